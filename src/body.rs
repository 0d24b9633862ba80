use std::sync::Arc;
use std::time::Duration;

use ultraviolet::Vec2;

use crate::render::Contact;
use crate::shape::Outline;

/// Character size at which a body with unit size variation has unit mass.
pub const REFERENCE_SIZE: f32 = 60.0;
/// Collision radius as a fraction of the rendered size.
pub const RADIUS_FACTOR: f32 = 0.6;
/// Default per-frame velocity decay in `Normal` mode.
pub const DEFAULT_DAMPING: f32 = 0.96;

/// Contact must last this long before the stroke starts to thicken.
const STROKE_GROWTH_DELAY: Duration = Duration::from_millis(3000);
const STROKE_BASE: f32 = 2.0;
const STROKE_MAX: f32 = 20.0;

/// Stable handle of a body. Handles are never reused within a simulation.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

/// Motion state of a body. A body is in exactly one mode at any time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mode {
    Normal,
    /// Easing toward its settle target right after spawn.
    Gathering { started_at: Duration },
    /// Ballistic dispersal; may leave the world.
    Exploding { started_at: Duration },
}

impl Mode {
    /// Time at which the current transient mode was entered.
    pub fn started_at(&self) -> Option<Duration> {
        match *self {
            Mode::Normal => None,
            Mode::Gathering { started_at } | Mode::Exploding { started_at } => Some(started_at),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Mode::Normal => 0,
            Mode::Gathering { .. } => 1,
            Mode::Exploding { .. } => 2,
        }
    }
}

/// One simulated crowd unit, corresponding to one displayed glyph.
#[derive(Clone, Debug)]
pub struct Body {
    pub id: BodyId,
    pub glyph: char,
    /// Position vector in world coordinates.
    pub pos: Vec2,
    /// Velocity in world units per frame.
    pub vel: Vec2,
    pub mass: f32,
    /// Collision radius used for every distance test.
    pub radius: f32,
    /// Random per-body scale in `[0.5, 1.5)`, fixed for the body's lifetime.
    pub size_variation: f32,
    pub damping: f32,
    pub mode: Mode,
    /// Raises the momentary speed cap after an impact. Decays every `Normal` frame.
    pub collision_boost: f32,
    /// First overlap seen in `Normal` mode. Only drives the contact stroke signal.
    pub collision_started_at: Option<Duration>,
    /// Last time the collision hook fired for this body.
    pub last_collision_signal: Option<Duration>,
    /// Unready bodies are skipped by every physics phase.
    pub ready: bool,
    pub outline: Option<Arc<Outline>>,
    /// Collision report from the most recent frame.
    pub contact: Contact,
}

impl Body {
    /// Creates a body with a random size variation in `[0.5, 1.5)`.
    pub fn new(id: BodyId, glyph: char, pos: Vec2, character_size: f32, rng: &mut fastrand::Rng) -> Self {
        let variation = 0.5 + rng.f32();
        Self::with_variation(id, glyph, pos, character_size, variation)
    }

    /// Creates a resting `Normal` body with an explicit size variation.
    pub fn with_variation(id: BodyId, glyph: char, pos: Vec2, character_size: f32, size_variation: f32) -> Self {
        let mut body = Self {
            id,
            glyph,
            pos,
            vel: Vec2::zero(),
            mass: 1.0,
            radius: 1.0,
            size_variation,
            damping: DEFAULT_DAMPING,
            mode: Mode::Normal,
            collision_boost: 0.0,
            collision_started_at: None,
            last_collision_signal: None,
            ready: true,
            outline: None,
            contact: Contact::default(),
        };
        body.resize(character_size);
        body
    }

    /// Rendered size for the given base character size.
    pub fn size(&self, character_size: f32) -> f32 {
        character_size * self.size_variation
    }

    /// Rescales radius and mass to a new base character size.
    pub fn resize(&mut self, character_size: f32) {
        self.radius = self.size(character_size) * RADIUS_FACTOR;
        self.mass = self.size_variation * (character_size / REFERENCE_SIZE);
    }

    pub fn is_normal(&self) -> bool {
        matches!(self.mode, Mode::Normal)
    }

    pub fn is_gathering(&self) -> bool {
        matches!(self.mode, Mode::Gathering { .. })
    }

    pub fn is_exploding(&self) -> bool {
        matches!(self.mode, Mode::Exploding { .. })
    }

    pub fn enter_gathering(&mut self, now: Duration) {
        self.mode = Mode::Gathering { started_at: now };
    }

    pub fn enter_exploding(&mut self, now: Duration) {
        self.mode = Mode::Exploding { started_at: now };
    }

    pub fn settle(&mut self) {
        self.mode = Mode::Normal;
    }

    /// Time spent in the current transient mode, `None` while `Normal`.
    pub fn mode_age(&self, now: Duration) -> Option<Duration> {
        self.mode.started_at().map(|t| now.saturating_sub(t))
    }

    /// Marks the start of contact and reports whether the collision hook may fire.
    /// The hook is rate limited to once per `cooldown`.
    pub fn take_collision_signal(&mut self, now: Duration, cooldown: Duration) -> bool {
        if self.collision_started_at.is_none() {
            self.collision_started_at = Some(now);
        }
        match self.last_collision_signal {
            Some(last) if now.saturating_sub(last) < cooldown => false,
            _ => {
                self.last_collision_signal = Some(now);
                true
            }
        }
    }

    /// Outline stroke width for renderers: thickens by one unit per full second
    /// of contact beyond the first three.
    pub fn contact_stroke_width(&self, now: Duration) -> f32 {
        let Some(started) = self.collision_started_at else {
            return STROKE_BASE;
        };
        let contact = now.saturating_sub(started);
        if contact <= STROKE_GROWTH_DELAY {
            return STROKE_BASE;
        }
        let extra = (contact - STROKE_GROWTH_DELAY).as_secs() as f32;
        (STROKE_BASE + extra).min(STROKE_MAX)
    }
}
