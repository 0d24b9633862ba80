//! Boundary with the presentation layer: per-frame render reports, the
//! collision side-effect hook, and the squash visual that renderers apply on
//! contact.

use std::time::Duration;

use crate::body::{Body, BodyId};

/// Collision state of one body for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Contact {
    pub collided: bool,
    /// Strongest `(depth / radius) * mass_ratio` over this frame's overlaps.
    pub intensity: f32,
}

/// Receives every ready body once per frame, after all physics has run.
pub trait RenderSink {
    fn present(&mut self, body: &Body, contact: Contact, now: Duration);

    /// Called once when a body leaves the active set.
    fn retire(&mut self, _id: BodyId) {}
}

/// Fired when a `Normal` body starts or keeps overlapping, rate limited per body.
pub trait CollisionHook {
    fn on_collision(&mut self, id: BodyId, glyph: char);
}

impl<F: FnMut(BodyId, char)> CollisionHook for F {
    fn on_collision(&mut self, id: BodyId, glyph: char) {
        self(id, glyph)
    }
}

/// Non-uniform scale and blur applied to a glyph while it is being squashed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Squash {
    pub scale_x: f32,
    pub scale_y: f32,
    pub blur: f32,
}

impl Squash {
    pub const IDENTITY: Squash = Squash {
        scale_x: 1.0,
        scale_y: 1.0,
        blur: 0.0,
    };

    pub fn from_intensity(intensity: f32) -> Self {
        let amount = (intensity * 0.5).min(1.0);
        Self {
            scale_x: (1.0 - amount * 0.3).max(0.7),
            scale_y: (1.0 + amount * 0.5).min(1.5),
            blur: (amount * 0.2).min(0.5),
        }
    }
}

/// Per-glyph squash state that reverts on its own unless re-triggered.
#[derive(Clone, Copy, Debug)]
pub struct Deformation {
    squash: Squash,
    until: Option<Duration>,
}

impl Default for Deformation {
    fn default() -> Self {
        Self {
            squash: Squash::IDENTITY,
            until: None,
        }
    }
}

impl Deformation {
    pub const HOLD: Duration = Duration::from_millis(150);

    /// Feeds one frame's contact. Frames without contact leave a running squash alone.
    pub fn update(&mut self, contact: Contact, now: Duration) {
        if contact.collided && contact.intensity > 0.0 {
            self.squash = Squash::from_intensity(contact.intensity);
            self.until = Some(now + Self::HOLD);
        }
    }

    pub fn current(&self, now: Duration) -> Squash {
        match self.until {
            Some(until) if now < until => self.squash,
            _ => Squash::IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn squash_is_bounded() {
        let squash = Squash::from_intensity(10.0);
        assert!((squash.scale_x - 0.7).abs() < 1e-6);
        assert!((squash.scale_y - 1.5).abs() < 1e-6);
        assert!((squash.blur - 0.2).abs() < 1e-6);
        assert_eq!(Squash::from_intensity(0.0), Squash::IDENTITY);
    }

    #[test]
    fn deformation_reverts_after_hold() {
        let mut deformation = Deformation::default();
        let hit = Contact {
            collided: true,
            intensity: 0.4,
        };
        deformation.update(hit, ms(1000));
        assert_ne!(deformation.current(ms(1100)), Squash::IDENTITY);

        deformation.update(Contact::default(), ms(1100));
        assert_ne!(deformation.current(ms(1149)), Squash::IDENTITY);
        assert_eq!(deformation.current(ms(1150)), Squash::IDENTITY);

        deformation.update(hit, ms(1140));
        assert_ne!(deformation.current(ms(1200)), Squash::IDENTITY);
    }

    #[test]
    fn closures_are_collision_hooks() {
        let mut seen = Vec::new();
        {
            let mut hook = |id: BodyId, glyph: char| seen.push((id, glyph));
            hook.on_collision(BodyId(3), 'さ');
        }
        assert_eq!(seen, vec![(BodyId(3), 'さ')]);
    }
}
