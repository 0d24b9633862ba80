use crate::{
    arena::Arena,
    body::{Body, BodyId},
    config::{ConfigError, CrowdConfig},
    force::{self, FrameContext},
    glyphs,
    overlap::OverlapResolver,
    render::{CollisionHook, Contact, RenderSink},
    shape::ShapeCache,
    spawn::{Approach, Occupant, SpawnPlanner},
    timeline::{Deferred, Timeline},
};

use std::f32::consts::{PI, TAU};
use std::time::Duration;
use ultraviolet::Vec2;

const BURST_BASE_SPEED: f32 = 12.0;
const BURST_SPEED_SPREAD: f32 = 18.0;
/// Each burst direction strays up to half this angle from its sector.
const BURST_JITTER: f32 = PI;
const BURST_BOOST_BASE: f32 = 1.5;
const BURST_BOOST_SPREAD: f32 = 1.0;
const SCATTER_BASE_SPEED: f32 = 20.0;
const SCATTER_SPEED_SPREAD: f32 = 15.0;
const SCATTER_BOOST: f32 = 3.0;
/// Boost granted per unit of impulse effect.
const IMPULSE_BOOST: f32 = 0.5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CrowdError {
    #[error("input contains no usable glyphs")]
    NoGlyphs,
    #[error("crowd already holds the maximum of {max} bodies")]
    CapacityReached { max: usize },
}

/// How `disperse` picks launch directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dispersal {
    /// Spread around the full circle by body index, each direction jittered.
    Outward,
    /// Uniformly random.
    Scatter,
}

/// Owns the active crowd and advances it one frame at a time.
pub struct Simulation {
    config: CrowdConfig,
    pub arena: Arena,
    /// Number of completed frames.
    pub frame: usize,
    /// Simulated time at the end of the last frame.
    pub clock: Duration,
    /// Active bodies in spawn order.
    pub bodies: Vec<Body>,
    overlap: OverlapResolver,
    pub timeline: Timeline,
    rng: fastrand::Rng,
    next_id: u64,
    shapes: Option<ShapeCache>,
    render: Option<Box<dyn RenderSink>>,
    collision_hook: Option<Box<dyn CollisionHook>>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("arena", &self.arena)
            .field("frame", &self.frame)
            .field("clock", &self.clock)
            .field("bodies", &self.bodies)
            .field("overlap", &self.overlap)
            .field("timeline", &self.timeline)
            .field("shapes", &self.shapes)
            .field("render", &self.render.as_ref().map(|_| "RenderSink"))
            .field("collision_hook", &self.collision_hook.as_ref().map(|_| "CollisionHook"))
            .finish()
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// Empty simulation with the default configuration and an entropy-seeded RNG.
    pub fn new() -> Self {
        Self::build(CrowdConfig::default())
    }

    /// Empty simulation with a validated configuration.
    pub fn with_config(config: CrowdConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Default configuration with a fixed seed, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::build(CrowdConfig {
            seed: Some(seed),
            ..CrowdConfig::default()
        })
    }

    fn build(config: CrowdConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let [width, height] = config.world_size;
        let arena = Arena::new(width, height, config.focal());
        let overlap = OverlapResolver::new(config.overlap_passes);

        Self {
            config,
            arena,
            frame: 0,
            clock: Duration::ZERO,
            bodies: Vec::new(),
            overlap,
            timeline: Timeline::new(),
            rng,
            next_id: 1,
            shapes: None,
            render: None,
            collision_hook: None,
        }
    }

    pub fn with_shapes(mut self, shapes: ShapeCache) -> Self {
        self.shapes = Some(shapes);
        self
    }

    pub fn with_render_sink(mut self, sink: impl RenderSink + 'static) -> Self {
        self.render = Some(Box::new(sink));
        self
    }

    pub fn with_collision_hook(mut self, hook: impl CollisionHook + 'static) -> Self {
        self.collision_hook = Some(Box::new(hook));
        self
    }

    /// Validated configuration. Runtime changes go through the `set_*` methods.
    pub fn config(&self) -> &CrowdConfig {
        &self.config
    }

    pub fn overlap(&self) -> &OverlapResolver {
        &self.overlap
    }

    pub fn shapes_mut(&mut self) -> Option<&mut ShapeCache> {
        self.shapes.as_mut()
    }

    /// Detaches the shape cache, emptied, e.g. before the font backing it is dropped.
    pub fn teardown_shapes(&mut self) -> Option<ShapeCache> {
        let mut shapes = self.shapes.take()?;
        shapes.clear();
        Some(shapes)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.iter().find(|body| body.id == id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|body| body.id == id)
    }

    pub fn character_size(&self) -> f32 {
        self.config.character_size as f32
    }

    pub fn planner(&self) -> SpawnPlanner {
        SpawnPlanner::new(self.arena, self.character_size(), self.config.spawn_attempts)
    }

    /// Advances the simulation by one frame.
    ///
    /// Deferred tasks run first, then expired explosions settle. Forces are
    /// evaluated against the start-of-frame state, integrated, and clamped to
    /// the arena. Overlaps are resolved, every ready body is reported to the
    /// render sink, and exploding bodies that left the world are removed.
    pub fn step(&mut self) {
        self.clock += self.config.frame_interval();
        self.frame += 1;
        let now = self.clock;

        self.run_due(now);
        self.expire(now);
        self.integrate(now);
        self.overlap.resolve(&mut self.bodies, &self.arena, &mut self.rng);
        self.report(now);
        self.sweep();
    }

    fn run_due(&mut self, now: Duration) {
        for action in self.timeline.take_due(now) {
            match action {
                Deferred::EndGathering(id) => {
                    if let Some(body) = self.body_mut(id) {
                        if body.is_gathering() {
                            body.settle();
                        }
                    }
                }
                Deferred::Despawn(ids) => {
                    for id in ids {
                        self.remove(id);
                    }
                }
                Deferred::Gather(glyphs) => {
                    self.spawn_batch(&glyphs, Approach::Gather);
                }
            }
        }
    }

    fn expire(&mut self, now: Duration) {
        let duration = self.config.exploding_duration();
        for body in &mut self.bodies {
            if force::has_expired(body, now, duration) {
                body.settle();
                log::debug!("{:?} ({}) returned from exploding", body.id, body.glyph);
            }
        }
    }

    fn integrate(&mut self, now: Duration) {
        let ctx = FrameContext {
            focal: self.arena.focal,
            repulsion: self.config.repulsion as f32,
            center_pull: self.config.center_pull,
        };
        let cooldown = self.config.collision_cooldown();

        let bodies = &self.bodies;
        let rng = &mut self.rng;
        let outcomes = (0..bodies.len())
            .map(|index| bodies[index].ready.then(|| force::evaluate(bodies, index, &ctx, rng)))
            .collect::<Vec<_>>();

        for (body, outcome) in self.bodies.iter_mut().zip(outcomes) {
            let Some(outcome) = outcome else {
                continue;
            };
            body.vel = outcome.vel;
            body.collision_boost = outcome.collision_boost;
            body.contact = outcome.contact;

            if outcome.contact.collided && body.take_collision_signal(now, cooldown) {
                log::trace!(
                    "{:?} ({}) collision, intensity {:.3}",
                    body.id,
                    body.glyph,
                    outcome.contact.intensity
                );
                if let Some(hook) = self.collision_hook.as_mut() {
                    hook.on_collision(body.id, body.glyph);
                }
            }

            body.pos += body.vel;
            self.arena.clamp(body);
        }
    }

    fn report(&mut self, now: Duration) {
        let Some(sink) = self.render.as_mut() else {
            return;
        };
        for body in self.bodies.iter().filter(|body| body.ready) {
            sink.present(body, body.contact, now);
        }
    }

    /// Removes exploding bodies that have left the world. Unready bodies have
    /// nothing to show, so they go as soon as they explode.
    fn sweep(&mut self) {
        let gone = self
            .bodies
            .iter()
            .filter(|body| body.is_exploding() && (!body.ready || self.arena.is_off_screen(body)))
            .map(|body| body.id)
            .collect::<Vec<_>>();
        for id in gone {
            self.remove(id);
        }
    }

    /// Adds a gathering body that starts at `start` and heads for `target`.
    /// It settles into `Normal` after the configured gathering duration.
    pub fn spawn(&mut self, glyph: char, start: Vec2, target: Vec2) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;

        let character_size = self.character_size();
        let mut body = Body::new(id, glyph, start, character_size, &mut self.rng);
        let launch = self.planner().launch(start, target, &mut self.rng);
        body.vel = launch.vel;
        body.collision_boost = launch.collision_boost;
        body.enter_gathering(self.clock);
        self.acquire_outline(&mut body);

        self.timeline
            .schedule(self.clock + self.config.gathering_duration(), Deferred::EndGathering(id));
        log::debug!(
            "spawned {:?} ({}) at ({:.1}, {:.1}) heading for ({:.1}, {:.1})",
            id,
            glyph,
            start.x,
            start.y,
            target.x,
            target.y
        );
        self.bodies.push(body);
        id
    }

    fn acquire_outline(&mut self, body: &mut Body) {
        let size = body.size(self.character_size());
        let Some(shapes) = self.shapes.as_mut() else {
            return;
        };
        match shapes.get(body.glyph, size) {
            Ok(outline) => {
                body.outline = Some(outline);
                body.ready = true;
            }
            Err(err) => {
                log::warn!("{:?} ({}) has no outline, keeping it out of the simulation: {}", body.id, body.glyph, err);
                body.ready = false;
            }
        }
    }

    /// Removes a body and drops its pending tasks. Returns `false` if it was already gone.
    pub fn remove(&mut self, id: BodyId) -> bool {
        let Some(index) = self.bodies.iter().position(|body| body.id == id) else {
            return false;
        };
        self.bodies.remove(index);
        self.timeline.forget(id);
        if let Some(sink) = self.render.as_mut() {
            sink.retire(id);
        }
        true
    }

    fn spawn_batch(&mut self, glyphs: &[char], approach: Approach) -> Vec<BodyId> {
        let occupied = self
            .bodies
            .iter()
            .filter(|body| !body.is_exploding())
            .map(|body| Occupant {
                pos: body.pos,
                radius: body.radius,
            })
            .collect::<Vec<_>>();
        let plans = self.planner().plan(glyphs, &occupied, approach, &mut self.rng);
        plans
            .into_iter()
            .map(|plan| self.spawn(plan.glyph, plan.start, plan.target))
            .collect()
    }

    /// Replaces the crowd with the accepted glyphs of `text`.
    ///
    /// An existing crowd is scattered first; the new glyphs arrive once the
    /// clear delay has passed. Returns how many glyphs will be spawned.
    pub fn gather(&mut self, text: &str) -> Result<usize, CrowdError> {
        let glyphs = glyphs::accepted(text, self.config.max_bodies);
        if glyphs.is_empty() {
            return Err(CrowdError::NoGlyphs);
        }
        let count = glyphs.len();

        self.timeline.cancel_gathers();
        if self.bodies.is_empty() {
            self.spawn_batch(&glyphs, Approach::Gather);
        } else {
            let due = self.clock + self.config.clear_delay();
            let ids = self.disperse(Dispersal::Scatter);
            self.timeline.schedule(due, Deferred::Despawn(ids));
            self.timeline.schedule(due, Deferred::Gather(glyphs));
        }
        log::info!("gathering {count} glyphs");
        Ok(count)
    }

    /// Adds the accepted glyphs of `text` to the current crowd, up to capacity.
    /// Returns how many were added.
    pub fn add(&mut self, text: &str) -> Result<usize, CrowdError> {
        let max = self.config.max_bodies;
        let mut glyphs = glyphs::accepted(text, max);
        if glyphs.is_empty() {
            return Err(CrowdError::NoGlyphs);
        }
        let room = max.saturating_sub(self.bodies.len());
        if room == 0 {
            return Err(CrowdError::CapacityReached { max });
        }
        if glyphs.len() > room {
            log::info!("only {room} of {} glyphs fit, dropping the rest", glyphs.len());
            glyphs.truncate(room);
        }
        self.spawn_batch(&glyphs, Approach::Add);
        log::info!("added {} glyphs", glyphs.len());
        Ok(glyphs.len())
    }

    /// Blows the crowd apart and drops any batch still waiting to spawn.
    /// Bodies are removed one by one as they leave the world.
    pub fn clear(&mut self) {
        self.timeline.cancel_gathers();
        if self.bodies.is_empty() {
            return;
        }
        log::info!("clearing {} bodies", self.bodies.len());
        self.explode_all();
    }

    /// Switches every body to `Exploding` with a randomized launch. Directions
    /// fan out around the circle so the crowd bursts in every direction.
    /// Bodies remove themselves once they leave the world.
    pub fn explode_all(&mut self) {
        let ids = self.disperse(Dispersal::Outward);
        log::info!("exploding {} bodies", ids.len());
    }

    fn disperse(&mut self, dispersal: Dispersal) -> Vec<BodyId> {
        let now = self.clock;
        let count = self.bodies.len() as f32;
        let rng = &mut self.rng;

        self.bodies
            .iter_mut()
            .enumerate()
            .map(|(index, body)| {
                let (vel, boost) = match dispersal {
                    Dispersal::Outward => {
                        let sector = index as f32 / count * TAU;
                        let (sin, cos) = (sector + (rng.f32() - 0.5) * BURST_JITTER).sin_cos();
                        let speed = BURST_BASE_SPEED + rng.f32() * BURST_SPEED_SPREAD;
                        (
                            Vec2::new(cos, sin) * speed,
                            BURST_BOOST_BASE + rng.f32() * BURST_BOOST_SPREAD,
                        )
                    }
                    Dispersal::Scatter => {
                        let speed = SCATTER_BASE_SPEED + rng.f32() * SCATTER_SPEED_SPREAD;
                        (force::random_direction(rng) * speed, SCATTER_BOOST)
                    }
                };

                body.enter_exploding(now);
                body.vel = vel;
                body.collision_boost = boost;
                body.id
            })
            .collect()
    }

    /// Pushes every body near `point` outward. The push fades linearly to zero
    /// at the configured falloff radius and is divided by mass. Returns how many
    /// bodies were affected.
    pub fn apply_impulse(&mut self, point: Vec2) -> usize {
        let strength = self.config.impulse_strength;
        let falloff = self.config.impulse_falloff;
        let mut affected = 0;

        for body in &mut self.bodies {
            let delta = body.pos - point;
            let distance = delta.mag();
            if distance <= 0.0 {
                continue;
            }
            let effect = (1.0 - distance / falloff).max(0.0);
            if effect <= 0.0 {
                continue;
            }
            body.vel += delta / distance * (strength * effect / body.mass);
            body.collision_boost = body.collision_boost.max(effect * IMPULSE_BOOST);
            affected += 1;
        }

        log::debug!("impulse at ({:.1}, {:.1}) moved {affected} bodies", point.x, point.y);
        affected
    }

    pub fn set_repulsion(&mut self, repulsion: i32) {
        if repulsion < 0 {
            log::warn!("ignoring negative repulsion {repulsion}");
            return;
        }
        self.config.repulsion = repulsion;
    }

    /// Changes the base character size and rescales every body's radius and mass.
    pub fn set_character_size(&mut self, size: i32) {
        if size <= 0 {
            log::warn!("ignoring non-positive character size {size}");
            return;
        }
        self.config.character_size = size;
        let character_size = size as f32;

        for body in &mut self.bodies {
            body.resize(character_size);
            let Some(shapes) = self.shapes.as_mut() else {
                continue;
            };
            match shapes.get(body.glyph, body.size(character_size)) {
                Ok(outline) => body.outline = Some(outline),
                Err(err) => log::warn!("{:?} ({}) keeps its old outline: {}", body.id, body.glyph, err),
            }
            log::debug!(
                "{:?} ({}) resized: radius {:.1}, mass {:.2}",
                body.id,
                body.glyph,
                body.radius,
                body.mass
            );
        }
    }

    /// Contact reports from the last frame, in body order.
    pub fn contacts(&self) -> impl Iterator<Item = (BodyId, Contact)> + '_ {
        self.bodies.iter().map(|body| (body.id, body.contact))
    }
}
