use std::f32::consts::{PI, TAU};
use std::ops::Range;

use ultraviolet::Vec2;

use crate::arena::Arena;

/// Settle targets are drawn from this ring around the focal point.
const TARGET_RING: Range<f32> = 80.0..160.0;
/// Minimum gap between targets, in character sizes, on top of the occupant radius.
const TARGET_SPACING: f32 = 1.2;
const TARGET_MARGIN: f32 = 0.6;

const LAUNCH_BASE_SPEED: f32 = 15.0;
const LAUNCH_SPEED_SPREAD: f32 = 10.0;
/// Distance that maps to a unit launch multiplier.
const LAUNCH_REFERENCE: f32 = 100.0;
const LAUNCH_MULTIPLIER: Range<f32> = 1.0..2.0;

const LAUNCH_BOOST_BASE: f32 = 1.2;
const LAUNCH_BOOST_SPREAD: f32 = 1.0;

/// Where a new batch of bodies comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Approach {
    /// A fresh crowd; starts scatter widely.
    Gather,
    /// Joining an existing crowd; starts stay a little closer.
    Add,
}

impl Approach {
    pub fn start_range(self) -> Range<f32> {
        match self {
            Approach::Gather => 150.0..400.0,
            Approach::Add => 150.0..300.0,
        }
    }
}

/// Something already taking up space around the focal point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Occupant {
    pub pos: Vec2,
    pub radius: f32,
}

/// Start and settle target for one glyph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnPlan {
    pub glyph: char,
    pub start: Vec2,
    pub target: Vec2,
}

/// Initial motion of a spawned body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Launch {
    pub vel: Vec2,
    pub collision_boost: f32,
}

/// Picks off-arena starts and loosely packed settle targets for new bodies.
#[derive(Clone, Copy, Debug)]
pub struct SpawnPlanner {
    pub arena: Arena,
    pub character_size: f32,
    /// Rejection-sampling budget per target.
    pub attempts: usize,
}

impl SpawnPlanner {
    pub fn new(arena: Arena, character_size: f32, attempts: usize) -> Self {
        Self {
            arena,
            character_size,
            attempts: attempts.max(1),
        }
    }

    /// Plans one start/target pair per glyph. Every chosen target is added to
    /// the occupied set so later glyphs in the batch avoid it.
    pub fn plan(
        &self,
        glyphs: &[char],
        occupied: &[Occupant],
        approach: Approach,
        rng: &mut fastrand::Rng,
    ) -> Vec<SpawnPlan> {
        let mut occupied = occupied.to_vec();
        glyphs
            .iter()
            .map(|&glyph| {
                let target = self.settle_target(&occupied, rng);
                let start = self.start_point(approach.start_range(), rng);
                occupied.push(Occupant {
                    pos: target,
                    radius: self.character_size / 2.0,
                });
                SpawnPlan { glyph, start, target }
            })
            .collect()
    }

    /// Random point on the target ring, retried while it crowds an occupant.
    /// Falls back to the last sample once the budget runs out, then clamps it
    /// into the world.
    pub fn settle_target(&self, occupied: &[Occupant], rng: &mut fastrand::Rng) -> Vec2 {
        let mut target = self.ring_point(TARGET_RING, rng);
        for _ in 1..self.attempts {
            if !self.is_occupied(target, occupied) {
                break;
            }
            target = self.ring_point(TARGET_RING, rng);
        }
        self.arena.contain(target, self.character_size * TARGET_MARGIN)
    }

    /// Random point at a distance in `range` from the focal point, usually outside the world.
    pub fn start_point(&self, range: Range<f32>, rng: &mut fastrand::Rng) -> Vec2 {
        let base = rng.f32() * TAU;
        let jitter = (rng.f32() - 0.5) * PI * 0.8;
        let distance = range.start + rng.f32() * (range.end - range.start);
        let (sin, cos) = (base + jitter).sin_cos();
        self.arena.focal + Vec2::new(cos, sin) * distance
    }

    fn ring_point(&self, ring: Range<f32>, rng: &mut fastrand::Rng) -> Vec2 {
        let angle = rng.f32() * TAU;
        let radius = ring.start + rng.f32() * (ring.end - ring.start);
        let (sin, cos) = angle.sin_cos();
        self.arena.focal + Vec2::new(cos, sin) * radius
    }

    fn is_occupied(&self, point: Vec2, occupied: &[Occupant]) -> bool {
        let spacing = self.character_size * TARGET_SPACING;
        occupied
            .iter()
            .any(|o| (point - o.pos).mag() < spacing + o.radius)
    }

    /// Initial velocity aimed at `target`, faster for far-away starts.
    pub fn launch(&self, start: Vec2, target: Vec2, rng: &mut fastrand::Rng) -> Launch {
        let delta = target - start;
        let distance = delta.mag();
        let vel = if distance > 0.0 {
            let base = LAUNCH_BASE_SPEED + rng.f32() * LAUNCH_SPEED_SPREAD;
            let multiplier = (distance / LAUNCH_REFERENCE).clamp(LAUNCH_MULTIPLIER.start, LAUNCH_MULTIPLIER.end);
            delta / distance * (base * multiplier)
        } else {
            let to_focal = self.arena.focal - start;
            let focal_distance = to_focal.mag();
            if focal_distance > 0.0 {
                to_focal / focal_distance * LAUNCH_BASE_SPEED
            } else {
                Vec2::zero()
            }
        };
        Launch {
            vel,
            collision_boost: LAUNCH_BOOST_BASE + rng.f32() * LAUNCH_BOOST_SPREAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> SpawnPlanner {
        SpawnPlanner::new(Arena::default(), 60.0, 50)
    }

    #[test]
    fn starts_fall_in_the_requested_band() {
        let planner = planner();
        let mut rng = fastrand::Rng::with_seed(4);
        for approach in [Approach::Gather, Approach::Add] {
            let range = approach.start_range();
            for _ in 0..200 {
                let d = (planner.start_point(range.clone(), &mut rng) - planner.arena.focal).mag();
                assert!(d >= range.start - 1e-3 && d <= range.end + 1e-3);
            }
        }
    }

    #[test]
    fn targets_lie_on_the_ring() {
        let planner = planner();
        let mut rng = fastrand::Rng::with_seed(8);
        for _ in 0..200 {
            let d = (planner.settle_target(&[], &mut rng) - planner.arena.focal).mag();
            assert!(d >= 80.0 - 1e-3 && d <= 160.0 + 1e-3);
        }
    }

    #[test]
    fn small_batches_get_spaced_targets() {
        let planner = planner();
        let mut rng = fastrand::Rng::with_seed(15);
        let plans = planner.plan(&['あ', 'い', 'う'], &[], Approach::Gather, &mut rng);
        assert_eq!(plans.len(), 3);
        assert_eq!(plans.iter().map(|p| p.glyph).collect::<String>(), "あいう");

        for i in 0..plans.len() {
            for j in i + 1..plans.len() {
                let d = (plans[i].target - plans[j].target).mag();
                assert!(d >= 60.0 * 1.2 + 30.0, "targets {i} and {j} are {d} apart");
            }
        }
    }

    #[test]
    fn crowded_ring_still_yields_targets_in_bounds() {
        let planner = SpawnPlanner::new(Arena::default(), 60.0, 3);
        let mut rng = fastrand::Rng::with_seed(2);
        let occupied = [Occupant {
            pos: planner.arena.focal,
            radius: 500.0,
        }];
        let target = planner.settle_target(&occupied, &mut rng);
        assert!(planner.arena.contains(target, 36.0));
    }

    #[test]
    fn launch_aims_at_target_with_bounded_speed() {
        let planner = planner();
        let mut rng = fastrand::Rng::with_seed(6);

        let far = planner.launch(Vec2::new(100.0, 300.0), Vec2::new(500.0, 300.0), &mut rng);
        assert!(far.vel.x > 0.0 && far.vel.y.abs() < 1e-4);
        assert!(far.vel.mag() >= 30.0 && far.vel.mag() <= 50.0);
        assert!((1.2..2.2).contains(&far.collision_boost));

        let near = planner.launch(Vec2::new(450.0, 300.0), Vec2::new(500.0, 300.0), &mut rng);
        assert!(near.vel.mag() >= 15.0 && near.vel.mag() <= 25.0);

        let still = planner.launch(Vec2::new(400.0, 300.0), Vec2::new(400.0, 300.0), &mut rng);
        assert!((still.vel - Vec2::new(15.0, 0.0)).mag() < 1e-4);
    }
}
