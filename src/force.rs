//! Mode-dependent velocity update for one body over one frame.
//!
//! Every function here reads the start-of-frame body set and returns the new
//! velocity instead of writing it, so the outcome never depends on the order in
//! which bodies are processed.

use std::f32::consts::TAU;
use std::time::Duration;

use ultraviolet::Vec2;

use crate::body::{Body, Mode};
use crate::render::Contact;

/// Fraction of the summed radii below which two `Normal` bodies overlap.
pub const CONTACT_FACTOR: f32 = 0.8;
/// Looser overlap threshold between two gathering bodies.
pub const GATHER_CONTACT_FACTOR: f32 = 0.6;

const REPULSION_SCALE: f32 = 0.005;
const EMERGENCY_DEPTH: f32 = 0.5;
const EMERGENCY_MULTIPLIER: f32 = 4.0;
const BASE_MULTIPLIER: f32 = 1.5;
const BOOST_PER_DEPTH: f32 = 0.04;
const BOOST_DECAY: f32 = 0.95;
const BASE_MAX_SPEED: f32 = 1.5;
const BOOST_SPEED_GAIN: f32 = 20.0;

const GATHER_DRAG: f32 = 0.998;
const GATHER_OUTER_RANGE: f32 = 250.0;
const GATHER_INNER_RANGE: f32 = 100.0;
const GATHER_SEPARATION: f32 = 0.003;

/// Downward acceleration per frame while exploding.
pub const GRAVITY: f32 = 0.3;
const EXPLODE_DRAG_X: f32 = 0.995;
const EXPLODE_DRAG_Y: f32 = 0.998;

/// Inputs shared by every body in a frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    pub focal: Vec2,
    /// Repulsion scale for `Normal` overlaps.
    pub repulsion: f32,
    /// Centripetal constant, divided by mass.
    pub center_pull: f32,
}

/// Result of evaluating one body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceOutcome {
    pub vel: Vec2,
    pub collision_boost: f32,
    pub contact: Contact,
}

/// Unit vector pointing from `other` to `pos`, and the distance between them.
///
/// Near-coincident points get a random direction and a distance of one, so the
/// caller never divides by zero.
pub fn separation(pos: Vec2, other: Vec2, rng: &mut fastrand::Rng) -> (Vec2, f32) {
    let delta = pos - other;
    let distance = delta.mag();
    if distance < 1.0 {
        (random_direction(rng), 1.0)
    } else {
        (delta / distance, distance)
    }
}

pub fn random_direction(rng: &mut fastrand::Rng) -> Vec2 {
    let angle = rng.f32() * TAU;
    let (sin, cos) = angle.sin_cos();
    Vec2::new(cos, sin)
}

/// Evaluates `bodies[index]` for one frame.
pub fn evaluate(bodies: &[Body], index: usize, ctx: &FrameContext, rng: &mut fastrand::Rng) -> ForceOutcome {
    let body = &bodies[index];
    match body.mode {
        Mode::Normal => normal(bodies, index, ctx, rng),
        Mode::Gathering { .. } => ForceOutcome {
            vel: gathering(bodies, index, ctx.focal),
            collision_boost: body.collision_boost,
            contact: Contact::default(),
        },
        Mode::Exploding { .. } => ForceOutcome {
            vel: exploding(body.vel),
            collision_boost: body.collision_boost,
            contact: Contact::default(),
        },
    }
}

/// Centripetal pull plus mass-weighted repulsion from every overlapping neighbour.
fn normal(bodies: &[Body], index: usize, ctx: &FrameContext, rng: &mut fastrand::Rng) -> ForceOutcome {
    let body = &bodies[index];
    let mut force = Vec2::zero();
    let mut boost = body.collision_boost;
    let mut contact = Contact::default();

    let to_focal = ctx.focal - body.pos;
    let focal_distance = to_focal.mag();
    if focal_distance > 0.0 {
        force += to_focal / focal_distance * (ctx.center_pull / body.mass);
    }

    for (j, other) in bodies.iter().enumerate() {
        if j == index || !other.ready || other.is_exploding() {
            continue;
        }
        let min_distance = (body.radius + other.radius) * CONTACT_FACTOR;
        if (body.pos - other.pos).mag_sq() >= min_distance * min_distance {
            continue;
        }

        let (direction, distance) = separation(body.pos, other.pos, rng);
        let depth = min_distance - distance;
        let mass_ratio = other.mass / (body.mass + other.mass);
        let multiplier = if depth > body.radius * EMERGENCY_DEPTH {
            EMERGENCY_MULTIPLIER
        } else {
            BASE_MULTIPLIER
        };

        force += direction * (depth * ctx.repulsion * REPULSION_SCALE * mass_ratio * multiplier);
        boost = boost.max(depth * BOOST_PER_DEPTH);

        contact.collided = true;
        contact.intensity = contact.intensity.max(depth / body.radius * mass_ratio);
    }

    let mut vel = (body.vel + force / body.mass) * body.damping;
    boost *= BOOST_DECAY;

    let max_speed = BASE_MAX_SPEED / body.mass * (1.0 + boost * BOOST_SPEED_GAIN);
    let speed = vel.mag();
    if speed > max_speed {
        vel *= max_speed / speed;
    }

    ForceOutcome {
        vel,
        collision_boost: boost,
        contact,
    }
}

/// Two-stage ease-in toward the focal point with a weak separation nudge.
fn gathering(bodies: &[Body], index: usize, focal: Vec2) -> Vec2 {
    let body = &bodies[index];
    let mut vel = body.vel * GATHER_DRAG;

    let distance = (body.pos - focal).mag();
    if distance < GATHER_OUTER_RANGE {
        vel *= 0.88 + (distance / GATHER_OUTER_RANGE).powf(0.7) * 0.1;
    }
    if distance < GATHER_INNER_RANGE {
        vel *= 0.75 + (distance / GATHER_INNER_RANGE).powf(0.5) * 0.2;
    }

    for (j, other) in bodies.iter().enumerate() {
        if j == index || !other.ready || !other.is_gathering() {
            continue;
        }
        let delta = body.pos - other.pos;
        let distance = delta.mag();
        let min_distance = (body.radius + other.radius) * GATHER_CONTACT_FACTOR;
        if distance < min_distance && distance > 1.0 {
            vel += delta / distance * ((min_distance - distance) * GATHER_SEPARATION);
        }
    }
    vel
}

/// Gravity with anisotropic drag; no neighbour interaction.
fn exploding(vel: Vec2) -> Vec2 {
    Vec2::new(vel.x * EXPLODE_DRAG_X, (vel.y + GRAVITY) * EXPLODE_DRAG_Y)
}

/// Whether an exploding body has been exploding for at least `duration`.
pub fn has_expired(body: &Body, now: Duration, duration: Duration) -> bool {
    body.is_exploding() && body.mode_age(now).is_some_and(|age| age >= duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyId;

    fn ctx() -> FrameContext {
        FrameContext {
            focal: Vec2::new(500.0, 300.0),
            repulsion: 100.0,
            center_pull: 0.08,
        }
    }

    fn body(id: u64, x: f32, y: f32) -> Body {
        Body::with_variation(BodyId(id), 'た', Vec2::new(x, y), 60.0, 1.0)
    }

    #[test]
    fn isolated_normal_body_drifts_toward_focal() {
        let bodies = vec![body(1, 300.0, 300.0)];
        let mut rng = fastrand::Rng::with_seed(1);
        let out = evaluate(&bodies, 0, &ctx(), &mut rng);

        assert!(out.vel.x > 0.0);
        assert!(out.vel.y.abs() < 1e-6);
        assert!((out.vel.x - 0.08 * 0.96).abs() < 1e-6);
        assert!(!out.contact.collided);
    }

    #[test]
    fn overlap_raises_boost_and_reports_contact() {
        let bodies = vec![body(1, 480.0, 300.0), body(2, 520.0, 300.0)];
        let mut rng = fastrand::Rng::with_seed(1);
        let out = evaluate(&bodies, 0, &ctx(), &mut rng);

        // min distance 57.6, actual 40
        let depth = 57.6 - 40.0;
        assert!(out.vel.x < 0.0);
        assert!(out.contact.collided);
        assert!((out.contact.intensity - depth / 36.0 * 0.5).abs() < 1e-4);
        assert!((out.collision_boost - depth * 0.04 * 0.95).abs() < 1e-4);
    }

    #[test]
    fn boost_is_a_floor_not_a_sum() {
        let mut bodies = vec![body(1, 480.0, 300.0), body(2, 520.0, 300.0)];
        bodies[0].collision_boost = 5.0;
        let mut rng = fastrand::Rng::with_seed(1);
        let out = evaluate(&bodies, 0, &ctx(), &mut rng);
        assert!((out.collision_boost - 5.0 * 0.95).abs() < 1e-5);
    }

    #[test]
    fn exploding_neighbours_are_ignored() {
        let mut bodies = vec![body(1, 480.0, 300.0), body(2, 490.0, 300.0)];
        bodies[1].enter_exploding(Duration::ZERO);
        let mut rng = fastrand::Rng::with_seed(1);
        let out = evaluate(&bodies, 0, &ctx(), &mut rng);
        assert!(!out.contact.collided);
    }

    #[test]
    fn speed_is_capped_by_mass_and_boost() {
        let mut bodies = vec![body(1, 300.0, 300.0)];
        bodies[0].vel = Vec2::new(100.0, 0.0);
        let mut rng = fastrand::Rng::with_seed(1);
        let out = evaluate(&bodies, 0, &ctx(), &mut rng);
        assert!((out.vel.mag() - 1.5).abs() < 1e-4);

        bodies[0].collision_boost = 1.0;
        let out = evaluate(&bodies, 0, &ctx(), &mut rng);
        assert!((out.vel.mag() - 1.5 * (1.0 + 0.95 * 20.0)).abs() < 1e-3);
    }

    #[test]
    fn coincident_bodies_get_a_random_unit_direction() {
        let bodies = vec![body(1, 500.0, 300.0), body(2, 500.0, 300.0)];
        let mut rng = fastrand::Rng::with_seed(9);
        let out = evaluate(&bodies, 0, &ctx(), &mut rng);
        assert!(out.vel.x.is_finite() && out.vel.y.is_finite());
        assert!(out.vel.mag() > 0.0);
        assert!(out.contact.collided);
    }

    #[test]
    fn gathering_eases_in_near_focal() {
        let mut far = body(1, 500.0, 0.0);
        far.enter_gathering(Duration::ZERO);
        far.vel = Vec2::new(0.0, 10.0);
        let mut near = body(2, 500.0, 250.0);
        near.enter_gathering(Duration::ZERO);
        near.vel = Vec2::new(0.0, 10.0);

        let bodies = vec![far, near];
        let v_far = gathering(&bodies, 0, ctx().focal);
        let v_near = gathering(&bodies, 1, ctx().focal);

        assert!((v_far.y - 9.98).abs() < 1e-4);
        // 50 from the focal point: both damping stages compound
        let outer = 0.88 + 0.2f32.powf(0.7) * 0.1;
        let inner = 0.75 + 0.5f32.powf(0.5) * 0.2;
        assert!((v_near.y - 10.0 * 0.998 * outer * inner).abs() < 1e-4);
    }

    #[test]
    fn gathering_bodies_nudge_apart() {
        let mut a = body(1, 480.0, 0.0);
        let mut b = body(2, 500.0, 0.0);
        a.enter_gathering(Duration::ZERO);
        b.enter_gathering(Duration::ZERO);
        let bodies = vec![a, b];

        let v = gathering(&bodies, 0, Vec2::new(500.0, 300.0));
        // min distance 43.2, actual 20
        assert!((v.x + (43.2 - 20.0) * 0.003).abs() < 1e-5);
    }

    #[test]
    fn exploding_follows_a_parabola() {
        let v = exploding(Vec2::new(10.0, -10.0));
        assert!((v.x - 9.95).abs() < 1e-5);
        assert!((v.y - (-9.7 * 0.998)).abs() < 1e-5);
    }

    #[test]
    fn explosion_expires_at_duration() {
        let mut b = body(1, 0.0, 0.0);
        b.enter_exploding(Duration::from_millis(1000));
        let duration = Duration::from_millis(3000);
        assert!(!has_expired(&b, Duration::from_millis(3999), duration));
        assert!(has_expired(&b, Duration::from_millis(4000), duration));
    }
}
