use broccoli::aabb::Rect;
use ultraviolet::Vec2;

use crate::{
    arena::Arena,
    body::Body,
    force::{self, CONTACT_FACTOR},
};

/// Positional de-penetration run after the boundary step.
///
/// Each pass finds candidate pairs with a `broccoli` broad phase and pushes
/// every truly overlapping pair apart by half the overlap depth each. Only
/// positions change. Exploding and unready bodies take no part.
#[derive(Clone, Copy, Debug)]
pub struct OverlapResolver {
    pub passes: usize,
}

impl Default for OverlapResolver {
    fn default() -> Self {
        Self { passes: 2 }
    }
}

impl OverlapResolver {
    pub fn new(passes: usize) -> Self {
        Self { passes: passes.max(1) }
    }

    /// Runs every pass and returns how many pair corrections were applied.
    pub fn resolve(&self, bodies: &mut [Body], arena: &Arena, rng: &mut fastrand::Rng) -> usize {
        (0..self.passes).map(|_| Self::pass(bodies, arena, rng)).sum()
    }

    /// One broad-phase sweep over all eligible bodies.
    pub fn pass(bodies: &mut [Body], arena: &Arena, rng: &mut fastrand::Rng) -> usize {
        let mut rects = bodies
            .iter()
            .enumerate()
            .filter(|(_, body)| body.ready && !body.is_exploding())
            .map(|(index, body)| {
                let reach = Vec2::one() * (body.radius * CONTACT_FACTOR);
                let min = body.pos - reach;
                let max = body.pos + reach;
                (Rect::new(min.x, max.x, min.y, max.y), index)
            })
            .collect::<Vec<_>>();

        if rects.len() < 2 {
            return 0;
        }

        let mut corrected = 0;
        let mut broccoli = broccoli::Tree::new(&mut rects);

        broccoli.find_colliding_pairs(|i, j| {
            let i = *i.unpack_inner();
            let j = *j.unpack_inner();

            if Self::separate(bodies, i, j, arena, rng) {
                corrected += 1;
            }
        });

        corrected
    }

    /// Pushes bodies `i` and `j` apart if they overlap. Returns whether they did.
    fn separate(bodies: &mut [Body], i: usize, j: usize, arena: &Arena, rng: &mut fastrand::Rng) -> bool {
        let a = &bodies[i];
        let b = &bodies[j];

        let min_distance = (a.radius + b.radius) * CONTACT_FACTOR;
        let delta = a.pos - b.pos;
        let distance = delta.mag();
        if distance >= min_distance {
            return false;
        }

        let direction = if distance < 1.0 {
            force::random_direction(rng)
        } else {
            delta / distance
        };
        let push = direction * ((min_distance - distance) * 0.5);

        let (a_pos, a_margin) = (a.pos + push, a.radius);
        let (b_pos, b_margin) = (b.pos - push, b.radius);
        bodies[i].pos = arena.contain(a_pos, a_margin);
        bodies[j].pos = arena.contain(b_pos, b_margin);
        true
    }
}
