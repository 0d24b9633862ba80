use ultraviolet::Vec2;

use crate::body::Body;

/// Restitution of a wall bounce in `Normal` and `Gathering` mode.
pub const RESTITUTION: f32 = 0.3;
/// Restitution of a ceiling bounce while exploding.
pub const EXPLODING_RESTITUTION: f32 = 0.6;
/// Speed added toward the focal point when a gathering body hugs a wall.
pub const GATHER_RESCUE_IMPULSE: f32 = 2.0;
/// Extra distance beyond the radius before an exploding body counts as gone.
pub const OFF_SCREEN_MARGIN: f32 = 50.0;

/// The fixed `[0, width] x [0, height]` world and its focal point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
    pub focal: Vec2,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(1000.0, 600.0, Vec2::new(500.0, 300.0))
    }
}

impl Arena {
    pub fn new(width: f32, height: f32, focal: Vec2) -> Self {
        Self { width, height, focal }
    }

    /// Reflects a body back into the world after integration.
    ///
    /// Every wall uses a margin of one radius. Exploding bodies only bounce off
    /// the ceiling; the other edges are open so dispersal can leave the world.
    pub fn clamp(&self, body: &mut Body) {
        let margin = body.radius;
        let exploding = body.is_exploding();

        if exploding {
            if body.pos.y < margin {
                body.pos.y = margin;
                if body.vel.y < 0.0 {
                    body.vel.y *= -EXPLODING_RESTITUTION;
                }
            }
            return;
        }

        if body.pos.x < margin {
            body.pos.x = margin;
            if body.vel.x < 0.0 {
                body.vel.x *= -RESTITUTION;
            }
        }
        if body.pos.x > self.width - margin {
            body.pos.x = self.width - margin;
            if body.vel.x > 0.0 {
                body.vel.x *= -RESTITUTION;
            }
        }
        if body.pos.y < margin {
            body.pos.y = margin;
            if body.vel.y < 0.0 {
                body.vel.y *= -RESTITUTION;
            }
        }
        if body.pos.y > self.height - margin {
            body.pos.y = self.height - margin;
            if body.vel.y > 0.0 {
                body.vel.y *= -RESTITUTION;
            }
        }

        if body.is_gathering() && self.near_edge(body.pos, margin * 2.0) {
            let to_focal = self.focal - body.pos;
            let distance = to_focal.mag();
            if distance > 0.0 {
                body.vel += to_focal / distance * GATHER_RESCUE_IMPULSE;
            }
        }
    }

    /// Clamps a position into the world shrunk by `margin`. Velocity is untouched.
    pub fn contain(&self, pos: Vec2, margin: f32) -> Vec2 {
        Vec2::new(
            pos.x.max(margin).min(self.width - margin),
            pos.y.max(margin).min(self.height - margin),
        )
    }

    pub fn contains(&self, pos: Vec2, margin: f32) -> bool {
        pos.x >= margin && pos.x <= self.width - margin && pos.y >= margin && pos.y <= self.height - margin
    }

    fn near_edge(&self, pos: Vec2, band: f32) -> bool {
        pos.x <= band || pos.x >= self.width - band || pos.y <= band || pos.y >= self.height - band
    }

    /// Whether a body has fully left the world, with slack beyond its radius.
    pub fn is_off_screen(&self, body: &Body) -> bool {
        let margin = body.radius + OFF_SCREEN_MARGIN;
        body.pos.x < -margin
            || body.pos.x > self.width + margin
            || body.pos.y < -margin
            || body.pos.y > self.height + margin
    }
}
