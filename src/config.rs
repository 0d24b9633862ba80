use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ultraviolet::Vec2;

/// Externally owned tuning for a crowd simulation.
///
/// Missing fields fall back to the defaults, so a JSON file only needs to name
/// what it changes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrowdConfig {
    /// World extent as `[width, height]`.
    pub world_size: [f32; 2],
    /// Attraction point for `Normal` and `Gathering` bodies.
    pub focal_point: [f32; 2],
    /// Scales `Normal`-mode repulsion between overlapping bodies.
    pub repulsion: i32,
    /// Base rendered size of a glyph; radius and mass scale with it.
    pub character_size: i32,
    /// Simulated time that passes per `step`.
    pub frame_interval_ms: f32,
    /// Centripetal pull toward the focal point, divided by mass.
    pub center_pull: f32,
    /// Overlap resolution passes per frame.
    pub overlap_passes: usize,
    pub collision_cooldown_ms: u64,
    /// Exploding bodies revert to `Normal` after this long.
    pub exploding_duration_ms: u64,
    /// Freshly spawned bodies gather for this long.
    pub gathering_duration_ms: u64,
    /// Delay between a clear and the removal of the cleared bodies.
    pub clear_delay_ms: u64,
    pub max_bodies: usize,
    /// Rejection-sampling budget per settle target.
    pub spawn_attempts: usize,
    pub impulse_strength: f32,
    pub impulse_falloff: f32,
    /// Fixed seed for reproducible runs. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for CrowdConfig {
    fn default() -> Self {
        Self {
            world_size: [1000.0, 600.0],
            focal_point: [500.0, 300.0],
            repulsion: 100,
            character_size: 60,
            frame_interval_ms: 1000.0 / 60.0,
            center_pull: 0.08,
            overlap_passes: 2,
            collision_cooldown_ms: 800,
            exploding_duration_ms: 3000,
            gathering_duration_ms: 1500,
            clear_delay_ms: 800,
            max_bodies: 50,
            spawn_attempts: 50,
            impulse_strength: 25.0,
            impulse_falloff: 200.0,
            seed: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("world size must be positive and finite, got {width}x{height}")]
    InvalidWorldSize { width: f32, height: f32 },
    #[error("focal point ({x}, {y}) lies outside the world")]
    FocalPointOutsideWorld { x: f32, y: f32 },
    #[error("character size must be positive, got {0}")]
    InvalidCharacterSize(i32),
    #[error("repulsion must not be negative, got {0}")]
    InvalidRepulsion(i32),
    #[error("frame interval must be positive and finite, got {0} ms")]
    InvalidFrameInterval(f32),
    #[error("at least one overlap pass is required")]
    NoOverlapPasses,
    #[error("center pull must be finite and non-negative, got {0}")]
    InvalidCenterPull(f32),
    #[error("max bodies must be at least 1")]
    InvalidMaxBodies,
    #[error("impulse falloff must be positive and finite, got {0}")]
    InvalidImpulseFalloff(f32),
}

impl CrowdConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_world()?;
        self.validate_physics()?;
        self.validate_limits()
    }

    fn validate_world(&self) -> Result<(), ConfigError> {
        let [width, height] = self.world_size;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ConfigError::InvalidWorldSize { width, height });
        }
        let [x, y] = self.focal_point;
        if !((0.0..=width).contains(&x) && (0.0..=height).contains(&y)) {
            return Err(ConfigError::FocalPointOutsideWorld { x, y });
        }
        Ok(())
    }

    fn validate_physics(&self) -> Result<(), ConfigError> {
        if self.character_size <= 0 {
            return Err(ConfigError::InvalidCharacterSize(self.character_size));
        }
        if self.repulsion < 0 {
            return Err(ConfigError::InvalidRepulsion(self.repulsion));
        }
        if !(self.frame_interval_ms.is_finite() && self.frame_interval_ms > 0.0) {
            return Err(ConfigError::InvalidFrameInterval(self.frame_interval_ms));
        }
        if !(self.center_pull.is_finite() && self.center_pull >= 0.0) {
            return Err(ConfigError::InvalidCenterPull(self.center_pull));
        }
        if self.overlap_passes == 0 {
            return Err(ConfigError::NoOverlapPasses);
        }
        Ok(())
    }

    fn validate_limits(&self) -> Result<(), ConfigError> {
        if self.max_bodies == 0 {
            return Err(ConfigError::InvalidMaxBodies);
        }
        if !(self.impulse_falloff.is_finite() && self.impulse_falloff > 0.0) {
            return Err(ConfigError::InvalidImpulseFalloff(self.impulse_falloff));
        }
        Ok(())
    }

    pub fn focal(&self) -> Vec2 {
        Vec2::new(self.focal_point[0], self.focal_point[1])
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f32(self.frame_interval_ms / 1000.0)
    }

    pub fn collision_cooldown(&self) -> Duration {
        Duration::from_millis(self.collision_cooldown_ms)
    }

    pub fn exploding_duration(&self) -> Duration {
        Duration::from_millis(self.exploding_duration_ms)
    }

    pub fn gathering_duration(&self) -> Duration {
        Duration::from_millis(self.gathering_duration_ms)
    }

    pub fn clear_delay(&self) -> Duration {
        Duration::from_millis(self.clear_delay_ms)
    }
}
