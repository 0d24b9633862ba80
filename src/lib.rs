pub mod arena;
pub mod body;
pub mod c_api;
pub mod config;
pub mod force;
pub mod glyphs;
pub mod overlap;
pub mod render;
pub mod shape;
pub mod simulation;
pub mod spawn;
pub mod timeline;

pub use arena::Arena;
pub use body::{Body, BodyId, Mode};
pub use config::{ConfigError, CrowdConfig};
pub use overlap::OverlapResolver;
pub use render::{CollisionHook, Contact, Deformation, RenderSink, Squash};
pub use shape::{Outline, ShapeCache, ShapeError, ShapeProvider};
pub use simulation::{CrowdError, Simulation};
pub use spawn::{Approach, SpawnPlanner};
pub use timeline::{Deferred, Timeline};
