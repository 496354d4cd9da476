//! Brisk Engine Core
//!
//! Contains the simulation half of the engine:
//! - Generational identifier allocation
//! - Frame-buffered event queue
//! - Entity store with deferred lifecycle
//! - Spatial partition grid and the physics step
//! - Fixed-tick time, draw extraction and the world facade

pub mod event;
pub mod id;
pub mod math;
pub mod physics;
pub mod render;
pub mod scene;
pub mod spatial;
pub mod time;
pub mod world;

pub use glam;

pub use event::{Event, EventQueue};
pub use scene::{Entity, EntityId, Scene};
pub use world::{World, WorldConfig};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
