//! Cadence Core
//!
//! Runtime kernel of the entity-component simulation:
//! - Entity identity, lifecycle and recycling
//! - Column component storage with bit-encoded membership
//! - Filtered live entity lists
//! - Time-budgeted cooperative logic scheduling
//! - Chunked parallel fan-out over live entities
//! - A publish/subscribe event bus

pub mod config;
pub mod ecs;
pub mod events;
pub mod id;
pub mod parallel;
pub mod queue;
pub mod runtime;
pub mod time;

pub use glam;

pub use config::WorldConfig;
pub use ecs::{Entity, EntityManager, SpawnRequest, World};

/// Kernel version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
