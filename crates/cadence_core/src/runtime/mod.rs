//! Time-budgeted cooperative scheduling.
//!
//! A [`RuntimeLimiter`] time-slices one runner's logic units within a
//! millisecond allowance, resuming next call where it stopped. A
//! [`RuntimeLimitSharer`] owns several named limiters and divides a frame's
//! allowance across them.
//!
//! Both are generic over the context `C` handed to every logic callback;
//! the world uses its `EntityManager`.

mod limiter;
mod logic;
mod sharer;

pub use limiter::RuntimeLimiter;
pub use logic::{LogicFn, LogicHandle, LogicId, LogicUnit};
pub use sharer::{LogicEvent, LogicQueue, RuntimeLimitSharer};

use std::collections::BTreeMap;

/// Runner holding system update logic.
pub const SYSTEMS_RUNNER: &str = "systems";
/// Runner holding world-level logic.
pub const WORLD_RUNNER: &str = "world";
/// Runner holding per-entity logic.
pub const ENTITIES_RUNNER: &str = "entities";

/// Key of the per-runner total runtime averages in [`RuntimeStats`].
pub const TOTALS_KEY: &str = "totals";

/// Runner name -> logic unit name -> estimated cost in milliseconds, plus a
/// [`TOTALS_KEY`] entry mapping runner name -> average total runtime.
pub type RuntimeStats = BTreeMap<String, BTreeMap<String, f64>>;
