//! Kernel configuration and compile-time defaults

use serde::{Deserialize, Serialize};

/// Default entity capacity of a world.
pub const MAX_ENTITIES: usize = 1600;

/// Capacity of each event subscriber's queue, and of the spawn and despawn
/// request queues.
pub const EVENT_SUBSCRIBER_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the queue carrying logic add/remove events to the sharer.
pub const ADD_REMOVE_LOGIC_CHANNEL_CAPACITY: usize = MAX_ENTITIES / 4;

/// Upper bound on round-robin passes per `share` call.
pub const RUNTIME_LIMIT_SHARER_MAX_LOOPS: usize = 20;

/// World construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Entity capacity before expansion.
    pub max_entities: usize,
    pub spawn_queue_capacity: usize,
    /// Queue capacity of each event bus subscriber.
    pub event_queue_capacity: usize,
    pub logic_queue_capacity: usize,
    pub sharer_max_loops: usize,
    /// Grow entity tables by half their size instead of failing a spawn at capacity.
    pub expand_on_capacity: bool,
    /// Worker threads for chunked fan-out. `None` uses the global rayon pool.
    pub worker_threads: Option<usize>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_entities: MAX_ENTITIES,
            spawn_queue_capacity: EVENT_SUBSCRIBER_CHANNEL_CAPACITY,
            event_queue_capacity: EVENT_SUBSCRIBER_CHANNEL_CAPACITY,
            logic_queue_capacity: ADD_REMOVE_LOGIC_CHANNEL_CAPACITY,
            sharer_max_loops: RUNTIME_LIMIT_SHARER_MAX_LOOPS,
            expand_on_capacity: false,
            worker_threads: None,
        }
    }
}

impl WorldConfig {
    /// Default configuration with a different entity capacity.
    pub fn with_max_entities(max_entities: usize) -> Self {
        Self {
            max_entities,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = WorldConfig::default();
        assert_eq!(config.max_entities, 1600);
        assert_eq!(config.logic_queue_capacity, 400);
        assert_eq!(config.event_queue_capacity, 64);
        assert_eq!(config.sharer_max_loops, 20);
        assert!(!config.expand_on_capacity);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: WorldConfig =
            serde_json::from_str(r#"{ "max_entities": 32, "expand_on_capacity": true }"#)
                .expect("valid config");
        assert_eq!(config.max_entities, 32);
        assert!(config.expand_on_capacity);
        assert_eq!(config.spawn_queue_capacity, EVENT_SUBSCRIBER_CHANNEL_CAPACITY);
    }
}
