//! Frame timing and periodic accumulators
//!
//! Fixed 60Hz frame rate; callers pass millisecond allowances derived from it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Target frame rate.
pub const FPS: u64 = 60;
/// Whole milliseconds per frame (1000 / 60, truncated).
pub const FRAME_DURATION_MS: u64 = 1000 / FPS;
pub const FRAME_DURATION: Duration = Duration::from_millis(FRAME_DURATION_MS);

/// Tick counter for a world
pub struct SimulationTime {
    tick_count: u64,
    allotted_ms: f64,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            allotted_ms: 0.0,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn advance_tick(&mut self, allowance_ms: f64) {
        self.tick_count += 1;
        self.allotted_ms += allowance_ms;
    }

    /// Sum of every allowance handed to the world so far.
    pub fn total_allotted_ms(&self) -> f64 {
        self.allotted_ms
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates elapsed time and fires once per period.
///
/// `tick` fires at most once per call: if `dt` covers several periods the
/// extra periods are folded away, leaving only the remainder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeAccumulator {
    accum_ms: f64,
    period_ms: f64,
}

impl TimeAccumulator {
    pub fn new(period_ms: f64) -> Self {
        Self {
            accum_ms: 0.0,
            period_ms,
        }
    }

    /// Add `dt_ms`; true when the accumulated time crosses the period.
    pub fn tick(&mut self, dt_ms: f64) -> bool {
        if self.period_ms <= 0.0 {
            self.accum_ms = 0.0;
            return true;
        }
        self.accum_ms += dt_ms;
        if self.accum_ms >= self.period_ms {
            self.accum_ms %= self.period_ms;
            return true;
        }
        false
    }

    /// Fraction of the period accumulated so far.
    pub fn completion(&self) -> f64 {
        if self.period_ms <= 0.0 {
            return 1.0;
        }
        self.accum_ms / self.period_ms
    }

    pub fn period_ms(&self) -> f64 {
        self.period_ms
    }

    pub fn accumulated_ms(&self) -> f64 {
        self.accum_ms
    }

    pub fn reset(&mut self) {
        self.accum_ms = 0.0;
    }
}
