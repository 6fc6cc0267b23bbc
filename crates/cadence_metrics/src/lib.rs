//! Cadence Metrics - running-cost estimation and tick instrumentation
//!
//! [`CostEstimate`] and [`duration_ms`] are always available since the
//! scheduler's admission control needs them. [`FrameTimer`] and [`Counter`]
//! are diagnostics: with the `metrics` feature off they compile to no-op
//! stubs that keep the same API, so callers never need `cfg` guards.
//!
//! ```ignore
//! let mut timer = FrameTimer::new(60);
//! timer.begin();
//! let overunder_ms = world.update(16.0);
//! timer.end();
//! timer.push_overunder(overunder_ms);
//! ```

mod cost_estimate;

pub use cost_estimate::CostEstimate;

/// Fractional milliseconds in `duration`.
#[inline]
pub fn duration_ms(duration: std::time::Duration) -> f64 {
    duration.as_nanos() as f64 / 1.0e6
}

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod frame_timer;
#[cfg(feature = "metrics")]
mod ring_buffer;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use frame_timer::FrameTimer;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;

#[cfg(not(feature = "metrics"))]
mod stubs {
    #[derive(Default)]
    pub struct FrameTimer;

    impl FrameTimer {
        pub fn new(_history: usize) -> Self {
            Self
        }
        pub fn begin(&mut self) {}
        pub fn end(&mut self) {}
        pub fn push_overunder(&mut self, _overunder_ms: f64) {}
        pub fn frame_time_ms(&self) -> f64 {
            0.0
        }
        pub fn frame_time_range_ms(&self) -> (f64, f64) {
            (0.0, 0.0)
        }
        pub fn average_overunder_ms(&self) -> f64 {
            0.0
        }
    }

    #[derive(Default)]
    pub struct Counter;

    impl Counter {
        pub fn new() -> Self {
            Self
        }
        pub fn increment(&mut self, _name: &str, _value: usize) {}
        pub fn get(&self, _name: &str) -> usize {
            0
        }
    }
}

#[cfg(not(feature = "metrics"))]
pub use stubs::{Counter, FrameTimer};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_api_available_with_either_feature_set() {
        let mut timer = FrameTimer::new(60);
        timer.begin();
        timer.end();
        timer.push_overunder(1.0);
        let mut counter = Counter::new();
        counter.increment("starved_ticks", 1);
        let _ = counter.get("starved_ticks");
    }

    #[test]
    fn test_duration_ms() {
        assert_eq!(duration_ms(Duration::from_millis(16)), 16.0);
        assert_eq!(duration_ms(Duration::from_micros(500)), 0.5);
    }
}
