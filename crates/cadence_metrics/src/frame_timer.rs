//! Tick timing: wall time per update plus the reported over/under budget

use super::ring_buffer::RingBuffer;
use std::time::Instant;

pub struct FrameTimer {
    started: Option<Instant>,
    tick_ms: RingBuffer,
    overunder_ms: RingBuffer,
}

impl FrameTimer {
    pub fn new(history: usize) -> Self {
        Self {
            started: None,
            tick_ms: RingBuffer::new(history),
            overunder_ms: RingBuffer::new(history),
        }
    }

    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Close the tick opened by [`begin`](Self::begin). No-op without one.
    pub fn end(&mut self) {
        if let Some(started) = self.started.take() {
            self.tick_ms.push(crate::duration_ms(started.elapsed()));
        }
    }

    /// Record the signed budget result of a tick (negative = overran).
    pub fn push_overunder(&mut self, overunder_ms: f64) {
        self.overunder_ms.push(overunder_ms);
    }

    pub fn frame_time_ms(&self) -> f64 {
        self.tick_ms.mean()
    }

    pub fn frame_time_range_ms(&self) -> (f64, f64) {
        self.tick_ms.min_max()
    }

    pub fn average_overunder_ms(&self) -> f64 {
        self.overunder_ms.mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_frame_timer_tracks_overunder() {
        let mut timer = FrameTimer::new(8);
        timer.begin();
        std::thread::sleep(Duration::from_millis(2));
        timer.end();
        timer.push_overunder(3.0);
        timer.push_overunder(-1.0);

        assert!(timer.frame_time_ms() >= 2.0);
        assert_eq!(timer.average_overunder_ms(), 1.0);
        let (min, max) = timer.frame_time_range_ms();
        assert!(min <= max);
    }

    #[test]
    fn test_end_without_begin() {
        let mut timer = FrameTimer::new(4);
        timer.end();
        assert_eq!(timer.frame_time_ms(), 0.0);
    }
}
