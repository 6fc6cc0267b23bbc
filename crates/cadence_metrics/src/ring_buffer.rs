//! Fixed-length window of millisecond samples

use std::collections::VecDeque;

/// Keeps the last `capacity` samples; pushing past capacity evicts the oldest.
pub struct RingBuffer {
    window: VecDeque<f64>,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample_ms: f64) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample_ms);
    }

    pub fn latest(&self) -> Option<f64> {
        self.window.back().copied()
    }

    /// Mean of the window, 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    pub fn min_max(&self) -> (f64, f64) {
        let mut samples = self.window.iter().copied();
        let Some(first) = samples.next() else {
            return (0.0, 0.0);
        };
        samples.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s)))
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_sample_is_evicted() {
        let mut window = RingBuffer::new(3);
        window.push(10.0);
        window.push(20.0);
        window.push(30.0);
        assert_eq!(window.mean(), 20.0);

        window.push(40.0);
        assert_eq!(window.len(), 3);
        assert_eq!(window.mean(), 30.0);
        assert_eq!(window.latest(), Some(40.0));
        assert_eq!(window.min_max(), (20.0, 40.0));
    }

    #[test]
    fn test_signed_samples() {
        let mut window = RingBuffer::new(4);
        assert!(window.is_empty());
        assert_eq!(window.mean(), 0.0);
        assert_eq!(window.min_max(), (0.0, 0.0));
        window.push(-2.0);
        window.push(4.0);
        assert_eq!(window.mean(), 1.0);
        assert_eq!(window.min_max(), (-2.0, 4.0));
    }
}
