//! Moving-average running-cost estimates

/// Two-sample moving average of a measured cost, in milliseconds.
///
/// The first sample seeds the estimate. Each later sample is averaged with
/// the previous estimate, so one burst moves the estimate halfway and a
/// return to normal pulls it back just as fast.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostEstimate {
    value: Option<f64>,
}

impl CostEstimate {
    pub const fn new() -> Self {
        Self { value: None }
    }

    /// Fold a new measurement into the estimate and return the result.
    pub fn record(&mut self, sample_ms: f64) -> f64 {
        let next = match self.value {
            Some(previous) => (previous + sample_ms) / 2.0,
            None => sample_ms,
        };
        self.value = Some(next);
        next
    }

    /// Current estimate, or `None` before the first measurement.
    #[inline]
    pub fn get(&self) -> Option<f64> {
        self.value
    }

    #[inline]
    pub fn get_or_zero(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}
