//! Named event counters (starved ticks, overrun ticks)

use std::collections::BTreeMap;

#[derive(Default)]
pub struct Counter {
    counts: BTreeMap<String, usize>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, name: &str, value: usize) {
        match self.counts.get_mut(name) {
            Some(count) => *count += value,
            None => {
                self.counts.insert(name.to_string(), value);
            }
        }
    }

    pub fn get(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }
}
