use super::logic::{LogicId, LogicUnit};
use cadence_metrics::{duration_ms, CostEstimate};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::trace;

/// Round-robin time-slicer over one runner's logic units.
///
/// Each [`run`](Self::run) starts at the resume index left by the previous
/// call and visits units in order until the allowance runs out or the index
/// wraps back to where the call started. A unit whose cost estimate exceeds
/// the remaining allowance is not started (unless it is the first unit of
/// the call) and stays next in line.
pub struct RuntimeLimiter<C> {
    start_ix: usize,
    run_ix: usize,
    finished: bool,
    overrun: bool,
    units: Vec<LogicUnit<C>>,
    indexes: HashMap<LogicId, usize>,
    estimates: HashMap<LogicId, CostEstimate>,
    total_runtime: CostEstimate,
}

impl<C> RuntimeLimiter<C> {
    pub fn new() -> Self {
        Self {
            start_ix: 0,
            run_ix: 0,
            finished: false,
            overrun: false,
            units: Vec::new(),
            indexes: HashMap::new(),
            estimates: HashMap::new(),
            total_runtime: CostEstimate::new(),
        }
    }

    /// Append a unit at the end of the iteration order.
    ///
    /// # Panics
    /// If a unit with the same ID is already present.
    pub fn add(&mut self, unit: LogicUnit<C>) {
        if self.indexes.contains_key(&unit.id()) {
            panic!(
                "double-add of logic unit {} (id {}) to runtime limiter",
                unit.name(),
                unit.id()
            );
        }
        self.indexes.insert(unit.id(), self.units.len());
        self.units.push(unit);
    }

    /// Swap-remove the unit with `id`. Returns false when absent.
    pub fn remove(&mut self, id: LogicId) -> bool {
        let Some(index) = self.indexes.remove(&id) else {
            return false;
        };
        self.estimates.remove(&id);
        self.units.swap_remove(index);
        if let Some(moved) = self.units.get(index) {
            self.indexes.insert(moved.id(), index);
        }

        if index < self.run_ix {
            self.run_ix -= 1;
        }
        if self.run_ix >= self.units.len() {
            self.run_ix = 0;
        }
        true
    }

    /// Spend up to `allowance_ms` running units. Returns the allowance minus
    /// the wall time spent; negative means the call overran.
    pub fn run(&mut self, allowance_ms: f64, ctx: &mut C) -> f64 {
        let t_start = Instant::now();
        self.finished = false;
        self.overrun = false;

        if self.units.is_empty() {
            self.finished = true;
            return allowance_ms;
        }

        self.start_ix = self.run_ix;
        let mut remaining_ms = allowance_ms;
        let mut first = true;
        while remaining_ms > 0.0 {
            let id = self.units[self.run_ix].id();
            if !first {
                if let Some(estimate) = self.estimates.get(&id).and_then(CostEstimate::get) {
                    if estimate > remaining_ms {
                        trace!(
                            unit = self.units[self.run_ix].name(),
                            estimate,
                            remaining_ms,
                            "estimate exceeds remaining allowance"
                        );
                        break;
                    }
                }
            }
            first = false;

            let t_unit = Instant::now();
            let unit = &mut self.units[self.run_ix];
            if unit.visit(ctx) {
                self.estimates
                    .entry(id)
                    .or_default()
                    .record(duration_ms(t_unit.elapsed()));
            }
            remaining_ms = allowance_ms - duration_ms(t_start.elapsed());

            self.run_ix = (self.run_ix + 1) % self.units.len();
            if self.run_ix == self.start_ix {
                self.finished = true;
                break;
            }
        }

        let total_ms = duration_ms(t_start.elapsed());
        self.total_runtime.record(total_ms);
        let overunder_ms = allowance_ms - total_ms;
        self.overrun = overunder_ms < 0.0;
        overunder_ms
    }

    pub fn activate_all(&self) {
        for unit in &self.units {
            unit.set_active(true);
        }
    }

    pub fn deactivate_all(&self) {
        for unit in &self.units {
            unit.set_active(false);
        }
    }

    /// Give the unit a periodic schedule. Returns false when absent.
    pub fn set_schedule(&mut self, id: LogicId, period_ms: f64) -> bool {
        match self.indexes.get(&id) {
            Some(&index) => {
                self.units[index].set_schedule(period_ms);
                true
            }
            None => false,
        }
    }

    /// Find a unit's ID by name.
    pub fn find(&self, name: &str) -> Option<LogicId> {
        self.units.iter().find(|u| u.name() == name).map(LogicUnit::id)
    }

    /// Current cost estimate of a unit in milliseconds, if it has run.
    pub fn estimate(&self, id: LogicId) -> Option<f64> {
        self.estimates.get(&id).and_then(CostEstimate::get)
    }

    pub fn contains(&self, id: LogicId) -> bool {
        self.indexes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether the last `run` completed a full pass.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Whether the last `run` took longer than its allowance.
    pub fn overrun(&self) -> bool {
        self.overrun
    }

    pub fn run_index(&self) -> usize {
        self.run_ix
    }

    /// Per-unit estimates by name (0 for units that never ran) and the
    /// moving average of whole `run` calls.
    pub fn dump_stats(&self) -> (BTreeMap<String, f64>, f64) {
        let stats = self
            .units
            .iter()
            .map(|unit| {
                let estimate = self.estimate(unit.id()).unwrap_or(0.0);
                (unit.name().to_string(), estimate)
            })
            .collect();
        (stats, self.total_runtime.get_or_zero())
    }
}

impl<C> Default for RuntimeLimiter<C> {
    fn default() -> Self {
        Self::new()
    }
}
