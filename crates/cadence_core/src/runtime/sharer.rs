use super::limiter::RuntimeLimiter;
use super::logic::{LogicId, LogicUnit};
use super::{RuntimeStats, TOTALS_KEY};
use crate::config::{ADD_REMOVE_LOGIC_CHANNEL_CAPACITY, RUNTIME_LIMIT_SHARER_MAX_LOOPS};
use crate::queue::{RequestQueue, RequestSender};
use cadence_metrics::duration_ms;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::{debug, info};

/// Queued change to a runner's set of logic units.
pub enum LogicEvent<C> {
    Add { runner: String, unit: LogicUnit<C> },
    Remove { runner: String, id: LogicId },
}

/// Producer side of a sharer's logic event queue.
pub type LogicQueue<C> = RequestSender<LogicEvent<C>>;

/// Divides one frame's allowance across named runners.
pub struct RuntimeLimitSharer<C> {
    run_ix: usize,
    runners: Vec<RuntimeLimiter<C>>,
    names: Vec<String>,
    runner_ix: HashMap<String, usize>,
    events: RequestQueue<LogicEvent<C>>,
    max_loops: usize,
}

impl<C: 'static> RuntimeLimitSharer<C> {
    pub fn new() -> Self {
        Self::with_limits(ADD_REMOVE_LOGIC_CHANNEL_CAPACITY, RUNTIME_LIMIT_SHARER_MAX_LOOPS)
    }

    pub fn with_limits(queue_capacity: usize, max_loops: usize) -> Self {
        Self {
            run_ix: 0,
            runners: Vec::new(),
            names: Vec::new(),
            runner_ix: HashMap::new(),
            events: RequestQueue::bounded("logic-add-remove", queue_capacity),
            max_loops: max_loops.max(1),
        }
    }

    /// Create a named runner.
    ///
    /// # Panics
    /// If a runner with that name already exists.
    pub fn register_runner(&mut self, name: &str) {
        if self.runner_ix.contains_key(name) {
            panic!("runner {name} registered twice");
        }
        self.runner_ix.insert(name.to_string(), self.runners.len());
        self.runners.push(RuntimeLimiter::new());
        self.names.push(name.to_string());
        info!(runner = name, "registered runner");
    }

    /// Sender other components use to queue logic changes.
    pub fn queue(&self) -> LogicQueue<C> {
        self.events.sender()
    }

    /// Queue `unit` for addition to `runner` at the next drain.
    pub fn add_logic(&self, runner: &str, unit: LogicUnit<C>) {
        self.events.push(LogicEvent::Add {
            runner: runner.to_string(),
            unit,
        });
    }

    /// Queue removal of unit `id` from `runner` at the next drain.
    pub fn remove_logic(&self, runner: &str, id: LogicId) {
        self.events.push(LogicEvent::Remove {
            runner: runner.to_string(),
            id,
        });
    }

    /// Apply every queued add/remove event.
    ///
    /// # Panics
    /// If an event names an unregistered runner, or adds a unit whose ID
    /// the runner already holds.
    pub fn process_add_remove_logics(&mut self) {
        for event in self.events.drain_pending() {
            match event {
                LogicEvent::Add { runner, unit } => {
                    let ix = self.expect_runner(&runner);
                    self.runners[ix].add(unit);
                }
                LogicEvent::Remove { runner, id } => {
                    let ix = self.expect_runner(&runner);
                    self.runners[ix].remove(id);
                }
            }
        }
    }

    fn expect_runner(&self, name: &str) -> usize {
        match self.runner_ix.get(name) {
            Some(&ix) => ix,
            None => panic!("no runner named {name}"),
        }
    }

    /// Run every runner within `allowance_ms`.
    ///
    /// The allowance is split evenly. Passes repeat while allowance remains
    /// and some runner has not finished a full pass over its units, up to
    /// the configured loop limit. Each pass resumes with the runner after
    /// the last one visited.
    ///
    /// Returns the unspent allowance (negative on overrun) and the number of
    /// unfinished runners that did not get to run in the final pass. With no
    /// allowance at all, that is every runner holding units.
    pub fn share(&mut self, allowance_ms: f64, ctx: &mut C) -> (f64, usize) {
        let t_start = Instant::now();
        self.process_add_remove_logics();

        let n = self.runners.len();
        if n == 0 {
            return (allowance_ms, 0);
        }

        if allowance_ms <= 0.0 {
            // No pass can run: every runner with work starves.
            let starved = self.runners.iter().filter(|r| !r.is_empty()).count();
            return (allowance_ms - duration_ms(t_start.elapsed()), starved);
        }

        let per_runner_ms = allowance_ms / n as f64;
        let mut finished = vec![false; n];
        let mut remaining_ms = allowance_ms;
        let mut starved = 0;

        for _ in 0..self.max_loops {
            if remaining_ms <= 0.0 || finished.iter().all(|&f| f) {
                break;
            }
            let unfinished = finished.iter().filter(|&&f| !f).count();
            let mut ran = 0;
            for _ in 0..n {
                if remaining_ms <= 0.0 {
                    break;
                }
                let ix = self.run_ix;
                self.run_ix = (self.run_ix + 1) % n;
                if finished[ix] {
                    continue;
                }

                let runner = &mut self.runners[ix];
                let overunder_ms = runner.run(per_runner_ms.min(remaining_ms), ctx);
                ran += 1;
                if runner.overrun() {
                    debug!(
                        runner = self.names[ix].as_str(),
                        overunder_ms, "runner overran its share"
                    );
                }
                finished[ix] = runner.finished();
                remaining_ms = allowance_ms - duration_ms(t_start.elapsed());
            }
            starved = unfinished - ran;
        }

        (allowance_ms - duration_ms(t_start.elapsed()), starved)
    }

    pub fn runner(&self, name: &str) -> Option<&RuntimeLimiter<C>> {
        self.runner_ix.get(name).map(|&ix| &self.runners[ix])
    }

    pub fn runner_mut(&mut self, name: &str) -> Option<&mut RuntimeLimiter<C>> {
        self.runner_ix.get(name).map(|&ix| &mut self.runners[ix])
    }

    pub fn runner_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn activate_all(&self, runner: &str) {
        if let Some(limiter) = self.runner(runner) {
            limiter.activate_all();
        }
    }

    pub fn deactivate_all(&self, runner: &str) {
        if let Some(limiter) = self.runner(runner) {
            limiter.deactivate_all();
        }
    }

    /// Set the period of the unit called `name` in `runner`. Returns false
    /// when either is absent.
    pub fn set_schedule(&mut self, runner: &str, name: &str, period_ms: f64) -> bool {
        let Some(limiter) = self.runner_mut(runner) else {
            return false;
        };
        match limiter.find(name) {
            Some(id) => limiter.set_schedule(id, period_ms),
            None => false,
        }
    }

    /// Per-runner unit estimates, plus [`TOTALS_KEY`] holding each runner's
    /// average total runtime.
    pub fn dump_stats(&self) -> RuntimeStats {
        let mut stats = RuntimeStats::new();
        let mut totals = BTreeMap::new();
        for (name, runner) in self.names.iter().zip(&self.runners) {
            let (units, total) = runner.dump_stats();
            stats.insert(name.clone(), units);
            totals.insert(name.clone(), total);
        }
        stats.insert(TOTALS_KEY.to_string(), totals);
        stats
    }
}

impl<C: 'static> Default for RuntimeLimitSharer<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    const SLEEP_MS: u64 = 20;

    fn sleeper(id: u32) -> LogicUnit<()> {
        LogicUnit::new(LogicId::new(id), format!("sleep-{id}"), |_, _| {
            thread::sleep(Duration::from_millis(SLEEP_MS))
        })
    }

    fn sharer_with_sleepers(runners: u32) -> RuntimeLimitSharer<()> {
        let mut sharer = RuntimeLimitSharer::new();
        for i in 0..runners {
            let name = format!("runner-{i}");
            sharer.register_runner(&name);
            sharer.add_logic(&name, sleeper(i));
        }
        sharer
    }

    #[test]
    fn test_sharing_runs_every_runner() {
        const RUNNERS: u32 = 3;
        const UNITS: u32 = 4;
        const LOOPS: usize = 5;

        let count = Arc::new(AtomicU32::new(0));
        let mut sharer = RuntimeLimitSharer::new();
        for r in 0..RUNNERS {
            let name = format!("runner-{r}");
            sharer.register_runner(&name);
            for u in 0..UNITS {
                let count = Arc::clone(&count);
                sharer.add_logic(
                    &name,
                    LogicUnit::new(LogicId::new(r * UNITS + u), format!("unit-{u}"), move |_, _| {
                        count.fetch_add(1, Ordering::Relaxed);
                        thread::sleep(Duration::from_millis(1));
                    }),
                );
            }
        }
        for _ in 0..LOOPS {
            let (_, starved) = sharer.share(200.0, &mut ());
            assert_eq!(starved, 0);
        }
        assert_eq!(
            count.load(Ordering::Relaxed),
            RUNNERS * UNITS * LOOPS as u32
        );
    }

    #[test]
    fn test_no_starvation_with_enough_allowance() {
        let mut sharer = sharer_with_sleepers(3);
        let (remaining, starved) = sharer.share((3 * SLEEP_MS + 30) as f64, &mut ());
        assert_eq!(starved, 0);
        assert!(remaining > 0.0);
    }

    #[test]
    fn test_one_runner_starves_without_enough_allowance() {
        let mut sharer = sharer_with_sleepers(3);
        let (remaining, starved) = sharer.share((2 * SLEEP_MS) as f64, &mut ());
        assert_eq!(starved, 1);
        assert!(remaining <= 0.0);
    }

    #[test]
    fn test_zero_allowance_starves_every_runner_with_work() {
        let mut sharer = sharer_with_sleepers(3);
        sharer.register_runner("idle");
        let (remaining, starved) = sharer.share(0.0, &mut ());
        assert_eq!(starved, 3);
        assert!(remaining <= 0.0);
        assert_eq!(sharer.share(-5.0, &mut ()).1, 3);

        // Nothing ran, so nothing has an estimate yet.
        assert_eq!(sharer.dump_stats()["runner-0"]["sleep-0"], 0.0);
    }

    #[test]
    fn test_logic_added_between_shares_runs() {
        let count = Arc::new(AtomicU32::new(0));
        let mut sharer: RuntimeLimitSharer<()> = RuntimeLimitSharer::new();
        sharer.register_runner("world");
        sharer.share(16.0, &mut ());

        let queue = sharer.queue();
        let counter = Arc::clone(&count);
        queue.push(LogicEvent::Add {
            runner: "world".to_string(),
            unit: LogicUnit::new(LogicId::new(0), "late", move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            }),
        });
        sharer.share(16.0, &mut ());
        assert_eq!(count.load(Ordering::Relaxed), 1);

        sharer.remove_logic("world", LogicId::new(0));
        sharer.share(16.0, &mut ());
        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert!(sharer.runner("world").unwrap().is_empty());
    }

    #[test]
    fn test_empty_sharer_returns_allowance() {
        let mut sharer: RuntimeLimitSharer<()> = RuntimeLimitSharer::new();
        assert_eq!(sharer.share(16.0, &mut ()), (16.0, 0));
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_runner_panics() {
        let mut sharer: RuntimeLimitSharer<()> = RuntimeLimitSharer::new();
        sharer.register_runner("systems");
        sharer.register_runner("systems");
    }

    #[test]
    #[should_panic(expected = "no runner named")]
    fn test_unknown_runner_panics_on_drain() {
        let mut sharer: RuntimeLimitSharer<()> = RuntimeLimitSharer::new();
        sharer.add_logic("missing", sleeper(0));
        sharer.process_add_remove_logics();
    }

    #[test]
    fn test_deactivate_all_in_runner() {
        let count = Arc::new(AtomicU32::new(0));
        let mut sharer: RuntimeLimitSharer<()> = RuntimeLimitSharer::new();
        sharer.register_runner("entities");
        for i in 0..3 {
            let count = Arc::clone(&count);
            sharer.add_logic(
                "entities",
                LogicUnit::new(LogicId::new(i), format!("e-{i}"), move |_, _| {
                    count.fetch_add(1, Ordering::Relaxed);
                }),
            );
        }
        sharer.process_add_remove_logics();
        sharer.deactivate_all("entities");
        sharer.share(16.0, &mut ());
        assert_eq!(count.load(Ordering::Relaxed), 0);

        sharer.activate_all("entities");
        sharer.share(16.0, &mut ());
        assert_eq!(count.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_dump_stats_has_totals() {
        let mut sharer = sharer_with_sleepers(2);
        sharer.share(100.0, &mut ());
        let stats = sharer.dump_stats();
        let totals = &stats[TOTALS_KEY];
        assert_eq!(totals.len(), 2);
        assert!(totals["runner-0"] >= SLEEP_MS as f64);
        assert!(stats["runner-1"]["sleep-1"] >= SLEEP_MS as f64);
    }

    #[test]
    fn test_set_schedule_by_name() {
        let mut sharer = sharer_with_sleepers(1);
        sharer.process_add_remove_logics();
        assert!(sharer.set_schedule("runner-0", "sleep-0", 100.0));
        assert!(!sharer.set_schedule("runner-0", "missing", 100.0));
        assert!(!sharer.set_schedule("missing", "sleep-0", 100.0));
    }
}
