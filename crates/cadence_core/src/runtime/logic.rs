use crate::time::TimeAccumulator;
use cadence_metrics::duration_ms;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Identity of a logic unit. A world never issues the same ID twice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicId(u32);

impl LogicId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LogicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callback of a logic unit: receives the runner context and the
/// milliseconds elapsed since the unit last ran.
pub type LogicFn<C> = Box<dyn FnMut(&mut C, f64) + Send>;

/// A named, schedulable callback owned by exactly one runner.
pub struct LogicUnit<C> {
    id: LogicId,
    name: String,
    f: LogicFn<C>,
    active: Arc<AtomicBool>,
    schedule: Option<TimeAccumulator>,
    last_run: Option<Instant>,
    last_visit: Option<Instant>,
}

impl<C> LogicUnit<C> {
    pub fn new<F>(id: LogicId, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&mut C, f64) + Send + 'static,
    {
        Self {
            id,
            name: name.into(),
            f: Box::new(f),
            active: Arc::new(AtomicBool::new(true)),
            schedule: None,
            last_run: None,
            last_visit: None,
        }
    }

    /// Only run once every `period_ms` of accumulated visit time. A unit
    /// that has never run fires on its first active visit.
    pub fn with_schedule(mut self, period_ms: f64) -> Self {
        self.schedule = Some(TimeAccumulator::new(period_ms));
        self
    }

    pub fn with_active(self, active: bool) -> Self {
        self.active.store(active, Ordering::Relaxed);
        self
    }

    #[inline]
    pub fn id(&self) -> LogicId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    pub fn schedule(&self) -> Option<&TimeAccumulator> {
        self.schedule.as_ref()
    }

    pub fn set_schedule(&mut self, period_ms: f64) {
        self.schedule = Some(TimeAccumulator::new(period_ms));
    }

    /// Shared handle to this unit's active flag, kept by whoever owns the
    /// unit conceptually (an entity, the world) after the unit moves into a
    /// runner.
    pub fn handle(&self) -> LogicHandle {
        LogicHandle {
            id: self.id,
            name: self.name.clone(),
            active: Arc::clone(&self.active),
        }
    }

    /// One scheduling visit. Invokes the callback when the unit is active
    /// and its schedule (if any) fires. Returns whether it ran.
    pub(crate) fn visit(&mut self, ctx: &mut C) -> bool {
        let now = Instant::now();
        let since_visit = self.last_visit.map_or(0.0, |t| duration_ms(now - t));
        self.last_visit = Some(now);

        if !self.is_active() {
            return false;
        }
        if let Some(schedule) = self.schedule.as_mut() {
            if self.last_run.is_some() && !schedule.tick(since_visit) {
                return false;
            }
        }

        let dt_ms = self.last_run.map_or(0.0, |t| duration_ms(now - t));
        (self.f)(ctx, dt_ms);
        self.last_run = Some(Instant::now());
        true
    }
}

impl<C> fmt::Debug for LogicUnit<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicUnit")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("active", &self.is_active())
            .field("schedule", &self.schedule)
            .finish()
    }
}

/// Owner-side view of a logic unit living in a runner.
#[derive(Clone, Debug)]
pub struct LogicHandle {
    id: LogicId,
    name: String,
    active: Arc<AtomicBool>,
}

impl LogicHandle {
    #[inline]
    pub fn id(&self) -> LogicId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    pub fn activate(&self) {
        self.set_active(true);
    }

    pub fn deactivate(&self) {
        self.set_active(false);
    }
}
