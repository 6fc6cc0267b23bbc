// world.rs - Top-level simulation: entity manager, systems and scheduling

use crate::config::WorldConfig;
use crate::ecs::component::CustomComponent;
use crate::ecs::funcs::{FuncSet, WorldFunc};
use crate::events::{EventBus, EventFilter, Subscription};
use crate::ecs::{
    Entity, EntityManager, SpawnRequest, SystemDescriptor, SystemHandle, SystemRef,
    SystemRegistry,
};
use crate::runtime::{
    LogicHandle, LogicUnit, RuntimeLimitSharer, RuntimeStats, ENTITIES_RUNNER, SYSTEMS_RUNNER,
    TOTALS_KEY, WORLD_RUNNER,
};
use crate::time::SimulationTime;
use cadence_metrics::{duration_ms, CostEstimate, Counter, FrameTimer};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Frames of history kept by the world's frame timer.
const FRAME_HISTORY: usize = 120;

/// Stats key of the world's own average update time.
pub const UPDATE_TOTAL_KEY: &str = "update";

/// The simulation.
///
/// Each [`update`](Self::update) applies queued despawns and spawns, then
/// shares what is left of the allowance across the `"systems"`, `"world"`
/// and `"entities"` runners.
pub struct World {
    config: WorldConfig,
    em: EntityManager,
    sharer: RuntimeLimitSharer<EntityManager>,
    systems: SystemRegistry,
    world_logics: HashMap<String, LogicHandle>,
    funcs: FuncSet<WorldFunc>,
    time: SimulationTime,
    total_runtime: CostEstimate,
    frame_timer: FrameTimer,
    counters: Counter,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let mut sharer =
            RuntimeLimitSharer::with_limits(config.logic_queue_capacity, config.sharer_max_loops);
        sharer.register_runner(SYSTEMS_RUNNER);
        sharer.register_runner(WORLD_RUNNER);
        sharer.register_runner(ENTITIES_RUNNER);
        let em = EntityManager::new(&config, sharer.queue());
        info!(max_entities = config.max_entities, "created world");

        Self {
            config,
            em,
            sharer,
            systems: SystemRegistry::new(),
            world_logics: HashMap::new(),
            funcs: FuncSet::new(),
            time: SimulationTime::new(),
            total_runtime: CostEstimate::new(),
            frame_timer: FrameTimer::new(FRAME_HISTORY),
            counters: Counter::new(),
        }
    }

    /// Run one tick within `allowance_ms`. Returns the unspent allowance,
    /// negative when the tick overran.
    ///
    /// # Panics
    /// If a queued spawn fails, once the rest of its batch is applied.
    pub fn update(&mut self, allowance_ms: f64) -> f64 {
        let t_start = Instant::now();
        self.frame_timer.begin();

        let failed = self.em.update();
        if let Some(err) = failed.first() {
            panic!("queued spawn failed: {err} ({} of the batch)", failed.len());
        }
        self.propagate_expansions();

        let remaining_ms = allowance_ms - duration_ms(t_start.elapsed());
        let (overunder_ms, starved) = self.sharer.share(remaining_ms, &mut self.em);

        let tick = self.time.tick_count();
        if starved > 0 {
            warn!(tick, starved, "runners starved this tick");
            self.counters.increment("starved_ticks", 1);
        }
        if overunder_ms < 0.0 {
            debug!(tick, overunder_ms, "tick overran its allowance");
            self.counters.increment("overrun_ticks", 1);
        }

        self.total_runtime.record(duration_ms(t_start.elapsed()));
        self.time.advance_tick(allowance_ms);
        self.frame_timer.end();
        self.frame_timer.push_overunder(overunder_ms);
        overunder_ms
    }

    fn propagate_expansions(&mut self) {
        for n in self.em.take_expansions() {
            for (_, _, system) in self.systems.iter() {
                system.lock().expand(n);
            }
        }
    }

    // Registration

    /// Register `"Kind,Name"` component specs.
    ///
    /// # Panics
    /// On a malformed spec or unknown kind.
    pub fn register_components(&mut self, specs: &[&str]) {
        for spec in specs {
            self.em.components_mut().add_component_spec(spec);
        }
    }

    pub fn register_custom_component(&mut self, implementation: Box<dyn CustomComponent>) {
        self.em.add_custom_component(implementation);
    }

    /// Register systems: their components, `link_world`, a logic unit in the
    /// `"systems"` runner, then dependency links. Dependencies may be
    /// registered in the same batch, in any order.
    ///
    /// # Panics
    /// On a duplicate system name, a self-dependency or an unresolved
    /// dependency.
    pub fn register_systems(&mut self, systems: Vec<SystemRef>) -> Vec<SystemHandle> {
        let mut handles = Vec::with_capacity(systems.len());
        for system in systems {
            let descriptor = SystemDescriptor::of(&*system.lock());
            for spec in descriptor.components() {
                self.em.components_mut().add_component_spec(spec);
            }

            let id = self.em.next_logic_id();
            let handle = match self.systems.register(descriptor.clone(), system.clone(), id) {
                Ok(handle) => handle,
                Err(err) => panic!("{err}"),
            };
            system.lock().link_world(&mut self.em);

            let runner_system = system.clone();
            let unit = LogicUnit::new(id, descriptor.name(), move |em: &mut EntityManager, dt_ms| {
                runner_system.lock().update(em, dt_ms)
            });
            self.sharer.add_logic(SYSTEMS_RUNNER, unit);
            info!(
                system = descriptor.name(),
                components = descriptor.components().len(),
                dependencies = descriptor.dependencies().len(),
                "registered system"
            );
            handles.push(handle);
        }

        for &handle in &handles {
            if let Err(err) = self.systems.check_dependencies(handle) {
                panic!("{err}");
            }
            let (Some(descriptor), Some(system)) =
                (self.systems.descriptor(handle), self.systems.system(handle))
            else {
                continue;
            };
            for dependency in descriptor.dependencies() {
                if let Some(target) = self.systems.resolve(dependency) {
                    system.lock().link_dependency(dependency, target);
                }
            }
        }
        handles
    }

    pub fn system(&self, name: &str) -> Option<SystemRef> {
        let handle = self.systems.handle_of(name)?;
        self.systems.system(handle).cloned()
    }

    /// Run the named system once per `period_ms`. Returns false if no such
    /// system is registered.
    pub fn set_system_schedule(&mut self, name: &str, period_ms: f64) -> bool {
        let Some(id) = self
            .systems
            .handle_of(name)
            .and_then(|handle| self.systems.logic(handle))
        else {
            return false;
        };
        self.sharer.process_add_remove_logics();
        self.sharer
            .runner_mut(SYSTEMS_RUNNER)
            .is_some_and(|runner| runner.set_schedule(id, period_ms))
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    // World logic

    /// Add a logic unit to the `"world"` runner, replacing one of the same name.
    pub fn add_world_logic<F>(&mut self, name: &str, f: F) -> LogicHandle
    where
        F: FnMut(&mut EntityManager, f64) + Send + 'static,
    {
        let id = self.em.next_logic_id();
        self.push_world_logic(LogicUnit::new(id, name, f))
    }

    pub fn add_world_logic_with_schedule<F>(
        &mut self,
        name: &str,
        period_ms: f64,
        f: F,
    ) -> LogicHandle
    where
        F: FnMut(&mut EntityManager, f64) + Send + 'static,
    {
        let unit = LogicUnit::new(self.em.next_logic_id(), name, f).with_schedule(period_ms);
        self.push_world_logic(unit)
    }

    fn push_world_logic(&mut self, unit: LogicUnit<EntityManager>) -> LogicHandle {
        let name = unit.name().to_string();
        self.remove_world_logic(&name);
        let handle = unit.handle();
        self.world_logics.insert(name, handle.clone());
        self.sharer.add_logic(WORLD_RUNNER, unit);
        handle
    }

    /// Absent names are a no-op.
    pub fn remove_world_logic(&mut self, name: &str) -> bool {
        let Some(handle) = self.world_logics.remove(name) else {
            return false;
        };
        self.sharer.remove_logic(WORLD_RUNNER, handle.id());
        true
    }

    pub fn activate_world_logic(&self, name: &str) -> bool {
        self.world_logics
            .get(name)
            .map(LogicHandle::activate)
            .is_some()
    }

    pub fn deactivate_world_logic(&self, name: &str) -> bool {
        self.world_logics
            .get(name)
            .map(LogicHandle::deactivate)
            .is_some()
    }

    pub fn activate_all_world_logics(&self) {
        self.world_logics.values().for_each(LogicHandle::activate);
    }

    pub fn deactivate_all_world_logics(&self) {
        self.world_logics.values().for_each(LogicHandle::deactivate);
    }

    pub fn activate_all_entity_logics(&self) {
        for entity in self.em.current_entities() {
            self.em.activate_logics(entity);
        }
    }

    pub fn deactivate_all_entity_logics(&self) {
        for entity in self.em.current_entities() {
            self.em.deactivate_logics(entity);
        }
    }

    // Entities

    /// # Panics
    /// If the spawn fails; see [`EntityManager::spawn`].
    pub fn spawn(&mut self, request: SpawnRequest) -> Entity {
        match self.em.spawn(request) {
            Ok(entity) => entity,
            Err(err) => panic!("spawn failed: {err}"),
        }
    }

    pub fn queue_spawn(&self, request: SpawnRequest) {
        self.em.queue_spawn(request);
    }

    pub fn despawn(&mut self, entity: Entity) -> bool {
        self.em.despawn(entity)
    }

    pub fn queue_despawn(&self, entity: Entity) {
        self.em.queue_despawn(entity);
    }

    pub fn despawn_all(&mut self) {
        self.em.despawn_all();
    }

    pub fn activate(&mut self, entity: Entity) {
        self.em.activate(entity);
    }

    pub fn deactivate(&mut self, entity: Entity) {
        self.em.deactivate(entity);
    }

    pub fn em(&self) -> &EntityManager {
        &self.em
    }

    pub fn em_mut(&mut self) -> &mut EntityManager {
        &mut self.em
    }

    // Events

    /// The world's event bus; logic reaches the same bus through
    /// [`EntityManager::events`].
    pub fn events(&self) -> &EventBus {
        self.em.events()
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, kind: &str, data: Value) -> usize {
        self.em.events().publish(kind, data)
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.em.events().subscribe(filter)
    }

    /// Grow entity capacity by `n`, including every system's `expand` hook.
    pub fn expand(&mut self, n: usize) {
        self.em.expand(n);
        self.propagate_expansions();
    }

    // Funcs

    pub fn add_func<F>(&mut self, name: &str, f: F)
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.funcs.add(name, Arc::new(f));
    }

    pub fn remove_func(&mut self, name: &str) -> bool {
        self.funcs.remove(name)
    }

    pub fn has_func(&self, name: &str) -> bool {
        self.funcs.has(name)
    }

    pub fn call_func(&self, name: &str, params: Value) -> Option<Value> {
        self.funcs.get(name).map(|f| f(params))
    }

    // Stats

    /// Runner -> unit -> estimated ms, plus per-runner and whole-update
    /// averages under `"totals"`.
    pub fn dump_stats(&self) -> RuntimeStats {
        let mut stats = self.sharer.dump_stats();
        stats
            .entry(TOTALS_KEY.to_string())
            .or_default()
            .insert(UPDATE_TOTAL_KEY.to_string(), self.total_runtime.get_or_zero());
        stats
    }

    pub fn dump_stats_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.dump_stats())
    }

    pub fn tick_count(&self) -> u64 {
        self.time.tick_count()
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn frame_timer(&self) -> &FrameTimer {
        &self.frame_timer
    }

    pub fn counters(&self) -> &Counter {
        &self.counters
    }

    pub fn sharer(&self) -> &RuntimeLimitSharer<EntityManager> {
        &self.sharer
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}
