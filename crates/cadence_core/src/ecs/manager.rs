use crate::config::WorldConfig;
use crate::ecs::component::{
    ComponentData, ComponentKind, ComponentTable, CustomComponent, TagList, GENERIC_TAGS,
    GENERIC_TAGS_SPEC,
};
use crate::ecs::entity::EntityRecord;
use crate::ecs::funcs::EntityFunc;
use crate::ecs::id_allocator::EntityIdAllocator;
use crate::ecs::list::{EntityFilter, EntitySignal, ListId, SignalKind, UpdatedEntityList};
use crate::ecs::spawn::{EntityLogicFn, SpawnRequest};
use crate::ecs::{Entity, EntityRef};
use crate::events::{EventBus, EventFilter, Subscription, DESPAWN_REQUEST};
use crate::parallel;
use crate::queue::{RequestQueue, RequestSender};
use crate::runtime::{LogicEvent, LogicHandle, LogicId, LogicQueue, LogicUnit, ENTITIES_RUNNER};
use rayon::ThreadPool;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns entity lifecycle, component storage and filtered lists.
///
/// Entity logic units run in the sharer's `"entities"` runner; the manager
/// only queues their addition and removal.
pub struct EntityManager {
    pub(crate) allocator: EntityIdAllocator,
    pub(crate) records: Vec<Option<EntityRecord>>,
    pub(crate) components: ComponentTable,
    pub(crate) lists: Vec<UpdatedEntityList>,
    pub(crate) list_names: HashMap<String, ListId>,
    pub(crate) unique: HashMap<String, Entity>,
    pub(crate) active_count: usize,
    pub(crate) spawn_queue: RequestQueue<SpawnRequest>,
    pub(crate) despawn_queue: RequestQueue<Entity>,
    pub(crate) despawn_requests: Subscription,
    events: EventBus,
    pub(crate) expand_on_capacity: bool,
    next_logic: u32,
    logics: LogicQueue<EntityManager>,
    workers: Option<ThreadPool>,
    expansions: Vec<usize>,
}

impl EntityManager {
    pub fn new(config: &WorldConfig, logics: LogicQueue<EntityManager>) -> Self {
        let capacity = config.max_entities;
        let mut components = ComponentTable::new(capacity);
        components.add_component_spec(GENERIC_TAGS_SPEC);

        let events = EventBus::new("world", config.event_queue_capacity);
        let despawn_requests = events.subscribe(EventFilter::kind(DESPAWN_REQUEST));

        let workers = config.worker_threads.and_then(|threads| {
            match parallel::build_worker_pool(Some(threads)) {
                Ok(pool) => Some(pool),
                Err(err) => {
                    warn!(threads, %err, "failed to build worker pool; using the global pool");
                    None
                }
            }
        });

        Self {
            allocator: EntityIdAllocator::new(capacity),
            records: (0..capacity).map(|_| None).collect(),
            components,
            lists: Vec::new(),
            list_names: HashMap::new(),
            unique: HashMap::new(),
            active_count: 0,
            spawn_queue: RequestQueue::bounded("spawn", config.spawn_queue_capacity),
            despawn_queue: RequestQueue::bounded("despawn", config.spawn_queue_capacity),
            despawn_requests,
            events,
            expand_on_capacity: config.expand_on_capacity,
            next_logic: 0,
            logics,
            workers,
            expansions: Vec::new(),
        }
    }

    // Records

    pub(crate) fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        if !self.allocator.is_live(entity) {
            return None;
        }
        self.records.get(entity.index())?.as_ref()
    }

    pub(crate) fn record_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        if !self.allocator.is_live(entity) {
            return None;
        }
        self.records.get_mut(entity.index())?.as_mut()
    }

    /// Read-only view of a live entity.
    pub fn entity_ref(&self, entity: Entity) -> Option<EntityRef<'_>> {
        self.record(entity).map(|record| EntityRef {
            record,
            components: &self.components,
        })
    }

    pub fn is_live(&self, entity: Entity) -> bool {
        self.record(entity).is_some_and(|r| !r.despawned)
    }

    pub fn is_active(&self, entity: Entity) -> bool {
        self.record(entity).is_some_and(|r| r.active)
    }

    // Components

    pub fn components(&self) -> &ComponentTable {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentTable {
        &mut self.components
    }

    pub fn add_component(&mut self, kind: ComponentKind, name: &str) -> usize {
        self.components.add_component(kind, name)
    }

    pub fn add_custom_component(&mut self, implementation: Box<dyn CustomComponent>) -> usize {
        self.components.add_custom_component(implementation)
    }

    pub fn entity_has_component(&self, entity: Entity, name: &str) -> bool {
        self.entity_ref(entity)
            .is_some_and(|e| e.has_component(name))
    }

    /// Component value of a live entity that has the component.
    pub fn get<T: ComponentData>(&self, entity: Entity, name: &str) -> Option<&T> {
        self.entity_ref(entity)?.get::<T>(name)
    }

    pub fn get_mut<T: ComponentData>(&mut self, entity: Entity, name: &str) -> Option<&mut T> {
        if !self.entity_has_component(entity, name) {
            return None;
        }
        self.components.get_mut::<T>(entity.index(), name)
    }

    // Activation

    pub fn activate(&mut self, entity: Entity) {
        self.set_active_state(entity, true);
    }

    pub fn deactivate(&mut self, entity: Entity) {
        self.set_active_state(entity, false);
    }

    pub(crate) fn set_active_state(&mut self, entity: Entity, active: bool) {
        let Some(record) = self.record_mut(entity) else {
            return;
        };
        if record.active == active || (active && record.despawned) {
            return;
        }
        record.active = active;
        for handle in record.logics.values() {
            handle.set_active(active);
        }
        if active {
            self.active_count += 1;
        } else {
            self.active_count -= 1;
        }
        self.notify_active_state(entity, active);
    }

    fn notify_active_state(&mut self, entity: Entity, active: bool) {
        if active {
            let matching = self.matching_lists(entity);
            for &id in &matching {
                self.lists[id.index()].signal(EntitySignal {
                    kind: SignalKind::Add,
                    entity,
                });
            }
            if let Some(record) = self.record_mut(entity) {
                record.lists = matching;
            }
        } else {
            let member_of = self
                .record_mut(entity)
                .map(|record| std::mem::take(&mut record.lists))
                .unwrap_or_default();
            for id in member_of {
                self.lists[id.index()].signal(EntitySignal {
                    kind: SignalKind::Remove,
                    entity,
                });
            }
        }
    }

    fn matching_lists(&self, entity: Entity) -> Vec<ListId> {
        let Some(view) = self.entity_ref(entity) else {
            return Vec::new();
        };
        self.lists
            .iter()
            .enumerate()
            .filter(|(_, list)| list.filter().test(&view))
            .map(|(ix, _)| ListId::new(ix))
            .collect()
    }

    /// Re-test an active entity against every list after its tags or
    /// components changed.
    pub fn check_active_entity(&mut self, entity: Entity) {
        if !self.is_active(entity) {
            return;
        }
        let matching = self.matching_lists(entity);
        let previous = self
            .record(entity)
            .map(|record| record.lists.clone())
            .unwrap_or_default();

        for &id in previous.iter().filter(|id| !matching.contains(id)) {
            self.lists[id.index()].signal(EntitySignal {
                kind: SignalKind::Remove,
                entity,
            });
        }
        for &id in matching.iter().filter(|id| !previous.contains(id)) {
            self.lists[id.index()].signal(EntitySignal {
                kind: SignalKind::Add,
                entity,
            });
        }
        if let Some(record) = self.record_mut(entity) {
            record.lists = matching;
        }
    }

    // Lists

    pub fn get_updated_entity_list(&mut self, filter: EntityFilter) -> ListId {
        self.create_list(filter, false)
    }

    /// Like [`get_updated_entity_list`](Self::get_updated_entity_list), with
    /// members kept in ID order.
    pub fn get_sorted_updated_entity_list(&mut self, filter: EntityFilter) -> ListId {
        self.create_list(filter, true)
    }

    fn create_list(&mut self, filter: EntityFilter, sorted: bool) -> ListId {
        if let Some(&id) = self.list_names.get(filter.name()) {
            return id;
        }
        let id = ListId::new(self.lists.len());
        let mut list = UpdatedEntityList::new(filter, sorted);

        let mut members = Vec::new();
        for record in self.records.iter().flatten() {
            if !record.active || record.despawned {
                continue;
            }
            let view = EntityRef {
                record,
                components: &self.components,
            };
            if list.filter().test(&view) {
                members.push(record.entity);
            }
        }
        for &entity in &members {
            list.signal(EntitySignal {
                kind: SignalKind::Add,
                entity,
            });
            if let Some(record) = self.record_mut(entity) {
                record.lists.push(id);
            }
        }

        debug!(list = list.name(), sorted, members = members.len(), "created entity list");
        self.list_names.insert(list.name().to_string(), id);
        self.lists.push(list);
        id
    }

    pub fn updated_entity_list_by_name(&self, name: &str) -> Option<ListId> {
        self.list_names.get(name).copied()
    }

    /// Sorted list of entities having every named component, named by the
    /// comma-joined component names.
    ///
    /// # Panics
    /// If any name is unregistered.
    pub fn updated_entity_list_by_component_names(&mut self, names: &[&str]) -> ListId {
        let bits = self.components.bits_from_names(names);
        let filter = EntityFilter::from_components(names.join(","), bits);
        self.get_sorted_updated_entity_list(filter)
    }

    pub fn list(&self, id: ListId) -> &UpdatedEntityList {
        &self.lists[id.index()]
    }

    pub fn add_list_callback<F>(&mut self, id: ListId, callback: F)
    where
        F: FnMut(&EntitySignal) + Send + 'static,
    {
        self.lists[id.index()].add_callback(callback);
    }

    // Logic

    /// Fresh logic unit ID. IDs are never reused, so a queued add can not
    /// collide with a unit whose removal is still in flight.
    pub fn next_logic_id(&mut self) -> LogicId {
        let id = self.next_logic;
        self.next_logic = match id.checked_add(1) {
            Some(next) => next,
            None => panic!("logic id space exhausted"),
        };
        LogicId::new(id)
    }

    /// Attach a logic unit to the entity, replacing any logic of the same name.
    pub fn add_logic<F>(&mut self, entity: Entity, name: &str, f: F) -> Option<LogicHandle>
    where
        F: FnMut(Entity, &mut EntityManager, f64) + Send + 'static,
    {
        self.add_entity_logic(entity, name, None, Box::new(f))
    }

    /// As [`add_logic`](Self::add_logic), running once per `period_ms`.
    pub fn add_logic_with_schedule<F>(
        &mut self,
        entity: Entity,
        name: &str,
        period_ms: f64,
        f: F,
    ) -> Option<LogicHandle>
    where
        F: FnMut(Entity, &mut EntityManager, f64) + Send + 'static,
    {
        self.add_entity_logic(entity, name, Some(period_ms), Box::new(f))
    }

    pub(crate) fn add_entity_logic(
        &mut self,
        entity: Entity,
        name: &str,
        period_ms: Option<f64>,
        mut f: EntityLogicFn,
    ) -> Option<LogicHandle> {
        let active = self.record(entity)?.active;
        self.remove_logic(entity, name);

        let id = self.next_logic_id();
        let mut unit = LogicUnit::new(
            id,
            format!("entity-logic-{}-{name}", entity.id()),
            move |em: &mut EntityManager, dt_ms| f(entity, em, dt_ms),
        )
        .with_active(active);
        if let Some(period_ms) = period_ms {
            unit = unit.with_schedule(period_ms);
        }

        let handle = unit.handle();
        self.record_mut(entity)?
            .logics
            .insert(name.to_string(), handle.clone());
        self.logics.push(LogicEvent::Add {
            runner: ENTITIES_RUNNER.to_string(),
            unit,
        });
        Some(handle)
    }

    /// Detach a logic unit by name. Absent names are a no-op.
    pub fn remove_logic(&mut self, entity: Entity, name: &str) -> bool {
        let Some(handle) = self
            .record_mut(entity)
            .and_then(|record| record.logics.remove(name))
        else {
            return false;
        };
        self.logics.push(LogicEvent::Remove {
            runner: ENTITIES_RUNNER.to_string(),
            id: handle.id(),
        });
        true
    }

    pub fn remove_all_logics(&mut self, entity: Entity) {
        let names: Vec<String> = match self.record(entity) {
            Some(record) => record.logics.keys().cloned().collect(),
            None => return,
        };
        for name in names {
            self.remove_logic(entity, &name);
        }
    }

    pub fn activate_logics(&self, entity: Entity) {
        if let Some(record) = self.record(entity) {
            record.logics.values().for_each(LogicHandle::activate);
        }
    }

    pub fn deactivate_logics(&self, entity: Entity) {
        if let Some(record) = self.record(entity) {
            record.logics.values().for_each(LogicHandle::deactivate);
        }
    }

    pub fn logic(&self, entity: Entity, name: &str) -> Option<&LogicHandle> {
        self.record(entity)?.logics.get(name)
    }

    // Funcs and mind

    pub fn add_func<F>(&mut self, entity: Entity, name: &str, f: F)
    where
        F: Fn(&EntityManager, Entity, Value) -> Value + Send + Sync + 'static,
    {
        self.add_func_arc(entity, name, Arc::new(f));
    }

    pub(crate) fn add_func_arc(&mut self, entity: Entity, name: &str, f: Arc<EntityFunc>) {
        if let Some(record) = self.record_mut(entity) {
            record.funcs.add(name, f);
        }
    }

    pub fn remove_func(&mut self, entity: Entity, name: &str) -> bool {
        self.record_mut(entity)
            .is_some_and(|record| record.funcs.remove(name))
    }

    pub fn has_func(&self, entity: Entity, name: &str) -> bool {
        self.record(entity).is_some_and(|record| record.funcs.has(name))
    }

    /// Invoke an entity func. `None` when the entity or func is missing.
    pub fn call_func(&self, entity: Entity, name: &str, params: Value) -> Option<Value> {
        let f = self.record(entity)?.funcs.get(name)?;
        Some(f(self, entity, params))
    }

    pub fn mind(&self, entity: Entity, key: &str) -> Option<&Value> {
        self.record(entity)?.mind.get(key)
    }

    pub fn set_mind(&mut self, entity: Entity, key: &str, value: Value) {
        if let Some(record) = self.record_mut(entity) {
            record.mind.insert(key.to_string(), value);
        }
    }

    // Inventory and queries

    /// (live entities, active entities)
    pub fn num_entities(&self) -> (usize, usize) {
        (self.allocator.len(), self.active_count)
    }

    pub fn current_entities(&self) -> Vec<Entity> {
        self.records.iter().flatten().map(|r| r.entity).collect()
    }

    pub fn active_entities(&self) -> Vec<Entity> {
        self.records
            .iter()
            .flatten()
            .filter(|r| r.active)
            .map(|r| r.entity)
            .collect()
    }

    /// Live entities passing `predicate`, in ID order.
    pub fn predicate_all_entities<P>(&self, predicate: P) -> Vec<Entity>
    where
        P: Fn(&EntityRef<'_>) -> bool,
    {
        self.records
            .iter()
            .flatten()
            .map(|record| EntityRef {
                record,
                components: &self.components,
            })
            .filter(|view| predicate(view))
            .map(|view| view.entity())
            .collect()
    }

    /// The entities of `entities` that are live and pass `predicate`.
    pub fn predicate_entities<P>(&self, entities: &[Entity], predicate: P) -> Vec<Entity>
    where
        P: Fn(&EntityRef<'_>) -> bool,
    {
        entities
            .iter()
            .filter_map(|&entity| self.entity_ref(entity))
            .filter(|view| predicate(view))
            .map(|view| view.entity())
            .collect()
    }

    pub fn entities_with_tags(&self, tags: &[&str]) -> Vec<Entity> {
        self.predicate_all_entities(|e| e.tags().is_some_and(|t| t.has_all(tags)))
    }

    pub fn active_entities_with_tags(&self, tags: &[&str]) -> Vec<Entity> {
        self.predicate_all_entities(|e| {
            e.is_active() && e.tags().is_some_and(|t| t.has_all(tags))
        })
    }

    /// Diagnostic snapshot of every live entity.
    pub fn dump_entities(&self) -> Value {
        let entities: Vec<Value> = self
            .records
            .iter()
            .flatten()
            .map(|record| {
                let tags = self
                    .components
                    .get::<TagList>(record.entity.index(), GENERIC_TAGS)
                    .map(|t| t.as_vec())
                    .unwrap_or_default();
                let mut logics: Vec<&str> = record.logics.keys().map(String::as_str).collect();
                logics.sort_unstable();
                json!({
                    "entity": record.entity,
                    "active": record.active,
                    "components": self.components.bits_to_string(&record.bits),
                    "tags": tags,
                    "logics": logics,
                })
            })
            .collect();
        Value::Array(entities)
    }

    // Capacity

    pub fn capacity(&self) -> usize {
        self.allocator.capacity()
    }

    /// Grow entity capacity by `n`.
    pub fn expand(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.allocator.expand(n);
        self.components.expand(n);
        self.records.extend((0..n).map(|_| None));
        self.expansions.push(n);
        info!(added = n, capacity = self.capacity(), "expanded entity capacity");
    }

    /// Expansions since the last call, for systems sized to capacity.
    pub fn take_expansions(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.expansions)
    }

    // Parallelism

    /// Run `f` over contiguous chunks of a list's members on the worker
    /// pool, returning one result per chunk in member order.
    pub fn par_chunks<R, F>(&self, list: ListId, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(&[Entity], &ComponentTable) -> R + Sync + Send,
    {
        let entities = self.lists[list.index()].entities();
        let components = &self.components;
        let run = || parallel::par_chunks(entities, |chunk| f(chunk, components));
        match &self.workers {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    /// The world's event bus. Publishing [`DESPAWN_REQUEST`] with an
    /// entity's bits queues its despawn.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn spawn_sender(&self) -> RequestSender<SpawnRequest> {
        self.spawn_queue.sender()
    }

    pub fn despawn_sender(&self) -> RequestSender<Entity> {
        self.despawn_queue.sender()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::RUNTIME_LIMIT_SHARER_MAX_LOOPS;
    use crate::runtime::RuntimeLimitSharer;
    use glam::DVec2;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn manager_with_capacity(
        capacity: usize,
    ) -> (EntityManager, RuntimeLimitSharer<EntityManager>) {
        let mut sharer = RuntimeLimitSharer::new();
        sharer.register_runner(ENTITIES_RUNNER);
        let config = WorldConfig::with_max_entities(capacity);
        let mut em = EntityManager::new(&config, sharer.queue());
        em.add_component(ComponentKind::Vec2D, "Position");
        em.add_component(ComponentKind::Float64, "Mass");
        (em, sharer)
    }

    fn positioned(x: f64) -> SpawnRequest {
        SpawnRequest::new().with("Vec2D,Position", DVec2::new(x, x))
    }

    #[test]
    fn test_position_reads_back() {
        let (mut em, _sharer) = manager_with_capacity(16);
        let e = em.spawn(positioned(11.0)).unwrap();
        assert_eq!(em.get::<DVec2>(e, "Position"), Some(&DVec2::new(11.0, 11.0)));
        assert!(em.get::<f64>(e, "Mass").is_none());

        em.get_mut::<DVec2>(e, "Position").unwrap().x = 4.0;
        assert_eq!(em.get::<DVec2>(e, "Position").unwrap().x, 4.0);
    }

    #[test]
    fn test_list_back_fills_active_matches() {
        let (mut em, _sharer) = manager_with_capacity(16);
        let a = em.spawn(positioned(1.0)).unwrap();
        let b = em.spawn(positioned(2.0).inactive()).unwrap();
        let _c = em.spawn(SpawnRequest::new()).unwrap();

        let list = em.updated_entity_list_by_component_names(&["Position"]);
        assert_eq!(em.list(list).entities(), &[a]);

        em.activate(b);
        assert_eq!(em.list(list).entities(), &[a, b]);
    }

    #[test]
    fn test_deactivate_and_reactivate() {
        let (mut em, _sharer) = manager_with_capacity(16);
        let e = em.spawn(positioned(1.0)).unwrap();
        let by_position = em.updated_entity_list_by_component_names(&["Position"]);
        let everything = em.get_updated_entity_list(EntityFilter::new("all", |_| true));
        assert!(em.list(by_position).contains(e));
        assert!(em.list(everything).contains(e));

        em.deactivate(e);
        assert!(em.list(by_position).is_empty());
        assert!(em.list(everything).is_empty());
        assert_eq!(em.num_entities(), (1, 0));

        em.activate(e);
        assert!(em.list(by_position).contains(e));
        assert!(em.list(everything).contains(e));
        assert_eq!(em.num_entities(), (1, 1));
    }

    #[test]
    fn test_same_filter_name_shares_list() {
        let (mut em, _sharer) = manager_with_capacity(4);
        let first = em.get_updated_entity_list(EntityFilter::new("heavy", |_| true));
        let second = em.get_updated_entity_list(EntityFilter::new("heavy", |_| false));
        assert_eq!(first, second);
        assert_eq!(em.updated_entity_list_by_name("heavy"), Some(first));
    }

    #[test]
    fn test_sorted_list_under_churn() {
        let (mut em, _sharer) = manager_with_capacity(32);
        let list = em.updated_entity_list_by_component_names(&["Position"]);
        let entities: Vec<Entity> = (0..10)
            .map(|i| em.spawn(positioned(i as f64)).unwrap())
            .collect();
        for &e in entities.iter().step_by(3) {
            em.deactivate(e);
        }
        em.despawn(entities[4]);
        em.activate(entities[3]);
        em.spawn(positioned(99.0)).unwrap();

        let ids: Vec<u32> = em.list(list).entities().iter().map(Entity::id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert!(!em.list(list).contains(entities[0]));
        assert!(em.list(list).contains(entities[3]));
    }

    #[test]
    fn test_list_callbacks_fire_on_activation() {
        let (mut em, _sharer) = manager_with_capacity(4);
        let signals = Arc::new(AtomicUsize::new(0));
        let list = em.get_updated_entity_list(EntityFilter::new("all", |_| true));
        let counter = Arc::clone(&signals);
        em.add_list_callback(list, move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let e = em.spawn(SpawnRequest::new()).unwrap();
        em.deactivate(e);
        assert_eq!(signals.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_logic_follows_active_state() {
        let (mut em, mut sharer) = manager_with_capacity(4);
        let e = em.spawn(SpawnRequest::new()).unwrap();
        let handle = em
            .add_logic(e, "tick", |entity, em, _dt| {
                let n = em.mind(entity, "ticks").and_then(Value::as_u64).unwrap_or(0);
                em.set_mind(entity, "ticks", json!(n + 1));
            })
            .unwrap();
        sharer.share(16.0, &mut em);
        assert_eq!(em.mind(e, "ticks"), Some(&json!(1)));

        em.deactivate(e);
        assert!(!handle.is_active());
        sharer.share(16.0, &mut em);
        assert_eq!(em.mind(e, "ticks"), Some(&json!(1)));

        em.activate(e);
        sharer.share(16.0, &mut em);
        assert_eq!(em.mind(e, "ticks"), Some(&json!(2)));
    }

    #[test]
    fn test_remove_logic_is_idempotent() {
        let (mut em, mut sharer) = manager_with_capacity(4);
        let e = em.spawn(SpawnRequest::new()).unwrap();
        em.add_logic(e, "noop", |_, _, _| {});
        sharer.process_add_remove_logics();
        assert_eq!(sharer.runner(ENTITIES_RUNNER).unwrap().len(), 1);

        assert!(em.remove_logic(e, "noop"));
        assert!(!em.remove_logic(e, "noop"));
        assert!(!em.remove_logic(e, "never-added"));
        sharer.process_add_remove_logics();
        assert!(sharer.runner(ENTITIES_RUNNER).unwrap().is_empty());
    }

    #[test]
    fn test_logic_churn_through_one_slot_queue() {
        let mut sharer = RuntimeLimitSharer::with_limits(1, RUNTIME_LIMIT_SHARER_MAX_LOOPS);
        sharer.register_runner(ENTITIES_RUNNER);
        let mut em = EntityManager::new(&WorldConfig::with_max_entities(4), sharer.queue());
        let e = em.spawn(SpawnRequest::new()).unwrap();

        let ran = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let logic = |name: &'static str| {
            let ran = Arc::clone(&ran);
            move |_: Entity, _: &mut EntityManager, _: f64| ran.lock().push(name)
        };

        em.add_logic(e, "a", logic("a"));
        let b = em.add_logic(e, "b", logic("b")).unwrap();
        sharer.process_add_remove_logics();
        em.remove_logic(e, "b");
        let c = em.add_logic(e, "c", logic("c")).unwrap();
        assert_ne!(b.id(), c.id());
        for _ in 0..20 {
            sharer.process_add_remove_logics();
        }

        let runner = sharer.runner(ENTITIES_RUNNER).unwrap();
        assert_eq!(runner.len(), 2);
        assert!(!runner.contains(b.id()));
        assert!(runner.contains(c.id()));

        sharer.share(100.0, &mut em);
        let mut seen = ran.lock().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec!["a", "c"]);
    }

    #[test]
    fn test_replacing_logic_keeps_one_unit() {
        let (mut em, mut sharer) = manager_with_capacity(4);
        let e = em.spawn(SpawnRequest::new()).unwrap();
        em.add_logic(e, "think", |_, _, _| {});
        em.add_logic(e, "think", |_, _, _| {});
        sharer.process_add_remove_logics();
        assert_eq!(sharer.runner(ENTITIES_RUNNER).unwrap().len(), 1);
    }

    #[test]
    fn test_entity_funcs() {
        let (mut em, _sharer) = manager_with_capacity(4);
        let e = em.spawn(positioned(3.0)).unwrap();
        em.add_func(e, "x", |em, entity, _params| {
            json!(em.get::<DVec2>(entity, "Position").map(|p| p.x))
        });
        assert!(em.has_func(e, "x"));
        assert_eq!(em.call_func(e, "x", Value::Null), Some(json!(3.0)));
        assert!(em.remove_func(e, "x"));
        assert_eq!(em.call_func(e, "x", Value::Null), None);
    }

    #[test]
    fn test_queries() {
        let (mut em, _sharer) = manager_with_capacity(8);
        let a = em.spawn(positioned(1.0).tags(["tree", "tall"])).unwrap();
        let b = em.spawn(positioned(2.0).tag("tree").inactive()).unwrap();
        let c = em.spawn(SpawnRequest::new()).unwrap();

        assert_eq!(em.entities_with_tags(&["tree"]), vec![a, b]);
        assert_eq!(em.active_entities_with_tags(&["tree"]), vec![a]);
        assert_eq!(em.entities_with_tags(&["tree", "tall"]), vec![a]);
        assert_eq!(
            em.predicate_all_entities(|e| e.has_component("Position")),
            vec![a, b]
        );
        assert_eq!(em.predicate_entities(&[c, b], |e| e.is_active()), vec![c]);
        assert_eq!(em.current_entities(), vec![a, b, c]);
        assert_eq!(em.active_entities(), vec![a, c]);
    }

    #[test]
    fn test_dump_entities() {
        let (mut em, _sharer) = manager_with_capacity(4);
        let e = em.spawn(positioned(1.0).tag("rock")).unwrap();
        em.add_logic(e, "roll", |_, _, _| {});
        let dump = em.dump_entities();
        let first = &dump[0];
        assert_eq!(first["active"], json!(true));
        assert_eq!(first["tags"], json!(["rock"]));
        assert_eq!(first["logics"], json!(["roll"]));
        assert_eq!(first["components"], json!("GenericTags,Position"));
    }

    #[test]
    fn test_expand_grows_everything() {
        let (mut em, _sharer) = manager_with_capacity(2);
        em.expand(3);
        assert_eq!(em.capacity(), 5);
        assert_eq!(em.components().capacity(), 5);
        assert_eq!(em.take_expansions(), vec![3]);
        assert!(em.take_expansions().is_empty());
        for _ in 0..5 {
            em.spawn(SpawnRequest::new()).unwrap();
        }
    }

    #[test]
    fn test_par_chunks_over_list() {
        let config = WorldConfig {
            max_entities: 64,
            worker_threads: Some(2),
            ..WorldConfig::default()
        };
        let sharer: RuntimeLimitSharer<EntityManager> = RuntimeLimitSharer::new();
        let mut em = EntityManager::new(&config, sharer.queue());
        em.add_component(ComponentKind::Float64, "Mass");
        for i in 0..40 {
            em.spawn(SpawnRequest::new().with("Float64,Mass", i as f64)).unwrap();
        }
        let list = em.updated_entity_list_by_component_names(&["Mass"]);
        let sums = em.par_chunks(list, |chunk, table| {
            chunk
                .iter()
                .filter_map(|e| table.get::<f64>(e.index(), "Mass"))
                .sum::<f64>()
        });
        assert_eq!(sums.len(), 2);
        assert_eq!(sums.iter().sum::<f64>(), (0..40).sum::<i32>() as f64);
    }

    #[test]
    fn test_generic_tags_registered() {
        let (em, _sharer) = manager_with_capacity(1);
        assert_eq!(em.components().kind_of(GENERIC_TAGS), Some(ComponentKind::TagList));
    }
}
