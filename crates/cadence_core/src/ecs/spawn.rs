//! Entity spawning and despawning.
//!
//! A [`SpawnRequest`] collects everything an entity starts with. Requests
//! are applied immediately through [`EntityManager::spawn`] or queued with
//! [`EntityManager::queue_spawn`] and applied by the next
//! [`EntityManager::update`].

use crate::ecs::component::{
    ComponentKind, ComponentSet, ComponentSpec, ComponentSpecError, ComponentValue, TagList,
    GENERIC_TAGS,
};
use crate::ecs::entity::EntityRecord;
use crate::ecs::funcs::EntityFunc;
use crate::ecs::id_allocator::AllocError;
use crate::ecs::{Entity, EntityManager};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Entity logic callback: the owning entity, the manager, and ms since the
/// unit last ran.
pub type EntityLogicFn = Box<dyn FnMut(Entity, &mut EntityManager, f64) + Send>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("entity capacity {capacity} exceeded")]
    CapacityExceeded { capacity: usize },
    #[error("unique tag '{tag}' is already held by a live entity")]
    DuplicateUniqueTag { tag: String },
    #[error("logic name '{name}' is not of the form \"name\" or \"name,<period_ms>\"")]
    MalformedLogicName { name: String },
    #[error(transparent)]
    ComponentSpec(#[from] ComponentSpecError),
}

impl From<AllocError> for SpawnError {
    fn from(err: AllocError) -> Self {
        match err {
            AllocError::CapacityExceeded { capacity } => SpawnError::CapacityExceeded { capacity },
        }
    }
}

/// Split `"name"` or `"name,<period_ms>"`.
pub fn parse_logic_name(raw: &str) -> Result<(&str, Option<f64>), SpawnError> {
    let malformed = || SpawnError::MalformedLogicName {
        name: raw.to_string(),
    };
    let mut parts = raw.split(',');
    let name = parts.next().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(malformed());
    }
    let period = match parts.next() {
        None => None,
        Some(period) => match period.trim().parse::<f64>() {
            Ok(ms) if ms.is_finite() && ms > 0.0 => Some(ms),
            _ => return Err(malformed()),
        },
    };
    if parts.next().is_some() {
        return Err(malformed());
    }
    Ok((name, period))
}

/// Everything a new entity starts with.
pub struct SpawnRequest {
    active: bool,
    unique_tag: Option<String>,
    tags: Vec<String>,
    components: Vec<(String, ComponentValue)>,
    custom_components: Vec<(String, Box<dyn Any + Send>)>,
    logics: Vec<(String, EntityLogicFn)>,
    funcs: Vec<(String, Arc<EntityFunc>)>,
    mind: HashMap<String, Value>,
}

impl SpawnRequest {
    pub fn new() -> Self {
        Self {
            active: true,
            unique_tag: None,
            tags: Vec::new(),
            components: Vec::new(),
            custom_components: Vec::new(),
            logics: Vec::new(),
            funcs: Vec::new(),
            mind: HashMap::new(),
        }
    }

    /// Spawn without activating; the entity joins no list until activated.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Tag that at most one live entity may hold. The entity is also tagged
    /// with it.
    pub fn unique(mut self, tag: impl Into<String>) -> Self {
        self.unique_tag = Some(tag.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I>(mut self, tags: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Component value under a `"Kind,Name"` spec.
    pub fn with(mut self, spec: &str, value: impl Into<ComponentValue>) -> Self {
        self.components.push((spec.to_string(), value.into()));
        self
    }

    pub fn with_custom<T: Any + Send>(mut self, name: &str, value: T) -> Self {
        self.custom_components
            .push((name.to_string(), Box::new(value)));
        self
    }

    /// Logic unit named `"name"` or `"name,<period_ms>"`.
    pub fn with_logic<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnMut(Entity, &mut EntityManager, f64) + Send + 'static,
    {
        self.logics.push((name.to_string(), Box::new(f)));
        self
    }

    pub fn with_func<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&EntityManager, Entity, Value) -> Value + Send + Sync + 'static,
    {
        self.funcs.push((name.to_string(), Arc::new(f)));
        self
    }

    pub fn with_mind(mut self, key: &str, value: Value) -> Self {
        self.mind.insert(key.to_string(), value);
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Default for SpawnRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityManager {
    /// Create an entity from `request`.
    ///
    /// Validation happens before an ID is taken, so a failed spawn leaves
    /// the manager untouched. With `expand_on_capacity` set, a full manager
    /// grows by half its capacity and retries once.
    ///
    /// # Panics
    /// If a component is unregistered or registered under another kind, or a
    /// custom component rejects its value.
    pub fn spawn(&mut self, request: SpawnRequest) -> Result<Entity, SpawnError> {
        let SpawnRequest {
            active,
            unique_tag,
            tags,
            components,
            custom_components,
            logics,
            funcs,
            mind,
        } = request;

        if let Some(tag) = &unique_tag {
            if self.unique.contains_key(tag) {
                return Err(SpawnError::DuplicateUniqueTag { tag: tag.clone() });
            }
        }
        let mut parsed_logics = Vec::with_capacity(logics.len());
        for (raw, f) in logics {
            let (name, period) = parse_logic_name(&raw)?;
            parsed_logics.push((name.to_string(), period, f));
        }

        let mut tag_list = TagList::from_tags(tags);
        if let Some(tag) = &unique_tag {
            tag_list.add(tag);
        }
        let mut set = ComponentSet::new();
        for (spec, value) in components {
            set.insert(spec.parse::<ComponentSpec>()?, value);
        }
        set.insert(
            ComponentSpec::new(ComponentKind::TagList, GENERIC_TAGS),
            ComponentValue::TagList(tag_list),
        );
        self.components.assert_valid_component_set(&set);

        let entity = self.allocate_entity()?;
        let ix = entity.index();
        let mut bits = self.components.bits_from_component_set(&set);
        self.components.apply_component_set(ix, set);
        for (name, value) in custom_components {
            if !self.components.apply_custom(ix, &name, value) {
                panic!("custom component {name} rejected the value for {entity}");
            }
            if let Some(bit) = self.components.index_of(&name) {
                bits.set(bit);
            }
        }
        self.records[ix] = Some(EntityRecord::new(entity, bits));

        if let Some(tag) = unique_tag {
            self.unique.insert(tag, entity);
        }
        for (name, period, f) in parsed_logics {
            self.add_entity_logic(entity, &name, period, f);
        }
        for (name, f) in funcs {
            self.add_func_arc(entity, &name, f);
        }
        if let Some(record) = self.record_mut(entity) {
            record.mind = mind;
        }
        if active {
            self.activate(entity);
        }
        trace!(%entity, active, "spawned entity");
        Ok(entity)
    }

    fn allocate_entity(&mut self) -> Result<Entity, SpawnError> {
        match self.allocator.allocate() {
            Ok(entity) => Ok(entity),
            Err(err) if self.expand_on_capacity => {
                debug!(%err, "entity capacity reached; expanding");
                self.expand((self.capacity() / 2).max(1));
                Ok(self.allocator.allocate()?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Remove an entity. Stale handles and repeated despawns return false
    /// and change nothing.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        match self.record_mut(entity) {
            Some(record) if !record.despawned => record.despawned = true,
            _ => return false,
        }
        self.remove_all_logics(entity);
        self.set_active_state(entity, false);
        self.unique.retain(|_, holder| *holder != entity);
        self.allocator.deallocate(entity);
        self.records[entity.index()] = None;
        trace!(%entity, "despawned entity");
        true
    }

    /// Drop pending spawns and despawn every live entity.
    pub fn despawn_all(&mut self) {
        let dropped = self.spawn_queue.clear();
        self.despawn_queue.clear();
        self.despawn_requests.clear();
        let entities = self.current_entities();
        debug!(entities = entities.len(), dropped, "despawning all entities");
        for entity in entities {
            self.despawn(entity);
        }
    }

    pub fn queue_spawn(&self, request: SpawnRequest) {
        self.spawn_queue.push(request);
    }

    pub fn queue_despawn(&self, entity: Entity) {
        self.despawn_queue.push(entity);
    }

    /// Apply the queued despawns (including despawn requests published on
    /// the event bus), then the queued spawns, present when the call starts.
    /// A failed spawn does not stop the batch; its error is returned in queue
    /// order with the others.
    #[must_use = "failed queued spawns are only reported here"]
    pub fn update(&mut self) -> Vec<SpawnError> {
        for entity in self.despawn_queue.drain_pending() {
            self.despawn(entity);
        }
        for event in self.despawn_requests.drain() {
            match event.data.as_u64() {
                Some(bits) => {
                    self.despawn(Entity::from_bits(bits));
                }
                None => warn!(data = %event.data, "malformed despawn request"),
            }
        }
        let mut failed = Vec::new();
        for request in self.spawn_queue.drain_pending() {
            if let Err(err) = self.spawn(request) {
                warn!(%err, "queued spawn failed");
                failed.push(err);
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::ecs::manager::tests::manager_with_capacity;
    use crate::runtime::{RuntimeLimitSharer, ENTITIES_RUNNER};
    use glam::DVec2;
    use serde_json::json;

    #[test]
    fn test_capacity_then_reuse() {
        let (mut em, _sharer) = manager_with_capacity(1600);
        let entities: Vec<Entity> = (0..1600)
            .map(|_| em.spawn(SpawnRequest::new()).unwrap())
            .collect();
        assert_eq!(
            em.spawn(SpawnRequest::new()).unwrap_err(),
            SpawnError::CapacityExceeded { capacity: 1600 }
        );

        assert!(em.despawn(entities[700]));
        let reused = em.spawn(SpawnRequest::new()).unwrap();
        assert_eq!(reused.id(), 700);
        assert_eq!(em.num_entities(), (1600, 1600));
    }

    #[test]
    fn test_expand_on_capacity() {
        let config = WorldConfig {
            max_entities: 2,
            expand_on_capacity: true,
            ..WorldConfig::default()
        };
        let sharer: RuntimeLimitSharer<EntityManager> = RuntimeLimitSharer::new();
        let mut em = EntityManager::new(&config, sharer.queue());
        for _ in 0..3 {
            em.spawn(SpawnRequest::new()).unwrap();
        }
        assert_eq!(em.capacity(), 3);
        assert_eq!(em.take_expansions(), vec![1]);
    }

    #[test]
    fn test_double_despawn_and_stale_handle() {
        let (mut em, _sharer) = manager_with_capacity(4);
        let old = em.spawn(SpawnRequest::new()).unwrap();
        assert!(em.despawn(old));
        assert!(!em.despawn(old));

        let new = em.spawn(SpawnRequest::new()).unwrap();
        assert_eq!(new.id(), old.id());
        assert_ne!(new, old);
        assert!(!em.despawn(old));
        assert!(em.is_live(new));
        assert!(!em.is_live(old));
    }

    #[test]
    fn test_despawn_leaves_lists_and_logic() {
        let (mut em, mut sharer) = manager_with_capacity(4);
        let list = em.updated_entity_list_by_component_names(&["Position"]);
        let e = em
            .spawn(
                SpawnRequest::new()
                    .with("Vec2D,Position", DVec2::ZERO)
                    .with_logic("drift", |_, _, _| {}),
            )
            .unwrap();
        sharer.process_add_remove_logics();
        assert_eq!(em.list(list).len(), 1);
        assert_eq!(sharer.runner(ENTITIES_RUNNER).unwrap().len(), 1);

        em.despawn(e);
        sharer.process_add_remove_logics();
        assert!(em.list(list).is_empty());
        assert!(sharer.runner(ENTITIES_RUNNER).unwrap().is_empty());
        assert_eq!(em.num_entities(), (0, 0));
    }

    #[test]
    fn test_queued_spawn_and_despawn() {
        let (mut em, _sharer) = manager_with_capacity(4);
        em.queue_spawn(SpawnRequest::new().tag("queued"));
        em.queue_spawn(SpawnRequest::new());
        assert_eq!(em.num_entities(), (0, 0));

        assert!(em.update().is_empty());
        assert_eq!(em.num_entities(), (2, 2));

        let queued = em.entities_with_tags(&["queued"]);
        em.queue_despawn(queued[0]);
        assert!(em.update().is_empty());
        assert_eq!(em.num_entities(), (1, 1));
        assert!(em.entities_with_tags(&["queued"]).is_empty());
    }

    #[test]
    fn test_failed_queued_spawn_keeps_rest_of_batch() {
        let (mut em, _sharer) = manager_with_capacity(8);
        em.queue_spawn(SpawnRequest::new().unique("player"));
        em.queue_spawn(SpawnRequest::new().unique("player"));
        em.queue_spawn(SpawnRequest::new().tag("after"));

        let failed = em.update();
        assert_eq!(
            failed,
            vec![SpawnError::DuplicateUniqueTag {
                tag: "player".to_string()
            }]
        );
        assert_eq!(em.num_entities(), (2, 2));
        assert_eq!(em.entities_with_tags(&["after"]).len(), 1);
        assert!(em.update().is_empty());
    }

    #[test]
    fn test_sender_from_another_thread() {
        let (mut em, _sharer) = manager_with_capacity(4);
        let sender = em.spawn_sender();
        std::thread::spawn(move || sender.push(SpawnRequest::new()))
            .join()
            .unwrap();
        assert!(em.update().is_empty());
        assert_eq!(em.num_entities(), (1, 1));
    }

    #[test]
    fn test_despawn_all_drops_pending() {
        let (mut em, _sharer) = manager_with_capacity(8);
        for _ in 0..3 {
            em.spawn(SpawnRequest::new()).unwrap();
        }
        em.queue_spawn(SpawnRequest::new());
        em.despawn_all();
        assert!(em.update().is_empty());
        assert_eq!(em.num_entities(), (0, 0));
    }

    #[test]
    fn test_parse_logic_name() {
        assert_eq!(parse_logic_name("think").unwrap(), ("think", None));
        assert_eq!(parse_logic_name("blink,50").unwrap(), ("blink", Some(50.0)));
        for bad in ["", ",10", "blink,fast", "blink,0", "blink,10,20"] {
            assert!(parse_logic_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_malformed_logic_name_takes_no_id() {
        let (mut em, _sharer) = manager_with_capacity(4);
        let err = em
            .spawn(SpawnRequest::new().with_logic("blink,fast", |_, _, _| {}))
            .unwrap_err();
        assert_eq!(
            err,
            SpawnError::MalformedLogicName {
                name: "blink,fast".to_string()
            }
        );
        assert_eq!(em.num_entities(), (0, 0));
    }

    #[test]
    fn test_scheduled_logic_from_request() {
        let (mut em, mut sharer) = manager_with_capacity(4);
        let e = em
            .spawn(SpawnRequest::new().with_logic("blink,50", |_, _, _| {}))
            .unwrap();
        assert!(em.logic(e, "blink").is_some_and(|h| h.is_active()));
        sharer.process_add_remove_logics();
        let runner = sharer.runner(ENTITIES_RUNNER).unwrap();
        let id = runner.find(&format!("entity-logic-{}-blink", e.id())).unwrap();
        assert!(runner.contains(id));
    }

    #[test]
    fn test_unknown_kind_in_request() {
        let (mut em, _sharer) = manager_with_capacity(4);
        let err = em
            .spawn(SpawnRequest::new().with("Quaternion,Spin", 1.0))
            .unwrap_err();
        assert!(matches!(err, SpawnError::ComponentSpec(_)));
        assert_eq!(em.num_entities(), (0, 0));
    }

    #[test]
    #[should_panic(expected = "component Mass is registered as Float64")]
    fn test_kind_mismatch_panics() {
        let (mut em, _sharer) = manager_with_capacity(4);
        let _ = em.spawn(SpawnRequest::new().with("Int,Mass", 3_i64));
    }

    #[test]
    fn test_funcs_and_mind_from_request() {
        let (mut em, _sharer) = manager_with_capacity(4);
        let e = em
            .spawn(
                SpawnRequest::new()
                    .with_mind("goal", json!("rest"))
                    .with_func("echo", |_, _, params| params),
            )
            .unwrap();
        assert_eq!(em.mind(e, "goal"), Some(&json!("rest")));
        assert_eq!(em.call_func(e, "echo", json!(7)), Some(json!(7)));
    }

    #[test]
    fn test_custom_component_from_request() {
        use crate::ecs::component::testing::CounterColumn;
        let (mut em, _sharer) = manager_with_capacity(4);
        em.add_custom_component(Box::new(CounterColumn::new()));
        let e = em.spawn(SpawnRequest::new().with_custom("Counter", 9_u32)).unwrap();
        assert!(em.entity_has_component(e, "Counter"));
        let value = em.components().custom("Counter").and_then(|c| c.get(e.index()));
        assert_eq!(value.and_then(|v| v.downcast_ref::<u32>()), Some(&9));
    }

    #[test]
    fn test_inactive_request() {
        let (mut em, _sharer) = manager_with_capacity(4);
        let e = em
            .spawn(SpawnRequest::new().inactive().with("Float64,Mass", 2.0))
            .unwrap();
        assert!(!em.is_active(e));
        assert_eq!(em.num_entities(), (1, 0));
        assert!(em.components().kind_of("Mass") == Some(ComponentKind::Float64));
    }
}
