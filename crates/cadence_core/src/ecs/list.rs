//! Filtered live entity lists
//!
//! An [`UpdatedEntityList`] holds the active entities matching its
//! [`EntityFilter`]. The entity manager is the only writer: it signals
//! additions and removals as entities activate, deactivate, despawn, or
//! change tags. Lists are created lazily per filter name and live as long
//! as the manager.

use crate::ecs::component::ComponentBitSet;
use crate::ecs::{Entity, EntityRef};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Index of a list within its entity manager.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(u32);

impl ListId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SignalKind {
    Add,
    Remove,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EntitySignal {
    pub kind: SignalKind,
    pub entity: Entity,
}

pub type SignalCallback = Box<dyn FnMut(&EntitySignal) + Send>;

type CustomPredicate = Arc<dyn Fn(&EntityRef<'_>) -> bool + Send + Sync>;

#[derive(Clone)]
pub enum FilterPredicate {
    /// Entity has every component in the set.
    Components(ComponentBitSet),
    /// Entity's generic tag list contains the tag.
    Tag(String),
    Custom(CustomPredicate),
}

/// Named membership test. Lists are shared by filter name, so two filters
/// with the same name must test the same thing.
#[derive(Clone)]
pub struct EntityFilter {
    name: String,
    predicate: FilterPredicate,
}

impl EntityFilter {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&EntityRef<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: FilterPredicate::Custom(Arc::new(predicate)),
        }
    }

    pub fn from_components(name: impl Into<String>, bits: ComponentBitSet) -> Self {
        Self {
            name: name.into(),
            predicate: FilterPredicate::Components(bits),
        }
    }

    /// Filter on a generic tag, named `tag:<tag>`.
    pub fn from_tag(tag: &str) -> Self {
        Self {
            name: tag_list_name(tag),
            predicate: FilterPredicate::Tag(tag.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn predicate(&self) -> &FilterPredicate {
        &self.predicate
    }

    pub fn test(&self, entity: &EntityRef<'_>) -> bool {
        match &self.predicate {
            FilterPredicate::Components(bits) => entity.bits().contains_all(bits),
            FilterPredicate::Tag(tag) => entity.has_tag(tag),
            FilterPredicate::Custom(predicate) => predicate(entity),
        }
    }
}

impl fmt::Debug for EntityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityFilter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub(crate) fn tag_list_name(tag: &str) -> String {
    format!("tag:{tag}")
}

/// Live list of the active entities passing a filter.
pub struct UpdatedEntityList {
    name: String,
    filter: EntityFilter,
    sorted: bool,
    entities: Vec<Entity>,
    // entity id -> slot in `entities`, unsorted lists only
    positions: HashMap<u32, usize>,
    callbacks: Vec<SignalCallback>,
}

impl UpdatedEntityList {
    pub(crate) fn new(filter: EntityFilter, sorted: bool) -> Self {
        Self {
            name: filter.name().to_string(),
            filter,
            sorted,
            entities: Vec::new(),
            positions: HashMap::new(),
            callbacks: Vec::new(),
        }
    }

    /// Apply a membership change. Every callback sees every signal, even
    /// when it changes nothing. Returns whether membership changed.
    pub(crate) fn signal(&mut self, signal: EntitySignal) -> bool {
        for callback in &mut self.callbacks {
            callback(&signal);
        }
        match signal.kind {
            SignalKind::Add => self.insert(signal.entity),
            SignalKind::Remove => self.remove(signal.entity),
        }
    }

    fn insert(&mut self, entity: Entity) -> bool {
        if self.sorted {
            match self.entities.binary_search(&entity) {
                Ok(_) => false,
                Err(at) => {
                    self.entities.insert(at, entity);
                    true
                }
            }
        } else {
            if self.positions.contains_key(&entity.id()) {
                return false;
            }
            self.positions.insert(entity.id(), self.entities.len());
            self.entities.push(entity);
            true
        }
    }

    fn remove(&mut self, entity: Entity) -> bool {
        if self.sorted {
            match self.entities.binary_search(&entity) {
                Ok(at) => {
                    self.entities.remove(at);
                    true
                }
                Err(_) => false,
            }
        } else {
            let Some(at) = self.positions.remove(&entity.id()) else {
                return false;
            };
            self.entities.swap_remove(at);
            if let Some(moved) = self.entities.get(at) {
                self.positions.insert(moved.id(), at);
            }
            true
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filter(&self) -> &EntityFilter {
        &self.filter
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Members; ID-ordered for sorted lists.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        if self.sorted {
            self.entities.binary_search(&entity).is_ok()
        } else {
            self.positions
                .get(&entity.id())
                .is_some_and(|&at| self.entities[at] == entity)
        }
    }

    pub fn first(&self) -> Option<Entity> {
        self.entities.first().copied()
    }

    pub fn add_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&EntitySignal) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }
}

impl fmt::Debug for UpdatedEntityList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdatedEntityList")
            .field("name", &self.name)
            .field("sorted", &self.sorted)
            .field("entities", &self.entities)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn add(id: u32) -> EntitySignal {
        EntitySignal {
            kind: SignalKind::Add,
            entity: Entity::new(id, 0),
        }
    }

    fn remove(id: u32) -> EntitySignal {
        EntitySignal {
            kind: SignalKind::Remove,
            entity: Entity::new(id, 0),
        }
    }

    fn list(sorted: bool) -> UpdatedEntityList {
        UpdatedEntityList::new(EntityFilter::new("all", |_| true), sorted)
    }

    fn ids(list: &UpdatedEntityList) -> Vec<u32> {
        list.entities().iter().map(Entity::id).collect()
    }

    #[test]
    fn test_sorted_stays_ordered() {
        let mut list = list(true);
        for id in [7, 2, 9, 4, 1] {
            list.signal(add(id));
        }
        list.signal(remove(4));
        list.signal(add(5));
        list.signal(remove(9));
        list.signal(add(3));
        assert_eq!(ids(&list), vec![1, 2, 3, 5, 7]);
    }

    #[test]
    fn test_signals_are_idempotent() {
        for sorted in [false, true] {
            let mut list = list(sorted);
            assert!(list.signal(add(1)));
            assert!(!list.signal(add(1)));
            assert_eq!(list.len(), 1);
            assert!(list.signal(remove(1)));
            assert!(!list.signal(remove(1)));
            assert!(list.is_empty());
        }
    }

    #[test]
    fn test_unsorted_swap_remove_keeps_positions() {
        let mut list = list(false);
        for id in 0..4 {
            list.signal(add(id));
        }
        list.signal(remove(0));
        assert_eq!(ids(&list), vec![3, 1, 2]);
        assert!(list.contains(Entity::new(3, 0)));
        list.signal(remove(3));
        assert_eq!(ids(&list), vec![2, 1]);
        assert!(!list.contains(Entity::new(0, 0)));
        assert_eq!(list.first(), Some(Entity::new(2, 0)));
    }

    #[test]
    fn test_callbacks_see_every_signal() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut list = list(false);
        let counter = Arc::clone(&seen);
        list.add_callback(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        list.signal(add(1));
        list.signal(add(1));
        list.signal(remove(2));
        assert_eq!(seen.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_tag_filter_name() {
        assert_eq!(EntityFilter::from_tag("tree").name(), "tag:tree");
    }
}
