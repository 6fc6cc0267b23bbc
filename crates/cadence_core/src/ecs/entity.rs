//! Entity handle with generational ID
//!
//! Entities are lightweight handles (8 bytes) naming a slot in the entity
//! manager. The generation counter rejects stale handles once the ID has
//! been recycled.

use crate::ecs::component::{ComponentBitSet, ComponentData, ComponentTable, TagList, GENERIC_TAGS};
use crate::ecs::funcs::{EntityFunc, FuncSet};
use crate::ecs::list::ListId;
use crate::runtime::LogicHandle;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Entity handle (generation-indexed for safety)
///
/// Format: [32-bit id | 32-bit generation]
/// - ID: slot in the component columns, reused after despawn
/// - Generation: incremented each time the ID is released
///
/// Example:
/// ```ignore
/// let entity = world.spawn(SpawnRequest::new());
/// world.despawn(entity);
/// // entity handle is now stale (generation mismatch)
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Entity {
    id: u32,
    generation: u32,
}

impl Entity {
    pub(crate) const fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Slot index into component columns.
    #[inline]
    pub fn index(&self) -> usize {
        self.id as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Pack into a 64-bit integer
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.id as u64)
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            id: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl Ord for Entity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then(self.generation.cmp(&other.generation))
    }
}

impl PartialOrd for Entity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}v{}", self.id, self.generation)
    }
}

/// Manager-side state of one live entity.
pub(crate) struct EntityRecord {
    pub entity: Entity,
    pub active: bool,
    pub despawned: bool,
    pub bits: ComponentBitSet,
    pub logics: HashMap<String, LogicHandle>,
    pub lists: Vec<ListId>,
    pub funcs: FuncSet<EntityFunc>,
    pub mind: HashMap<String, serde_json::Value>,
}

impl EntityRecord {
    pub fn new(entity: Entity, bits: ComponentBitSet) -> Self {
        Self {
            entity,
            active: false,
            despawned: false,
            bits,
            logics: HashMap::new(),
            lists: Vec::new(),
            funcs: FuncSet::new(),
            mind: HashMap::new(),
        }
    }
}

/// Read-only view of an entity handed to filter predicates.
#[derive(Clone, Copy)]
pub struct EntityRef<'a> {
    pub(crate) record: &'a EntityRecord,
    pub(crate) components: &'a ComponentTable,
}

impl<'a> EntityRef<'a> {
    pub fn entity(&self) -> Entity {
        self.record.entity
    }

    pub fn id(&self) -> u32 {
        self.record.entity.id()
    }

    pub fn is_active(&self) -> bool {
        self.record.active
    }

    pub fn bits(&self) -> &'a ComponentBitSet {
        &self.record.bits
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components
            .index_of(name)
            .is_some_and(|bit| self.record.bits.get(bit))
    }

    pub fn tags(&self) -> Option<&'a TagList> {
        self.components
            .get::<TagList>(self.record.entity.index(), GENERIC_TAGS)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().is_some_and(|tags| tags.has(tag))
    }

    /// Component value, or `None` if the entity lacks the component.
    pub fn get<T: ComponentData>(&self, name: &str) -> Option<&'a T> {
        if !self.has_component(name) {
            return None;
        }
        self.components.get::<T>(self.record.entity.index(), name)
    }
}
