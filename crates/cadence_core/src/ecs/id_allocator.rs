use crate::ecs::Entity;
use crate::id::IdPool;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("entity capacity {capacity} exceeded")]
    CapacityExceeded { capacity: usize },
}

/// Hands out entity IDs within a fixed capacity.
///
/// Freed IDs are reused most-recent-first. Each release bumps the ID's
/// generation so handles from before the release no longer compare live.
#[derive(Debug, Clone)]
pub struct EntityIdAllocator {
    pool: IdPool,
    generations: Vec<u32>,
    live: Vec<bool>,
}

impl EntityIdAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: IdPool::with_capacity(capacity),
            generations: vec![0; capacity],
            live: vec![false; capacity],
        }
    }

    pub fn allocate(&mut self) -> Result<Entity, AllocError> {
        let id = self
            .pool
            .acquire()
            .map_err(|err| AllocError::CapacityExceeded {
                capacity: err.capacity,
            })?;
        let ix = id as usize;
        self.live[ix] = true;
        Ok(Entity::new(id, self.generations[ix]))
    }

    /// Release the entity's ID. Returns false (and does nothing) when the
    /// handle is stale or already released.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_live(entity) {
            return false;
        }
        let ix = entity.index();
        self.live[ix] = false;
        self.generations[ix] = self.generations[ix].wrapping_add(1);
        self.pool.release(entity.id());
        true
    }

    pub fn is_live(&self, entity: Entity) -> bool {
        let ix = entity.index();
        ix < self.live.len() && self.live[ix] && self.generations[ix] == entity.generation()
    }

    pub fn expand(&mut self, n: usize) {
        self.pool.expand(n);
        let capacity = self.capacity();
        self.generations.resize(capacity, 0);
        self.live.resize(capacity, false);
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity().unwrap_or(self.live.len())
    }

    /// Number of live IDs.
    pub fn len(&self) -> usize {
        self.pool.issued()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.issued() == 0
    }
}
