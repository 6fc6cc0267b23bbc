use crate::ecs::{Entity, EntityManager};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Named callable attached to an entity.
pub type EntityFunc = dyn Fn(&EntityManager, Entity, Value) -> Value + Send + Sync;

/// Named callable attached to the world.
pub type WorldFunc = dyn Fn(Value) -> Value + Send + Sync;

/// Name -> shared function table.
pub struct FuncSet<F: ?Sized> {
    funcs: HashMap<String, Arc<F>>,
}

impl<F: ?Sized> FuncSet<F> {
    pub fn new() -> Self {
        Self {
            funcs: HashMap::new(),
        }
    }

    /// Insert or replace.
    pub fn add(&mut self, name: impl Into<String>, f: Arc<F>) {
        self.funcs.insert(name.into(), f);
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.funcs.remove(name).is_some()
    }

    pub fn has(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Shared handle, so callers can invoke without holding a borrow of
    /// the owner.
    pub fn get(&self, name: &str) -> Option<Arc<F>> {
        self.funcs.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

impl<F: ?Sized> Default for FuncSet<F> {
    fn default() -> Self {
        Self::new()
    }
}
