//! Recycling pool of small dense integer IDs, backing entity IDs.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("id pool exhausted at capacity {capacity}")]
pub struct IdExhausted {
    pub capacity: usize,
}

/// Issues dense `u32` IDs, reusing the most recently released ID before
/// advancing past the highest ID ever issued.
#[derive(Debug, Clone)]
pub struct IdPool {
    next: u32,
    free: Vec<u32>,
    capacity: Option<usize>,
    issued: usize,
}

impl IdPool {
    /// Pool limited only by the `u32` range.
    pub fn unbounded() -> Self {
        Self {
            next: 0,
            free: Vec::new(),
            capacity: None,
            issued: 0,
        }
    }

    /// Pool that refuses to have more than `capacity` IDs outstanding.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::unbounded()
        }
    }

    pub fn acquire(&mut self) -> Result<u32, IdExhausted> {
        if let Some(capacity) = self.capacity {
            if self.issued >= capacity {
                return Err(IdExhausted { capacity });
            }
        }
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                if self.next == u32::MAX {
                    return Err(IdExhausted {
                        capacity: u32::MAX as usize,
                    });
                }
                let id = self.next;
                self.next += 1;
                id
            }
        };
        self.issued += 1;
        Ok(id)
    }

    /// Return an ID to the pool. The caller guarantees it is outstanding.
    pub fn release(&mut self, id: u32) {
        debug_assert!(id < self.next, "releasing id {id} that was never issued");
        debug_assert!(!self.free.contains(&id), "double release of id {id}");
        self.free.push(id);
        self.issued -= 1;
    }

    /// Raise the capacity by `n`. No-op for unbounded pools.
    pub fn expand(&mut self, n: usize) {
        if let Some(capacity) = self.capacity.as_mut() {
            *capacity += n;
        }
    }

    #[inline]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of IDs currently outstanding.
    #[inline]
    pub fn issued(&self) -> usize {
        self.issued
    }

    /// One past the highest ID ever issued.
    #[inline]
    pub fn high_water(&self) -> u32 {
        self.next
    }
}
