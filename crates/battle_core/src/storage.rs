//! Id-keyed arena storage.
//!
//! Units and projectiles live here and refer to each other only by id.
//! A reference that no longer resolves simply means the other side is gone.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Storage for simulation objects keyed by a monotonically increasing id.
///
/// Uses a `HashMap` for O(1) lookup, with deterministic iteration via
/// sorted keys when the simulation walks over its contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage<T> {
    /// Map of id to stored value.
    items: HashMap<u64, T>,
    /// Next id to assign.
    next_id: u64,
}

impl<T> Storage<T> {
    /// Create empty storage. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a value built from its freshly assigned id.
    pub fn insert_with(&mut self, build: impl FnOnce(u64) -> T) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.insert(id, build(id));
        id
    }

    /// Remove a value by id.
    pub fn remove(&mut self, id: u64) -> Option<T> {
        self.items.remove(&id)
    }

    /// Get a value by id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&T> {
        self.items.get(&id)
    }

    /// Get a mutable reference to a value by id.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    /// Check if an id resolves.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.items.contains_key(&id)
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get sorted ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<u64> {
        let mut ids: Vec<_> = self.items.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all values (not in deterministic order).
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    /// Drop every stored value. Ids are not reused afterwards.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T> Default for Storage<T> {
    fn default() -> Self {
        Self::new()
    }
}
