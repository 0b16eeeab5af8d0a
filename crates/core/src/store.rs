//! Cache store: insertion-ordered entity storage keyed by id.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::entity::Entity;

/// Mapping from key to entity, one per entity kind, owned by its parent.
///
/// Ids are unique; iteration follows insertion order. With a `max_size`
/// the oldest entry is evicted to make room, and `Some(0)` disables
/// caching entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStore<T: Entity> {
    entries: IndexMap<T::Key, T>,
    max_size: Option<usize>,
}

impl<T: Entity> Default for CacheStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> CacheStore<T> {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            max_size: None,
        }
    }

    /// Create a store holding at most `max_size` entries (`None` = unbounded).
    pub fn with_max_size(max_size: Option<usize>) -> Self {
        Self {
            entries: IndexMap::new(),
            max_size,
        }
    }

    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Whether `insert` stores anything at all.
    pub fn accepts_inserts(&self) -> bool {
        self.max_size != Some(0)
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &T::Key) -> Option<&mut T> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace an entity, returning the one it displaced.
    ///
    /// Replacing keeps the original position. Returns `None` without storing
    /// anything when the store is disabled.
    pub fn insert(&mut self, entity: T) -> Option<T> {
        let key = entity.key();
        if let Some(existing) = self.entries.get_mut(&key) {
            return Some(std::mem::replace(existing, entity));
        }
        match self.max_size {
            Some(0) => return None,
            Some(max) => {
                while self.entries.len() >= max {
                    self.entries.shift_remove_index(0);
                }
            }
            None => {}
        }
        self.entries.insert(key, entity);
        None
    }

    pub fn remove(&mut self, key: &T::Key) -> Option<T> {
        self.entries.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &T::Key> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Keep only entries matching `keep`; returns how many were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entity| keep(entity));
        before - self.entries.len()
    }

    /// Remove and return every entry, in insertion order.
    pub fn drain(&mut self) -> Vec<T> {
        self.entries.drain(..).map(|(_, entity)| entity).collect()
    }
}

impl<T: Entity + Serialize> Serialize for CacheStore<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PayloadError;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Item {
        id: u32,
        label: &'static str,
    }

    impl Entity for Item {
        type Key = u32;
        const NAME: &'static str = "item";

        fn key(&self) -> u32 {
            self.id
        }

        fn patch(&mut self, _raw: &serde_json::Value) -> Result<(), PayloadError> {
            Ok(())
        }
    }

    fn item(id: u32, label: &'static str) -> Item {
        Item { id, label }
    }

    #[test]
    fn insert_get_remove() {
        let mut store = CacheStore::new();
        assert!(store.insert(item(1, "a")).is_none());
        assert_eq!(store.get(&1).unwrap().label, "a");
        assert_eq!(store.remove(&1).unwrap().label, "a");
        assert!(store.is_empty());
    }

    #[test]
    fn replace_keeps_position() {
        let mut store = CacheStore::new();
        store.insert(item(1, "a"));
        store.insert(item(2, "b"));
        let old = store.insert(item(1, "c")).unwrap();
        assert_eq!(old.label, "a");
        let keys: Vec<_> = store.keys().copied().collect();
        assert_eq!(keys, vec![1, 2]);
    }

    #[test]
    fn bounded_store_evicts_oldest() {
        let mut store = CacheStore::with_max_size(Some(2));
        store.insert(item(1, "a"));
        store.insert(item(2, "b"));
        store.insert(item(3, "c"));
        let keys: Vec<_> = store.keys().copied().collect();
        assert_eq!(keys, vec![2, 3]);
    }

    #[test]
    fn zero_sized_store_caches_nothing() {
        let mut store = CacheStore::with_max_size(Some(0));
        store.insert(item(1, "a"));
        assert!(store.is_empty());
    }

    #[test]
    fn retain_reports_removed() {
        let mut store = CacheStore::new();
        for id in 0..5 {
            store.insert(item(id, "x"));
        }
        assert_eq!(store.retain(|i| i.id % 2 == 0), 2);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn serializes_as_list() {
        let mut store = CacheStore::new();
        store.insert(item(7, "seven"));
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json, serde_json::json!([{"id": 7, "label": "seven"}]));
    }
}
