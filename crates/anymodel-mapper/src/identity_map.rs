use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use anymodel_types::Shared;

/// Cache of identity key to live entity, scoped per mapper.
///
/// Holding is weak: the map records the association for lookup only and
/// never keeps an entity alive. Once every strong owner of an entity is
/// gone its entry is observed as dead and pruned on the next lookup.
/// There is no capacity bound or TTL.
///
/// All operations are lookup-or-insert under one lock, so two concurrent
/// misses for the same identity cannot produce two divergent instances.
pub struct IdentityMap<E> {
    inner: Mutex<HashMap<Vec<String>, Weak<std::sync::RwLock<E>>>>,
}

impl<E> IdentityMap<E> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a live entity by its identity key.
    pub fn get(&self, key: &[String]) -> Option<Shared<E>> {
        let mut map = self.inner.lock().expect("lock poisoned");
        match map.get(key).map(Weak::upgrade) {
            Some(Some(entity)) => Some(entity),
            Some(None) => {
                // The entry died; drop it so the map does not grow.
                map.remove(key);
                None
            }
            None => None,
        }
    }

    /// Register an entity as the canonical instance for its key,
    /// replacing whatever was there. Returns the entity. Used by save,
    /// where the entity just written is authoritative.
    pub fn set(&self, key: Vec<String>, entity: Shared<E>) -> Shared<E> {
        let mut map = self.inner.lock().expect("lock poisoned");
        map.insert(key, Arc::downgrade(&entity));
        entity
    }

    /// Return the live entity for the key, inserting the candidate only
    /// when none exists. Used by hydration, where an instance that is
    /// already out there must win over a fresh copy of the same row.
    pub fn get_or_insert(&self, key: Vec<String>, candidate: Shared<E>) -> Shared<E> {
        let mut map = self.inner.lock().expect("lock poisoned");
        if let Some(existing) = map.get(&key).and_then(Weak::upgrade) {
            return existing;
        }
        map.insert(key, Arc::downgrade(&candidate));
        candidate
    }

    /// Drop the entry for a key, if any.
    pub fn remove(&self, key: &[String]) {
        self.inner.lock().expect("lock poisoned").remove(key);
    }

    /// Number of entries whose entity is still alive.
    pub fn live(&self) -> usize {
        self.inner
            .lock()
            .expect("lock poisoned")
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl<E> Default for IdentityMap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for IdentityMap<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityMap")
            .field("live", &self.live())
            .finish()
    }
}
