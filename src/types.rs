use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, RwLock},
};

use crate::error::TinyError;

// Type alias, not a new type, cannot define methods on it
pub type Pod<T> = Arc<RwLock<T>>;

pub type ResultPod<T> = Result<Pod<T>, TinyError>;
pub type TinyResult = Result<(), TinyError>;

/// A hash map that can be shared between threads. Reads run concurrently,
/// mutations take a short exclusive section on the whole map.
///
/// Insertions via `get_or_insert` are idempotent: when two threads race on
/// the same key, the loser observes the winner's value.
pub struct ConcurrentHashMap<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> ConcurrentHashMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read().unwrap().get(key).cloned()
    }

    pub fn get_or_insert<F>(&self, key: &K, f: F) -> Result<V, TinyError>
    where
        F: FnOnce(&K) -> Result<V, TinyError>,
    {
        let mut map = self.inner.write().unwrap();
        if let Some(v) = map.get(key) {
            return Ok(v.clone());
        }

        let v = f(key)?;
        map.insert(key.clone(), v.clone());
        Ok(v)
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.write().unwrap().insert(key, value);
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.write().unwrap().remove(key)
    }

    pub fn size(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    /// Snapshot of all entries at the time of the call.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.inner
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn clear(&self) {
        self.inner.write().unwrap().clear();
    }
}
