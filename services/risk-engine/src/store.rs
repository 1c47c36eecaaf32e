//! Object store capability
//!
//! Every shared collection in the book (horses, races, events, users and
//! published reports) sits behind [`ObjectStore`]. Two backends implement
//! it and are chosen explicitly when the book is assembled:
//!
//! - [`LocalStore`]: a single lock around an ordered map
//! - [`PartitionedStore`]: a sharded concurrent map, standing in for a
//!   partitioned/distributed map where writers on different keys never
//!   contend
//!
//! Both return `keys`/`values` in key order so callers see identical
//! results whichever backend is wired in.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::Arc;

/// Key-value store keyed by a numeric identifier.
///
/// Values are expected to be cheap to clone (usually `Arc<T>`), and are
/// replaced wholesale: a reader never observes a partially written value.
pub trait ObjectStore<K, V>: Send + Sync {
    /// Fetch a value
    fn get(&self, key: &K) -> Option<V>;

    /// Insert or replace a value
    fn put(&self, key: K, value: V);

    /// Atomically replace an existing value with `f(current)`.
    ///
    /// Returns the new value, or None if the key is absent.
    fn update(&self, key: &K, f: &dyn Fn(&V) -> V) -> Option<V>;

    /// Keys whose entries match the predicate, in key order
    fn keys(&self, predicate: &dyn Fn(&K, &V) -> bool) -> Vec<K>;

    /// Values whose entries match the predicate, in key order
    fn values(&self, predicate: &dyn Fn(&K, &V) -> bool) -> Vec<V>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every value, in key order
    fn all_values(&self) -> Vec<V> {
        self.values(&|_, _| true)
    }
}

/// Shared handle to a store
pub type SharedStore<K, V> = Arc<dyn ObjectStore<K, V>>;

/// Store backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Local,
    Partitioned,
}

impl StoreBackend {
    /// Create an empty store of this kind
    pub fn open<K, V>(self) -> SharedStore<K, V>
    where
        K: Ord + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        match self {
            StoreBackend::Local => Arc::new(LocalStore::new()),
            StoreBackend::Partitioned => Arc::new(PartitionedStore::new()),
        }
    }
}

// ── Local backend ───────────────────────────────────────────────────

/// In-process store: one lock around an ordered map
#[derive(Debug)]
pub struct LocalStore<K, V> {
    entries: RwLock<BTreeMap<K, V>>,
}

impl<K: Ord, V> LocalStore<K, V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K: Ord, V> Default for LocalStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ObjectStore<K, V> for LocalStore<K, V>
where
    K: Ord + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: K, value: V) {
        self.entries.write().insert(key, value);
    }

    fn update(&self, key: &K, f: &dyn Fn(&V) -> V) -> Option<V> {
        let mut entries = self.entries.write();
        let slot = entries.get_mut(key)?;
        let next = f(slot);
        *slot = next.clone();
        Some(next)
    }

    fn keys(&self, predicate: &dyn Fn(&K, &V) -> bool) -> Vec<K> {
        self.entries
            .read()
            .iter()
            .filter(|(k, v)| predicate(k, v))
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn values(&self, predicate: &dyn Fn(&K, &V) -> bool) -> Vec<V> {
        self.entries
            .read()
            .iter()
            .filter(|(k, v)| predicate(k, v))
            .map(|(_, v)| v.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

// ── Partitioned backend ─────────────────────────────────────────────

/// Sharded concurrent store
#[derive(Debug)]
pub struct PartitionedStore<K: Eq + Hash, V> {
    entries: DashMap<K, V>,
}

impl<K: Eq + Hash, V> PartitionedStore<K, V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> Default for PartitionedStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> PartitionedStore<K, V>
where
    K: Ord + Hash + Clone,
    V: Clone,
{
    /// Matching entries sorted by key. Shards iterate in arbitrary order.
    fn matching(&self, predicate: &dyn Fn(&K, &V) -> bool) -> Vec<(K, V)> {
        let mut out: Vec<(K, V)> = self
            .entries
            .iter()
            .filter(|e| predicate(e.key(), e.value()))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl<K, V> ObjectStore<K, V> for PartitionedStore<K, V>
where
    K: Ord + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    fn put(&self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    fn update(&self, key: &K, f: &dyn Fn(&V) -> V) -> Option<V> {
        let mut slot = self.entries.get_mut(key)?;
        let next = f(slot.value());
        *slot.value_mut() = next.clone();
        Some(next)
    }

    fn keys(&self, predicate: &dyn Fn(&K, &V) -> bool) -> Vec<K> {
        self.matching(predicate).into_iter().map(|(k, _)| k).collect()
    }

    fn values(&self, predicate: &dyn Fn(&K, &V) -> bool) -> Vec<V> {
        self.matching(predicate).into_iter().map(|(_, v)| v).collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
