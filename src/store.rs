//! Per-object record storage.
//!
//! Render and compute objects are identified by [`ObjectId`] arena handles
//! minted by the embedding engine. [`KeyedStore`] attaches cache records
//! to those handles through a generation-checked secondary table: a stale
//! handle (a freed slot that was reused) can never alias the record of the
//! object now occupying that slot.

use slotmap::{Key, SecondaryMap, new_key_type};

new_key_type! {
    /// Stable handle of a render object or compute node.
    pub struct ObjectId;
}

/// Auxiliary-data table keyed by arena handles.
///
/// Thin wrapper over [`SecondaryMap`] whose main entry point is
/// [`get_or_create`](Self::get_or_create): records are materialized lazily
/// on first request and live until explicitly removed.
#[derive(Debug)]
pub struct KeyedStore<K: Key, V> {
    records: SecondaryMap<K, V>,
}

impl<K: Key, V> Default for KeyedStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, V> KeyedStore<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: SecondaryMap::new(),
        }
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: K) -> bool {
        self.records.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: K) -> Option<&V> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.records.get_mut(key)
    }

    /// Removes and returns the record for `key`, if any.
    ///
    /// Dropping a record has no side effect on whatever it referenced;
    /// callers release referenced resources first.
    pub fn remove(&mut self, key: K) -> Option<V> {
        self.records.remove(key)
    }

    /// Drops all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl<K: Key, V: Default> KeyedStore<K, V> {
    /// Returns the record for `key`, creating a default one on first use.
    pub fn get_or_create(&mut self, key: K) -> &mut V {
        if !self.records.contains_key(key) {
            self.records.insert(key, V::default());
        }
        &mut self.records[key]
    }
}
