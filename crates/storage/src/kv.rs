//! Store traits and the change set they exchange.
//!
//! A [`MultiStore`] is a set of named partitions, each an ordered byte-keyed
//! map. Every write reaches a store as a [`ChangeSet`] through
//! [`MultiStore::apply`], so wrappers that police writes only have to look in
//! one place.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::{Result, StorageError};

/// Key/value pairs returned by prefix scans, ordered by key
pub type KvPairs = Vec<(Vec<u8>, Vec<u8>)>;

/// A view over a single partition
pub trait KvStore {
    /// Read a value
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Whether a key is present
    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Write a value
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()>;

    /// Remove a key
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// All entries whose key starts with `prefix`
    fn prefix_scan(&self, prefix: &[u8]) -> Result<KvPairs>;
}

/// A store made of named partitions
pub trait MultiStore {
    /// Whether the partition exists in this store
    fn has_partition(&self, partition: &str) -> bool;

    /// Read a value from a partition
    fn get(&self, partition: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// All entries of a partition whose key starts with `prefix`
    fn prefix_scan(&self, partition: &str, prefix: &[u8]) -> Result<KvPairs>;

    /// Apply a batch of writes atomically
    fn apply(&mut self, changes: ChangeSet) -> Result<()>;

    /// A single-partition view
    fn kv_store(&mut self, partition: &str) -> Result<Box<dyn KvStore + '_>>;

    /// A copy-on-write layer over this store
    fn cache_multi_store(&mut self) -> Box<dyn CacheMultiStore + '_>;
}

/// A staging layer whose writes reach the parent only on [`CacheMultiStore::write`].
///
/// Dropping the layer discards its writes.
pub trait CacheMultiStore: MultiStore {
    /// Flush staged writes into the parent
    fn write(self: Box<Self>) -> Result<()>;
}

impl<S: MultiStore + ?Sized> MultiStore for &mut S {
    fn has_partition(&self, partition: &str) -> bool {
        (**self).has_partition(partition)
    }

    fn get(&self, partition: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(partition, key)
    }

    fn prefix_scan(&self, partition: &str, prefix: &[u8]) -> Result<KvPairs> {
        (**self).prefix_scan(partition, prefix)
    }

    fn apply(&mut self, changes: ChangeSet) -> Result<()> {
        (**self).apply(changes)
    }

    fn kv_store(&mut self, partition: &str) -> Result<Box<dyn KvStore + '_>> {
        (**self).kv_store(partition)
    }

    fn cache_multi_store(&mut self) -> Box<dyn CacheMultiStore + '_> {
        (**self).cache_multi_store()
    }
}

impl<S: MultiStore + ?Sized> MultiStore for Box<S> {
    fn has_partition(&self, partition: &str) -> bool {
        (**self).has_partition(partition)
    }

    fn get(&self, partition: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(partition, key)
    }

    fn prefix_scan(&self, partition: &str, prefix: &[u8]) -> Result<KvPairs> {
        (**self).prefix_scan(partition, prefix)
    }

    fn apply(&mut self, changes: ChangeSet) -> Result<()> {
        (**self).apply(changes)
    }

    fn kv_store(&mut self, partition: &str) -> Result<Box<dyn KvStore + '_>> {
        (**self).kv_store(partition)
    }

    fn cache_multi_store(&mut self) -> Box<dyn CacheMultiStore + '_> {
        (**self).cache_multi_store()
    }
}

/// Pending writes grouped by partition. `None` marks a deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    partitions: BTreeMap<String, BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
}

impl ChangeSet {
    /// Create an empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a write
    pub fn set(&mut self, partition: &str, key: &[u8], value: Vec<u8>) {
        self.entry(partition).insert(key.to_vec(), Some(value));
    }

    /// Stage a deletion
    pub fn delete(&mut self, partition: &str, key: &[u8]) {
        self.entry(partition).insert(key.to_vec(), None);
    }

    /// Staged state of a key: `None` if untouched, `Some(None)` if deleted
    pub fn get(&self, partition: &str, key: &[u8]) -> Option<Option<&[u8]>> {
        self.partitions
            .get(partition)
            .and_then(|p| p.get(key))
            .map(|v| v.as_deref())
    }

    /// Fold `other` into this set; later writes win
    pub fn merge(&mut self, other: ChangeSet) {
        for (partition, entries) in other.partitions {
            self.partitions.entry(partition).or_default().extend(entries);
        }
    }

    /// Staged entries of one partition
    pub fn partition(&self, partition: &str) -> Option<&BTreeMap<Vec<u8>, Option<Vec<u8>>>> {
        self.partitions.get(partition)
    }

    /// Names of the partitions touched
    pub fn partitions(&self) -> impl Iterator<Item = &str> {
        self.partitions.keys().map(String::as_str)
    }

    /// Every staged entry as `(partition, key, value)`
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8], Option<&[u8]>)> {
        self.partitions.iter().flat_map(|(partition, entries)| {
            entries
                .iter()
                .map(move |(k, v)| (partition.as_str(), k.as_slice(), v.as_deref()))
        })
    }

    /// Consume into `(partition, entries)` pairs
    pub fn into_partitions(
        self,
    ) -> impl Iterator<Item = (String, BTreeMap<Vec<u8>, Option<Vec<u8>>>)> {
        self.partitions.into_iter()
    }

    /// Number of staged entries
    pub fn len(&self) -> usize {
        self.partitions.values().map(BTreeMap::len).sum()
    }

    /// Whether nothing is staged
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&mut self, partition: &str) -> &mut BTreeMap<Vec<u8>, Option<Vec<u8>>> {
        self.partitions.entry(partition.to_string()).or_default()
    }
}

/// [`KvStore`] adapter that routes through a parent's [`MultiStore::apply`]
pub struct PartitionStore<'a> {
    store: &'a mut dyn MultiStore,
    partition: String,
}

impl<'a> PartitionStore<'a> {
    /// View `partition` of `store`, failing if it does not exist
    pub fn new(store: &'a mut dyn MultiStore, partition: &str) -> Result<Self> {
        if !store.has_partition(partition) {
            return Err(StorageError::PartitionNotFound(partition.to_string()));
        }
        Ok(Self {
            store,
            partition: partition.to_string(),
        })
    }
}

impl KvStore for PartitionStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.store.get(&self.partition, key)
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        let mut changes = ChangeSet::new();
        changes.set(&self.partition, key, value);
        self.store.apply(changes)
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        let mut changes = ChangeSet::new();
        changes.delete(&self.partition, key);
        self.store.apply(changes)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<KvPairs> {
        self.store.prefix_scan(&self.partition, prefix)
    }
}

/// Ordered entries of `tree` under `prefix`
pub(crate) fn scan_tree(tree: &BTreeMap<Vec<u8>, Vec<u8>>, prefix: &[u8]) -> KvPairs {
    tree.range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
