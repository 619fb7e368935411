//! Write-through layer that records how to undo its writes.

use tracing::trace;

use crate::cache::CacheStore;
use crate::kv::{CacheMultiStore, ChangeSet, KvPairs, KvStore, MultiStore, PartitionStore};
use crate::Result;

/// Forwards every write to `parent` at once and keeps the value each key held
/// before its first write. Applying [`RecordingStore::into_undo`] to the
/// parent restores it.
pub struct RecordingStore<'p> {
    parent: &'p mut dyn MultiStore,
    undo: ChangeSet,
}

impl<'p> RecordingStore<'p> {
    /// Record writes made to `parent`
    pub fn new(parent: &'p mut dyn MultiStore) -> Self {
        Self {
            parent,
            undo: ChangeSet::new(),
        }
    }

    /// The writes restoring every key this layer touched
    pub fn into_undo(self) -> ChangeSet {
        self.undo
    }
}

impl MultiStore for RecordingStore<'_> {
    fn has_partition(&self, partition: &str) -> bool {
        self.parent.has_partition(partition)
    }

    fn get(&self, partition: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.parent.get(partition, key)
    }

    fn prefix_scan(&self, partition: &str, prefix: &[u8]) -> Result<KvPairs> {
        self.parent.prefix_scan(partition, prefix)
    }

    fn apply(&mut self, changes: ChangeSet) -> Result<()> {
        let mut prior = ChangeSet::new();
        for (partition, key, _) in changes.iter() {
            if self.undo.get(partition, key).is_some() {
                continue;
            }
            match self.parent.get(partition, key)? {
                Some(value) => prior.set(partition, key, value),
                None => prior.delete(partition, key),
            }
        }
        self.parent.apply(changes)?;
        trace!(entries = prior.len(), "recorded prior values");
        self.undo.merge(prior);
        Ok(())
    }

    fn kv_store(&mut self, partition: &str) -> Result<Box<dyn KvStore + '_>> {
        Ok(Box::new(PartitionStore::new(self, partition)?))
    }

    fn cache_multi_store(&mut self) -> Box<dyn CacheMultiStore + '_> {
        Box::new(CacheStore::new(self))
    }
}
