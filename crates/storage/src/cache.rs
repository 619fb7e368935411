//! Copy-on-write cache layer over any [`MultiStore`].

use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::kv::{CacheMultiStore, ChangeSet, KvPairs, KvStore, MultiStore, PartitionStore};
use crate::{Result, StorageError};

/// Staged writes over a borrowed parent.
///
/// Reads see staged writes first, then the parent. Layers nest freely since a
/// `CacheStore` is itself a [`MultiStore`].
pub struct CacheStore<'p> {
    parent: &'p mut dyn MultiStore,
    pending: ChangeSet,
}

impl<'p> CacheStore<'p> {
    /// Open a layer over `parent`
    pub fn new(parent: &'p mut dyn MultiStore) -> Self {
        Self {
            parent,
            pending: ChangeSet::new(),
        }
    }

    /// Writes staged so far
    pub fn pending(&self) -> &ChangeSet {
        &self.pending
    }
}

impl MultiStore for CacheStore<'_> {
    fn has_partition(&self, partition: &str) -> bool {
        self.parent.has_partition(partition)
    }

    fn get(&self, partition: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.pending.get(partition, key) {
            Some(staged) => Ok(staged.map(<[u8]>::to_vec)),
            None => self.parent.get(partition, key),
        }
    }

    fn prefix_scan(&self, partition: &str, prefix: &[u8]) -> Result<KvPairs> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self
            .parent
            .prefix_scan(partition, prefix)?
            .into_iter()
            .collect();
        if let Some(staged) = self.pending.partition(partition) {
            for (key, value) in staged.iter().filter(|(k, _)| k.starts_with(prefix)) {
                match value {
                    Some(v) => {
                        merged.insert(key.clone(), v.clone());
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    fn apply(&mut self, changes: ChangeSet) -> Result<()> {
        if let Some(missing) = changes.partitions().find(|p| !self.parent.has_partition(p)) {
            return Err(StorageError::PartitionNotFound(missing.to_string()));
        }
        trace!(entries = changes.len(), "staging writes in cache layer");
        self.pending.merge(changes);
        Ok(())
    }

    fn kv_store(&mut self, partition: &str) -> Result<Box<dyn KvStore + '_>> {
        Ok(Box::new(PartitionStore::new(self, partition)?))
    }

    fn cache_multi_store(&mut self) -> Box<dyn CacheMultiStore + '_> {
        Box::new(CacheStore::new(self))
    }
}

impl CacheMultiStore for CacheStore<'_> {
    fn write(self: Box<Self>) -> Result<()> {
        let CacheStore { parent, pending } = *self;
        if pending.is_empty() {
            return Ok(());
        }
        debug!(entries = pending.len(), "flushing cache layer");
        parent.apply(pending)
    }
}
