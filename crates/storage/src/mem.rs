//! In-memory versioned store with published read snapshots.
//!
//! The writer owns a [`MemStore`] and mutates its working state. Each
//! [`MemStore::commit`] publishes an immutable snapshot under a new version.
//! Readers hold a [`SnapshotReader`] and open [`SnapshotStore`]s; they only
//! contend with the writer for the moment it takes to swap in a new snapshot.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::cache::CacheStore;
use crate::kv::{scan_tree, CacheMultiStore, ChangeSet, KvPairs, KvStore, MultiStore, PartitionStore};
use crate::{Result, StorageError};

/// Default number of committed versions kept for readers
pub const DEFAULT_KEEP_RECENT: usize = 100;

type Tree = BTreeMap<Vec<u8>, Vec<u8>>;
type Partitions = BTreeMap<String, Tree>;
type History = Arc<RwLock<BTreeMap<u64, Arc<Partitions>>>>;

/// Writer side of the in-memory store
pub struct MemStore {
    working: Partitions,
    version: u64,
    keep_recent: usize,
    history: History,
}

impl MemStore {
    /// Create a store with the given fixed partitions
    pub fn new<I, S>(partitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            working: partitions
                .into_iter()
                .map(|p| (p.into(), Tree::new()))
                .collect(),
            version: 0,
            keep_recent: DEFAULT_KEEP_RECENT,
            history: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Set how many committed versions stay readable (at least one)
    pub fn with_keep_recent(mut self, keep_recent: usize) -> Self {
        self.keep_recent = keep_recent.max(1);
        self
    }

    /// Last committed version, 0 before the first commit
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Publish the working state as a new version
    pub fn commit(&mut self) -> u64 {
        self.version += 1;
        let snapshot = Arc::new(self.working.clone());
        let mut history = self.history.write();
        history.insert(self.version, snapshot);
        while history.len() > self.keep_recent {
            if let Some((&oldest, _)) = history.iter().next() {
                history.remove(&oldest);
            }
        }
        debug!(version = self.version, retained = history.len(), "committed store version");
        self.version
    }

    /// A handle for concurrent readers
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            history: Arc::clone(&self.history),
        }
    }

    fn tree(&self, partition: &str) -> Result<&Tree> {
        self.working
            .get(partition)
            .ok_or_else(|| StorageError::PartitionNotFound(partition.to_string()))
    }
}

impl MultiStore for MemStore {
    fn has_partition(&self, partition: &str) -> bool {
        self.working.contains_key(partition)
    }

    fn get(&self, partition: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        trace!(partition = %partition, "mem store read");
        Ok(self.tree(partition)?.get(key).cloned())
    }

    fn prefix_scan(&self, partition: &str, prefix: &[u8]) -> Result<KvPairs> {
        Ok(scan_tree(self.tree(partition)?, prefix))
    }

    fn apply(&mut self, changes: ChangeSet) -> Result<()> {
        if let Some(missing) = changes.partitions().find(|p| !self.working.contains_key(*p)) {
            return Err(StorageError::PartitionNotFound(missing.to_string()));
        }
        for (partition, entries) in changes.into_partitions() {
            let Some(tree) = self.working.get_mut(&partition) else {
                continue;
            };
            for (key, value) in entries {
                match value {
                    Some(v) => {
                        tree.insert(key, v);
                    }
                    None => {
                        tree.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    fn kv_store(&mut self, partition: &str) -> Result<Box<dyn KvStore + '_>> {
        Ok(Box::new(PartitionStore::new(self, partition)?))
    }

    fn cache_multi_store(&mut self) -> Box<dyn CacheMultiStore + '_> {
        Box::new(CacheStore::new(self))
    }
}

/// Cloneable, thread-safe access to committed versions
#[derive(Clone)]
pub struct SnapshotReader {
    history: History,
}

impl SnapshotReader {
    /// Most recent committed version, if any
    pub fn latest_version(&self) -> Option<u64> {
        self.history.read().keys().next_back().copied()
    }

    /// Store over the most recent committed version
    pub fn latest(&self) -> Result<SnapshotStore> {
        let history = self.history.read();
        let (&version, data) = history
            .iter()
            .next_back()
            .ok_or(StorageError::VersionNotFound(0))?;
        Ok(SnapshotStore {
            version,
            data: Arc::clone(data),
        })
    }

    /// Store over a specific committed version
    pub fn at(&self, version: u64) -> Result<SnapshotStore> {
        let history = self.history.read();
        let data = history
            .get(&version)
            .ok_or(StorageError::VersionNotFound(version))?;
        Ok(SnapshotStore {
            version,
            data: Arc::clone(data),
        })
    }
}

/// Read-only store over one committed version
#[derive(Clone)]
pub struct SnapshotStore {
    version: u64,
    data: Arc<Partitions>,
}

impl SnapshotStore {
    /// The version this snapshot was committed as
    pub fn version(&self) -> u64 {
        self.version
    }

    fn tree(&self, partition: &str) -> Result<&Tree> {
        self.data
            .get(partition)
            .ok_or_else(|| StorageError::PartitionNotFound(partition.to_string()))
    }
}

impl MultiStore for SnapshotStore {
    fn has_partition(&self, partition: &str) -> bool {
        self.data.contains_key(partition)
    }

    fn get(&self, partition: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.tree(partition)?.get(key).cloned())
    }

    fn prefix_scan(&self, partition: &str, prefix: &[u8]) -> Result<KvPairs> {
        Ok(scan_tree(self.tree(partition)?, prefix))
    }

    fn apply(&mut self, _changes: ChangeSet) -> Result<()> {
        Err(StorageError::ReadOnly)
    }

    fn kv_store(&mut self, partition: &str) -> Result<Box<dyn KvStore + '_>> {
        Ok(Box::new(PartitionStore::new(self, partition)?))
    }

    fn cache_multi_store(&mut self) -> Box<dyn CacheMultiStore + '_> {
        Box::new(CacheStore::new(self))
    }
}

/// Source of read-only stores for query paths
pub trait SnapshotSource: Send + Sync {
    /// A read view over the latest committed state
    fn latest_store(&self) -> Result<Box<dyn MultiStore + '_>>;
}

impl SnapshotSource for SnapshotReader {
    fn latest_store(&self) -> Result<Box<dyn MultiStore + '_>> {
        Ok(Box::new(self.latest()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_publishes_snapshot() {
        let mut store = MemStore::new(["evm"]);
        let reader = store.reader();
        assert!(reader.latest().is_err());

        store.kv_store("evm").unwrap().set(b"k", vec![1]).unwrap();
        assert_eq!(store.commit(), 1);
        store.kv_store("evm").unwrap().set(b"k", vec![2]).unwrap();

        let snap = reader.latest().unwrap();
        assert_eq!(snap.version(), 1);
        assert_eq!(snap.get("evm", b"k").unwrap(), Some(vec![1]));
        assert_eq!(store.get("evm", b"k").unwrap(), Some(vec![2]));
    }

    #[test]
    fn test_snapshot_rejects_writes() {
        let mut store = MemStore::new(["evm"]);
        store.commit();
        let mut snap = store.reader().latest().unwrap();
        let err = snap.kv_store("evm").unwrap().set(b"k", vec![1]).unwrap_err();
        assert!(matches!(err, StorageError::ReadOnly));
    }

    #[test]
    fn test_keep_recent_prunes_old_versions() {
        let mut store = MemStore::new(["evm"]).with_keep_recent(2);
        for _ in 0..4 {
            store.commit();
        }
        let reader = store.reader();
        assert!(matches!(reader.at(1), Err(StorageError::VersionNotFound(1))));
        assert!(reader.at(3).is_ok());
        assert_eq!(reader.latest_version(), Some(4));
    }

    #[test]
    fn test_reader_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SnapshotReader>();
        assert_send_sync::<SnapshotStore>();
    }

    #[test]
    fn test_unknown_partition() {
        let mut store = MemStore::new(["evm"]);
        let mut changes = ChangeSet::new();
        changes.set("missing", b"k", vec![]);
        assert!(matches!(
            store.apply(changes),
            Err(StorageError::PartitionNotFound(_))
        ));
    }
}
