//! Execution context passed to every keeper call.

use serde::{Deserialize, Serialize};
use tracing::debug;

use dualvm_storage::{CacheMultiStore, KvPairs, KvStore, MultiStore, StorageError};

/// Block-level facts visible to executing code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height
    pub height: u64,
    /// Block time, unix seconds
    pub time: u64,
    /// Native chain identifier
    pub chain_id: String,
}

/// A store plus the block it executes in.
///
/// Reads need only `&Context`; anything that writes takes `&mut Context`.
pub struct Context<'a> {
    store: &'a mut dyn MultiStore,
    header: BlockHeader,
}

impl<'a> Context<'a> {
    /// Create a context over `store`
    pub fn new(store: &'a mut dyn MultiStore, header: BlockHeader) -> Self {
        Self { store, header }
    }

    /// Block header
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Read a value
    pub fn get(&self, partition: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.store.get(partition, key)
    }

    /// Entries of `partition` under `prefix`
    pub fn prefix_scan(&self, partition: &str, prefix: &[u8]) -> Result<KvPairs, StorageError> {
        self.store.prefix_scan(partition, prefix)
    }

    /// Writable view of one partition
    pub fn kv_store(&mut self, partition: &str) -> Result<Box<dyn KvStore + '_>, StorageError> {
        self.store.kv_store(partition)
    }

    /// Underlying store
    pub fn store_mut(&mut self) -> &mut dyn MultiStore {
        &mut *self.store
    }

    /// Open a cache layer; its writes are discarded unless committed
    pub fn branch(&mut self) -> Branch<'_> {
        Branch {
            cache: self.store.cache_multi_store(),
            header: self.header.clone(),
        }
    }

    /// Run `f` in a cache layer, committing only if it succeeds
    pub fn run_cached<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Context<'_>) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut branch = self.branch();
        let out = {
            let mut ctx = branch.ctx();
            f(&mut ctx)?
        };
        branch.commit()?;
        Ok(out)
    }
}

/// A cache layer over a context's store
pub struct Branch<'a> {
    cache: Box<dyn CacheMultiStore + 'a>,
    header: BlockHeader,
}

impl Branch<'_> {
    /// Context executing against the cache layer
    pub fn ctx(&mut self) -> Context<'_> {
        Context {
            store: &mut self.cache,
            header: self.header.clone(),
        }
    }

    /// Flush the layer into its parent
    pub fn commit(self) -> Result<(), StorageError> {
        debug!(height = self.header.height, "committing branch");
        self.cache.write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualvm_storage::MemStore;

    fn header() -> BlockHeader {
        BlockHeader {
            height: 7,
            time: 1_700_000_000,
            chain_id: "dual-test".into(),
        }
    }

    #[test]
    fn test_branch_commit_and_discard() {
        let mut store = MemStore::new(["bank"]);
        let mut ctx = Context::new(&mut store, header());

        {
            let mut branch = ctx.branch();
            branch.ctx().kv_store("bank").unwrap().set(b"a", vec![1]).unwrap();
        }
        assert_eq!(ctx.get("bank", b"a").unwrap(), None);

        let mut branch = ctx.branch();
        branch.ctx().kv_store("bank").unwrap().set(b"a", vec![1]).unwrap();
        assert_eq!(branch.ctx().header().height, 7);
        branch.commit().unwrap();
        assert_eq!(ctx.get("bank", b"a").unwrap(), Some(vec![1]));
    }

    #[test]
    fn test_run_cached_rolls_back_on_error() {
        let mut store = MemStore::new(["bank"]);
        let mut ctx = Context::new(&mut store, header());

        let res: Result<(), StorageError> = ctx.run_cached(|inner| {
            inner.kv_store("bank")?.set(b"x", vec![1])?;
            Err(StorageError::ReadOnly)
        });
        assert!(res.is_err());
        assert_eq!(ctx.get("bank", b"x").unwrap(), None);

        let res: Result<u8, StorageError> = ctx.run_cached(|inner| {
            inner.kv_store("bank")?.set(b"x", vec![2])?;
            Ok(2)
        });
        assert_eq!(res.unwrap(), 2);
        assert_eq!(ctx.get("bank", b"x").unwrap(), Some(vec![2]));
    }
}
