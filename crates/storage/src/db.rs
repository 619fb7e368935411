//! RocksDB backed multi-store.
//!
//! Each partition is a column family. Writes arrive as [`ChangeSet`]s and land
//! in a single RocksDB write batch, so a flushed cache layer is atomic on disk.

use parking_lot::RwLock;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, ReadOptions, SnapshotWithThreadMode, WriteBatchWithTransaction,
    WriteOptions,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::cache::CacheStore;
use crate::kv::{CacheMultiStore, ChangeSet, KvPairs, KvStore, MultiStore, PartitionStore};
use crate::mem::SnapshotSource;
use crate::{partitions, Result, StorageError};

type Db = DBWithThreadMode<MultiThreaded>;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database directory
    pub path: String,
    /// Partitions, one column family each
    pub partitions: Vec<String>,
    /// Enable compression (LZ4)
    pub enable_compression: bool,
    /// Maximum number of open files
    pub max_open_files: i32,
    /// Write buffer size in bytes
    pub write_buffer_size: usize,
    /// Enable WAL (Write-Ahead Log)
    pub enable_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: String::from("./data/dualvm"),
            partitions: partitions::ALL.iter().map(|p| p.to_string()).collect(),
            enable_compression: true,
            max_open_files: 512,
            write_buffer_size: 64 * 1024 * 1024, // 64 MB
            enable_wal: true,
        }
    }
}

/// RocksDB wrapper with one column family per partition
pub struct Database {
    inner: Db,
    config: DatabaseConfig,
    write_lock: RwLock<()>,
}

impl Database {
    /// Open or create a database
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        info!(path = %config.path, "opening database");

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);
        if config.enable_compression {
            opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        }

        let descriptors: Vec<ColumnFamilyDescriptor> = config
            .partitions
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                if config.enable_compression {
                    cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
                }
                ColumnFamilyDescriptor::new(name, cf_opts)
            })
            .collect();

        let db = Db::open_cf_descriptors(&opts, Path::new(&config.path), descriptors)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        info!(partitions = config.partitions.len(), "database opened");

        Ok(Self {
            inner: db,
            config,
            write_lock: RwLock::new(()),
        })
    }

    /// Open with default configuration at `path`
    pub fn open_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(DatabaseConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        })
    }

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.inner
            .cf_handle(name)
            .ok_or_else(|| StorageError::PartitionNotFound(name.to_string()))
    }

    /// Consistent read-only view of the current contents
    pub fn snapshot(&self) -> DbSnapshot<'_> {
        DbSnapshot {
            snapshot: self.inner.snapshot(),
            db: self,
        }
    }

    /// Flush memtables of every partition to disk
    pub fn flush_all(&self) -> Result<()> {
        for name in &self.config.partitions {
            let cf = self.cf_handle(name)?;
            self.inner
                .flush_cf(&cf)
                .map_err(|e| StorageError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Get the path to the database
    pub fn path(&self) -> &str {
        &self.config.path
    }

    fn scan(&self, partition: &str, prefix: &[u8], opts: ReadOptions) -> Result<KvPairs> {
        let cf = self.cf_handle(partition)?;
        let iter = self
            .inner
            .iterator_cf_opt(&cf, opts, IteratorMode::From(prefix, Direction::Forward));
        let mut pairs = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StorageError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            pairs.push((key.into_vec(), value.into_vec()));
        }
        Ok(pairs)
    }
}

impl MultiStore for Database {
    fn has_partition(&self, partition: &str) -> bool {
        self.inner.cf_handle(partition).is_some()
    }

    fn get(&self, partition: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        trace!(partition = %partition, "db read");
        let cf = self.cf_handle(partition)?;
        self.inner
            .get_cf(&cf, key)
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn prefix_scan(&self, partition: &str, prefix: &[u8]) -> Result<KvPairs> {
        self.scan(partition, prefix, ReadOptions::default())
    }

    fn apply(&mut self, changes: ChangeSet) -> Result<()> {
        let mut batch = WriteBatchWithTransaction::<false>::default();
        for (partition, key, value) in changes.iter() {
            let cf = self.cf_handle(partition)?;
            match value {
                Some(v) => batch.put_cf(&cf, key, v),
                None => batch.delete_cf(&cf, key),
            }
        }

        let _guard = self.write_lock.write();
        let mut write_opts = WriteOptions::default();
        if !self.config.enable_wal {
            write_opts.disable_wal(true);
        }
        debug!(entries = batch.len(), "writing batch");
        self.inner
            .write_opt(batch, &write_opts)
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn kv_store(&mut self, partition: &str) -> Result<Box<dyn KvStore + '_>> {
        Ok(Box::new(PartitionStore::new(self, partition)?))
    }

    fn cache_multi_store(&mut self) -> Box<dyn CacheMultiStore + '_> {
        Box::new(CacheStore::new(self))
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        debug!(path = %self.config.path, "closing database");
    }
}

/// Read-only view pinned to a RocksDB snapshot
pub struct DbSnapshot<'a> {
    snapshot: SnapshotWithThreadMode<'a, Db>,
    db: &'a Database,
}

impl DbSnapshot<'_> {
    fn read_opts(&self) -> ReadOptions {
        let mut opts = ReadOptions::default();
        opts.set_snapshot(&self.snapshot);
        opts
    }
}

impl MultiStore for DbSnapshot<'_> {
    fn has_partition(&self, partition: &str) -> bool {
        self.db.has_partition(partition)
    }

    fn get(&self, partition: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.db.cf_handle(partition)?;
        self.db
            .inner
            .get_cf_opt(&cf, key, &self.read_opts())
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn prefix_scan(&self, partition: &str, prefix: &[u8]) -> Result<KvPairs> {
        self.db.scan(partition, prefix, self.read_opts())
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

impl SnapshotSource for Database {
    fn latest_store(&self) -> Result<Box<dyn MultiStore + '_>> {
        Ok(Box::new(self.snapshot()))
    }
}
