//! Write whitelisting for stores handed to VM-crossing code.
//!
//! A [`WhitelistedStore`] lets reads through untouched and checks every write
//! against a fixed [`Whitelist`]. Cache layers derived from it carry the same
//! `Arc<Whitelist>`; there is no way to derive a layer with a wider policy.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::kv::{CacheMultiStore, ChangeSet, KvPairs, KvStore, MultiStore};
use crate::{Result, StorageError};

/// How a partition may be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePolicy {
    /// Keys starting with any of these prefixes are writable.
    /// An empty prefix admits every key.
    Prefixes(Vec<Vec<u8>>),
    /// No key is writable
    ReadOnly,
}

impl WritePolicy {
    /// Whether `key` is writable under this policy
    pub fn permits(&self, key: &[u8]) -> bool {
        match self {
            WritePolicy::Prefixes(prefixes) => prefixes.iter().any(|p| key.starts_with(p)),
            WritePolicy::ReadOnly => false,
        }
    }
}

static READ_ONLY: WritePolicy = WritePolicy::ReadOnly;

/// Partition name to write policy. Partitions without an entry are read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    partitions: BTreeMap<String, WritePolicy>,
}

impl Whitelist {
    /// An empty whitelist: every partition read-only
    pub fn new() -> Self {
        Self::default()
    }

    /// Permit writes to `partition` under the given prefixes
    pub fn allow<I, P>(mut self, partition: &str, prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        let prefixes = prefixes.into_iter().map(Into::into).collect();
        self.partitions
            .insert(partition.to_string(), WritePolicy::Prefixes(prefixes));
        self
    }

    /// Mark `partition` explicitly read-only
    pub fn read_only(mut self, partition: &str) -> Self {
        self.partitions
            .insert(partition.to_string(), WritePolicy::ReadOnly);
        self
    }

    /// Policy in force for `partition`
    pub fn policy(&self, partition: &str) -> &WritePolicy {
        self.partitions.get(partition).unwrap_or(&READ_ONLY)
    }

    /// Whether `key` in `partition` is writable
    pub fn permits(&self, partition: &str, key: &[u8]) -> bool {
        self.policy(partition).permits(key)
    }

    /// Fail with [`StorageError::WriteNotWhitelisted`] unless the write is permitted
    pub fn check(&self, partition: &str, key: &[u8]) -> Result<()> {
        if self.permits(partition, key) {
            return Ok(());
        }
        warn!(
            partition = %partition,
            key = %hex::encode(key),
            "write outside whitelist rejected"
        );
        Err(StorageError::WriteNotWhitelisted {
            partition: partition.to_string(),
            key: hex::encode(key),
        })
    }

    /// Partitions with an explicit entry
    pub fn partitions(&self) -> impl Iterator<Item = (&str, &WritePolicy)> {
        self.partitions.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A store whose writes are checked against a whitelist
pub struct WhitelistedStore<S> {
    inner: S,
    whitelist: Arc<Whitelist>,
}

impl<S: MultiStore> WhitelistedStore<S> {
    /// Restrict `inner` to `whitelist`
    pub fn new(inner: S, whitelist: Arc<Whitelist>) -> Self {
        Self { inner, whitelist }
    }

    /// The policy this store enforces
    pub fn whitelist(&self) -> &Arc<Whitelist> {
        &self.whitelist
    }
}

impl<S: MultiStore> MultiStore for WhitelistedStore<S> {
    fn has_partition(&self, partition: &str) -> bool {
        self.inner.has_partition(partition)
    }

    fn get(&self, partition: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(partition, key)
    }

    fn prefix_scan(&self, partition: &str, prefix: &[u8]) -> Result<KvPairs> {
        self.inner.prefix_scan(partition, prefix)
    }

    fn apply(&mut self, changes: ChangeSet) -> Result<()> {
        for (partition, key, _) in changes.iter() {
            self.whitelist.check(partition, key)?;
        }
        self.inner.apply(changes)
    }

    fn kv_store(&mut self, partition: &str) -> Result<Box<dyn KvStore + '_>> {
        let whitelist = Arc::clone(&self.whitelist);
        let inner = self.inner.kv_store(partition)?;
        Ok(Box::new(WhitelistedKvStore {
            inner,
            partition: partition.to_string(),
            whitelist,
        }))
    }

    fn cache_multi_store(&mut self) -> Box<dyn CacheMultiStore + '_> {
        Box::new(WhitelistedStore {
            inner: self.inner.cache_multi_store(),
            whitelist: Arc::clone(&self.whitelist),
        })
    }
}

impl<'a> CacheMultiStore for WhitelistedStore<Box<dyn CacheMultiStore + 'a>> {
    fn write(self: Box<Self>) -> Result<()> {
        self.inner.write()
    }
}

/// Single-partition view whose writes are checked against a whitelist
pub struct WhitelistedKvStore<'a> {
    inner: Box<dyn KvStore + 'a>,
    partition: String,
    whitelist: Arc<Whitelist>,
}

impl KvStore for WhitelistedKvStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.whitelist.check(&self.partition, key)?;
        self.inner.set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.whitelist.check(&self.partition, key)?;
        self.inner.delete(key)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<KvPairs> {
        self.inner.prefix_scan(prefix)
    }
}
