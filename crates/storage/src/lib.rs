//! DualVM Storage Layer
//!
//! This crate provides the partitioned state store shared by both VMs:
//!
//! - **Store traits**: [`KvStore`] per partition, [`MultiStore`] over named partitions
//! - **Cache layers**: copy-on-write [`CacheStore`] staging, committed or discarded as a unit
//! - **Undo recording**: [`RecordingStore`] writing through while keeping the prior values
//! - **Whitelisting**: [`WhitelistedStore`] bounding what VM-crossing code may write
//! - **In-memory store**: [`MemStore`] with versioned snapshots for concurrent readers
//! - **Database**: RocksDB backend with one column family per partition

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod cache;
pub mod db;
pub mod kv;
pub mod mem;
pub mod undo;
pub mod whitelist;

pub use cache::CacheStore;
pub use db::{Database, DatabaseConfig, DbSnapshot};
pub use kv::{CacheMultiStore, ChangeSet, KvPairs, KvStore, MultiStore, PartitionStore};
pub use mem::{MemStore, SnapshotReader, SnapshotSource, SnapshotStore, DEFAULT_KEEP_RECENT};
pub use undo::RecordingStore;
pub use whitelist::{Whitelist, WhitelistedKvStore, WhitelistedStore, WritePolicy};

use thiserror::Error;

/// Partition names used by the bridge and the native modules
pub mod partitions {
    /// EVM accounts, code, storage, address mapping and the pointer registry
    pub const EVM: &str = "evm";
    /// Balances, supply and denomination metadata
    pub const BANK: &str = "bank";
    /// Account records
    pub const ACC: &str = "acc";
    /// Delegations and validators
    pub const STAKING: &str = "staking";
    /// Proposals, votes and deposits
    pub const GOV: &str = "gov";
    /// Withdraw addresses and rewards
    pub const DISTRIBUTION: &str = "distribution";
    /// Outgoing cross-chain transfers
    pub const TRANSFER: &str = "transfer";
    /// Light-client, connection and channel state
    pub const IBC: &str = "ibc";
    /// Native contract instances and their state
    pub const WASM: &str = "wasm";
    /// Exchange rates and price history
    pub const ORACLE: &str = "oracle";

    /// All partitions
    pub const ALL: &[&str] = &[
        EVM,
        BANK,
        ACC,
        STAKING,
        GOV,
        DISTRIBUTION,
        TRANSFER,
        IBC,
        WASM,
        ORACLE,
    ];
}

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Partition not present in the store
    #[error("Partition not found: {0}")]
    PartitionNotFound(String),

    /// Write rejected by the active whitelist
    #[error("write to {partition} key {key} is not whitelisted")]
    WriteNotWhitelisted {
        /// Partition written to
        partition: String,
        /// Hex encoded key
        key: String,
    },

    /// Write attempted on a read-only view
    #[error("store is read-only")]
    ReadOnly,

    /// Committed version no longer (or never) retained
    #[error("version not found: {0}")]
    VersionNotFound(u64),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether this error is a whitelist violation
    pub fn is_access_violation(&self) -> bool {
        matches!(self, StorageError::WriteNotWhitelisted { .. })
    }
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Encode a value for storage
pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Decode a stored value
pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let value = (42u64, String::from("udual"));
        let bytes = encode(&value).unwrap();
        let decoded: (u64, String) = decode(&bytes).unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode::<(u64, String)>(&[1, 2]).unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
        assert!(!err.is_access_violation());
    }
}
