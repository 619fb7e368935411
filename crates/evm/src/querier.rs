//! Read-only pointer queries over the latest committed snapshot.
//!
//! Queries never touch the writer's working state, so they can be served from
//! any number of threads while blocks execute. Until the first snapshot is
//! published every lookup answers as against an empty ledger.

use std::sync::Arc;

use dualvm_core::{BlockHeader, Context, KeeperError, PointerLookup, PointerReader};
use dualvm_storage::{partitions, MemStore, MultiStore, SnapshotSource, StorageError};
use dualvm_types::PointerKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::registry::PointerRegistry;

/// Errors of the query surface
#[derive(Error, Debug)]
pub enum QueryError {
    /// Kind value outside the supported set
    #[error("unsupported pointer kind {0}")]
    Unsupported(i32),

    /// Snapshot could not be read
    #[error(transparent)]
    Store(#[from] StorageError),

    /// Lookup failed
    #[error(transparent)]
    Keeper(#[from] KeeperError),
}

/// Answer to a pointer query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerResponse {
    /// Pointer address, or the zero value of its space
    pub pointer: String,
    /// Artifact version, 0 when absent
    pub version: u16,
    /// Whether the pointer is registered
    pub exists: bool,
}

/// Answer to a pointee query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointeeResponse {
    /// Asset key, or the zero value of its space
    pub pointee: String,
    /// Artifact version, 0 when absent
    pub version: u16,
    /// Whether the pointer is registered
    pub exists: bool,
}

impl From<PointerLookup> for PointerResponse {
    fn from(lookup: PointerLookup) -> Self {
        Self {
            pointer: lookup.address,
            version: lookup.version,
            exists: lookup.exists,
        }
    }
}

impl From<PointerLookup> for PointeeResponse {
    fn from(lookup: PointerLookup) -> Self {
        Self {
            pointee: lookup.address,
            version: lookup.version,
            exists: lookup.exists,
        }
    }
}

/// Pointer lookups against published snapshots
#[derive(Clone)]
pub struct Querier {
    registry: PointerRegistry,
    source: Arc<dyn SnapshotSource>,
    chain_id: String,
}

fn kind_of(kind: i32) -> Result<PointerKind, QueryError> {
    PointerKind::try_from(kind).map_err(|_| QueryError::Unsupported(kind))
}

impl Querier {
    /// Querier reading from `source`
    pub fn new(
        registry: PointerRegistry,
        source: Arc<dyn SnapshotSource>,
        chain_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            source,
            chain_id: chain_id.into(),
        }
    }

    fn with_latest<T>(
        &self,
        f: impl FnOnce(&Context<'_>) -> Result<T, KeeperError>,
    ) -> Result<T, QueryError> {
        let mut store: Box<dyn MultiStore + '_> = match self.source.latest_store() {
            Ok(store) => store,
            Err(StorageError::VersionNotFound(_)) => {
                trace!("no snapshot published yet");
                Box::new(MemStore::new(partitions::ALL.iter().copied()))
            }
            Err(err) => return Err(err.into()),
        };
        let header = BlockHeader {
            chain_id: self.chain_id.clone(),
            ..BlockHeader::default()
        };
        let ctx = Context::new(&mut store, header);
        Ok(f(&ctx)?)
    }

    /// Pointer of `kind` for `pointee`
    pub fn pointer(&self, kind: i32, pointee: &str) -> Result<PointerResponse, QueryError> {
        let kind = kind_of(kind)?;
        trace!(kind = %kind, pointee, "pointer query");
        self.with_latest(|ctx| self.registry.resolve_pointer(ctx, kind, pointee))
            .map(PointerResponse::from)
    }

    /// Asset that `pointer` stands for
    pub fn pointee(&self, kind: i32, pointer: &str) -> Result<PointeeResponse, QueryError> {
        let kind = kind_of(kind)?;
        trace!(kind = %kind, pointer, "pointee query");
        self.with_latest(|ctx| self.registry.resolve_asset(ctx, kind, pointer))
            .map(PointeeResponse::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualvm_storage::MemStore;
    use dualvm_test_utils::{test_header, TEST_PREFIX};
    use dualvm_types::ZERO_EVM_ADDRESS_HEX;

    #[test]
    fn test_queries_read_committed_snapshot() {
        let registry = PointerRegistry::new(TEST_PREFIX);
        let mut store = MemStore::new(dualvm_storage::partitions::ALL.iter().copied());
        let reader = store.reader();
        let pointer = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
        {
            let mut ctx = Context::new(&mut store, test_header());
            registry
                .write_pointer(&mut ctx, PointerKind::Native, "ufoo", pointer, 1)
                .unwrap();
        }
        let querier = Querier::new(registry, Arc::new(reader), "dual-test");

        // nothing committed yet
        let pending = querier.pointer(2, "ufoo").unwrap();
        assert!(!pending.exists);
        assert_eq!(pending.pointer, ZERO_EVM_ADDRESS_HEX);
        assert_eq!(pending.version, 0);

        store.commit();
        let found = querier.pointer(2, "ufoo").unwrap();
        assert!(found.exists);
        assert_eq!(found.version, 1);
        assert_eq!(found.pointer.to_lowercase(), pointer.to_lowercase());

        let back = querier.pointee(2, &found.pointer).unwrap();
        assert_eq!(back.pointee, "ufoo");

        let missing = querier.pointee(0, "not-a-bech32-address").unwrap();
        assert_eq!(missing.pointee, ZERO_EVM_ADDRESS_HEX);
        assert!(!missing.exists);

        assert!(matches!(
            querier.pointer(999, "ufoo"),
            Err(QueryError::Unsupported(999))
        ));
    }

    #[test]
    fn test_queries_before_first_commit_miss() {
        let store = MemStore::new(dualvm_storage::partitions::ALL.iter().copied());
        let querier = Querier::new(
            PointerRegistry::new(TEST_PREFIX),
            Arc::new(store.reader()),
            "dual-test",
        );

        let pointer = querier.pointer(2, "ufoo").unwrap();
        assert_eq!(pointer.pointer, ZERO_EVM_ADDRESS_HEX);
        assert!(!pointer.exists);

        let pointee = querier
            .pointee(3, "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")
            .unwrap();
        assert_eq!(pointee.pointee, "");
        assert_eq!(pointee.version, 0);
        assert!(!pointee.exists);

        assert!(matches!(
            querier.pointee(7, "ufoo"),
            Err(QueryError::Unsupported(7))
        ));
    }
}
