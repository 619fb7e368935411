//! Pointer registry: the two indexes of asset/pointer equivalences.
//!
//! Each kind has its own key space in the `evm` partition. The forward index
//! is keyed by the asset key, the reverse index by the pointer address, and
//! both entries of a pair are written in one change set.
//!
//! Lookups never fail on malformed input. A key that does not parse in its
//! address space simply cannot be registered, so the lookup reports a miss
//! carrying the zero value of the result's address space.

use dualvm_core::{Context, KeeperError, KeeperResult, PointerLookup, PointerReader};
use dualvm_storage::{partitions::EVM, ChangeSet, StorageError};
use dualvm_types::{parse_evm_address, AddressSpace, NativeAddress, PointerKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::keys::{pointer_key, pointer_reverse_key};

/// Deployment of a pointer contract failed; nothing was recorded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("contract deployment failed: {0}")]
pub struct DeployError(pub String);

/// Errors of registry writes
#[derive(Error, Debug)]
pub enum PointerError {
    /// Pointer kind outside the supported set
    #[error("unsupported pointer kind {0}")]
    Unsupported(i32),

    /// Asset key does not parse in the kind's asset space
    #[error("invalid {kind} asset key {key:?}")]
    InvalidAssetKey {
        /// Pointer kind
        kind: PointerKind,
        /// Rejected key
        key: String,
    },

    /// Pointer address does not parse in the kind's pointer space
    #[error("invalid {kind} pointer address {address:?}")]
    InvalidPointerAddress {
        /// Pointer kind
        kind: PointerKind,
        /// Rejected address
        address: String,
    },

    /// The pointer already stands for a different asset
    #[error("{kind} pointer {pointer} already registered for {asset}")]
    Conflict {
        /// Pointer kind
        kind: PointerKind,
        /// Pointer address
        pointer: String,
        /// Asset it is registered for
        asset: String,
    },

    /// Deploying or upgrading the pointer contract failed
    #[error(transparent)]
    Deploy(#[from] DeployError),

    /// A native module call failed
    #[error(transparent)]
    Keeper(#[from] KeeperError),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StorageError),
}

impl From<dualvm_types::Error> for PointerError {
    fn from(err: dualvm_types::Error) -> Self {
        match err {
            dualvm_types::Error::UnsupportedPointerKind(kind) => PointerError::Unsupported(kind),
            other => PointerError::Keeper(KeeperError::Types(other)),
        }
    }
}

/// Value stored in either index: the other side of the pair and the artifact
/// version it was deployed with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerRecord {
    /// Canonical string of the other side
    pub address: String,
    /// Artifact version
    pub version: u16,
}

/// A lookup key in storage form plus its canonical string
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Normalized {
    pub(crate) bytes: Vec<u8>,
    pub(crate) canonical: String,
}

/// Which side of a pair a string names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Asset,
    Pointer,
}

/// Whether `denom` is a well-formed bank denomination
pub fn is_valid_denom(denom: &str) -> bool {
    let mut chars = denom.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (3..=128).contains(&denom.len())
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c))
}

/// Stateless access to the pointer indexes of the `evm` partition
#[derive(Debug, Clone)]
pub struct PointerRegistry {
    prefix: String,
}

impl PointerRegistry {
    /// Registry validating native addresses against `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Bech32 prefix of native addresses
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn normalize(&self, kind: PointerKind, side: Side, value: &str) -> Option<Normalized> {
        let space = match side {
            Side::Asset => kind.asset_space(),
            Side::Pointer => kind.pointer_space(),
        };
        if kind == PointerKind::Native && side == Side::Asset {
            return is_valid_denom(value).then(|| Normalized {
                bytes: value.as_bytes().to_vec(),
                canonical: value.to_string(),
            });
        }
        match space {
            AddressSpace::Evm => parse_evm_address(value).ok().map(|addr| Normalized {
                bytes: addr.as_slice().to_vec(),
                canonical: addr.to_string(),
            }),
            AddressSpace::Native => NativeAddress::parse_with_prefix(value, &self.prefix)
                .ok()
                .map(|addr| Normalized {
                    bytes: addr.as_bytes().to_vec(),
                    canonical: addr.to_string(),
                }),
        }
    }

    fn read(&self, ctx: &Context<'_>, key: &[u8]) -> Result<Option<PointerRecord>, StorageError> {
        match ctx.get(EVM, key)? {
            Some(bytes) => Ok(Some(dualvm_storage::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Forward record of an asset, if registered
    pub fn pointer_record(
        &self,
        ctx: &Context<'_>,
        kind: PointerKind,
        asset_key: &str,
    ) -> Result<Option<PointerRecord>, StorageError> {
        match self.normalize(kind, Side::Asset, asset_key) {
            Some(asset) => self.read(ctx, &pointer_key(kind, &asset.bytes)),
            None => Ok(None),
        }
    }

    /// Reverse record of a pointer, if registered
    pub fn asset_record(
        &self,
        ctx: &Context<'_>,
        kind: PointerKind,
        pointer: &str,
    ) -> Result<Option<PointerRecord>, StorageError> {
        match self.normalize(kind, Side::Pointer, pointer) {
            Some(ptr) => self.read(ctx, &pointer_reverse_key(kind, &ptr.bytes)),
            None => Ok(None),
        }
    }

    /// Whether `address` is registered as a pointer of any of `kinds`
    pub fn is_pointer(
        &self,
        ctx: &Context<'_>,
        kinds: &[PointerKind],
        address: &str,
    ) -> Result<bool, StorageError> {
        for kind in kinds {
            if self.asset_record(ctx, *kind, address)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Record `asset_key <-> pointer` at `version`.
    ///
    /// A pointer already registered for a different asset is refused. If the
    /// asset previously had another pointer, that pointer's reverse entry is
    /// removed in the same write.
    pub fn write_pointer(
        &self,
        ctx: &mut Context<'_>,
        kind: PointerKind,
        asset_key: &str,
        pointer: &str,
        version: u16,
    ) -> Result<(), PointerError> {
        let asset = self
            .normalize(kind, Side::Asset, asset_key)
            .ok_or_else(|| PointerError::InvalidAssetKey {
                kind,
                key: asset_key.to_string(),
            })?;
        let ptr = self
            .normalize(kind, Side::Pointer, pointer)
            .ok_or_else(|| PointerError::InvalidPointerAddress {
                kind,
                address: pointer.to_string(),
            })?;

        let forward_key = pointer_key(kind, &asset.bytes);
        let reverse_key = pointer_reverse_key(kind, &ptr.bytes);
        if let Some(existing) = self.read(ctx, &reverse_key)? {
            if existing.address != asset.canonical {
                return Err(PointerError::Conflict {
                    kind,
                    pointer: ptr.canonical,
                    asset: existing.address,
                });
            }
        }

        let mut changes = ChangeSet::new();
        if let Some(previous) = self.read(ctx, &forward_key)? {
            if previous.address != ptr.canonical {
                if let Some(old) = self.normalize(kind, Side::Pointer, &previous.address) {
                    changes.delete(EVM, &pointer_reverse_key(kind, &old.bytes));
                }
            }
        }
        changes.set(
            EVM,
            &forward_key,
            dualvm_storage::encode(&PointerRecord {
                address: ptr.canonical.clone(),
                version,
            })?,
        );
        changes.set(
            EVM,
            &reverse_key,
            dualvm_storage::encode(&PointerRecord {
                address: asset.canonical.clone(),
                version,
            })?,
        );
        ctx.store_mut().apply(changes)?;
        debug!(kind = %kind, asset = %asset.canonical, pointer = %ptr.canonical, version, "pointer recorded");
        Ok(())
    }
}

impl PointerReader for PointerRegistry {
    fn resolve_pointer(
        &self,
        ctx: &Context<'_>,
        kind: PointerKind,
        asset_key: &str,
    ) -> KeeperResult<PointerLookup> {
        trace!(kind = %kind, asset = asset_key, "resolving pointer");
        Ok(match self.pointer_record(ctx, kind, asset_key)? {
            Some(rec) => PointerLookup {
                address: rec.address,
                version: rec.version,
                exists: true,
            },
            None => PointerLookup::missing(kind.pointer_space().zero_value()),
        })
    }

    fn resolve_asset(
        &self,
        ctx: &Context<'_>,
        kind: PointerKind,
        pointer: &str,
    ) -> KeeperResult<PointerLookup> {
        trace!(kind = %kind, pointer, "resolving asset");
        Ok(match self.asset_record(ctx, kind, pointer)? {
            Some(rec) => PointerLookup {
                address: rec.address,
                version: rec.version,
                exists: true,
            },
            None => PointerLookup::missing(kind.asset_space().zero_value()),
        })
    }
}
