//! Address mapping and pointer lookups exposed by the EVM module.

use dualvm_types::{EvmAddress, NativeAddress, PointerKind};
use serde::{Deserialize, Serialize};

use crate::{Context, KeeperResult};

/// Association between native and EVM addresses
pub trait AddressMapper: Send + Sync {
    /// Explicitly mapped native address of an EVM address
    fn get_native_address(&self, ctx: &Context<'_>, evm: &EvmAddress)
        -> KeeperResult<Option<NativeAddress>>;

    /// Mapped native address, or the default derivation if unmapped
    fn get_native_address_or_default(
        &self,
        ctx: &Context<'_>,
        evm: &EvmAddress,
    ) -> KeeperResult<NativeAddress>;

    /// Explicitly mapped EVM address of a native address
    fn get_evm_address(&self, ctx: &Context<'_>, native: &NativeAddress)
        -> KeeperResult<Option<EvmAddress>>;

    /// Mapped EVM address, or the default derivation if unmapped
    fn get_evm_address_or_default(
        &self,
        ctx: &Context<'_>,
        native: &NativeAddress,
    ) -> KeeperResult<EvmAddress>;

    /// Record a two-way association
    fn set_address_mapping(
        &self,
        ctx: &mut Context<'_>,
        native: &NativeAddress,
        evm: &EvmAddress,
    ) -> KeeperResult<()>;
}

/// Result of a registry lookup. A miss carries the zero value of the result's
/// address space and `exists == false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerLookup {
    /// Address or asset key found, or the zero value
    pub address: String,
    /// Recorded artifact version, 0 on a miss
    pub version: u16,
    /// Whether a record exists
    pub exists: bool,
}

impl PointerLookup {
    /// A miss in the given result space
    pub fn missing(zero: &str) -> Self {
        Self {
            address: zero.to_string(),
            version: 0,
            exists: false,
        }
    }
}

/// Read-only pointer registry access
pub trait PointerReader: Send + Sync {
    /// Pointer contract registered for an asset
    fn resolve_pointer(&self, ctx: &Context<'_>, kind: PointerKind, asset_key: &str)
        -> KeeperResult<PointerLookup>;

    /// Asset a pointer contract stands for
    fn resolve_asset(&self, ctx: &Context<'_>, kind: PointerKind, pointer: &str)
        -> KeeperResult<PointerLookup>;
}
