//! Versioned pointer contract artifacts.
//!
//! EVM-side pointers (NATIVE, CW20, CW721) are deployed from init code;
//! native-side pointers (ERC20, ERC721) are instantiated from stored wasm
//! code. A registry record whose version is older than the artifact's is
//! upgraded on the next upsert.

use alloy_primitives::Bytes;
use dualvm_types::PointerKind;
use serde::{Deserialize, Serialize};

/// Init code returning the one-byte runtime `0x00`. Constructor arguments
/// appended to it are ignored.
pub const PLACEHOLDER_INIT_CODE: [u8; 13] = [
    0x60, 0x01, 0x60, 0x0c, 0x60, 0x00, 0x39, 0x60, 0x01, 0x60, 0x00, 0xf3, 0x00,
];

/// Init code and version of an EVM pointer contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmArtifact {
    /// Artifact version, starting at 1
    pub version: u16,
    /// Creation bytecode; ABI-encoded constructor arguments are appended
    pub init_code: Bytes,
}

/// Code id and version of a wasm pointer contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmArtifact {
    /// Artifact version, starting at 1
    pub version: u16,
    /// Stored code to instantiate or migrate to
    pub code_id: u64,
}

/// The artifact behind each pointer kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerArtifacts {
    /// ERC-20 wrapping a native denom
    pub native: EvmArtifact,
    /// ERC-20 wrapping a CW-20 contract
    pub cw20: EvmArtifact,
    /// ERC-721 wrapping a CW-721 contract
    pub cw721: EvmArtifact,
    /// CW-20 wrapping an ERC-20 contract
    pub erc20: WasmArtifact,
    /// CW-721 wrapping an ERC-721 contract
    pub erc721: WasmArtifact,
}

impl PointerArtifacts {
    /// Current version for `kind`
    pub fn version(&self, kind: PointerKind) -> u16 {
        match kind {
            PointerKind::Native => self.native.version,
            PointerKind::Cw20 => self.cw20.version,
            PointerKind::Cw721 => self.cw721.version,
            PointerKind::Erc20 => self.erc20.version,
            PointerKind::Erc721 => self.erc721.version,
        }
    }

    /// EVM artifact for an EVM-side pointer kind
    pub fn evm(&self, kind: PointerKind) -> Option<&EvmArtifact> {
        match kind {
            PointerKind::Native => Some(&self.native),
            PointerKind::Cw20 => Some(&self.cw20),
            PointerKind::Cw721 => Some(&self.cw721),
            PointerKind::Erc20 | PointerKind::Erc721 => None,
        }
    }

    /// Wasm artifact for a native-side pointer kind
    pub fn wasm(&self, kind: PointerKind) -> Option<WasmArtifact> {
        match kind {
            PointerKind::Erc20 => Some(self.erc20),
            PointerKind::Erc721 => Some(self.erc721),
            PointerKind::Native | PointerKind::Cw20 | PointerKind::Cw721 => None,
        }
    }
}

impl Default for PointerArtifacts {
    fn default() -> Self {
        let evm = EvmArtifact {
            version: 1,
            init_code: Bytes::from_static(&PLACEHOLDER_INIT_CODE),
        };
        Self {
            native: evm.clone(),
            cw20: evm.clone(),
            cw721: evm,
            erc20: WasmArtifact {
                version: 1,
                code_id: 1,
            },
            erc721: WasmArtifact {
                version: 1,
                code_id: 2,
            },
        }
    }
}
