//! Native (bech32) and EVM (20-byte) address types.
//!
//! The native ledger identifies accounts by 20-byte addresses and contracts by
//! 32-byte addresses, both rendered as bech32 strings under the chain prefix.
//! The EVM side uses [`alloy_primitives::Address`].

use crate::{Error, Result};
use bech32::{Bech32, Hrp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 20-byte EVM address
pub type EvmAddress = alloy_primitives::Address;

/// Hex form of the all-zero EVM address, the EVM-space "not found" value
pub const ZERO_EVM_ADDRESS_HEX: &str = "0x0000000000000000000000000000000000000000";

/// Length of a native account address in bytes
pub const ACCOUNT_ADDRESS_LEN: usize = 20;

/// Length of a native contract address in bytes
pub const CONTRACT_ADDRESS_LEN: usize = 32;

/// A bech32 encoded native ledger address.
///
/// The encoded form is computed once at construction, so `Display` never fails.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeAddress {
    encoded: String,
    hrp: String,
    bytes: Vec<u8>,
}

impl NativeAddress {
    /// Build an address from a prefix and raw bytes (20 or 32 bytes).
    pub fn new(prefix: &str, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != ACCOUNT_ADDRESS_LEN && bytes.len() != CONTRACT_ADDRESS_LEN {
            return Err(Error::InvalidLength {
                expected: ACCOUNT_ADDRESS_LEN,
                actual: bytes.len(),
            });
        }
        let hrp = Hrp::parse(prefix).map_err(|e| Error::InvalidBech32(e.to_string()))?;
        let encoded = bech32::encode::<Bech32>(hrp, &bytes)
            .map_err(|e| Error::InvalidBech32(e.to_string()))?;
        Ok(Self {
            encoded,
            hrp: hrp.to_lowercase(),
            bytes,
        })
    }

    /// Parse a bech32 string, requiring the given human readable prefix.
    pub fn parse_with_prefix(s: &str, prefix: &str) -> Result<Self> {
        let addr: Self = s.parse()?;
        if addr.hrp != prefix {
            return Err(Error::PrefixMismatch {
                expected: prefix.to_string(),
                actual: addr.hrp,
            });
        }
        Ok(addr)
    }

    /// Human readable prefix
    pub fn prefix(&self) -> &str {
        &self.hrp
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether this is a 32-byte contract address
    pub fn is_contract(&self) -> bool {
        self.bytes.len() == CONTRACT_ADDRESS_LEN
    }

    /// Bech32 string form
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl FromStr for NativeAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (hrp, bytes) = bech32::decode(s).map_err(|e| Error::InvalidBech32(e.to_string()))?;
        Self::new(&hrp.to_lowercase(), bytes)
    }
}

impl fmt::Display for NativeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl fmt::Debug for NativeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeAddress({})", self.encoded)
    }
}

impl Serialize for NativeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encoded)
    }
}

impl<'de> Deserialize<'de> for NativeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a `0x`-prefixed, 40 hex character EVM address.
///
/// Mixed-case input is accepted without checksum validation.
pub fn parse_evm_address(s: &str) -> Result<EvmAddress> {
    let hex_part = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| Error::InvalidEvmAddress(s.to_string()))?;
    if hex_part.len() != 40 {
        return Err(Error::InvalidEvmAddress(s.to_string()));
    }
    let bytes = hex::decode(hex_part)?;
    Ok(EvmAddress::from_slice(&bytes))
}

/// Native address an EVM address maps to when no explicit mapping exists.
pub fn default_native_address(evm: &EvmAddress, prefix: &str) -> Result<NativeAddress> {
    NativeAddress::new(prefix, evm.as_slice().to_vec())
}

/// EVM address a native address maps to when no explicit mapping exists.
///
/// Contract addresses keep their trailing 20 bytes.
pub fn default_evm_address(native: &NativeAddress) -> EvmAddress {
    let bytes = native.as_bytes();
    EvmAddress::from_slice(&bytes[bytes.len() - 20..])
}
