//! # DualVM Types
//!
//! Type definitions shared by every crate of the dual-VM bridge.
//!
//! - [`NativeAddress`] - bech32 account and contract addresses of the native ledger
//! - [`EvmAddress`] - 20-byte EVM addresses (re-exported from `alloy-primitives`)
//! - [`Coin`] and [`DenomMetadata`] - native fungible amounts
//! - [`PointerKind`] - the five address-space pairings of the pointer registry
//!
//! ## Example
//!
//! ```rust
//! use dualvm_types::{NativeAddress, PointerKind};
//!
//! let addr = NativeAddress::new("dual", [7u8; 20].to_vec()).unwrap();
//! let parsed: NativeAddress = addr.to_string().parse().unwrap();
//! assert_eq!(addr, parsed);
//!
//! assert_eq!(PointerKind::try_from(2).unwrap(), PointerKind::Native);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod address;
pub mod coin;
pub mod pointer;

pub use address::{
    default_evm_address, default_native_address, parse_evm_address, EvmAddress, NativeAddress,
    ZERO_EVM_ADDRESS_HEX,
};
pub use coin::{Coin, DenomMetadata};
pub use pointer::{AddressSpace, PointerKind};

/// Result type alias for type conversions
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when working with bridge types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Invalid length for a fixed-size type
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Invalid EVM address format
    #[error("invalid EVM address: {0}")]
    InvalidEvmAddress(String),

    /// Invalid bech32 address
    #[error("invalid bech32 address: {0}")]
    InvalidBech32(String),

    /// Bech32 human readable part did not match the expected prefix
    #[error("bech32 prefix mismatch: expected {expected}, got {actual}")]
    PrefixMismatch {
        /// Expected prefix
        expected: String,
        /// Actual prefix
        actual: String,
    },

    /// Pointer kind value outside the defined set
    #[error("unsupported pointer kind: {0}")]
    UnsupportedPointerKind(i32),

    /// Pointer kind name that could not be parsed
    #[error("unknown pointer kind name: {0}")]
    UnknownPointerKindName(String),
}
