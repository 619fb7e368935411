//! # DualVM EVM
//!
//! The EVM side of the bridge.
//!
//! This crate provides:
//! - [`EvmKeeper`] - EVM state, address mapping and pointer upsert
//! - [`PointerRegistry`] - the forward and reverse pointer indexes
//! - [`StateAdapter`] - revm database over the ledger, with the gas refund counter
//! - [`EvmKeeper::execute_message`] - whitelist-enforced message execution
//! - [`Querier`] - pointer lookups over committed snapshots
//! - Bridge precompiles exposing native modules to EVM callers, reachable both
//!   as message targets and from contract frames
//!
//! ## Precompile Addresses
//!
//! | Address | Precompile |
//! |---------|------------|
//! | 0x...1001 | Bank |
//! | 0x...1002 | Wasmd |
//! | 0x...1004 | Addr |
//! | 0x...1005 | Staking |
//! | 0x...1006 | Gov |
//! | 0x...1007 | Distribution |
//! | 0x...1008 | Oracle |
//! | 0x...1009 | IBC |
//! | 0x...100b | PointerView |
//!
//! ## Example
//!
//! ```rust,ignore
//! use dualvm_evm::{EvmKeeper, EvmParams, PointerArtifacts};
//! use dualvm_types::PointerKind;
//!
//! let keeper = EvmKeeper::new(params, PointerArtifacts::default(), whitelist, &keepers);
//! let pointer = keeper.upsert_pointer(&mut ctx, PointerKind::Native, "ufoo")?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod abi;
pub mod artifacts;
pub mod executor;
pub mod keeper;
pub mod keys;
mod nested;
mod pointer;
pub mod precompiles;
pub mod querier;
pub mod registry;
mod state_adapter;

// Re-export main types at crate root
pub use artifacts::{EvmArtifact, PointerArtifacts, WasmArtifact, PLACEHOLDER_INIT_CODE};
pub use executor::{EvmMessage, ExecutionError, Log, MessageResult, DEFAULT_MESSAGE_GAS_LIMIT};
pub use keeper::{
    module_address, EvmKeeper, EvmParams, StoredAccount, DEFAULT_CHAIN_ID,
    DEFAULT_DEPLOY_GAS_LIMIT,
};
pub use precompiles::{
    Precompile, PrecompileCall, PrecompileError, PrecompileOutput, PrecompileRegistry,
    ADDR_ADDRESS, BANK_ADDRESS, DISTRIBUTION_ADDRESS, GOV_ADDRESS, IBC_ADDRESS, ORACLE_ADDRESS,
    POINTERVIEW_ADDRESS, STAKING_ADDRESS, WASMD_ADDRESS,
};
pub use querier::{PointeeResponse, PointerResponse, Querier, QueryError};
pub use registry::{is_valid_denom, DeployError, PointerError, PointerRecord, PointerRegistry};
pub use state_adapter::{StateAdapter, StateError};

/// Result type alias for EVM operations
pub type Result<T> = std::result::Result<T, ExecutionError>;
