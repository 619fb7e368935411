//! # DualVM Config
//!
//! Configuration for a bridge node, read from a single `dualvm.toml`.
//!
//! ## Sections
//!
//! - `[chain]` - chain ids, bech32 prefix and the base denom backing EVM balances
//! - `[evm]` - gas limits and the pointer deployer module account
//! - `[pointers.*]` - versioned pointer artifacts
//! - `[whitelist]` - partitions and key prefixes EVM messages may write
//! - `[storage]` - database location, partitions, snapshot retention
//! - `[rpc]` - query server address
//! - `[logging]` - log level and format
//!
//! ## Example
//!
//! ```rust,ignore
//! use dualvm_config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("dualvm.toml"))?;
//! let whitelist = config.whitelist.to_whitelist();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

mod config;
mod error;

pub use config::{
    ChainConfig, Config, EvmArtifactConfig, EvmConfig, LoggingConfig, PointersConfig, RpcConfig,
    StorageConfig, WasmArtifactConfig, WhitelistConfig, DEFAULT_CONFIG_FILE,
};
pub use error::{ConfigError, ConfigResult};
