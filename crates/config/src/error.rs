//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        /// File that could not be read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write configuration file
    #[error("Failed to write config file at {path}: {source}")]
    FileWrite {
        /// File that could not be written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize configuration
    #[error("Failed to serialize config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Invalid EVM chain ID (must be non-zero)
    #[error("Invalid chain ID: evm_chain_id must be non-zero")]
    InvalidChainId,

    /// Bech32 prefix is empty or not lowercase alphanumeric
    #[error("Invalid bech32 prefix: {0:?}")]
    InvalidPrefix(String),

    /// Denomination does not follow denom syntax
    #[error("Invalid denom: {0:?}")]
    InvalidDenom(String),

    /// Invalid gas limit
    #[error("Invalid gas limit: {name} must be at least 21000, got {value}")]
    InvalidGasLimit {
        /// Offending field
        name: &'static str,
        /// Configured value
        value: u64,
    },

    /// Artifact version is zero
    #[error("Invalid artifact version for {0}: versions start at 1")]
    InvalidArtifactVersion(&'static str),

    /// Init code is not hex or is empty
    #[error("Invalid init code for {kind}: {reason}")]
    InvalidInitCode {
        /// Pointer kind of the artifact
        kind: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Wasm code id is zero
    #[error("Invalid code id for {0}: must be non-zero")]
    InvalidCodeId(&'static str),

    /// Partition name is not one the store knows
    #[error("Unknown partition: {0}")]
    UnknownPartition(String),

    /// Whitelisted partition is not opened by the store
    #[error("Whitelisted partition {0} is not in storage.partitions")]
    PartitionNotStored(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid socket address format
    #[error("Invalid socket address: {0}")]
    InvalidSocketAddr(String),

    /// Invalid log level
    #[error("Invalid log level: {0} (must be one of: trace, debug, info, warn, error)")]
    InvalidLogLevel(String),

    /// Invalid log format
    #[error("Invalid log format: {0} (must be one of: json, pretty)")]
    InvalidLogFormat(String),
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
