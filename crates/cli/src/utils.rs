//! Shared utilities for CLI commands.
//!
//! Error types, output formatting and argument parsing helpers.

use clap::ValueEnum;
use dualvm_config::ConfigError;
use dualvm_storage::StorageError;
use dualvm_types::PointerKind;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// CLI error types
#[derive(Error, Debug)]
pub enum CliError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Home directory already holds a configuration
    #[error("Already initialized: {0} exists (use --force to overwrite)")]
    AlreadyInitialized(PathBuf),

    /// RPC error
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<dualvm_rpc::RpcError> for CliError {
    fn from(err: dualvm_rpc::RpcError) -> Self {
        CliError::Rpc(err.to_string())
    }
}

impl From<jsonrpsee::core::ClientError> for CliError {
    fn from(err: jsonrpsee::core::ClientError) -> Self {
        CliError::Rpc(err.to_string())
    }
}

/// CLI result type alias
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Output Formatting
// ============================================================================

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for scripting
    Json,
}

/// Print an info message to stderr (so JSON output stays clean)
pub fn print_info(msg: &str) {
    use console::style;
    eprintln!("{} {}", style("[INFO]").cyan().bold(), msg);
}

/// Print a success message to stderr
pub fn print_success(msg: &str) {
    use console::style;
    eprintln!("{} {}", style("[OK]").green().bold(), msg);
}

// ============================================================================
// Argument Parsing
// ============================================================================

/// Wire value of a pointer kind given by name (`native`, `cw20`, ...) or number.
///
/// Numbers are passed through unchecked so the server decides what it supports.
pub fn parse_kind(s: &str) -> CliResult<i32> {
    if let Ok(value) = s.parse::<i32>() {
        return Ok(value);
    }
    s.parse::<PointerKind>()
        .map(|kind| kind.as_i32())
        .map_err(|e| CliError::InvalidArgument(e.to_string()))
}

/// Log filter directive for a base level and `-v`/`-q` flags
pub fn log_filter(level: &str, verbose: u8, quiet: bool) -> String {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (_, 0) => level,
        (_, 1) => "debug",
        (_, _) => "trace",
    };
    format!("{level},jsonrpsee=warn")
}
