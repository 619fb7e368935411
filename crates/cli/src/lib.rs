//! # DualVM CLI
//!
//! Command-line interface for a dual-VM bridge node.
//!
//! ## Available Commands
//!
//! - `init` - Write a default `dualvm.toml` and data directory
//! - `serve` - Open the store and serve pointer queries over JSON-RPC
//! - `query pointer` / `query pointee` - Ask a running server
//!
//! ## Example Usage
//!
//! ```bash
//! dualvm init --home ~/.dualvm
//! dualvm serve --config ~/.dualvm/dualvm.toml
//! dualvm query pointer native ufoo
//! dualvm query pointee 2 0x9f8a...
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod commands;
pub mod utils;

pub use commands::{run_cli, Cli, Commands};
pub use utils::{CliError, CliResult, OutputFormat};

/// CLI application name
pub const APP_NAME: &str = "dualvm";

/// Default home directory
pub const DEFAULT_HOME: &str = ".dualvm";

/// Default RPC endpoint
pub const DEFAULT_RPC_ENDPOINT: &str = "http://127.0.0.1:26658";
