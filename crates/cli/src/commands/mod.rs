//! CLI command definitions and handlers.
//!
//! Each subcommand has its own module with implementation details.

pub mod init;
pub mod query;
pub mod serve;

use clap::{Parser, Subcommand};
use dualvm_config::LoggingConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::utils::{log_filter, CliResult, OutputFormat};

/// DualVM - pointer bridge between a native chain and its EVM
#[derive(Parser, Debug)]
#[command(name = "dualvm")]
#[command(version)]
#[command(about = "Dual-VM bridge node and query tools", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Global output format for command results
    #[arg(global = true, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(global = true, short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(global = true, short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration into a home directory
    Init(init::InitArgs),

    /// Serve pointer queries from the node's store
    Serve(serve::ServeArgs),

    /// Query a running server
    #[command(subcommand)]
    Query(query::QueryCommands),
}

/// Execute the CLI with parsed arguments
pub async fn run_cli(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Init(args) => {
            init_tracing(&LoggingConfig::default(), cli.verbose, cli.quiet);
            init::execute(args, cli.output).await
        }
        Commands::Serve(args) => {
            // Logging follows the node's [logging] section
            let config = serve::load_config(&args)?;
            init_tracing(&config.logging, cli.verbose, cli.quiet);
            serve::execute(args, config).await
        }
        Commands::Query(cmd) => {
            init_tracing(&LoggingConfig::default(), cli.verbose, cli.quiet);
            query::execute(cmd, cli.output).await
        }
    }
}

/// Install the global subscriber; `RUST_LOG` wins over config and flags
fn init_tracing(logging: &LoggingConfig, verbose: u8, quiet: bool) {
    let filter = log_filter(&logging.level.to_lowercase(), verbose, quiet);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if logging.is_json() {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        registry
            .with(fmt::layer().with_target(verbose >= 2).with_writer(std::io::stderr))
            .try_init()
    };
    // A subscriber may already be installed when driven from tests
    installed.ok();
}
