//! `dualvm serve` - pointer queries over JSON-RPC.
//!
//! Opens the RocksDB store read-side and answers from its latest contents
//! until interrupted.

use clap::Parser;
use dualvm_config::{Config, DEFAULT_CONFIG_FILE};
use dualvm_evm::{PointerRegistry, Querier};
use dualvm_rpc::{RpcServer, RpcServerConfig};
use dualvm_storage::Database;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::utils::{CliError, CliResult};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Override the RPC listen address
    #[arg(long)]
    pub rpc_addr: Option<String>,
}

/// Load and validate the configuration named by `args`
pub fn load_config(args: &ServeArgs) -> CliResult<Config> {
    let mut config = Config::load(&args.config)?;
    if let Some(addr) = &args.rpc_addr {
        config.rpc.http_addr = addr.clone();
        config.rpc.validate()?;
    }
    Ok(config)
}

/// Server settings for the `[rpc]` section
pub fn server_config(config: &Config) -> CliResult<RpcServerConfig> {
    let http_addr: SocketAddr = config
        .rpc
        .http_addr
        .parse()
        .map_err(|_| CliError::InvalidArgument(config.rpc.http_addr.clone()))?;
    Ok(RpcServerConfig {
        http_addr,
        max_connections: config.rpc.max_connections,
        ..RpcServerConfig::default()
    })
}

/// Querier over the store at `home`
pub fn open_querier(config: &Config, home: Option<&Path>) -> CliResult<Querier> {
    let database = Database::open(config.storage.database_config(home))?;
    Ok(Querier::new(
        PointerRegistry::new(&config.chain.bech32_prefix),
        Arc::new(database),
        &config.chain.chain_id,
    ))
}

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: Config) -> CliResult<()> {
    // Relative storage paths are relative to the config file
    let home = args.config.parent().filter(|p| !p.as_os_str().is_empty());
    let querier = open_querier(&config, home)?;

    let mut server = RpcServer::new(server_config(&config)?, Arc::new(querier));
    let addr = server.start().await?;
    info!(%addr, chain_id = %config.chain.chain_id, "serving pointer queries");

    let interrupted = tokio::select! {
        _ = server.wait() => None,
        signal = tokio::signal::ctrl_c() => Some(signal),
    };
    if let Some(signal) = interrupted {
        signal?;
        info!("interrupt received, shutting down");
        server.stop();
    }

    Ok(())
}
