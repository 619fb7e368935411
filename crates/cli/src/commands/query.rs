//! Pointer queries against a running server.

use clap::{Parser, Subcommand};
use dualvm_evm::{PointeeResponse, PointerResponse};
use dualvm_rpc::PointerApiClient;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde::Serialize;

use crate::utils::{parse_kind, CliError, CliResult, OutputFormat};
use crate::DEFAULT_RPC_ENDPOINT;

/// Query subcommands
#[derive(Subcommand, Debug)]
pub enum QueryCommands {
    /// Pointer registered for an asset
    Pointer(PointerArgs),

    /// Asset a pointer stands for
    Pointee(PointeeArgs),
}

/// Arguments for the pointer query
#[derive(Parser, Debug)]
pub struct PointerArgs {
    /// Pointer kind: erc20, erc721, native, cw20, cw721 or its number
    pub kind: String,

    /// Denom, contract address or EVM address of the asset
    pub pointee: String,

    /// RPC endpoint
    #[arg(long, default_value = DEFAULT_RPC_ENDPOINT)]
    pub rpc: String,
}

/// Arguments for the pointee query
#[derive(Parser, Debug)]
pub struct PointeeArgs {
    /// Pointer kind: erc20, erc721, native, cw20, cw721 or its number
    pub kind: String,

    /// Address of the pointer contract
    pub pointer: String,

    /// RPC endpoint
    #[arg(long, default_value = DEFAULT_RPC_ENDPOINT)]
    pub rpc: String,
}

fn client(endpoint: &str) -> CliResult<HttpClient> {
    HttpClientBuilder::default()
        .build(endpoint)
        .map_err(|e| CliError::Rpc(format!("{endpoint}: {e}")))
}

/// Ask the server for the pointer of `args.pointee`
pub async fn fetch_pointer(args: &PointerArgs) -> CliResult<PointerResponse> {
    let kind = parse_kind(&args.kind)?;
    Ok(client(&args.rpc)?.pointer(kind, args.pointee.clone()).await?)
}

/// Ask the server for the asset behind `args.pointer`
pub async fn fetch_pointee(args: &PointeeArgs) -> CliResult<PointeeResponse> {
    let kind = parse_kind(&args.kind)?;
    Ok(client(&args.rpc)?.pointee(kind, args.pointer.clone()).await?)
}

fn print<T: Serialize>(
    value: &T,
    address: &str,
    version: u16,
    exists: bool,
    output_format: OutputFormat,
) -> CliResult<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text if exists => println!("{address} (version {version})"),
        OutputFormat::Text => println!("not found"),
    }
    Ok(())
}

/// Execute a query command
pub async fn execute(cmd: QueryCommands, output_format: OutputFormat) -> CliResult<()> {
    match cmd {
        QueryCommands::Pointer(args) => {
            let response = fetch_pointer(&args).await?;
            print(
                &response,
                &response.pointer,
                response.version,
                response.exists,
                output_format,
            )
        }
        QueryCommands::Pointee(args) => {
            let response = fetch_pointee(&args).await?;
            print(
                &response,
                &response.pointee,
                response.version,
                response.exists,
                output_format,
            )
        }
    }
}
