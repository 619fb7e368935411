//! DualVM CLI - Main entry point

use clap::Parser;
use dualvm_cli::{commands::run_cli, commands::Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_cli(cli).await?;
    Ok(())
}
