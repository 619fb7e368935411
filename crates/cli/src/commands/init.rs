//! Node initialization command.
//!
//! `dualvm init` writes `dualvm.toml` into the home directory and creates the
//! data directory the configured store lives in.

use clap::Parser;
use dualvm_config::{Config, DEFAULT_CONFIG_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::utils::{print_info, print_success, CliError, CliResult, OutputFormat};
use crate::DEFAULT_HOME;

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Home directory for the node
    #[arg(long, env = "DUALVM_HOME", default_value = DEFAULT_HOME)]
    pub home: PathBuf,

    /// Native chain identifier
    #[arg(long)]
    pub chain_id: Option<String>,

    /// EVM chain id
    #[arg(long)]
    pub evm_chain_id: Option<u64>,

    /// Bech32 prefix of native addresses
    #[arg(long)]
    pub bech32_prefix: Option<String>,

    /// Denom backing EVM balances
    #[arg(long)]
    pub base_denom: Option<String>,

    /// Overwrite existing configuration
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Default configuration with the command-line overrides applied
    pub fn to_config(&self) -> Config {
        let mut config = Config::default();
        if let Some(chain_id) = &self.chain_id {
            config.chain.chain_id = chain_id.clone();
        }
        if let Some(evm_chain_id) = self.evm_chain_id {
            config.chain.evm_chain_id = evm_chain_id;
        }
        if let Some(prefix) = &self.bech32_prefix {
            config.chain.bech32_prefix = prefix.clone();
        }
        if let Some(denom) = &self.base_denom {
            config.chain.base_denom = denom.clone();
        }
        config
    }
}

/// Write the configuration and data directory; returns the config file path
pub fn init_home(args: &InitArgs) -> CliResult<PathBuf> {
    let config_path = args.home.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() && !args.force {
        return Err(CliError::AlreadyInitialized(config_path));
    }

    let config = args.to_config();
    config.validate()?;

    fs::create_dir_all(&args.home)?;
    let data_dir = data_dir(&args.home, &config.storage.path);
    fs::create_dir_all(&data_dir)?;
    config.save(&config_path)?;

    info!(
        home = %args.home.display(),
        chain_id = %config.chain.chain_id,
        "node home initialized"
    );
    Ok(config_path)
}

fn data_dir(home: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_relative() {
        home.join(path)
    } else {
        path.to_path_buf()
    }
}

/// Execute the init command
pub async fn execute(args: InitArgs, output_format: OutputFormat) -> CliResult<()> {
    print_info(&format!("Initializing node home: {}", args.home.display()));
    let config_path = init_home(&args)?;

    match output_format {
        OutputFormat::Json => {
            let info = serde_json::json!({
                "home": args.home,
                "config": config_path,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        OutputFormat::Text => {
            print_success(&format!(
                "Node initialized\n  Config: {}\n  Start with: dualvm serve --config {}",
                config_path.display(),
                config_path.display()
            ));
        }
    }

    Ok(())
}
