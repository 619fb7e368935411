//! Node configuration for the dual-VM bridge
//!
//! Every setting lives in one `dualvm.toml`. Sections are validated on load
//! and converted into the parameter types the storage and EVM crates take.

use crate::error::{ConfigError, ConfigResult};
use alloy_primitives::Bytes;
use dualvm_evm::{
    is_valid_denom, module_address, EvmArtifact, EvmParams, PointerArtifacts, WasmArtifact,
    DEFAULT_CHAIN_ID, DEFAULT_DEPLOY_GAS_LIMIT, DEFAULT_MESSAGE_GAS_LIMIT, PLACEHOLDER_INIT_CODE,
};
use dualvm_storage::{partitions, DatabaseConfig, Whitelist, DEFAULT_KEEP_RECENT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "dualvm.toml";

/// Minimum gas any EVM message pays
const MIN_GAS_LIMIT: u64 = 21_000;

/// Main configuration struct containing all bridge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chain identity
    #[serde(default)]
    pub chain: ChainConfig,

    /// EVM execution parameters
    #[serde(default)]
    pub evm: EvmConfig,

    /// Pointer contract artifacts
    #[serde(default)]
    pub pointers: PointersConfig,

    /// Partitions EVM messages may write
    #[serde(default)]
    pub whitelist: WhitelistConfig,

    /// Storage backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Query server
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use dualvm_config::Config;
    /// use std::path::Path;
    ///
    /// let config = Config::load(Path::new("dualvm.toml"))?;
    /// ```
    pub fn load(path: &Path) -> ConfigResult<Self> {
        info!(path = %path.display(), "loading configuration");

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)?;

        debug!("configuration parsed, validating");
        config.validate()?;

        info!(
            chain_id = %config.chain.chain_id,
            evm_chain_id = config.chain.evm_chain_id,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Load configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section and the cross-section constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        self.chain.validate()?;
        self.evm.validate()?;
        self.pointers.validate()?;
        self.whitelist.validate()?;
        self.storage.validate()?;
        self.rpc.validate()?;
        self.logging.validate()?;

        // The whitelist can only name partitions the store opens
        for partition in self.whitelist.partitions() {
            if !self.storage.partitions.iter().any(|p| p == partition) {
                return Err(ConfigError::PartitionNotStored(partition.to_string()));
            }
        }

        Ok(())
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Parameters for the EVM keeper
    pub fn evm_params(&self) -> EvmParams {
        let mut params = EvmParams::new(&self.chain.bech32_prefix, &self.chain.base_denom);
        params.chain_id = self.chain.evm_chain_id;
        params.deploy_gas_limit = self.evm.deploy_gas_limit;
        params.deployer = module_address(&self.evm.deployer);
        params
    }
}

// =============================================================================
// Chain Configuration
// =============================================================================

/// Chain identity configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Native chain identifier, e.g. `dualvm-1`
    pub chain_id: String,

    /// EVM chain id
    pub evm_chain_id: u64,

    /// Human-readable part of native addresses
    pub bech32_prefix: String,

    /// Denom backing EVM balances, one base unit per wei
    pub base_denom: String,
}

impl ChainConfig {
    /// Check identifiers and the base denom
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chain_id.is_empty() {
            return Err(ConfigError::MissingField("chain.chain_id"));
        }

        if self.evm_chain_id == 0 {
            return Err(ConfigError::InvalidChainId);
        }

        let prefix_ok = !self.bech32_prefix.is_empty()
            && self
                .bech32_prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !prefix_ok {
            return Err(ConfigError::InvalidPrefix(self.bech32_prefix.clone()));
        }

        if !is_valid_denom(&self.base_denom) {
            return Err(ConfigError::InvalidDenom(self.base_denom.clone()));
        }

        Ok(())
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: "dualvm-local".to_string(),
            evm_chain_id: DEFAULT_CHAIN_ID,
            bech32_prefix: "dual".to_string(),
            base_denom: "udual".to_string(),
        }
    }
}

// =============================================================================
// EVM Configuration
// =============================================================================

/// EVM execution parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvmConfig {
    /// Gas limit of pointer deployments and upgrades
    #[serde(default = "default_deploy_gas_limit")]
    pub deploy_gas_limit: u64,

    /// Gas limit given to messages that do not set one
    #[serde(default = "default_message_gas_limit")]
    pub message_gas_limit: u64,

    /// Module account name whose address deploys pointers
    #[serde(default = "default_deployer")]
    pub deployer: String,
}

fn default_deploy_gas_limit() -> u64 {
    DEFAULT_DEPLOY_GAS_LIMIT
}

fn default_message_gas_limit() -> u64 {
    DEFAULT_MESSAGE_GAS_LIMIT
}

fn default_deployer() -> String {
    "evm".to_string()
}

impl EvmConfig {
    /// Check gas limits and the deployer name
    pub fn validate(&self) -> ConfigResult<()> {
        if self.deploy_gas_limit < MIN_GAS_LIMIT {
            return Err(ConfigError::InvalidGasLimit {
                name: "evm.deploy_gas_limit",
                value: self.deploy_gas_limit,
            });
        }

        if self.message_gas_limit < MIN_GAS_LIMIT {
            return Err(ConfigError::InvalidGasLimit {
                name: "evm.message_gas_limit",
                value: self.message_gas_limit,
            });
        }

        if self.deployer.is_empty() {
            return Err(ConfigError::MissingField("evm.deployer"));
        }

        Ok(())
    }
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            deploy_gas_limit: default_deploy_gas_limit(),
            message_gas_limit: default_message_gas_limit(),
            deployer: default_deployer(),
        }
    }
}

// =============================================================================
// Pointer Artifacts
// =============================================================================

/// Init code and version of an EVM-side pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvmArtifactConfig {
    /// Artifact version, starting at 1
    pub version: u16,

    /// Creation bytecode as hex, with or without `0x`
    pub init_code: String,
}

impl EvmArtifactConfig {
    fn validate(&self, kind: &'static str) -> ConfigResult<()> {
        if self.version == 0 {
            return Err(ConfigError::InvalidArtifactVersion(kind));
        }
        self.decode(kind).map(|_| ())
    }

    fn decode(&self, kind: &'static str) -> ConfigResult<Vec<u8>> {
        let raw = self.init_code.trim_start_matches("0x");
        let code = hex::decode(raw).map_err(|e| ConfigError::InvalidInitCode {
            kind,
            reason: e.to_string(),
        })?;
        if code.is_empty() {
            return Err(ConfigError::InvalidInitCode {
                kind,
                reason: "empty".to_string(),
            });
        }
        Ok(code)
    }

    fn to_artifact(&self, kind: &'static str) -> ConfigResult<EvmArtifact> {
        Ok(EvmArtifact {
            version: self.version,
            init_code: Bytes::from(self.decode(kind)?),
        })
    }
}

impl Default for EvmArtifactConfig {
    fn default() -> Self {
        Self {
            version: 1,
            init_code: format!("0x{}", hex::encode(PLACEHOLDER_INIT_CODE)),
        }
    }
}

/// Stored code and version of a native-side pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmArtifactConfig {
    /// Artifact version, starting at 1
    pub version: u16,

    /// Code id to instantiate or migrate to
    pub code_id: u64,
}

impl WasmArtifactConfig {
    fn validate(&self, kind: &'static str) -> ConfigResult<()> {
        if self.version == 0 {
            return Err(ConfigError::InvalidArtifactVersion(kind));
        }
        if self.code_id == 0 {
            return Err(ConfigError::InvalidCodeId(kind));
        }
        Ok(())
    }
}

impl From<WasmArtifactConfig> for WasmArtifact {
    fn from(config: WasmArtifactConfig) -> Self {
        WasmArtifact {
            version: config.version,
            code_id: config.code_id,
        }
    }
}

/// Artifact per pointer kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointersConfig {
    /// ERC-20 wrapping a native denom
    #[serde(default)]
    pub native: EvmArtifactConfig,

    /// ERC-20 wrapping a CW-20 contract
    #[serde(default)]
    pub cw20: EvmArtifactConfig,

    /// ERC-721 wrapping a CW-721 contract
    #[serde(default)]
    pub cw721: EvmArtifactConfig,

    /// CW-20 wrapping an ERC-20 contract
    #[serde(default = "default_erc20_artifact")]
    pub erc20: WasmArtifactConfig,

    /// CW-721 wrapping an ERC-721 contract
    #[serde(default = "default_erc721_artifact")]
    pub erc721: WasmArtifactConfig,
}

fn default_erc20_artifact() -> WasmArtifactConfig {
    WasmArtifactConfig {
        version: 1,
        code_id: 1,
    }
}

fn default_erc721_artifact() -> WasmArtifactConfig {
    WasmArtifactConfig {
        version: 1,
        code_id: 2,
    }
}

impl PointersConfig {
    /// Check versions, init code and code ids
    pub fn validate(&self) -> ConfigResult<()> {
        self.native.validate("native")?;
        self.cw20.validate("cw20")?;
        self.cw721.validate("cw721")?;
        self.erc20.validate("erc20")?;
        self.erc721.validate("erc721")?;
        Ok(())
    }

    /// Decode into the artifacts the EVM keeper deploys from
    pub fn to_artifacts(&self) -> ConfigResult<PointerArtifacts> {
        Ok(PointerArtifacts {
            native: self.native.to_artifact("native")?,
            cw20: self.cw20.to_artifact("cw20")?,
            cw721: self.cw721.to_artifact("cw721")?,
            erc20: self.erc20.into(),
            erc721: self.erc721.into(),
        })
    }
}

impl Default for PointersConfig {
    fn default() -> Self {
        Self {
            native: EvmArtifactConfig::default(),
            cw20: EvmArtifactConfig::default(),
            cw721: EvmArtifactConfig::default(),
            erc20: default_erc20_artifact(),
            erc721: default_erc721_artifact(),
        }
    }
}

// =============================================================================
// Whitelist Configuration
// =============================================================================

/// Write whitelist handed to EVM messages.
///
/// Partitions under neither `allow` nor `read_only` are read-only as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistConfig {
    /// Partition to permitted key prefixes; `""` admits every key
    #[serde(default)]
    pub allow: BTreeMap<String, Vec<String>>,

    /// Partitions listed explicitly as read-only
    #[serde(default)]
    pub read_only: Vec<String>,
}

impl WhitelistConfig {
    /// Check that every named partition exists
    pub fn validate(&self) -> ConfigResult<()> {
        for partition in self.partitions() {
            if !partitions::ALL.contains(&partition) {
                return Err(ConfigError::UnknownPartition(partition.to_string()));
            }
        }
        Ok(())
    }

    /// Every partition the whitelist names
    pub fn partitions(&self) -> impl Iterator<Item = &str> {
        self.allow
            .keys()
            .chain(self.read_only.iter())
            .map(String::as_str)
    }

    /// Build the storage whitelist
    pub fn to_whitelist(&self) -> Whitelist {
        let whitelist = self
            .allow
            .iter()
            .fold(Whitelist::new(), |wl, (partition, prefixes)| {
                wl.allow(partition, prefixes.iter().map(String::as_str))
            });
        self.read_only
            .iter()
            .fold(whitelist, |wl, partition| wl.read_only(partition))
    }
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        let allow = [
            (partitions::EVM, vec![""]),
            (partitions::BANK, vec!["balances/"]),
            (partitions::ACC, vec!["accounts/"]),
            (partitions::WASM, vec![""]),
            (partitions::STAKING, vec!["delegations/"]),
            (partitions::GOV, vec!["votes/", "deposits/", "proposals/"]),
            (partitions::DISTRIBUTION, vec!["withdraw_addr/", "rewards/"]),
            (partitions::TRANSFER, vec!["sequence/", "packets/"]),
        ]
        .into_iter()
        .map(|(partition, prefixes)| {
            (
                partition.to_string(),
                prefixes.into_iter().map(String::from).collect(),
            )
        })
        .collect();

        Self {
            allow,
            read_only: vec![partitions::IBC.to_string(), partitions::ORACLE.to_string()],
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database directory
    pub path: String,

    /// Partitions opened by the store
    #[serde(default = "default_partitions")]
    pub partitions: Vec<String>,

    /// Committed versions that stay readable
    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,
}

fn default_partitions() -> Vec<String> {
    partitions::ALL.iter().map(|p| p.to_string()).collect()
}

fn default_keep_recent() -> usize {
    DEFAULT_KEEP_RECENT
}

impl StorageConfig {
    /// Check the path, partition names and retention
    pub fn validate(&self) -> ConfigResult<()> {
        if self.path.is_empty() {
            return Err(ConfigError::MissingField("storage.path"));
        }

        if self.partitions.is_empty() {
            return Err(ConfigError::MissingField("storage.partitions"));
        }

        for partition in &self.partitions {
            if !partitions::ALL.contains(&partition.as_str()) {
                return Err(ConfigError::UnknownPartition(partition.clone()));
            }
        }

        if self.keep_recent == 0 {
            return Err(ConfigError::MissingField("storage.keep_recent"));
        }

        Ok(())
    }

    /// RocksDB settings for this storage section, resolved against `home`
    pub fn database_config(&self, home: Option<&Path>) -> DatabaseConfig {
        let path = match home {
            Some(home) if Path::new(&self.path).is_relative() => {
                home.join(&self.path).to_string_lossy().to_string()
            }
            _ => self.path.clone(),
        };
        DatabaseConfig {
            path,
            partitions: self.partitions.clone(),
            ..DatabaseConfig::default()
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "./data".to_string(),
            partitions: default_partitions(),
            keep_recent: default_keep_recent(),
        }
    }
}

// =============================================================================
// RPC Configuration
// =============================================================================

/// Query server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// HTTP listen address
    pub http_addr: String,

    /// Maximum concurrent connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    100
}

impl RpcConfig {
    /// Check the listen address
    pub fn validate(&self) -> ConfigResult<()> {
        if self.http_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidSocketAddr(self.http_addr.clone()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::MissingField("rpc.max_connections"));
        }

        Ok(())
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:26658".to_string(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl LoggingConfig {
    /// Check level and format names
    pub fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.level.clone()));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(self.format.clone()));
        }

        Ok(())
    }

    /// Whether logs are emitted as JSON lines
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
