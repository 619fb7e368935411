//! Tests for Config module

use dualvm_config::{
    ChainConfig, Config, ConfigError, EvmConfig, LoggingConfig, PointersConfig, RpcConfig,
    StorageConfig, WhitelistConfig,
};
use dualvm_evm::{module_address, PointerArtifacts, PLACEHOLDER_INIT_CODE};
use dualvm_storage::partitions;
use std::path::Path;

const SAMPLE: &str = r#"
[chain]
chain_id = "dualvm-test-1"
evm_chain_id = 4242
bech32_prefix = "test"
base_denom = "utest"

[evm]
deploy_gas_limit = 3000000
deployer = "pointer-deployer"

[pointers.native]
version = 3
init_code = "0x600160"

[pointers.erc20]
version = 2
code_id = 11

[whitelist]
read_only = ["oracle"]

[whitelist.allow]
evm = [""]
bank = ["balances/"]

[storage]
path = "db"
partitions = ["evm", "bank", "oracle"]
keep_recent = 4

[rpc]
http_addr = "127.0.0.1:9000"

[logging]
level = "debug"
format = "json"
"#;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.chain.bech32_prefix, "dual");
    assert_eq!(config.evm.deployer, "evm");
    assert_eq!(config.pointers.to_artifacts().unwrap(), PointerArtifacts::default());
    config.validate().unwrap();
}

#[test]
fn test_parse_sample() {
    let config = Config::from_str(SAMPLE).unwrap();
    assert_eq!(config.chain.chain_id, "dualvm-test-1");
    assert_eq!(config.evm.deploy_gas_limit, 3_000_000);
    assert_eq!(config.evm.message_gas_limit, EvmConfig::default().message_gas_limit);
    assert_eq!(config.storage.keep_recent, 4);
    assert!(config.logging.is_json());

    // Unset artifacts keep their defaults
    assert_eq!(config.pointers.cw20, PointersConfig::default().cw20);
    assert_eq!(config.pointers.erc721.code_id, 2);
}

#[test]
fn test_evm_params_from_config() {
    let config = Config::from_str(SAMPLE).unwrap();
    let params = config.evm_params();
    assert_eq!(params.chain_id, 4242);
    assert_eq!(params.bech32_prefix, "test");
    assert_eq!(params.base_denom, "utest");
    assert_eq!(params.deploy_gas_limit, 3_000_000);
    assert_eq!(params.deployer, module_address("pointer-deployer"));
}

#[test]
fn test_artifacts_from_config() {
    let artifacts = Config::from_str(SAMPLE).unwrap().pointers.to_artifacts().unwrap();
    assert_eq!(artifacts.native.version, 3);
    assert_eq!(artifacts.native.init_code.as_ref(), &[0x60, 0x01, 0x60]);
    assert_eq!(artifacts.cw721.init_code.as_ref(), &PLACEHOLDER_INIT_CODE);
    assert_eq!(artifacts.erc20.code_id, 11);
    assert_eq!(artifacts.erc20.version, 2);
}

#[test]
fn test_whitelist_from_config() {
    let whitelist = Config::from_str(SAMPLE).unwrap().whitelist.to_whitelist();
    assert!(whitelist.permits(partitions::EVM, b"code/1"));
    assert!(whitelist.permits(partitions::BANK, b"balances/a"));
    assert!(!whitelist.permits(partitions::BANK, b"supply/a"));
    assert!(!whitelist.permits(partitions::ORACLE, b"rates/a"));
    // Not mentioned at all
    assert!(!whitelist.permits(partitions::STAKING, b"delegations/a"));
}

#[test]
fn test_invalid_chain_id() {
    let mut config = ChainConfig::default();
    config.evm_chain_id = 0;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidChainId)));
}

#[test]
fn test_invalid_prefix_and_denom() {
    let mut config = ChainConfig::default();
    config.bech32_prefix = "Dual".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::InvalidPrefix(_))));

    let mut config = ChainConfig::default();
    config.base_denom = "1x".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::InvalidDenom(_))));
}

#[test]
fn test_invalid_gas_limit() {
    let mut config = EvmConfig::default();
    config.deploy_gas_limit = 1000;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidGasLimit {
            name: "evm.deploy_gas_limit",
            value: 1000
        })
    ));
}

#[test]
fn test_invalid_artifacts() {
    let mut config = PointersConfig::default();
    config.cw20.version = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidArtifactVersion("cw20"))
    ));

    let mut config = PointersConfig::default();
    config.native.init_code = "0xzz".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidInitCode { kind: "native", .. })
    ));

    let mut config = PointersConfig::default();
    config.erc721.code_id = 0;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidCodeId("erc721"))));
}

#[test]
fn test_unknown_partition_rejected() {
    let mut config = WhitelistConfig::default();
    config.allow.insert("nope".to_string(), vec![String::new()]);
    assert!(matches!(config.validate(), Err(ConfigError::UnknownPartition(p)) if p == "nope"));
}

#[test]
fn test_whitelisted_partition_must_be_stored() {
    let mut config = Config::default();
    config.storage.partitions = vec!["evm".to_string(), "bank".to_string()];
    assert!(matches!(
        config.validate(),
        Err(ConfigError::PartitionNotStored(_))
    ));
}

#[test]
fn test_storage_validation() {
    let mut config = StorageConfig::default();
    config.keep_recent = 0;
    assert!(config.validate().is_err());

    let mut config = StorageConfig::default();
    config.partitions = vec!["ledger".to_string()];
    assert!(matches!(config.validate(), Err(ConfigError::UnknownPartition(_))));
}

#[test]
fn test_database_config_resolves_relative_path() {
    let config = StorageConfig::default();
    let db = config.database_config(Some(Path::new("/srv/node")));
    assert_eq!(db.path, "/srv/node/./data");
    assert_eq!(db.partitions.len(), partitions::ALL.len());

    let mut config = StorageConfig::default();
    config.path = "/var/lib/dualvm".to_string();
    assert_eq!(config.database_config(Some(Path::new("/srv"))).path, "/var/lib/dualvm");
}

#[test]
fn test_invalid_rpc_addr() {
    let mut config = RpcConfig::default();
    config.http_addr = "localhost".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::InvalidSocketAddr(_))));
}

#[test]
fn test_invalid_logging() {
    let mut config = LoggingConfig::default();
    config.level = "loud".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::InvalidLogLevel(_))));

    let mut config = LoggingConfig::default();
    config.format = "xml".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::InvalidLogFormat(_))));
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dualvm.toml");
    let config = Config::from_str(SAMPLE).unwrap();
    config.save(&path).unwrap();
    assert_eq!(Config::load(&path).unwrap(), config);
}

#[test]
fn test_load_missing_file() {
    let err = Config::load(Path::new("/nonexistent/dualvm.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileRead { .. }));
}

#[test]
fn test_malformed_toml() {
    assert!(matches!(
        Config::from_str("[chain\nchain_id = 1"),
        Err(ConfigError::TomlParse(_))
    ));
}
