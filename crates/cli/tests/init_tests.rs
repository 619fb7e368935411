//! Tests for `dualvm init`

use clap::Parser;
use dualvm_cli::commands::init::{init_home, InitArgs};
use dualvm_cli::CliError;
use dualvm_config::Config;

fn args(home: &std::path::Path, extra: &[&str]) -> InitArgs {
    let home = home.to_string_lossy().to_string();
    let mut argv = vec!["init", "--home", home.as_str()];
    argv.extend_from_slice(extra);
    InitArgs::parse_from(argv)
}

#[test]
fn test_init_writes_loadable_config() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("node");
    let path = init_home(&args(&home, &["--chain-id", "dual-9", "--base-denom", "uatom"])).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.chain.chain_id, "dual-9");
    assert_eq!(config.chain.base_denom, "uatom");
    assert!(home.join(&config.storage.path).is_dir());
}

#[test]
fn test_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    init_home(&args(dir.path(), &[])).unwrap();

    let err = init_home(&args(dir.path(), &[])).unwrap_err();
    assert!(matches!(err, CliError::AlreadyInitialized(_)));

    init_home(&args(dir.path(), &["--force", "--evm-chain-id", "77"])).unwrap();
    let config = Config::load(&dir.path().join("dualvm.toml")).unwrap();
    assert_eq!(config.chain.evm_chain_id, 77);
}

#[test]
fn test_init_rejects_invalid_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let err = init_home(&args(dir.path(), &["--bech32-prefix", "Not Valid"])).unwrap_err();
    assert!(matches!(err, CliError::Config(_)));
    assert!(!dir.path().join("dualvm.toml").exists());
}
