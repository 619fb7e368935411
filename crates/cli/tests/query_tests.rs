//! End-to-end pointer queries: store on disk, server, CLI client

use clap::Parser;
use dualvm_cli::commands::init::{init_home, InitArgs};
use dualvm_cli::commands::query::{fetch_pointee, fetch_pointer, PointeeArgs, PointerArgs};
use dualvm_cli::commands::serve::open_querier;
use dualvm_cli::CliError;
use dualvm_config::Config;
use dualvm_core::Context;
use dualvm_evm::PointerRegistry;
use dualvm_rpc::{RpcServer, RpcServerConfig};
use dualvm_storage::Database;
use dualvm_test_utils::test_header;
use dualvm_types::PointerKind;
use std::sync::Arc;

const POINTER: &str = "0x1111111111111111111111111111111111111111";

#[tokio::test]
async fn test_query_against_served_store() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().to_string_lossy().to_string();
    let config_path = init_home(&InitArgs::parse_from(["init", "--home", home.as_str()])).unwrap();
    let config = Config::load(&config_path).unwrap();

    {
        let mut db = Database::open(config.storage.database_config(Some(dir.path()))).unwrap();
        let mut ctx = Context::new(&mut db, test_header());
        PointerRegistry::new(&config.chain.bech32_prefix)
            .write_pointer(&mut ctx, PointerKind::Native, "ufoo", POINTER, 1)
            .unwrap();
    }

    let querier = open_querier(&config, Some(dir.path())).unwrap();
    let server_config = RpcServerConfig {
        http_addr: "127.0.0.1:0".parse().unwrap(),
        ..RpcServerConfig::default()
    };
    let mut server = RpcServer::new(server_config, Arc::new(querier));
    let addr = server.start().await.unwrap();
    let rpc = format!("http://{addr}");

    let found = fetch_pointer(&PointerArgs::parse_from(["pointer", "native", "ufoo", "--rpc", &rpc]))
        .await
        .unwrap();
    assert!(found.exists);
    assert_eq!(found.pointer.to_lowercase(), POINTER);

    let back = fetch_pointee(&PointeeArgs::parse_from(["pointee", "2", POINTER, "--rpc", &rpc]))
        .await
        .unwrap();
    assert_eq!(back.pointee, "ufoo");
    assert_eq!(back.version, 1);

    let err = fetch_pointer(&PointerArgs::parse_from(["pointer", "999", "ufoo", "--rpc", &rpc]))
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::Rpc(_)));

    server.stop();
}

#[tokio::test]
async fn test_unknown_kind_name_fails_before_connecting() {
    let args = PointerArgs::parse_from(["pointer", "erc1155", "ufoo", "--rpc", "http://127.0.0.1:1"]);
    assert!(matches!(fetch_pointer(&args).await, Err(CliError::InvalidArgument(_))));
}
