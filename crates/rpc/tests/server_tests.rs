//! Round trips through the pointer RPC server

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use dualvm_core::Context;
use dualvm_evm::{PointerRegistry, Querier};
use dualvm_rpc::{PointerApiClient, RpcServer, RpcServerConfig};
use dualvm_storage::{partitions, MemStore};
use dualvm_test_utils::{test_header, TEST_CHAIN_ID, TEST_PREFIX};
use dualvm_types::PointerKind;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};

const POINTER: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

async fn serve(store: &mut MemStore, commit: bool) -> (RpcServer, HttpClient) {
    let registry = PointerRegistry::new(TEST_PREFIX);
    {
        let mut ctx = Context::new(store, test_header());
        registry
            .write_pointer(&mut ctx, PointerKind::Native, "ufoo", POINTER, 1)
            .unwrap();
    }
    if commit {
        store.commit();
    }
    let querier = Querier::new(registry, Arc::new(store.reader()), TEST_CHAIN_ID);

    let config = RpcServerConfig {
        http_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
        ..RpcServerConfig::default()
    };
    let mut server = RpcServer::new(config, Arc::new(querier));
    let addr = server.start().await.unwrap();
    let client = HttpClientBuilder::default()
        .build(format!("http://{addr}"))
        .unwrap();
    (server, client)
}

#[tokio::test]
async fn test_pointer_and_pointee_round_trip() {
    let mut store = MemStore::new(partitions::ALL.iter().copied());
    let (mut server, client) = serve(&mut store, true).await;

    let found = client
        .pointer(PointerKind::Native.as_i32(), "ufoo".to_string())
        .await
        .unwrap();
    assert!(found.exists);
    assert_eq!(found.version, 1);
    assert_eq!(found.pointer.to_lowercase(), POINTER);

    let back = client
        .pointee(PointerKind::Native.as_i32(), found.pointer.clone())
        .await
        .unwrap();
    assert!(back.exists);
    assert_eq!(back.pointee, "ufoo");

    let missing = client
        .pointer(PointerKind::Native.as_i32(), "ubar".to_string())
        .await
        .unwrap();
    assert!(!missing.exists);
    assert_eq!(missing.version, 0);

    server.stop();
}

#[tokio::test]
async fn test_unsupported_kind_is_invalid_params() {
    let mut store = MemStore::new(partitions::ALL.iter().copied());
    let (mut server, client) = serve(&mut store, true).await;

    let err = client.pointer(999, "ufoo".to_string()).await.unwrap_err();
    match err {
        jsonrpsee::core::ClientError::Call(obj) => assert_eq!(obj.code(), -32602),
        other => panic!("unexpected error: {other:?}"),
    }

    server.stop();
}

#[tokio::test]
async fn test_uncommitted_state_reads_as_missing() {
    let mut store = MemStore::new(partitions::ALL.iter().copied());
    let (mut server, client) = serve(&mut store, false).await;

    let missing = client
        .pointer(PointerKind::Native.as_i32(), "ufoo".to_string())
        .await
        .unwrap();
    assert!(!missing.exists);
    assert_eq!(missing.version, 0);
    assert_eq!(missing.pointer, "0x0000000000000000000000000000000000000000");

    server.stop();
}
