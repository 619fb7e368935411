//! Integration tests for pointer upsert and lookups

mod common;

use std::sync::Arc;

use alloy_primitives::{Address, Bytes};
use common::{cw20_contract, cw721_contract, deploy, funded, keeper_for, message_whitelist, setup, setup_with};
use dualvm_core::{Context, PointerReader};
use dualvm_evm::{
    EvmArtifact, PointerArtifacts, PointerError, Querier, QueryError, PLACEHOLDER_INIT_CODE,
};
use dualvm_storage::MemStore;
use dualvm_test_utils::{test_header, test_store, MockModules, MockWasm, TEST_CHAIN_ID};
use dualvm_types::{DenomMetadata, PointerKind, ZERO_EVM_ADDRESS_HEX};

fn bumped(artifacts: &PointerArtifacts, kind: PointerKind) -> PointerArtifacts {
    let mut next = artifacts.clone();
    match kind {
        PointerKind::Native => next.native.version += 1,
        PointerKind::Cw20 => next.cw20.version += 1,
        PointerKind::Cw721 => next.cw721.version += 1,
        PointerKind::Erc20 => next.erc20.version += 1,
        PointerKind::Erc721 => next.erc721.version += 1,
    }
    next
}

#[test]
fn test_native_pointer_deploys_and_round_trips() {
    let (keeper, mocks) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    mocks
        .bank
        .set_denom_metadata(&mut ctx, &DenomMetadata {
            base: "ufoo".into(),
            display: "foo".into(),
            name: "Foo".into(),
            symbol: "FOO".into(),
            decimals: 6,
        })
        .unwrap();

    let pointer = keeper
        .upsert_pointer(&mut ctx, PointerKind::Native, "ufoo")
        .unwrap();
    let address: Address = pointer.parse().unwrap();
    assert_eq!(
        keeper.get_code(&ctx, &address).unwrap(),
        Some(Bytes::from_static(&[0x00]))
    );

    let forward = keeper
        .resolve_pointer(&ctx, PointerKind::Native, "ufoo")
        .unwrap();
    assert!(forward.exists);
    assert_eq!(forward.version, 1);
    assert_eq!(forward.address, pointer);

    let back = keeper
        .resolve_asset(&ctx, PointerKind::Native, &pointer.to_lowercase())
        .unwrap();
    assert_eq!(back.address, "ufoo");
    assert_eq!(back.version, 1);
}

#[test]
fn test_upsert_is_idempotent() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());

    let first = keeper
        .upsert_pointer(&mut ctx, PointerKind::Native, "ufoo")
        .unwrap();
    let deployer_nonce = keeper.get_nonce(&ctx, &keeper.params().deployer).unwrap();
    let second = keeper
        .upsert_pointer(&mut ctx, PointerKind::Native, "ufoo")
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        keeper.get_nonce(&ctx, &keeper.params().deployer).unwrap(),
        deployer_nonce
    );
}

#[test]
fn test_distinct_assets_get_distinct_pointers() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());

    let foo = keeper
        .upsert_pointer(&mut ctx, PointerKind::Native, "ufoo")
        .unwrap();
    let bar = keeper
        .upsert_pointer(&mut ctx, PointerKind::Native, "ubar")
        .unwrap();
    assert_ne!(foo, bar);
}

#[test]
fn test_upgrade_keeps_address_and_bumps_version() {
    let (keeper, mocks) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let original = keeper
        .upsert_pointer(&mut ctx, PointerKind::Native, "ufoo")
        .unwrap();

    // new artifact: init code returning the runtime `0x01`
    let mut artifacts = bumped(keeper.artifacts(), PointerKind::Native);
    let mut init = PLACEHOLDER_INIT_CODE.to_vec();
    init[12] = 0x01;
    artifacts.native = EvmArtifact {
        version: 2,
        init_code: init.into(),
    };
    let upgraded = keeper_for(&mocks, artifacts);

    let address = upgraded
        .upsert_pointer(&mut ctx, PointerKind::Native, "ufoo")
        .unwrap();
    assert_eq!(address, original);

    let record = upgraded
        .resolve_pointer(&ctx, PointerKind::Native, "ufoo")
        .unwrap();
    assert_eq!(record.version, 2);
    let parsed: Address = address.parse().unwrap();
    assert_eq!(
        upgraded.get_code(&ctx, &parsed).unwrap(),
        Some(Bytes::from_static(&[0x01]))
    );
}

#[test]
fn test_newer_recorded_version_is_left_alone() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let recorded = Address::repeat_byte(0x42).to_string();
    keeper
        .registry()
        .write_pointer(&mut ctx, PointerKind::Native, "ufoo", &recorded, 9)
        .unwrap();

    let address = keeper
        .upsert_pointer(&mut ctx, PointerKind::Native, "ufoo")
        .unwrap();
    assert_eq!(address, recorded);
    assert_eq!(
        keeper
            .resolve_pointer(&ctx, PointerKind::Native, "ufoo")
            .unwrap()
            .version,
        9
    );
}

#[test]
fn test_invalid_asset_keys_are_rejected() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());

    assert!(matches!(
        keeper.upsert_pointer(&mut ctx, PointerKind::Native, ""),
        Err(PointerError::InvalidAssetKey { .. })
    ));
    assert!(matches!(
        keeper.upsert_pointer(&mut ctx, PointerKind::Cw20, "0x1234"),
        Err(PointerError::InvalidAssetKey { .. })
    ));
    assert!(matches!(
        keeper.upsert_pointer(&mut ctx, PointerKind::Erc20, "not-an-address"),
        Err(PointerError::InvalidAssetKey { .. })
    ));
}

#[test]
fn test_failed_evm_deploy_records_nothing() {
    let mut artifacts = PointerArtifacts::default();
    artifacts.native.init_code = Bytes::from_static(&[0xfe]);
    let (keeper, _) = setup_with(MockModules::new(), artifacts, message_whitelist());
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());

    let err = keeper
        .upsert_pointer(&mut ctx, PointerKind::Native, "ufoo")
        .unwrap_err();
    assert!(matches!(err, PointerError::Deploy(_)));
    assert!(!keeper
        .resolve_pointer(&ctx, PointerKind::Native, "ufoo")
        .unwrap()
        .exists);
    assert_eq!(keeper.get_nonce(&ctx, &keeper.params().deployer).unwrap(), 0);
}

#[test]
fn test_cw20_pointer_uses_token_info() {
    let (keeper, mocks) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let cw20 = cw20_contract(&mocks, &mut ctx);

    let pointer = keeper
        .upsert_pointer(&mut ctx, PointerKind::Cw20, &cw20.to_string())
        .unwrap();
    let back = keeper
        .resolve_asset(&ctx, PointerKind::Cw20, &pointer)
        .unwrap();
    assert_eq!(back.address, cw20.to_string());

    // a CW20 without a contract behind it cannot be wrapped
    let missing = dualvm_test_utils::mock_contract_address(77);
    assert!(matches!(
        keeper.upsert_pointer(&mut ctx, PointerKind::Cw20, &missing.to_string()),
        Err(PointerError::Deploy(_))
    ));
}

#[test]
fn test_erc20_pointer_instantiates_wasm_contract() {
    let (keeper, mocks) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let (_, owner) = funded(&mocks, &mut ctx, 1, 0);
    let token = deploy(&keeper, &mut ctx, owner, &PLACEHOLDER_INIT_CODE);

    let pointer = keeper
        .upsert_pointer(&mut ctx, PointerKind::Erc20, &token.to_string())
        .unwrap();
    let contract = pointer.parse().unwrap();
    let info = mocks.wasm.contract(&ctx, &contract).unwrap().unwrap();
    assert_eq!(info.code_id, keeper.artifacts().erc20.code_id);
    assert_eq!(info.admin, Some(keeper.deployer_native(&ctx).unwrap()));
    let state: serde_json::Value = serde_json::from_slice(&info.state).unwrap();
    assert_eq!(state["erc20_address"], token.to_string());

    let back = keeper
        .resolve_asset(&ctx, PointerKind::Erc20, &pointer)
        .unwrap();
    assert_eq!(back.address, token.to_string());
}

#[test]
fn test_cw721_pointer_round_trips() {
    let (keeper, mocks) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let collection = cw721_contract(&mocks, &mut ctx);

    let pointer = keeper
        .upsert_pointer(&mut ctx, PointerKind::Cw721, &collection.to_string())
        .unwrap();
    let address: Address = pointer.parse().unwrap();
    assert!(keeper.get_code(&ctx, &address).unwrap().is_some());

    let forward = keeper
        .resolve_pointer(&ctx, PointerKind::Cw721, &collection.to_string())
        .unwrap();
    assert!(forward.exists);
    assert_eq!(forward.version, 1);
    assert_eq!(forward.address, pointer);

    let back = keeper
        .resolve_asset(&ctx, PointerKind::Cw721, &forward.address)
        .unwrap();
    assert!(back.exists);
    assert_eq!(back.address, collection.to_string());
}

#[test]
fn test_erc721_pointer_round_trips() {
    let (keeper, mocks) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let (_, owner) = funded(&mocks, &mut ctx, 2, 0);
    let collection = deploy(&keeper, &mut ctx, owner, &PLACEHOLDER_INIT_CODE);

    let pointer = keeper
        .upsert_pointer(&mut ctx, PointerKind::Erc721, &collection.to_string())
        .unwrap();
    let contract = pointer.parse().unwrap();
    let info = mocks.wasm.contract(&ctx, &contract).unwrap().unwrap();
    assert_eq!(info.code_id, keeper.artifacts().erc721.code_id);
    let state: serde_json::Value = serde_json::from_slice(&info.state).unwrap();
    assert_eq!(state["erc721_address"], collection.to_string());

    let forward = keeper
        .resolve_pointer(&ctx, PointerKind::Erc721, &collection.to_string())
        .unwrap();
    assert!(forward.exists);
    assert_eq!(forward.version, 1);
    assert_eq!(forward.address, pointer);

    let back = keeper
        .resolve_asset(&ctx, PointerKind::Erc721, &forward.address)
        .unwrap();
    assert!(back.exists);
    assert_eq!(back.address, collection.to_string());
}

#[test]
fn test_erc20_upgrade_migrates_in_place() {
    let (keeper, mocks) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let (_, owner) = funded(&mocks, &mut ctx, 1, 0);
    let token = deploy(&keeper, &mut ctx, owner, &PLACEHOLDER_INIT_CODE);
    let original = keeper
        .upsert_pointer(&mut ctx, PointerKind::Erc20, &token.to_string())
        .unwrap();

    let mut artifacts = bumped(keeper.artifacts(), PointerKind::Erc20);
    artifacts.erc20.code_id = 11;
    let upgraded = keeper_for(&mocks, artifacts);
    let address = upgraded
        .upsert_pointer(&mut ctx, PointerKind::Erc20, &token.to_string())
        .unwrap();

    assert_eq!(address, original);
    let info = mocks
        .wasm
        .contract(&ctx, &address.parse().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(info.code_id, 11);
    assert_eq!(
        upgraded
            .resolve_pointer(&ctx, PointerKind::Erc20, &token.to_string())
            .unwrap()
            .version,
        2
    );
}

#[test]
fn test_failed_wasm_instantiate_records_nothing() {
    let artifacts = PointerArtifacts::default();
    let mocks = MockModules::with_wasm(
        MockWasm::new(dualvm_test_utils::TEST_PREFIX).with_failing_code(artifacts.erc20.code_id),
    );
    let (keeper, mocks) = setup_with(mocks, artifacts, message_whitelist());
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let (_, owner) = funded(&mocks, &mut ctx, 1, 0);
    let token = deploy(&keeper, &mut ctx, owner, &PLACEHOLDER_INIT_CODE);

    assert!(matches!(
        keeper.upsert_pointer(&mut ctx, PointerKind::Erc20, &token.to_string()),
        Err(PointerError::Deploy(_))
    ));
    assert!(!keeper
        .resolve_pointer(&ctx, PointerKind::Erc20, &token.to_string())
        .unwrap()
        .exists);
}

#[test]
fn test_erc20_pointer_needs_contract_code() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());

    assert!(matches!(
        keeper.upsert_pointer(&mut ctx, PointerKind::Erc20, &Address::repeat_byte(7).to_string()),
        Err(PointerError::Deploy(_))
    ));
}

#[test]
fn test_pointers_cannot_be_wrapped_again() {
    let (keeper, mocks) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());

    // NATIVE pointer is an EVM contract; wrapping it as an ERC20 is refused
    let native_pointer = keeper
        .upsert_pointer(&mut ctx, PointerKind::Native, "ufoo")
        .unwrap();
    assert!(matches!(
        keeper.upsert_pointer(&mut ctx, PointerKind::Erc20, &native_pointer),
        Err(PointerError::Deploy(_))
    ));

    // ERC20 pointer is a wasm contract; wrapping it as a CW20 is refused
    let (_, owner) = funded(&mocks, &mut ctx, 1, 0);
    let token = deploy(&keeper, &mut ctx, owner, &PLACEHOLDER_INIT_CODE);
    let wasm_pointer = keeper
        .upsert_pointer(&mut ctx, PointerKind::Erc20, &token.to_string())
        .unwrap();
    assert!(matches!(
        keeper.upsert_pointer(&mut ctx, PointerKind::Cw20, &wasm_pointer),
        Err(PointerError::Deploy(_))
    ));
}

#[test]
fn test_registered_and_unregistered_queries() {
    let (keeper, _) = setup();
    let mut store = MemStore::new(dualvm_storage::partitions::ALL.iter().copied());
    let reader = store.reader();
    let registered = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
    {
        let mut ctx = Context::new(&mut store, test_header());
        keeper
            .set_pointer(&mut ctx, PointerKind::Native, "ufoo", registered)
            .unwrap();
    }
    store.commit();
    let querier = Querier::new(keeper.registry().clone(), Arc::new(reader), TEST_CHAIN_ID);

    let found = querier
        .pointer(PointerKind::Native.as_i32(), "ufoo")
        .unwrap();
    assert!(found.exists);
    assert_eq!(found.version, 1);
    assert_eq!(found.pointer.to_lowercase(), registered.to_lowercase());

    let unknown = querier
        .pointee(
            PointerKind::Native.as_i32(),
            "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB",
        )
        .unwrap();
    assert_eq!(unknown.pointee, "");
    assert_eq!(unknown.version, 0);
    assert!(!unknown.exists);

    let malformed = querier
        .pointee(PointerKind::Erc20.as_i32(), "not-a-bech32-address")
        .unwrap();
    assert_eq!(malformed.pointee, ZERO_EVM_ADDRESS_HEX);
    assert!(!malformed.exists);

    assert!(matches!(
        querier.pointer(42, "ufoo"),
        Err(QueryError::Unsupported(42))
    ));
}
