//! Integration tests for whitelist-enforced message execution

mod common;

use alloy_primitives::{Address, U256};
use common::{deploy, funded, setup, setup_with, CLEARING_INIT_CODE};
use dualvm_core::{BankKeeper, Context};
use dualvm_evm::{EvmMessage, ExecutionError, PointerArtifacts, PLACEHOLDER_INIT_CODE};
use dualvm_storage::{partitions::BANK, Whitelist};
use dualvm_test_utils::{mock_address_pair, test_header, test_store, MockModules, TEST_DENOM};

/// Init code installing a runtime that writes slot 0 and then reverts
const REVERTING_INIT_CODE: [u8; 22] = [
    0x60, 0x0a, 0x60, 0x0c, 0x60, 0x00, 0x39, // codecopy(0, 12, 10)
    0x60, 0x0a, 0x60, 0x00, 0xf3, // return(0, 10)
    0x60, 0x01, 0x60, 0x00, 0x55, // runtime: sstore(0, 1)
    0x60, 0x00, 0x60, 0x00, 0xfd, // revert(0, 0)
];

#[test]
fn test_create_installs_code_and_bumps_nonce() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let (_, sender) = mock_address_pair(1);

    let contract = deploy(&keeper, &mut ctx, sender, &PLACEHOLDER_INIT_CODE);
    assert_eq!(contract, sender.create(0));
    assert_eq!(keeper.get_code(&ctx, &contract).unwrap().unwrap().as_ref(), &[0x00]);
    assert_eq!(keeper.get_nonce(&ctx, &sender).unwrap(), 1);
}

#[test]
fn test_value_moves_base_denom_balances() {
    let (keeper, mocks) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let (alice_native, alice) = funded(&mocks, &mut ctx, 1, 1_000);
    let (bob_native, bob) = mock_address_pair(2);

    let msg = EvmMessage::call(alice, bob, Vec::new()).with_value(U256::from(250u64));
    let result = keeper.execute_message(&mut ctx, &msg).unwrap();
    assert!(result.success);
    assert!(result.gas_used >= 21_000);

    assert_eq!(mocks.bank.get_balance(&ctx, &alice_native, TEST_DENOM).unwrap().amount, 750);
    assert_eq!(mocks.bank.get_balance(&ctx, &bob_native, TEST_DENOM).unwrap().amount, 250);
    assert_eq!(keeper.get_balance(&ctx, &bob).unwrap(), U256::from(250u64));
}

#[test]
fn test_clearing_storage_reports_refund() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let (_, sender) = mock_address_pair(1);
    let contract = deploy(&keeper, &mut ctx, sender, &CLEARING_INIT_CODE);
    assert_eq!(keeper.get_state(&ctx, &contract, &U256::ZERO).unwrap(), U256::from(1u8));

    let result = keeper
        .execute_message(&mut ctx, &EvmMessage::call(sender, contract, Vec::new()))
        .unwrap();
    assert!(result.success);
    // revm's capped refund for clearing one slot
    assert_eq!(result.gas_refunded, 4_800);
    assert_eq!(keeper.get_state(&ctx, &contract, &U256::ZERO).unwrap(), U256::ZERO);
}

#[test]
fn test_revert_discards_writes() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let (_, sender) = mock_address_pair(1);
    let contract = deploy(&keeper, &mut ctx, sender, &REVERTING_INIT_CODE);
    let nonce = keeper.get_nonce(&ctx, &sender).unwrap();

    let result = keeper
        .execute_message(&mut ctx, &EvmMessage::call(sender, contract, Vec::new()))
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("execution reverted"));
    assert_eq!(result.gas_refunded, 0);
    assert_eq!(keeper.get_state(&ctx, &contract, &U256::ZERO).unwrap(), U256::ZERO);
    assert_eq!(keeper.get_nonce(&ctx, &sender).unwrap(), nonce);
}

#[test]
fn test_out_of_gas_is_a_failed_result() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let (_, sender) = mock_address_pair(1);

    let msg = EvmMessage::create(sender, PLACEHOLDER_INIT_CODE.to_vec()).with_gas_limit(53_250);
    let result = keeper.execute_message(&mut ctx, &msg).unwrap();
    assert!(!result.success);
    assert!(result.contract_address.is_none());
    assert_eq!(keeper.get_code(&ctx, &sender.create(0)).unwrap(), None);
}

#[test]
fn test_write_outside_whitelist_aborts_message() {
    // EVM partition itself is not writable
    let (keeper, _) = setup_with(
        MockModules::new(),
        PointerArtifacts::default(),
        Whitelist::new().allow(BANK, ["balances/"]),
    );
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let (_, sender) = mock_address_pair(1);

    let err = keeper
        .execute_message(&mut ctx, &EvmMessage::create(sender, PLACEHOLDER_INIT_CODE.to_vec()))
        .unwrap_err();
    assert!(err.is_access_violation());
    assert!(matches!(err, ExecutionError::AccessViolation(_)));
    assert_eq!(keeper.get_nonce(&ctx, &sender).unwrap(), 0);
    assert_eq!(keeper.get_code(&ctx, &sender.create(0)).unwrap(), None);
}

#[test]
fn test_unwhitelisted_balance_write_aborts_transfer() {
    let (keeper, mocks) = setup_with(
        MockModules::new(),
        PointerArtifacts::default(),
        Whitelist::new().allow(dualvm_storage::partitions::EVM, [""]),
    );
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let (alice_native, alice) = funded(&mocks, &mut ctx, 1, 100);

    let msg = EvmMessage::call(alice, Address::repeat_byte(2), Vec::new())
        .with_value(U256::from(10u64));
    let err = keeper.execute_message(&mut ctx, &msg).unwrap_err();
    assert!(err.is_access_violation());
    assert_eq!(mocks.bank.get_balance(&ctx, &alice_native, TEST_DENOM).unwrap().amount, 100);
}
