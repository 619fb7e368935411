//! Integration tests for the native/EVM address mapping

mod common;

use alloy_primitives::Address;
use common::setup;
use dualvm_core::{AddressMapper, Context};
use dualvm_test_utils::{mock_address_pair, mock_contract_address, test_header, test_store};
use dualvm_types::NativeAddress;

#[test]
fn test_default_mapping_keeps_address_bytes() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let ctx = Context::new(&mut store, test_header());
    let (native, evm) = mock_address_pair(3);

    assert_eq!(keeper.get_evm_address(&ctx, &native).unwrap(), None);
    assert_eq!(keeper.get_native_address(&ctx, &evm).unwrap(), None);
    assert_eq!(keeper.get_evm_address_or_default(&ctx, &native).unwrap(), evm);
    assert_eq!(keeper.get_native_address_or_default(&ctx, &evm).unwrap(), native);
}

#[test]
fn test_contract_address_defaults_to_trailing_bytes() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let ctx = Context::new(&mut store, test_header());
    let contract = mock_contract_address(7);

    let evm = keeper.get_evm_address_or_default(&ctx, &contract).unwrap();
    assert_eq!(evm, Address::from([7u8; 20]));
}

#[test]
fn test_explicit_mapping_overrides_default() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let (native, _) = mock_address_pair(4);
    let evm = Address::repeat_byte(0x44);

    keeper.set_address_mapping(&mut ctx, &native, &evm).unwrap();
    assert_eq!(keeper.get_evm_address(&ctx, &native).unwrap(), Some(evm));
    assert_eq!(keeper.get_native_address(&ctx, &evm).unwrap(), Some(native.clone()));

    // Same pair again is fine
    keeper.set_address_mapping(&mut ctx, &native, &evm).unwrap();
}

#[test]
fn test_mapping_is_one_to_one() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let (native, _) = mock_address_pair(5);
    let (other, _) = mock_address_pair(6);
    let evm = Address::repeat_byte(0x55);

    keeper.set_address_mapping(&mut ctx, &native, &evm).unwrap();
    assert!(keeper
        .set_address_mapping(&mut ctx, &native, &Address::repeat_byte(0x56))
        .is_err());
    assert!(keeper.set_address_mapping(&mut ctx, &other, &evm).is_err());
}

#[test]
fn test_mapping_rejects_foreign_prefix() {
    let (keeper, _) = setup();
    let mut store = test_store();
    let mut ctx = Context::new(&mut store, test_header());
    let foreign = NativeAddress::new("cosmos", vec![9u8; 20]).unwrap();

    assert!(keeper
        .set_address_mapping(&mut ctx, &foreign, &Address::repeat_byte(9))
        .is_err());
}
