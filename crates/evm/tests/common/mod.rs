//! Shared fixtures for the EVM integration tests

#![allow(dead_code)]

use alloy_primitives::{Address, U256};
use dualvm_core::{Context, WasmdKeeper};
use dualvm_evm::abi::{self, Token};
use dualvm_evm::{EvmKeeper, EvmMessage, EvmParams, MessageResult, PointerArtifacts};
use dualvm_storage::{
    partitions::{ACC, BANK, DISTRIBUTION, EVM, GOV, STAKING, TRANSFER, WASM},
    Whitelist,
};
use dualvm_test_utils::{mock_address_pair, MockModules, TEST_DENOM, TEST_PREFIX};
use dualvm_types::{Coin, NativeAddress};

/// Init code that stores 1 in slot 0 and installs a runtime clearing it
pub const CLEARING_INIT_CODE: [u8; 23] = [
    0x60, 0x01, 0x60, 0x00, 0x55, // sstore(0, 1)
    0x60, 0x06, 0x60, 0x11, 0x60, 0x00, 0x39, // codecopy(0, 17, 6)
    0x60, 0x06, 0x60, 0x00, 0xf3, // return(0, 6)
    0x60, 0x00, 0x60, 0x00, 0x55, 0x00, // runtime: sstore(0, 0) stop
];

/// How a forwarding contract calls its target and what it does after
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forward {
    /// CALL with the attached value, reverting if the call failed
    Call,
    /// STATICCALL, reverting if the call failed
    StaticCall,
    /// CALL with the attached value, then revert
    CallThenRevert,
    /// CALL with the attached value, then stop whatever the outcome
    CallIgnoringFailure,
}

/// Init code of a contract passing its calldata on to `target`
pub fn forwarder_init_code(target: Address, forward: Forward) -> Vec<u8> {
    // calldatacopy(0, 0, calldatasize)
    let mut runtime = vec![0x36, 0x60, 0x00, 0x60, 0x00, 0x37];
    // retSize, retOffset, argsSize, argsOffset
    runtime.extend_from_slice(&[0x60, 0x00, 0x60, 0x00, 0x36, 0x60, 0x00]);
    if forward != Forward::StaticCall {
        runtime.push(0x34); // callvalue
    }
    runtime.push(0x73); // push20
    runtime.extend_from_slice(target.as_slice());
    runtime.push(0x5a); // gas
    runtime.push(if forward == Forward::StaticCall { 0xfa } else { 0xf1 });
    match forward {
        Forward::Call | Forward::StaticCall => {
            let ok = runtime.len() as u8 + 8;
            // jumpi(ok, success) revert(0, 0) ok: stop
            runtime.extend_from_slice(&[0x60, ok, 0x57, 0x60, 0x00, 0x60, 0x00, 0xfd, 0x5b, 0x00]);
        }
        Forward::CallThenRevert => {
            runtime.extend_from_slice(&[0x50, 0x60, 0x00, 0x60, 0x00, 0xfd]);
        }
        Forward::CallIgnoringFailure => runtime.extend_from_slice(&[0x50, 0x00]),
    }

    // codecopy(0, 11, len) return(0, len)
    let mut code = vec![0x60, runtime.len() as u8, 0x80, 0x60, 0x0b, 0x60, 0x00, 0x39, 0x60, 0x00, 0xf3];
    code.extend(runtime);
    code
}

/// The whitelist a chain would hand EVM messages
pub fn message_whitelist() -> Whitelist {
    Whitelist::new()
        .allow(EVM, [""])
        .allow(BANK, ["balances/"])
        .allow(ACC, ["accounts/"])
        .allow(WASM, [""])
        .allow(STAKING, ["delegations/"])
        .allow(GOV, ["votes/", "deposits/", "proposals/"])
        .allow(DISTRIBUTION, ["withdraw_addr/", "rewards/"])
        .allow(TRANSFER, ["sequence/", "packets/"])
}

/// Keeper over fresh mocks with the default artifacts and message whitelist
pub fn setup() -> (EvmKeeper, MockModules) {
    setup_with(MockModules::new(), PointerArtifacts::default(), message_whitelist())
}

/// Keeper over the given mocks, artifacts and whitelist
pub fn setup_with(
    mocks: MockModules,
    artifacts: PointerArtifacts,
    whitelist: Whitelist,
) -> (EvmKeeper, MockModules) {
    let keeper = EvmKeeper::new(
        EvmParams::new(TEST_PREFIX, TEST_DENOM),
        artifacts,
        whitelist,
        &mocks.keepers(),
    );
    (keeper, mocks)
}

/// A second keeper sharing `mocks`, e.g. after an artifact upgrade
pub fn keeper_for(mocks: &MockModules, artifacts: PointerArtifacts) -> EvmKeeper {
    EvmKeeper::new(
        EvmParams::new(TEST_PREFIX, TEST_DENOM),
        artifacts,
        message_whitelist(),
        &mocks.keepers(),
    )
}

/// A funded native account and its EVM address
pub fn funded(mocks: &MockModules, ctx: &mut Context<'_>, seed: u8, amount: u128) -> (NativeAddress, Address) {
    let (native, evm) = mock_address_pair(seed);
    mocks
        .bank
        .mint(ctx, &native, &Coin::new(TEST_DENOM, amount))
        .unwrap();
    (native, evm)
}

/// Deploy `init_code` from `from` on the enforced path
pub fn deploy(keeper: &EvmKeeper, ctx: &mut Context<'_>, from: Address, init_code: &[u8]) -> Address {
    let result = keeper
        .execute_message(ctx, &EvmMessage::create(from, init_code.to_vec()))
        .unwrap();
    assert!(result.success, "deploy failed: {:?}", result.error);
    result.contract_address.unwrap()
}

/// A CW-20 contract instantiated on the mock wasm module
pub fn cw20_contract(mocks: &MockModules, ctx: &mut Context<'_>) -> NativeAddress {
    let (creator, _) = mock_address_pair(90);
    let (addr, _) = mocks
        .wasm
        .instantiate(
            ctx,
            5,
            &creator,
            None,
            br#"{"name":"Dual Token","symbol":"DTK","decimals":6}"#,
            "dtk",
            &[],
        )
        .unwrap();
    addr
}

/// A CW-721 collection instantiated on the mock wasm module
pub fn cw721_contract(mocks: &MockModules, ctx: &mut Context<'_>) -> NativeAddress {
    let (creator, _) = mock_address_pair(91);
    let (addr, _) = mocks
        .wasm
        .instantiate(
            ctx,
            6,
            &creator,
            None,
            br#"{"name":"Dual Punks","symbol":"DPK"}"#,
            "dpk",
            &[],
        )
        .unwrap();
    addr
}

/// Call `signature` on the precompile at `to`
pub fn call(
    keeper: &EvmKeeper,
    ctx: &mut Context<'_>,
    from: Address,
    to: Address,
    signature: &str,
    args: &[Token],
) -> MessageResult {
    call_with_value(keeper, ctx, from, to, signature, args, 0)
}

/// Call `signature` on the precompile at `to` with attached value
pub fn call_with_value(
    keeper: &EvmKeeper,
    ctx: &mut Context<'_>,
    from: Address,
    to: Address,
    signature: &str,
    args: &[Token],
    value: u128,
) -> MessageResult {
    let data = abi::encode_call(abi::selector(signature), args);
    let msg = EvmMessage::call(from, to, data).with_value(U256::from(value));
    keeper.execute_message(ctx, &msg).unwrap()
}
