//! Test support for the dual-VM bridge.
//!
//! Every mock module keeps its state in its own partition of the context
//! store, so whatever whitelist wraps the context also governs the mocks.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod account;
mod bank;
mod distribution;
mod gov;
mod ibc;
mod oracle;
mod staking;
mod transfer;
mod wasm;

pub use account::MockAccounts;
pub use bank::MockBank;
pub use distribution::MockDistribution;
pub use gov::{MockGov, Proposal};
pub use ibc::MockIbc;
pub use oracle::{MockOracle, VoteCounters};
pub use staking::{MockStaking, UNBONDING_SECONDS};
pub use transfer::MockTransfer;
pub use wasm::{ContractInfo, MockWasm};

use std::sync::Arc;

use dualvm_core::{BlockHeader, Context, KeeperResult, Keepers};
use dualvm_storage::{partitions, MemStore};
use dualvm_types::{default_native_address, EvmAddress, NativeAddress};
use serde::{de::DeserializeOwned, Serialize};

/// Bech32 prefix used throughout the tests
pub const TEST_PREFIX: &str = "dual";

/// Chain id used throughout the tests
pub const TEST_CHAIN_ID: &str = "dual-test-1";

/// Base denomination used throughout the tests
pub const TEST_DENOM: &str = "udual";

/// A store holding every bridge partition
pub fn test_store() -> MemStore {
    MemStore::new(partitions::ALL.iter().copied())
}

/// Header of block 1 at a fixed time
pub fn test_header() -> BlockHeader {
    BlockHeader {
        height: 1,
        time: 1_700_000_000,
        chain_id: TEST_CHAIN_ID.to_string(),
    }
}

/// A native account and the EVM address it maps to by default
pub fn mock_address_pair(seed: u8) -> (NativeAddress, EvmAddress) {
    let evm = EvmAddress::from([seed; 20]);
    let native = default_native_address(&evm, TEST_PREFIX).expect("valid test prefix");
    (native, evm)
}

/// A 32-byte native contract address derived from `seed`
pub fn mock_contract_address(seed: u8) -> NativeAddress {
    NativeAddress::new(TEST_PREFIX, vec![seed; 32]).expect("valid test prefix")
}

/// One instance of every mock module
#[derive(Clone)]
pub struct MockModules {
    /// Balances
    pub bank: Arc<MockBank>,
    /// Accounts
    pub account: Arc<MockAccounts>,
    /// Native contracts
    pub wasm: Arc<MockWasm>,
    /// Delegations
    pub staking: Arc<MockStaking>,
    /// Proposals
    pub gov: Arc<MockGov>,
    /// Rewards
    pub distribution: Arc<MockDistribution>,
    /// Outbound transfers
    pub transfer: Arc<MockTransfer>,
    /// Light clients, connections and channels
    pub ibc: Arc<MockIbc>,
    /// Rates
    pub oracle: Arc<MockOracle>,
}

impl MockModules {
    /// Modules using [`TEST_PREFIX`]
    pub fn new() -> Self {
        Self::with_wasm(MockWasm::new(TEST_PREFIX))
    }

    /// Modules using a custom contract mock
    pub fn with_wasm(wasm: MockWasm) -> Self {
        let bank = Arc::new(MockBank::new());
        Self {
            account: Arc::new(MockAccounts::new()),
            wasm: Arc::new(wasm),
            staking: Arc::new(MockStaking::new(bank.clone())),
            gov: Arc::new(MockGov::new(bank.clone())),
            bank,
            distribution: Arc::new(MockDistribution::new()),
            transfer: Arc::new(MockTransfer::new()),
            ibc: Arc::new(MockIbc::new()),
            oracle: Arc::new(MockOracle::new()),
        }
    }

    /// The keeper bundle backed by these mocks
    pub fn keepers(&self) -> Keepers {
        Keepers {
            bank: self.bank.clone(),
            evm_balance: self.bank.clone(),
            account: self.account.clone(),
            oracle: self.oracle.clone(),
            wasmd: self.wasm.clone(),
            wasmd_view: self.wasm.clone(),
            staking: self.staking.clone(),
            staking_querier: self.staking.clone(),
            gov: self.gov.clone(),
            distribution: self.distribution.clone(),
            transfer: self.transfer.clone(),
            client: self.ibc.clone(),
            connection: self.ibc.clone(),
            channel: self.ibc.clone(),
        }
    }
}

impl Default for MockModules {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn read<T: DeserializeOwned>(
    ctx: &Context<'_>,
    partition: &str,
    key: &str,
) -> KeeperResult<Option<T>> {
    match ctx.get(partition, key.as_bytes())? {
        Some(bytes) => Ok(Some(dualvm_storage::decode(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn write<T: Serialize>(
    ctx: &mut Context<'_>,
    partition: &str,
    key: &str,
    value: &T,
) -> KeeperResult<()> {
    let bytes = dualvm_storage::encode(value)?;
    ctx.kv_store(partition)?.set(key.as_bytes(), bytes)?;
    Ok(())
}

pub(crate) fn remove(ctx: &mut Context<'_>, partition: &str, key: &str) -> KeeperResult<()> {
    ctx.kv_store(partition)?.delete(key.as_bytes())?;
    Ok(())
}

/// Decoded `(key suffix, value)` pairs under a string prefix
pub(crate) fn scan<T: DeserializeOwned>(
    ctx: &Context<'_>,
    partition: &str,
    prefix: &str,
) -> KeeperResult<Vec<(String, T)>> {
    ctx.prefix_scan(partition, prefix.as_bytes())?
        .into_iter()
        .map(|(key, value)| -> KeeperResult<(String, T)> {
            let suffix = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            Ok((suffix, dualvm_storage::decode(&value)?))
        })
        .collect()
}
