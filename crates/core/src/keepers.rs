//! The set of native modules the bridge is wired to.

use std::sync::Arc;

use crate::traits::{
    AccountKeeper, BankKeeper, ChannelKeeper, ClientKeeper, ConnectionKeeper, DistributionKeeper,
    EvmBalanceKeeper, GovKeeper, OracleKeeper, StakingKeeper, StakingQuerier, TransferKeeper,
    WasmdKeeper, WasmdViewKeeper,
};

/// Native module implementations, one per capability trait.
///
/// The bundle is only held by host-side wiring. Each consumer is handed the
/// individual `Arc`s it needs, never the bundle.
#[derive(Clone)]
pub struct Keepers {
    /// Ledger balances
    pub bank: Arc<dyn BankKeeper>,
    /// Balance reconciliation for the EVM state adapter
    pub evm_balance: Arc<dyn EvmBalanceKeeper>,
    /// Account records
    pub account: Arc<dyn AccountKeeper>,
    /// Oracle rates
    pub oracle: Arc<dyn OracleKeeper>,
    /// Contract execution
    pub wasmd: Arc<dyn WasmdKeeper>,
    /// Contract queries
    pub wasmd_view: Arc<dyn WasmdViewKeeper>,
    /// Delegation changes
    pub staking: Arc<dyn StakingKeeper>,
    /// Delegation lookups
    pub staking_querier: Arc<dyn StakingQuerier>,
    /// Votes and deposits
    pub gov: Arc<dyn GovKeeper>,
    /// Rewards
    pub distribution: Arc<dyn DistributionKeeper>,
    /// Outbound transfers
    pub transfer: Arc<dyn TransferKeeper>,
    /// Light clients
    pub client: Arc<dyn ClientKeeper>,
    /// Connections
    pub connection: Arc<dyn ConnectionKeeper>,
    /// Channels
    pub channel: Arc<dyn ChannelKeeper>,
}
