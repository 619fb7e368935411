//! Read-only oracle data.

use dualvm_types::NativeAddress;
use serde::{Deserialize, Serialize};

use crate::{Context, KeeperResult};

/// Latest aggregated rate of one denomination. Decimals are kept as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleExchangeRate {
    /// Exchange rate against the base currency
    pub exchange_rate: String,
    /// Block height of the last update
    pub last_update: u64,
    /// Unix time of the last update
    pub last_update_timestamp: u64,
}

/// Time weighted average price over a look-back window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleTwap {
    /// Denomination
    pub denom: String,
    /// Average rate
    pub twap: String,
    /// Window actually covered
    pub lookback_seconds: u64,
}

/// Rates recorded at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Unix time
    pub timestamp: u64,
    /// `(denom, rate)` pairs
    pub rates: Vec<(String, OracleExchangeRate)>,
}

/// Oracle state visible to VM-crossing callers
pub trait OracleKeeper: Send + Sync {
    /// Current rates, ordered by denomination
    fn base_exchange_rates(&self, ctx: &Context<'_>)
        -> KeeperResult<Vec<(String, OracleExchangeRate)>>;

    /// Averages over the last `lookback_seconds`
    fn calculate_twaps(&self, ctx: &Context<'_>, lookback_seconds: u64)
        -> KeeperResult<Vec<OracleTwap>>;

    /// Denominations validators vote on
    fn vote_targets(&self, ctx: &Context<'_>) -> KeeperResult<Vec<String>>;

    /// Stored price history
    fn price_snapshots(&self, ctx: &Context<'_>) -> KeeperResult<Vec<PriceSnapshot>>;

    /// Feeder account delegated by a validator
    fn feeder_delegation(&self, ctx: &Context<'_>, validator: &NativeAddress)
        -> KeeperResult<Option<NativeAddress>>;

    /// Missed votes of a validator in the current window
    fn miss_count(&self, ctx: &Context<'_>, validator: &NativeAddress) -> KeeperResult<u64>;

    /// Abstained votes of a validator in the current window
    fn abstain_count(&self, ctx: &Context<'_>, validator: &NativeAddress) -> KeeperResult<u64>;

    /// Successful votes of a validator in the current window
    fn success_count(&self, ctx: &Context<'_>, validator: &NativeAddress) -> KeeperResult<u64>;
}
