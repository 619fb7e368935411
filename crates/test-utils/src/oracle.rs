use std::collections::BTreeMap;

use dualvm_core::{Context, KeeperError, KeeperResult, OracleExchangeRate, OracleKeeper, OracleTwap, PriceSnapshot};
use dualvm_storage::partitions::ORACLE;
use dualvm_types::NativeAddress;
use serde::{Deserialize, Serialize};

use crate::{read, scan, write};

const DECIMALS: u32 = 18;

/// Per-validator vote tallies of the current window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounters {
    /// Missed votes
    pub miss: u64,
    /// Abstentions
    pub abstain: u64,
    /// Successful votes
    pub success: u64,
}

/// Rates under `rates/{denom}`, history under `snapshots/{timestamp}`, vote
/// targets under `targets/{denom}`, feeders under `feeders/{validator}` and
/// tallies under `counters/{validator}`
#[derive(Debug, Default)]
pub struct MockOracle;

impl MockOracle {
    /// Create the mock
    pub fn new() -> Self {
        Self
    }

    /// Record a rate and append it to the price history at the block time
    pub fn set_rate(&self, ctx: &mut Context<'_>, denom: &str, rate: &str) -> KeeperResult<()> {
        parse_decimal(rate)?;
        let header = ctx.header().clone();
        let entry = OracleExchangeRate {
            exchange_rate: rate.to_string(),
            last_update: header.height,
            last_update_timestamp: header.time,
        };
        write(ctx, ORACLE, &format!("rates/{denom}"), &entry)?;
        write(ctx, ORACLE, &format!("targets/{denom}"), &())?;

        let key = snapshot_key(header.time);
        let mut snapshot: PriceSnapshot = read(ctx, ORACLE, &key)?.unwrap_or(PriceSnapshot {
            timestamp: header.time,
            rates: Vec::new(),
        });
        snapshot.rates.retain(|(d, _)| d != denom);
        snapshot.rates.push((denom.to_string(), entry));
        write(ctx, ORACLE, &key, &snapshot)
    }

    /// Set a validator's feeder
    pub fn set_feeder(&self, ctx: &mut Context<'_>, validator: &NativeAddress, feeder: &NativeAddress) -> KeeperResult<()> {
        write(ctx, ORACLE, &format!("feeders/{validator}"), feeder)
    }

    /// Set a validator's vote tallies
    pub fn set_counters(&self, ctx: &mut Context<'_>, validator: &NativeAddress, counters: VoteCounters) -> KeeperResult<()> {
        write(ctx, ORACLE, &format!("counters/{validator}"), &counters)
    }

    fn counters(&self, ctx: &Context<'_>, validator: &NativeAddress) -> KeeperResult<VoteCounters> {
        Ok(read(ctx, ORACLE, &format!("counters/{validator}"))?.unwrap_or_default())
    }
}

fn snapshot_key(timestamp: u64) -> String {
    format!("snapshots/{timestamp:020}")
}

/// Fixed-point value with 18 decimals
fn parse_decimal(s: &str) -> KeeperResult<u128> {
    let invalid = || KeeperError::InvalidRequest(format!("invalid decimal {s}"));
    let (int, frac) = s.split_once('.').unwrap_or((s, ""));
    if int.is_empty() || frac.len() > DECIMALS as usize {
        return Err(invalid());
    }
    let int: u128 = int.parse().map_err(|_| invalid())?;
    let frac_value: u128 = if frac.is_empty() {
        0
    } else {
        frac.parse::<u128>().map_err(|_| invalid())? * 10u128.pow(DECIMALS - frac.len() as u32)
    };
    int.checked_mul(10u128.pow(DECIMALS))
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(invalid)
}

fn format_decimal(value: u128) -> String {
    let scale = 10u128.pow(DECIMALS);
    let (int, frac) = (value / scale, value % scale);
    if frac == 0 {
        return int.to_string();
    }
    let frac = format!("{frac:018}");
    format!("{int}.{}", frac.trim_end_matches('0'))
}

impl OracleKeeper for MockOracle {
    fn base_exchange_rates(&self, ctx: &Context<'_>) -> KeeperResult<Vec<(String, OracleExchangeRate)>> {
        scan(ctx, ORACLE, "rates/")
    }

    fn calculate_twaps(&self, ctx: &Context<'_>, lookback_seconds: u64) -> KeeperResult<Vec<OracleTwap>> {
        if lookback_seconds == 0 {
            return Err(KeeperError::InvalidRequest("lookback must be positive".into()));
        }
        let now = ctx.header().time;
        let start = now.saturating_sub(lookback_seconds);
        let snapshots: Vec<PriceSnapshot> = scan::<PriceSnapshot>(ctx, ORACLE, "snapshots/")?
            .into_iter()
            .map(|(_, s)| s)
            .filter(|s| s.timestamp >= start)
            .collect();
        let oldest = snapshots
            .first()
            .map(|s| s.timestamp)
            .ok_or_else(|| KeeperError::NotFound("price snapshots".into()))?;

        let mut sums: BTreeMap<String, (u128, u128)> = BTreeMap::new();
        for snapshot in &snapshots {
            for (denom, rate) in &snapshot.rates {
                let entry = sums.entry(denom.clone()).or_default();
                entry.0 += parse_decimal(&rate.exchange_rate)?;
                entry.1 += 1;
            }
        }
        Ok(sums
            .into_iter()
            .map(|(denom, (sum, count))| OracleTwap {
                denom,
                twap: format_decimal(sum / count),
                lookback_seconds: now - oldest,
            })
            .collect())
    }

    fn vote_targets(&self, ctx: &Context<'_>) -> KeeperResult<Vec<String>> {
        Ok(scan::<()>(ctx, ORACLE, "targets/")?
            .into_iter()
            .map(|(denom, _)| denom)
            .collect())
    }

    fn price_snapshots(&self, ctx: &Context<'_>) -> KeeperResult<Vec<PriceSnapshot>> {
        Ok(scan::<PriceSnapshot>(ctx, ORACLE, "snapshots/")?
            .into_iter()
            .map(|(_, s)| s)
            .collect())
    }

    fn feeder_delegation(&self, ctx: &Context<'_>, validator: &NativeAddress) -> KeeperResult<Option<NativeAddress>> {
        read(ctx, ORACLE, &format!("feeders/{validator}"))
    }

    fn miss_count(&self, ctx: &Context<'_>, validator: &NativeAddress) -> KeeperResult<u64> {
        Ok(self.counters(ctx, validator)?.miss)
    }

    fn abstain_count(&self, ctx: &Context<'_>, validator: &NativeAddress) -> KeeperResult<u64> {
        Ok(self.counters(ctx, validator)?.abstain)
    }

    fn success_count(&self, ctx: &Context<'_>, validator: &NativeAddress) -> KeeperResult<u64> {
        Ok(self.counters(ctx, validator)?.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_header, test_store};
    use dualvm_core::BlockHeader;

    #[test]
    fn test_decimal_roundtrip() {
        assert_eq!(format_decimal(parse_decimal("1.25").unwrap()), "1.25");
        assert_eq!(format_decimal(parse_decimal("3").unwrap()), "3");
        assert!(parse_decimal("abc").is_err());
        assert!(parse_decimal(".5").is_err());
    }

    #[test]
    fn test_twap_averages_window() {
        let mut store = test_store();
        let oracle = MockOracle::new();
        let base = test_header();
        for (offset, rate) in [(0u64, "1.0"), (60, "2.0"), (120, "4.0")] {
            let header = BlockHeader {
                time: base.time + offset,
                ..base.clone()
            };
            let mut ctx = Context::new(&mut store, header);
            oracle.set_rate(&mut ctx, "uatom", rate).unwrap();
        }

        let header = BlockHeader {
            time: base.time + 120,
            ..base.clone()
        };
        let ctx = Context::new(&mut store, header);
        let twaps = oracle.calculate_twaps(&ctx, 60).unwrap();
        assert_eq!(twaps.len(), 1);
        assert_eq!(twaps[0].twap, "3");
        assert_eq!(twaps[0].lookback_seconds, 60);

        assert_eq!(oracle.price_snapshots(&ctx).unwrap().len(), 3);
        assert_eq!(oracle.vote_targets(&ctx).unwrap(), vec!["uatom".to_string()]);
        assert_eq!(
            oracle.base_exchange_rates(&ctx).unwrap()[0].1.exchange_rate,
            "4.0"
        );
        assert!(oracle.calculate_twaps(&ctx, 0).is_err());
    }
}
