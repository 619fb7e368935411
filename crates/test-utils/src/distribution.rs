use std::collections::BTreeMap;

use dualvm_core::{Context, DelegationReward, DelegationTotalRewards, DistributionKeeper, KeeperResult};
use dualvm_storage::partitions::DISTRIBUTION;
use dualvm_types::{Coin, NativeAddress};

use crate::{read, remove, scan, write};

/// Withdraw addresses under `withdraw_addr/{delegator}`, pending rewards
/// under `rewards/{delegator}/{validator}`
#[derive(Debug, Default)]
pub struct MockDistribution;

impl MockDistribution {
    /// Create the mock
    pub fn new() -> Self {
        Self
    }

    /// Add pending rewards
    pub fn accrue(
        &self,
        ctx: &mut Context<'_>,
        delegator: &NativeAddress,
        validator: &NativeAddress,
        reward: Vec<Coin>,
    ) -> KeeperResult<()> {
        write(ctx, DISTRIBUTION, &rewards_key(delegator, validator), &reward)
    }

    /// Configured withdraw address, if any
    pub fn withdraw_addr(&self, ctx: &Context<'_>, delegator: &NativeAddress) -> KeeperResult<Option<NativeAddress>> {
        read(ctx, DISTRIBUTION, &format!("withdraw_addr/{delegator}"))
    }
}

fn rewards_key(delegator: &NativeAddress, validator: &NativeAddress) -> String {
    format!("rewards/{delegator}/{validator}")
}

impl DistributionKeeper for MockDistribution {
    fn set_withdraw_addr(
        &self,
        ctx: &mut Context<'_>,
        delegator: &NativeAddress,
        withdraw: &NativeAddress,
    ) -> KeeperResult<()> {
        write(ctx, DISTRIBUTION, &format!("withdraw_addr/{delegator}"), withdraw)
    }

    fn withdraw_delegation_rewards(
        &self,
        ctx: &mut Context<'_>,
        delegator: &NativeAddress,
        validator: &NativeAddress,
    ) -> KeeperResult<Vec<Coin>> {
        let key = rewards_key(delegator, validator);
        let reward: Vec<Coin> = read(ctx, DISTRIBUTION, &key)?.unwrap_or_default();
        remove(ctx, DISTRIBUTION, &key)?;
        Ok(reward)
    }

    fn delegation_total_rewards(
        &self,
        ctx: &Context<'_>,
        delegator: &NativeAddress,
    ) -> KeeperResult<DelegationTotalRewards> {
        let mut totals: BTreeMap<String, u128> = BTreeMap::new();
        let mut rewards = Vec::new();
        for (validator, reward) in scan::<Vec<Coin>>(ctx, DISTRIBUTION, &format!("rewards/{delegator}/"))? {
            for coin in &reward {
                *totals.entry(coin.denom.clone()).or_default() += coin.amount;
            }
            rewards.push(DelegationReward {
                validator: validator.parse()?,
                reward,
            });
        }
        Ok(DelegationTotalRewards {
            rewards,
            total: totals
                .into_iter()
                .map(|(denom, amount)| Coin::new(denom, amount))
                .collect(),
        })
    }
}
