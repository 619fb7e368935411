//! Reward distribution.

use dualvm_types::{Coin, NativeAddress};
use serde::{Deserialize, Serialize};

use crate::{Context, KeeperResult};

/// Pending rewards from one validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationReward {
    /// Validator operator address
    pub validator: NativeAddress,
    /// Accrued rewards
    pub reward: Vec<Coin>,
}

/// Pending rewards across all validators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationTotalRewards {
    /// Per-validator rewards
    pub rewards: Vec<DelegationReward>,
    /// Sum over validators
    pub total: Vec<Coin>,
}

/// Reward withdrawal and lookup
pub trait DistributionKeeper: Send + Sync {
    /// Redirect future reward withdrawals
    fn set_withdraw_addr(
        &self,
        ctx: &mut Context<'_>,
        delegator: &NativeAddress,
        withdraw: &NativeAddress,
    ) -> KeeperResult<()>;

    /// Withdraw rewards earned with one validator
    fn withdraw_delegation_rewards(
        &self,
        ctx: &mut Context<'_>,
        delegator: &NativeAddress,
        validator: &NativeAddress,
    ) -> KeeperResult<Vec<Coin>>;

    /// Rewards pending for a delegator
    fn delegation_total_rewards(&self, ctx: &Context<'_>, delegator: &NativeAddress)
        -> KeeperResult<DelegationTotalRewards>;
}
