//! Staking capabilities.

use dualvm_types::{Coin, NativeAddress};
use serde::{Deserialize, Serialize};

use crate::{Context, KeeperResult};

/// Bond tokens to a validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDelegate {
    /// Delegator account
    pub delegator: NativeAddress,
    /// Validator operator address
    pub validator: NativeAddress,
    /// Amount to bond
    pub amount: Coin,
}

/// Move bonded tokens between validators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBeginRedelegate {
    /// Delegator account
    pub delegator: NativeAddress,
    /// Source validator
    pub src_validator: NativeAddress,
    /// Destination validator
    pub dst_validator: NativeAddress,
    /// Amount to move
    pub amount: Coin,
}

/// Unbond tokens from a validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUndelegate {
    /// Delegator account
    pub delegator: NativeAddress,
    /// Validator operator address
    pub validator: NativeAddress,
    /// Amount to unbond
    pub amount: Coin,
}

/// Outcome of a redelegation or unbonding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Unix time at which the operation completes
    pub completion_time: u64,
}

/// A delegator's stake with one validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Delegator account
    pub delegator: NativeAddress,
    /// Validator operator address
    pub validator: NativeAddress,
    /// Shares held, as a decimal string
    pub shares: String,
    /// Token value of the shares
    pub balance: Coin,
}

/// Delegation state changes
pub trait StakingKeeper: Send + Sync {
    /// Bond tokens
    fn delegate(&self, ctx: &mut Context<'_>, msg: &MsgDelegate) -> KeeperResult<()>;

    /// Start a redelegation
    fn begin_redelegate(&self, ctx: &mut Context<'_>, msg: &MsgBeginRedelegate)
        -> KeeperResult<CompletionResponse>;

    /// Start unbonding
    fn undelegate(&self, ctx: &mut Context<'_>, msg: &MsgUndelegate)
        -> KeeperResult<CompletionResponse>;
}

/// Delegation lookups
pub trait StakingQuerier: Send + Sync {
    /// Stake of `delegator` with `validator`
    fn delegation(
        &self,
        ctx: &Context<'_>,
        delegator: &NativeAddress,
        validator: &NativeAddress,
    ) -> KeeperResult<Delegation>;
}
