use std::sync::Arc;

use dualvm_core::{
    BankKeeper, CompletionResponse, Context, Delegation, KeeperError, KeeperResult,
    MsgBeginRedelegate, MsgDelegate, MsgUndelegate, StakingKeeper, StakingQuerier,
};
use dualvm_storage::partitions::STAKING;
use dualvm_types::{Coin, NativeAddress};

use crate::{mock_address_pair, read, remove, write, MockBank};

/// Unbonding period applied to redelegations and undelegations
pub const UNBONDING_SECONDS: u64 = 21 * 24 * 60 * 60;

/// Delegations under `delegations/{delegator}/{validator}`, one share per token.
///
/// Bonded tokens sit in a pool account of `bank`. Undelegated tokens return
/// to the delegator at once.
#[derive(Debug)]
pub struct MockStaking {
    bank: Arc<MockBank>,
    pool: NativeAddress,
}

impl MockStaking {
    /// Create the mock over `bank`
    pub fn new(bank: Arc<MockBank>) -> Self {
        Self {
            bank,
            pool: mock_address_pair(0xb0).0,
        }
    }

    /// Account holding bonded tokens
    pub fn bonded_pool(&self) -> &NativeAddress {
        &self.pool
    }

    fn bonded(&self, ctx: &Context<'_>, delegator: &NativeAddress, validator: &NativeAddress) -> KeeperResult<Option<Coin>> {
        read(ctx, STAKING, &delegation_key(delegator, validator))
    }

    fn bond(&self, ctx: &mut Context<'_>, delegator: &NativeAddress, validator: &NativeAddress, amount: &Coin) -> KeeperResult<()> {
        if amount.is_zero() {
            return Err(KeeperError::InvalidRequest("zero delegation".into()));
        }
        let total = match self.bonded(ctx, delegator, validator)? {
            Some(existing) if existing.denom != amount.denom => {
                return Err(KeeperError::InvalidRequest(format!(
                    "bond denom is {}",
                    existing.denom
                )))
            }
            Some(existing) => existing.amount + amount.amount,
            None => amount.amount,
        };
        write(
            ctx,
            STAKING,
            &delegation_key(delegator, validator),
            &Coin::new(amount.denom.clone(), total),
        )
    }

    fn unbond(&self, ctx: &mut Context<'_>, delegator: &NativeAddress, validator: &NativeAddress, amount: &Coin) -> KeeperResult<()> {
        let existing = self
            .bonded(ctx, delegator, validator)?
            .ok_or_else(|| KeeperError::NotFound(format!("delegation {delegator} -> {validator}")))?;
        if existing.denom != amount.denom || existing.amount < amount.amount {
            return Err(KeeperError::InsufficientFunds(format!(
                "delegation holds {existing}, requested {amount}"
            )));
        }
        let key = delegation_key(delegator, validator);
        let remaining = existing.amount - amount.amount;
        if remaining == 0 {
            remove(ctx, STAKING, &key)
        } else {
            write(ctx, STAKING, &key, &Coin::new(existing.denom, remaining))
        }
    }
}

fn delegation_key(delegator: &NativeAddress, validator: &NativeAddress) -> String {
    format!("delegations/{delegator}/{validator}")
}

impl StakingKeeper for MockStaking {
    fn delegate(&self, ctx: &mut Context<'_>, msg: &MsgDelegate) -> KeeperResult<()> {
        if msg.amount.is_zero() {
            return Err(KeeperError::InvalidRequest("zero delegation".into()));
        }
        self.bank
            .send_coins(ctx, &msg.delegator, &self.pool, std::slice::from_ref(&msg.amount))?;
        self.bond(ctx, &msg.delegator, &msg.validator, &msg.amount)
    }

    fn begin_redelegate(&self, ctx: &mut Context<'_>, msg: &MsgBeginRedelegate) -> KeeperResult<CompletionResponse> {
        if msg.src_validator == msg.dst_validator {
            return Err(KeeperError::InvalidRequest("self redelegation".into()));
        }
        self.unbond(ctx, &msg.delegator, &msg.src_validator, &msg.amount)?;
        self.bond(ctx, &msg.delegator, &msg.dst_validator, &msg.amount)?;
        Ok(CompletionResponse {
            completion_time: ctx.header().time + UNBONDING_SECONDS,
        })
    }

    fn undelegate(&self, ctx: &mut Context<'_>, msg: &MsgUndelegate) -> KeeperResult<CompletionResponse> {
        self.unbond(ctx, &msg.delegator, &msg.validator, &msg.amount)?;
        self.bank
            .send_coins(ctx, &self.pool, &msg.delegator, std::slice::from_ref(&msg.amount))?;
        Ok(CompletionResponse {
            completion_time: ctx.header().time + UNBONDING_SECONDS,
        })
    }
}

impl StakingQuerier for MockStaking {
    fn delegation(
        &self,
        ctx: &Context<'_>,
        delegator: &NativeAddress,
        validator: &NativeAddress,
    ) -> KeeperResult<Delegation> {
        let balance = self
            .bonded(ctx, delegator, validator)?
            .ok_or_else(|| KeeperError::NotFound(format!("delegation {delegator} -> {validator}")))?;
        Ok(Delegation {
            delegator: delegator.clone(),
            validator: validator.clone(),
            shares: balance.amount.to_string(),
            balance,
        })
    }
}
