//! Distribution precompile: reward withdrawal and queries.

use std::sync::Arc;

use alloy_primitives::Address;
use dualvm_core::DistributionKeeper;
use tracing::debug;

use super::{
    coin_array, next, single_address, Access, MethodTable, Precompile, PrecompileCall, PrecompileError,
    PrecompileOutput, DISTRIBUTION_ADDRESS, READ_GAS, WRITE_GAS,
};
use crate::abi::{self, ParamKind, Token};

const SET_WITHDRAW_ADDRESS: &str = "setWithdrawAddress(address)";
const WITHDRAW_DELEGATION_REWARDS: &str = "withdrawDelegationRewards(string)";
const WITHDRAW_MULTIPLE: &str = "withdrawMultipleDelegationRewards(string[])";
const REWARDS: &str = "rewards(address)";

/// Distribution module precompile
pub struct DistributionPrecompile {
    distribution: Arc<dyn DistributionKeeper>,
    methods: MethodTable,
}

impl DistributionPrecompile {
    /// Create the precompile
    pub fn new(distribution: Arc<dyn DistributionKeeper>) -> Self {
        Self {
            distribution,
            methods: MethodTable::new(&[
                (SET_WITHDRAW_ADDRESS, Access::Write),
                (WITHDRAW_DELEGATION_REWARDS, Access::Write),
                (WITHDRAW_MULTIPLE, Access::Write),
                (REWARDS, Access::Read),
            ]),
        }
    }

    fn withdraw(
        &self,
        call: &mut PrecompileCall<'_, '_>,
        validators: Vec<String>,
    ) -> Result<PrecompileOutput, PrecompileError> {
        if validators.is_empty() {
            return Err(PrecompileError::InvalidInput("no validators given".into()));
        }
        let delegator = call.caller_native()?;
        for validator in validators {
            let validator = call.parse_native(&validator)?;
            let coins = self
                .distribution
                .withdraw_delegation_rewards(call.ctx, &delegator, &validator)?;
            debug!(delegator = %delegator, validator = %validator, coins = coins.len(), "rewards withdrawn");
        }
        Ok(PrecompileOutput::new(
            abi::encode(&[Token::Bool(true)]),
            WRITE_GAS,
        ))
    }
}

impl Precompile for DistributionPrecompile {
    fn address(&self) -> Address {
        DISTRIBUTION_ADDRESS
    }

    fn name(&self) -> &'static str {
        "distribution"
    }

    fn access(&self, input: &[u8]) -> Access {
        self.methods.access(input)
    }

    fn execute(
        &self,
        call: &mut PrecompileCall<'_, '_>,
        input: &[u8],
    ) -> Result<PrecompileOutput, PrecompileError> {
        let (method, data) = self.methods.resolve(input)?;
        call.require_no_value(method)?;
        match method {
            SET_WITHDRAW_ADDRESS => {
                let withdraw = call.native_of(&single_address(data)?)?;
                let delegator = call.caller_native()?;
                self.distribution
                    .set_withdraw_addr(call.ctx, &delegator, &withdraw)?;
                debug!(delegator = %delegator, withdraw = %withdraw, "withdraw address set");
                Ok(PrecompileOutput::new(
                    abi::encode(&[Token::Bool(true)]),
                    WRITE_GAS,
                ))
            }
            WITHDRAW_DELEGATION_REWARDS => {
                let mut args = abi::decode(&[ParamKind::String], data)?.into_iter();
                let validator = next(&mut args)?.into_string()?;
                self.withdraw(call, vec![validator])
            }
            WITHDRAW_MULTIPLE => {
                let mut args = abi::decode(
                    &[ParamKind::Array(Box::new(ParamKind::String))],
                    data,
                )?
                .into_iter();
                let Token::Array(items) = next(&mut args)? else {
                    return Err(PrecompileError::InvalidInput("expected string array".into()));
                };
                let validators = items
                    .into_iter()
                    .map(Token::into_string)
                    .collect::<Result<Vec<_>, _>>()?;
                self.withdraw(call, validators)
            }
            REWARDS => {
                let delegator = call.native_of(&single_address(data)?)?;
                let totals = self
                    .distribution
                    .delegation_total_rewards(call.ctx, &delegator)?;
                let rewards = totals
                    .rewards
                    .into_iter()
                    .map(|r| {
                        Token::Tuple(vec![
                            Token::String(r.validator.to_string()),
                            coin_array(r.reward),
                        ])
                    })
                    .collect();
                let output = abi::encode(&[Token::Tuple(vec![
                    Token::Array(rewards),
                    coin_array(totals.total),
                ])]);
                Ok(PrecompileOutput::new(output, READ_GAS))
            }
            _ => Err(PrecompileError::InvalidInput(format!(
                "unhandled method {method}"
            ))),
        }
    }
}
