//! Staking precompile
//!
//! Delegation changes on behalf of the caller. `delegate` is payable and
//! stakes exactly the attached value in the base denom.

use std::sync::Arc;

use alloy_primitives::Address;
use dualvm_core::{MsgBeginRedelegate, MsgDelegate, MsgUndelegate, StakingKeeper, StakingQuerier};
use dualvm_types::Coin;
use tracing::debug;

use super::{
    address_topic, event, next, single_string, Access, MethodTable, Precompile, PrecompileCall,
    PrecompileError, PrecompileOutput, READ_GAS, STAKING_ADDRESS, WRITE_GAS,
};
use crate::abi::{self, ParamKind, Token};

const DELEGATE: &str = "delegate(string)";
const REDELEGATE: &str = "redelegate(string,string,uint256)";
const UNDELEGATE: &str = "undelegate(string,uint256)";
const DELEGATION: &str = "delegation(address,string)";

const DELEGATE_EVENT: &str = "Delegate(address,string,uint256)";
const UNDELEGATE_EVENT: &str = "Undelegate(address,string,uint256,uint64)";

/// Staking module precompile
pub struct StakingPrecompile {
    staking: Arc<dyn StakingKeeper>,
    querier: Arc<dyn StakingQuerier>,
    methods: MethodTable,
}

impl StakingPrecompile {
    /// Create the precompile
    pub fn new(staking: Arc<dyn StakingKeeper>, querier: Arc<dyn StakingQuerier>) -> Self {
        Self {
            staking,
            querier,
            methods: MethodTable::new(&[
                (DELEGATE, Access::Write),
                (REDELEGATE, Access::Write),
                (UNDELEGATE, Access::Write),
                (DELEGATION, Access::Read),
            ]),
        }
    }

    fn amount(call: &PrecompileCall<'_, '_>, token: Token) -> Result<Coin, PrecompileError> {
        let amount = token.into_u128()?;
        if amount == 0 {
            return Err(PrecompileError::InvalidInput("zero amount".into()));
        }
        Ok(Coin::new(call.base_denom, amount))
    }

    fn delegate(
        &self,
        call: &mut PrecompileCall<'_, '_>,
        data: &[u8],
    ) -> Result<PrecompileOutput, PrecompileError> {
        let validator = call.parse_native(&single_string(data)?)?;
        let msg = MsgDelegate {
            delegator: call.caller_native()?,
            validator,
            amount: call.take_value()?,
        };
        self.staking.delegate(call.ctx, &msg)?;
        debug!(delegator = %msg.delegator, validator = %msg.validator, amount = %msg.amount, "delegated");

        let log = event(
            STAKING_ADDRESS,
            DELEGATE_EVENT,
            vec![address_topic(&call.caller)],
            abi::encode(&[
                Token::String(msg.validator.to_string()),
                Token::uint(msg.amount.amount),
            ]),
        );
        Ok(PrecompileOutput::with_logs(
            abi::encode(&[Token::Bool(true)]),
            WRITE_GAS,
            vec![log],
        ))
    }

    fn redelegate(
        &self,
        call: &mut PrecompileCall<'_, '_>,
        data: &[u8],
    ) -> Result<PrecompileOutput, PrecompileError> {
        let mut args = abi::decode(
            &[ParamKind::String, ParamKind::String, ParamKind::Uint],
            data,
        )?
        .into_iter();
        let src_validator = call.parse_native(&next(&mut args)?.into_string()?)?;
        let dst_validator = call.parse_native(&next(&mut args)?.into_string()?)?;
        let msg = MsgBeginRedelegate {
            delegator: call.caller_native()?,
            src_validator,
            dst_validator,
            amount: Self::amount(call, next(&mut args)?)?,
        };
        let completion = self.staking.begin_redelegate(call.ctx, &msg)?;
        debug!(
            delegator = %msg.delegator,
            src = %msg.src_validator,
            dst = %msg.dst_validator,
            completion_time = completion.completion_time,
            "redelegation started"
        );
        Ok(PrecompileOutput::new(
            abi::encode(&[Token::Bool(true)]),
            WRITE_GAS,
        ))
    }

    fn undelegate(
        &self,
        call: &mut PrecompileCall<'_, '_>,
        data: &[u8],
    ) -> Result<PrecompileOutput, PrecompileError> {
        let mut args = abi::decode(&[ParamKind::String, ParamKind::Uint], data)?.into_iter();
        let validator = call.parse_native(&next(&mut args)?.into_string()?)?;
        let msg = MsgUndelegate {
            delegator: call.caller_native()?,
            validator,
            amount: Self::amount(call, next(&mut args)?)?,
        };
        let completion = self.staking.undelegate(call.ctx, &msg)?;
        debug!(
            delegator = %msg.delegator,
            validator = %msg.validator,
            completion_time = completion.completion_time,
            "undelegation started"
        );

        let log = event(
            STAKING_ADDRESS,
            UNDELEGATE_EVENT,
            vec![address_topic(&call.caller)],
            abi::encode(&[
                Token::String(msg.validator.to_string()),
                Token::uint(msg.amount.amount),
                Token::uint(completion.completion_time),
            ]),
        );
        Ok(PrecompileOutput::with_logs(
            abi::encode(&[Token::Bool(true)]),
            WRITE_GAS,
            vec![log],
        ))
    }
}

impl Precompile for StakingPrecompile {
    fn address(&self) -> Address {
        STAKING_ADDRESS
    }

    fn name(&self) -> &'static str {
        "staking"
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
        if method != DELEGATE {
            call.require_no_value(method)?;
        }
        match method {
            DELEGATE => self.delegate(call, data),
            REDELEGATE => self.redelegate(call, data),
            UNDELEGATE => self.undelegate(call, data),
            DELEGATION => {
                let mut args =
                    abi::decode(&[ParamKind::Address, ParamKind::String], data)?.into_iter();
                let delegator = call.native_of(&next(&mut args)?.into_address()?)?;
                let validator = call.parse_native(&next(&mut args)?.into_string()?)?;
                let delegation = self.querier.delegation(call.ctx, &delegator, &validator)?;
                let output = abi::encode(&[Token::Tuple(vec![
                    Token::uint(delegation.balance.amount),
                    Token::String(delegation.balance.denom),
                    Token::String(delegation.shares),
                    Token::String(delegation.delegator.to_string()),
                    Token::String(delegation.validator.to_string()),
                ])]);
                Ok(PrecompileOutput::new(output, READ_GAS))
            }
            _ => Err(PrecompileError::InvalidInput(format!(
                "unhandled method {method}"
            ))),
        }
    }
}
