//! Governance precompile
//!
//! Votes are cast and deposits made by the caller's native address. Vote
//! options use the native numbering (1 yes, 2 abstain, 3 no, 4 no with veto).

use std::sync::Arc;

use alloy_primitives::Address;
use dualvm_core::{GovKeeper, VoteOption, WeightedVoteOption};
use tracing::debug;

use super::{
    next, single_u64, Access, MethodTable, Precompile, PrecompileCall, PrecompileError,
    PrecompileOutput, GOV_ADDRESS, WRITE_GAS,
};
use crate::abi::{self, ParamKind, Token};

const VOTE: &str = "vote(uint64,int32)";
const VOTE_WEIGHTED: &str = "voteWeighted(uint64,(int32,string)[])";
const DEPOSIT: &str = "deposit(uint64)";

/// Governance precompile
pub struct GovPrecompile {
    gov: Arc<dyn GovKeeper>,
    methods: MethodTable,
}

fn vote_option(token: Token) -> Result<VoteOption, PrecompileError> {
    let raw = token.into_u64()?;
    let raw = u8::try_from(raw)
        .map_err(|_| PrecompileError::InvalidInput(format!("vote option {raw}")))?;
    Ok(VoteOption::try_from(raw)?)
}

impl GovPrecompile {
    /// Create the precompile
    pub fn new(gov: Arc<dyn GovKeeper>) -> Self {
        Self {
            gov,
            methods: MethodTable::new(&[
                (VOTE, Access::Write),
                (VOTE_WEIGHTED, Access::Write),
                (DEPOSIT, Access::Write),
            ]),
        }
    }

    fn vote(
        &self,
        call: &mut PrecompileCall<'_, '_>,
        data: &[u8],
        weighted: bool,
    ) -> Result<PrecompileOutput, PrecompileError> {
        let kinds = if weighted {
            vec![
                ParamKind::Uint,
                ParamKind::Array(Box::new(ParamKind::Tuple(vec![
                    ParamKind::Uint,
                    ParamKind::String,
                ]))),
            ]
        } else {
            vec![ParamKind::Uint, ParamKind::Uint]
        };
        let mut args = abi::decode(&kinds, data)?.into_iter();
        let proposal_id = next(&mut args)?.into_u64()?;

        let options = if weighted {
            let Token::Array(items) = next(&mut args)? else {
                return Err(PrecompileError::InvalidInput("expected option array".into()));
            };
            let mut options = Vec::with_capacity(items.len());
            for item in items {
                let Token::Tuple(fields) = item else {
                    return Err(PrecompileError::InvalidInput("expected option tuple".into()));
                };
                let mut fields = fields.into_iter();
                options.push(WeightedVoteOption {
                    option: vote_option(next(&mut fields)?)?,
                    weight: next(&mut fields)?.into_string()?,
                });
            }
            if options.is_empty() {
                return Err(PrecompileError::InvalidInput("no vote options".into()));
            }
            options
        } else {
            vec![WeightedVoteOption {
                option: vote_option(next(&mut args)?)?,
                weight: "1".to_string(),
            }]
        };

        let voter = call.caller_native()?;
        self.gov.add_vote(call.ctx, proposal_id, &voter, &options)?;
        debug!(proposal_id, voter = %voter, options = options.len(), "vote cast");
        Ok(PrecompileOutput::new(
            abi::encode(&[Token::Bool(true)]),
            WRITE_GAS,
        ))
    }
}

impl Precompile for GovPrecompile {
    fn address(&self) -> Address {
        GOV_ADDRESS
    }

    fn name(&self) -> &'static str {
        "gov"
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
        match method {
            VOTE => {
                call.require_no_value(method)?;
                self.vote(call, data, false)
            }
            VOTE_WEIGHTED => {
                call.require_no_value(method)?;
                self.vote(call, data, true)
            }
            DEPOSIT => {
                let proposal_id = single_u64(data)?;
                let coin = call.take_value()?;
                let depositor = call.caller_native()?;
                let voting_started = self.gov.add_deposit(
                    call.ctx,
                    proposal_id,
                    &depositor,
                    std::slice::from_ref(&coin),
                )?;
                debug!(proposal_id, depositor = %depositor, amount = %coin, voting_started, "deposit made");
                Ok(PrecompileOutput::new(
                    abi::encode(&[Token::Bool(true)]),
                    WRITE_GAS,
                ))
            }
            _ => Err(PrecompileError::InvalidInput(format!(
                "unhandled method {method}"
            ))),
        }
    }
}
