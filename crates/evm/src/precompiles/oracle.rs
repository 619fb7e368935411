//! Oracle precompile. Read only.

use std::sync::Arc;

use alloy_primitives::Address;
use dualvm_core::{OracleExchangeRate, OracleKeeper};

use super::{
    next, single_u64, Access, MethodTable, Precompile, PrecompileCall, PrecompileError,
    PrecompileOutput, ORACLE_ADDRESS, READ_GAS,
};
use crate::abi::{self, ParamKind, Token};

const GET_EXCHANGE_RATES: &str = "getExchangeRates()";
const GET_ORACLE_TWAPS: &str = "getOracleTwaps(uint64)";
const GET_VOTE_TARGETS: &str = "getVoteTargets()";
const GET_PRICE_SNAPSHOTS: &str = "getPriceSnapshots()";
const GET_FEEDER_DELEGATION: &str = "getFeederDelegation(string)";
const GET_VOTE_PENALTY_COUNTER: &str = "getVotePenaltyCounter(string)";

/// Oracle module precompile
pub struct OraclePrecompile {
    oracle: Arc<dyn OracleKeeper>,
    methods: MethodTable,
}

/// `(string denom, (string rate, uint64 lastUpdate, uint64 lastUpdateTimestamp))[]`
fn rate_array(rates: Vec<(String, OracleExchangeRate)>) -> Token {
    Token::Array(
        rates
            .into_iter()
            .map(|(denom, rate)| {
                Token::Tuple(vec![
                    Token::String(denom),
                    Token::Tuple(vec![
                        Token::String(rate.exchange_rate),
                        Token::uint(rate.last_update),
                        Token::uint(rate.last_update_timestamp),
                    ]),
                ])
            })
            .collect(),
    )
}

impl OraclePrecompile {
    /// Create the precompile
    pub fn new(oracle: Arc<dyn OracleKeeper>) -> Self {
        Self {
            oracle,
            methods: MethodTable::new(&[
                (GET_EXCHANGE_RATES, Access::Read),
                (GET_ORACLE_TWAPS, Access::Read),
                (GET_VOTE_TARGETS, Access::Read),
                (GET_PRICE_SNAPSHOTS, Access::Read),
                (GET_FEEDER_DELEGATION, Access::Read),
                (GET_VOTE_PENALTY_COUNTER, Access::Read),
            ]),
        }
    }
}

impl Precompile for OraclePrecompile {
    fn address(&self) -> Address {
        ORACLE_ADDRESS
    }

    fn name(&self) -> &'static str {
        "oracle"
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
        let output = match method {
            GET_EXCHANGE_RATES => {
                abi::encode(&[rate_array(self.oracle.base_exchange_rates(call.ctx)?)])
            }
            GET_ORACLE_TWAPS => {
                let lookback = single_u64(data)?;
                let twaps = self.oracle.calculate_twaps(call.ctx, lookback)?;
                abi::encode(&[Token::Array(
                    twaps
                        .into_iter()
                        .map(|t| {
                            Token::Tuple(vec![
                                Token::String(t.denom),
                                Token::String(t.twap),
                                Token::uint(t.lookback_seconds),
                            ])
                        })
                        .collect(),
                )])
            }
            GET_VOTE_TARGETS => abi::encode(&[Token::Array(
                self.oracle
                    .vote_targets(call.ctx)?
                    .into_iter()
                    .map(Token::String)
                    .collect(),
            )]),
            GET_PRICE_SNAPSHOTS => {
                let snapshots = self.oracle.price_snapshots(call.ctx)?;
                abi::encode(&[Token::Array(
                    snapshots
                        .into_iter()
                        .map(|s| Token::Tuple(vec![Token::uint(s.timestamp), rate_array(s.rates)]))
                        .collect(),
                )])
            }
            GET_FEEDER_DELEGATION => {
                let mut args = abi::decode(&[ParamKind::String], data)?.into_iter();
                let validator = call.parse_native(&next(&mut args)?.into_string()?)?;
                let feeder = self
                    .oracle
                    .feeder_delegation(call.ctx, &validator)?
                    .map(|f| f.to_string())
                    .unwrap_or_default();
                abi::encode(&[Token::String(feeder)])
            }
            GET_VOTE_PENALTY_COUNTER => {
                let mut args = abi::decode(&[ParamKind::String], data)?.into_iter();
                let validator = call.parse_native(&next(&mut args)?.into_string()?)?;
                abi::encode(&[Token::Tuple(vec![
                    Token::uint(self.oracle.miss_count(call.ctx, &validator)?),
                    Token::uint(self.oracle.abstain_count(call.ctx, &validator)?),
                    Token::uint(self.oracle.success_count(call.ctx, &validator)?),
                ])])
            }
            _ => {
                return Err(PrecompileError::InvalidInput(format!(
                    "unhandled method {method}"
                )))
            }
        };
        Ok(PrecompileOutput::new(output, READ_GAS))
    }
}
