//! Wasmd precompile
//!
//! Lets EVM callers instantiate, execute and query native contracts. Coins
//! forwarded to the contract are passed as a JSON array of
//! `{"denom", "amount"}` objects; an empty byte string means no coins.

use std::sync::Arc;

use alloy_primitives::Address;
use dualvm_core::{WasmdKeeper, WasmdViewKeeper};
use dualvm_types::Coin;
use tracing::debug;

use super::{
    next, Access, MethodTable, Precompile, PrecompileCall, PrecompileError, PrecompileOutput,
    READ_GAS, WASMD_ADDRESS, WRITE_GAS,
};
use crate::abi::{self, ParamKind, Token};

const INSTANTIATE: &str = "instantiate(uint64,string,bytes,string,bytes)";
const EXECUTE: &str = "execute(string,bytes,bytes)";
const QUERY: &str = "query(string,bytes)";

/// Wasm module precompile
pub struct WasmdPrecompile {
    wasmd: Arc<dyn WasmdKeeper>,
    view: Arc<dyn WasmdViewKeeper>,
    methods: MethodTable,
}

fn parse_coins(raw: &[u8]) -> Result<Vec<Coin>, PrecompileError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let coins: Vec<Coin> = serde_json::from_slice(raw)?;
    if coins.iter().any(Coin::is_zero) {
        return Err(PrecompileError::InvalidInput("zero coin amount".into()));
    }
    Ok(coins)
}

impl WasmdPrecompile {
    /// Create the precompile
    pub fn new(wasmd: Arc<dyn WasmdKeeper>, view: Arc<dyn WasmdViewKeeper>) -> Self {
        Self {
            wasmd,
            view,
            methods: MethodTable::new(&[
                (INSTANTIATE, Access::Write),
                (EXECUTE, Access::Write),
                (QUERY, Access::Read),
            ]),
        }
    }

    fn instantiate(
        &self,
        call: &mut PrecompileCall<'_, '_>,
        data: &[u8],
    ) -> Result<Vec<u8>, PrecompileError> {
        let mut args = abi::decode(
            &[
                ParamKind::Uint,
                ParamKind::String,
                ParamKind::Bytes,
                ParamKind::String,
                ParamKind::Bytes,
            ],
            data,
        )?
        .into_iter();
        let code_id = next(&mut args)?.into_u64()?;
        let admin = next(&mut args)?.into_string()?;
        let msg = next(&mut args)?.into_bytes()?;
        let label = next(&mut args)?.into_string()?;
        let coins = parse_coins(&next(&mut args)?.into_bytes()?)?;

        let creator = call.caller_native()?;
        let admin = if admin.is_empty() {
            None
        } else {
            Some(call.parse_native(&admin)?)
        };
        let (contract, response) = self.wasmd.instantiate(
            call.ctx,
            code_id,
            &creator,
            admin.as_ref(),
            &msg,
            &label,
            &coins,
        )?;
        debug!(code_id, creator = %creator, contract = %contract, "contract instantiated");
        Ok(abi::encode(&[
            Token::String(contract.to_string()),
            Token::Bytes(response),
        ]))
    }

    fn execute_contract(
        &self,
        call: &mut PrecompileCall<'_, '_>,
        data: &[u8],
    ) -> Result<Vec<u8>, PrecompileError> {
        let mut args =
            abi::decode(&[ParamKind::String, ParamKind::Bytes, ParamKind::Bytes], data)?
                .into_iter();
        let contract = call.parse_native(&next(&mut args)?.into_string()?)?;
        let msg = next(&mut args)?.into_bytes()?;
        let coins = parse_coins(&next(&mut args)?.into_bytes()?)?;

        let caller = call.caller_native()?;
        let response = self
            .wasmd
            .execute(call.ctx, &contract, &caller, &msg, &coins)?;
        debug!(contract = %contract, caller = %caller, "contract executed");
        Ok(abi::encode(&[Token::Bytes(response)]))
    }
}

impl Precompile for WasmdPrecompile {
    fn address(&self) -> Address {
        WASMD_ADDRESS
    }

    fn name(&self) -> &'static str {
        "wasmd"
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
            INSTANTIATE => Ok(PrecompileOutput::new(self.instantiate(call, data)?, WRITE_GAS)),
            EXECUTE => Ok(PrecompileOutput::new(
                self.execute_contract(call, data)?,
                WRITE_GAS,
            )),
            QUERY => {
                let mut args =
                    abi::decode(&[ParamKind::String, ParamKind::Bytes], data)?.into_iter();
                let contract = call.parse_native(&next(&mut args)?.into_string()?)?;
                let req = next(&mut args)?.into_bytes()?;
                let response = self.view.query_smart(call.ctx, &contract, &req)?;
                Ok(PrecompileOutput::new(
                    abi::encode(&[Token::Bytes(response)]),
                    READ_GAS,
                ))
            }
            _ => Err(PrecompileError::InvalidInput(format!(
                "unhandled method {method}"
            ))),
        }
    }
}
