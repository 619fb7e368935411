//! Addr precompile: explicit address mapping lookups.
//!
//! Unlike balance resolution, these lookups do not fall back to the default
//! derivation; an unmapped address is an error.

use alloy_primitives::Address;

use super::{
    next, single_address, Access, MethodTable, Precompile, PrecompileCall, PrecompileError,
    PrecompileOutput, ADDR_ADDRESS, READ_GAS,
};
use crate::abi::{self, ParamKind, Token};

const GET_NATIVE_ADDR: &str = "getNativeAddr(address)";
const GET_EVM_ADDR: &str = "getEvmAddr(string)";

/// Address mapping precompile
pub struct AddrPrecompile {
    methods: MethodTable,
}

impl AddrPrecompile {
    /// Create the precompile
    pub fn new() -> Self {
        Self {
            methods: MethodTable::new(&[
                (GET_NATIVE_ADDR, Access::Read),
                (GET_EVM_ADDR, Access::Read),
            ]),
        }
    }
}

impl Default for AddrPrecompile {
    fn default() -> Self {
        Self::new()
    }
}

impl Precompile for AddrPrecompile {
    fn address(&self) -> Address {
        ADDR_ADDRESS
    }

    fn name(&self) -> &'static str {
        "addr"
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
            GET_NATIVE_ADDR => {
                let evm = single_address(data)?;
                let native = call
                    .mapper
                    .get_native_address(call.ctx, &evm)?
                    .ok_or_else(|| {
                        PrecompileError::InvalidInput(format!("{evm} has no native address"))
                    })?;
                abi::encode(&[Token::String(native.to_string())])
            }
            GET_EVM_ADDR => {
                let mut args = abi::decode(&[ParamKind::String], data)?.into_iter();
                let native = call.parse_native(&next(&mut args)?.into_string()?)?;
                let evm = call
                    .mapper
                    .get_evm_address(call.ctx, &native)?
                    .ok_or_else(|| {
                        PrecompileError::InvalidInput(format!("{native} has no EVM address"))
                    })?;
                abi::encode(&[Token::Address(evm)])
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
