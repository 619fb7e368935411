//! PointerView precompile: registry lookups for EVM contracts.
//!
//! Every getter returns `(pointer, version, exists)`. A miss returns the zero
//! value of the pointer's address space with version 0.

use alloy_primitives::Address;
use dualvm_core::PointerLookup;
use dualvm_types::{parse_evm_address, AddressSpace, PointerKind};

use super::{
    single_address, single_string, Access, MethodTable, Precompile, PrecompileCall,
    PrecompileError, PrecompileOutput, POINTERVIEW_ADDRESS, READ_GAS,
};
use crate::abi::{self, Token};

const GET_NATIVE_POINTER: &str = "getNativePointer(string)";
const GET_CW20_POINTER: &str = "getCW20Pointer(string)";
const GET_CW721_POINTER: &str = "getCW721Pointer(string)";
const GET_ERC20_POINTER: &str = "getERC20Pointer(address)";
const GET_ERC721_POINTER: &str = "getERC721Pointer(address)";

/// Pointer registry view precompile
pub struct PointerViewPrecompile {
    methods: MethodTable,
}

impl PointerViewPrecompile {
    /// Create the precompile
    pub fn new() -> Self {
        Self {
            methods: MethodTable::new(&[
                (GET_NATIVE_POINTER, Access::Read),
                (GET_CW20_POINTER, Access::Read),
                (GET_CW721_POINTER, Access::Read),
                (GET_ERC20_POINTER, Access::Read),
                (GET_ERC721_POINTER, Access::Read),
            ]),
        }
    }
}

impl Default for PointerViewPrecompile {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_lookup(kind: PointerKind, lookup: PointerLookup) -> Result<Vec<u8>, PrecompileError> {
    let pointer = match kind.pointer_space() {
        AddressSpace::Evm => Token::Address(parse_evm_address(&lookup.address)?),
        AddressSpace::Native => Token::String(lookup.address),
    };
    Ok(abi::encode(&[
        pointer,
        Token::uint(lookup.version),
        Token::Bool(lookup.exists),
    ]))
}

impl Precompile for PointerViewPrecompile {
    fn address(&self) -> Address {
        POINTERVIEW_ADDRESS
    }

    fn name(&self) -> &'static str {
        "pointerview"
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
        let (kind, asset) = match method {
            GET_NATIVE_POINTER => (PointerKind::Native, single_string(data)?),
            GET_CW20_POINTER => (PointerKind::Cw20, single_string(data)?),
            GET_CW721_POINTER => (PointerKind::Cw721, single_string(data)?),
            GET_ERC20_POINTER => (PointerKind::Erc20, single_address(data)?.to_string()),
            GET_ERC721_POINTER => (PointerKind::Erc721, single_address(data)?.to_string()),
            _ => {
                return Err(PrecompileError::InvalidInput(format!(
                    "unhandled method {method}"
                )))
            }
        };
        let lookup = call.pointers.resolve_pointer(call.ctx, kind, &asset)?;
        Ok(PrecompileOutput::new(encode_lookup(kind, lookup)?, READ_GAS))
    }
}
