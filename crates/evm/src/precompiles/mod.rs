//! Bridge precompiles
//!
//! Each precompile exposes one native module to EVM callers. A precompile is
//! reached either as the target of a message or from a contract frame inside
//! revm; both paths run under [`EvmKeeper::execute_message`](crate::EvmKeeper::execute_message),
//! so every write they make is checked against the message whitelist.
//!
//! Value attached to a call is held at the precompile's own account until a
//! payable method claims it with [`PrecompileCall::take_value`].
//!
//! ## Precompile Addresses
//!
//! | Address | Name | Description |
//! |---------|------|-------------|
//! | 0x1001 | Bank | Balances, metadata, pointer-driven sends |
//! | 0x1002 | Wasmd | Contract instantiate, execute, query |
//! | 0x1004 | Addr | Address mapping lookups |
//! | 0x1005 | Staking | Delegate, redelegate, undelegate |
//! | 0x1006 | Gov | Votes and deposits |
//! | 0x1007 | Distribution | Rewards and withdraw address |
//! | 0x1008 | Oracle | Exchange rates and TWAPs |
//! | 0x1009 | IBC | Outbound token transfers |
//! | 0x100b | PointerView | Pointer registry lookups |

pub mod addr;
pub mod bank;
pub mod distribution;
pub mod gov;
pub mod ibc;
pub mod oracle;
pub mod pointerview;
pub mod staking;
pub mod wasmd;

use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, U256};
use dualvm_core::{AddressMapper, Context, EvmBalanceKeeper, KeeperError, Keepers, PointerReader};
use dualvm_storage::StorageError;
use dualvm_types::{Coin, NativeAddress};
use thiserror::Error;

use crate::abi::{self, AbiError, ParamKind, Token};
use crate::keeper::u256_to_u128;

pub use addr::AddrPrecompile;
pub use bank::BankPrecompile;
pub use distribution::DistributionPrecompile;
pub use gov::GovPrecompile;
pub use ibc::IbcPrecompile;
pub use oracle::OraclePrecompile;
pub use pointerview::PointerViewPrecompile;
pub use staking::StakingPrecompile;
pub use wasmd::WasmdPrecompile;

/// Bank precompile address (0x0000...1001)
pub const BANK_ADDRESS: Address = address_from_low_u64(0x1001);

/// Wasmd precompile address (0x0000...1002)
pub const WASMD_ADDRESS: Address = address_from_low_u64(0x1002);

/// Addr precompile address (0x0000...1004)
pub const ADDR_ADDRESS: Address = address_from_low_u64(0x1004);

/// Staking precompile address (0x0000...1005)
pub const STAKING_ADDRESS: Address = address_from_low_u64(0x1005);

/// Gov precompile address (0x0000...1006)
pub const GOV_ADDRESS: Address = address_from_low_u64(0x1006);

/// Distribution precompile address (0x0000...1007)
pub const DISTRIBUTION_ADDRESS: Address = address_from_low_u64(0x1007);

/// Oracle precompile address (0x0000...1008)
pub const ORACLE_ADDRESS: Address = address_from_low_u64(0x1008);

/// IBC precompile address (0x0000...1009)
pub const IBC_ADDRESS: Address = address_from_low_u64(0x1009);

/// PointerView precompile address (0x0000...100b)
pub const POINTERVIEW_ADDRESS: Address = address_from_low_u64(0x100b);

/// Gas charged for a view method
pub const READ_GAS: u64 = 2_000;

/// Gas charged for a state-changing method
pub const WRITE_GAS: u64 = 30_000;

/// Create an address from a low u64 value
const fn address_from_low_u64(v: u64) -> Address {
    let bytes = v.to_be_bytes();
    Address::new([
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, bytes[0], bytes[1], bytes[2], bytes[3], bytes[4],
        bytes[5], bytes[6], bytes[7],
    ])
}

/// Errors that can occur in precompile execution.
///
/// Store failures abort the enclosing message; every other variant reverts
/// the call.
#[derive(Error, Debug)]
pub enum PrecompileError {
    /// Invalid input data
    #[error("invalid input data: {0}")]
    InvalidInput(String),

    /// Unknown function selector
    #[error("unknown function selector: {selector:?}")]
    UnknownSelector {
        /// The unknown selector bytes
        selector: [u8; 4],
    },

    /// Malformed ABI payload
    #[error(transparent)]
    Abi(#[from] AbiError),

    /// Value sent to a method that does not take any
    #[error("{0} is not payable")]
    NotPayable(&'static str),

    /// Caller may not perform the call
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Native module rejected the call
    #[error(transparent)]
    Keeper(#[from] KeeperError),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StorageError),

    /// Malformed JSON argument
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<dualvm_types::Error> for PrecompileError {
    fn from(err: dualvm_types::Error) -> Self {
        PrecompileError::InvalidInput(err.to_string())
    }
}

impl PrecompileError {
    /// Whether this error is a whitelist violation
    pub fn is_access_violation(&self) -> bool {
        match self {
            PrecompileError::Store(e) => e.is_access_violation(),
            PrecompileError::Keeper(e) => e.is_access_violation(),
            _ => false,
        }
    }
}

/// Output from a precompile execution
#[derive(Debug, Clone)]
pub struct PrecompileOutput {
    /// Output data
    pub output: Bytes,
    /// Gas used
    pub gas_used: u64,
    /// Logs emitted
    pub logs: Vec<revm::primitives::Log>,
}

impl PrecompileOutput {
    /// Create a new precompile output with no logs
    pub fn new(output: impl Into<Bytes>, gas_used: u64) -> Self {
        Self {
            output: output.into(),
            gas_used,
            logs: Vec::new(),
        }
    }

    /// Create output with logs
    pub fn with_logs(
        output: impl Into<Bytes>,
        gas_used: u64,
        logs: Vec<revm::primitives::Log>,
    ) -> Self {
        Self {
            output: output.into(),
            gas_used,
            logs,
        }
    }
}

/// Everything a precompile call may use: the guarded context, the call's
/// caller and value, and the EVM module's read capabilities.
pub struct PrecompileCall<'a, 'c> {
    /// Whitelisted context of the enclosing message
    pub ctx: &'a mut Context<'c>,
    /// Address of the precompile being called
    pub address: Address,
    /// EVM caller
    pub caller: Address,
    /// Value attached to the call, held at the precompile's account
    pub value: U256,
    /// Base-denom balances backing EVM value
    pub balances: &'a dyn EvmBalanceKeeper,
    /// EVM module address mapping
    pub mapper: &'a dyn AddressMapper,
    /// Pointer registry lookups
    pub pointers: &'a dyn PointerReader,
    /// Native bech32 prefix
    pub prefix: &'a str,
    /// Denomination backing EVM value
    pub base_denom: &'a str,
}

impl PrecompileCall<'_, '_> {
    /// Native address of the caller
    pub fn caller_native(&self) -> Result<NativeAddress, PrecompileError> {
        self.native_of(&self.caller)
    }

    /// Native address an EVM address maps to
    pub fn native_of(&self, evm: &Address) -> Result<NativeAddress, PrecompileError> {
        Ok(self.mapper.get_native_address_or_default(self.ctx, evm)?)
    }

    /// Parse a bech32 argument under the chain prefix
    pub fn parse_native(&self, value: &str) -> Result<NativeAddress, PrecompileError> {
        Ok(NativeAddress::parse_with_prefix(value, self.prefix)?)
    }

    /// Reject attached value
    pub fn require_no_value(&self, method: &'static str) -> Result<(), PrecompileError> {
        if self.value.is_zero() {
            Ok(())
        } else {
            Err(PrecompileError::NotPayable(method))
        }
    }

    /// Release the attached value from the precompile's account back to the
    /// caller and return it as a base-denom coin, for the module call to
    /// debit. Zero value is rejected.
    pub fn take_value(&mut self) -> Result<Coin, PrecompileError> {
        if self.value.is_zero() {
            return Err(PrecompileError::InvalidInput("no value attached".into()));
        }
        let amount = u256_to_u128(self.value)
            .ok_or_else(|| PrecompileError::InvalidInput("value out of range".into()))?;
        let coin = Coin::new(self.base_denom, amount);
        let escrow = self.native_of(&self.address)?;
        let caller = self.caller_native()?;
        self.balances.sub_unlocked_coins(self.ctx, &escrow, &coin)?;
        self.balances.add_coins(self.ctx, &caller, &coin)?;
        self.value = U256::ZERO;
        Ok(coin)
    }
}

/// Trait for precompiled contracts
pub trait Precompile: Send + Sync {
    /// Get the precompile address
    fn address(&self) -> Address;

    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Whether the method `input` selects changes state
    fn access(&self, input: &[u8]) -> Access;

    /// Get the gas cost for an operation
    fn gas_cost(&self, input: &[u8]) -> u64 {
        match self.access(input) {
            Access::Write => WRITE_GAS,
            Access::Read => READ_GAS,
        }
    }

    /// Execute the precompile
    fn execute(
        &self,
        call: &mut PrecompileCall<'_, '_>,
        input: &[u8],
    ) -> Result<PrecompileOutput, PrecompileError>;
}

/// Whether a method changes state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// View method
    Read,
    /// State-changing method
    Write,
}

/// Selector lookup for one precompile's methods
#[derive(Debug, Clone)]
pub struct MethodTable {
    methods: Vec<([u8; 4], &'static str, Access)>,
}

impl MethodTable {
    /// Table over `(signature, access)` pairs
    pub fn new(methods: &[(&'static str, Access)]) -> Self {
        Self {
            methods: methods
                .iter()
                .map(|(sig, access)| (abi::selector(sig), *sig, *access))
                .collect(),
        }
    }

    /// Split `input` and resolve its selector to a method signature
    pub fn resolve<'i>(&self, input: &'i [u8]) -> Result<(&'static str, &'i [u8]), PrecompileError> {
        let (selector, data) = abi::split_selector(input)?;
        self.methods
            .iter()
            .find(|(sel, _, _)| *sel == selector)
            .map(|(_, sig, _)| (*sig, data))
            .ok_or(PrecompileError::UnknownSelector { selector })
    }

    /// Access of the method `input` selects; unknown selectors read
    pub fn access(&self, input: &[u8]) -> Access {
        input
            .get(..4)
            .and_then(|sel| {
                self.methods
                    .iter()
                    .find(|(s, _, _)| s.as_slice() == sel)
                    .map(|(_, _, access)| *access)
            })
            .unwrap_or(Access::Read)
    }

    /// Gas for the method `input` selects
    pub fn gas_cost(&self, input: &[u8]) -> u64 {
        match self.access(input) {
            Access::Write => WRITE_GAS,
            Access::Read => READ_GAS,
        }
    }
}

/// Build an event log with an indexed address or string topic hash
pub(crate) fn event(
    address: Address,
    signature: &str,
    indexed: Vec<alloy_primitives::B256>,
    data: Vec<u8>,
) -> revm::primitives::Log {
    let mut topics = vec![abi::keccak256(signature.as_bytes())];
    topics.extend(indexed);
    revm::primitives::Log::new_unchecked(address, topics, Bytes::from(data))
}

/// Address as a 32-byte log topic
pub(crate) fn address_topic(address: &Address) -> alloy_primitives::B256 {
    address.into_word()
}

/// `(uint256 amount, string denom)[]`
pub(crate) fn coin_array(coins: Vec<Coin>) -> Token {
    Token::Array(
        coins
            .into_iter()
            .map(|c| Token::Tuple(vec![Token::uint(c.amount), Token::String(c.denom)]))
            .collect(),
    )
}

/// Next decoded argument
pub(crate) fn next(args: &mut impl Iterator<Item = Token>) -> Result<Token, PrecompileError> {
    args.next()
        .ok_or_else(|| PrecompileError::InvalidInput("missing argument".into()))
}

/// The only argument, a string
pub(crate) fn single_string(data: &[u8]) -> Result<String, PrecompileError> {
    let mut args = abi::decode(&[ParamKind::String], data)?.into_iter();
    Ok(next(&mut args)?.into_string()?)
}

/// The only argument, an address
pub(crate) fn single_address(data: &[u8]) -> Result<Address, PrecompileError> {
    let mut args = abi::decode(&[ParamKind::Address], data)?.into_iter();
    Ok(next(&mut args)?.into_address()?)
}

/// The only argument, a uint64
pub(crate) fn single_u64(data: &[u8]) -> Result<u64, PrecompileError> {
    let mut args = abi::decode(&[ParamKind::Uint], data)?.into_iter();
    Ok(next(&mut args)?.into_u64()?)
}

/// Registry of all bridge precompiles
pub struct PrecompileRegistry {
    precompiles: BTreeMap<Address, Box<dyn Precompile>>,
}

impl PrecompileRegistry {
    /// Registry with every bridge precompile wired to `keepers`
    pub fn new(keepers: &Keepers) -> Self {
        let mut registry = Self {
            precompiles: BTreeMap::new(),
        };
        registry.register(BankPrecompile::new(keepers.bank.clone(), keepers.account.clone()));
        registry.register(WasmdPrecompile::new(
            keepers.wasmd.clone(),
            keepers.wasmd_view.clone(),
        ));
        registry.register(AddrPrecompile::new());
        registry.register(StakingPrecompile::new(
            keepers.staking.clone(),
            keepers.staking_querier.clone(),
        ));
        registry.register(GovPrecompile::new(keepers.gov.clone()));
        registry.register(DistributionPrecompile::new(keepers.distribution.clone()));
        registry.register(OraclePrecompile::new(keepers.oracle.clone()));
        registry.register(IbcPrecompile::new(
            keepers.transfer.clone(),
            keepers.client.clone(),
            keepers.connection.clone(),
            keepers.channel.clone(),
        ));
        registry.register(PointerViewPrecompile::new());
        registry
    }

    /// Add or replace a precompile
    pub fn register(&mut self, precompile: impl Precompile + 'static) {
        self.precompiles
            .insert(precompile.address(), Box::new(precompile));
    }

    /// Precompile at `address`
    pub fn get(&self, address: &Address) -> Option<&dyn Precompile> {
        self.precompiles.get(address).map(|p| p.as_ref())
    }

    /// Check if an address is a registered precompile
    pub fn is_precompile(&self, address: &Address) -> bool {
        self.precompiles.contains_key(address)
    }

    /// Registered addresses, ascending
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.precompiles.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualvm_test_utils::MockModules;

    #[test]
    fn test_registry_addresses() {
        let registry = PrecompileRegistry::new(&MockModules::new().keepers());
        let addresses: Vec<Address> = registry.addresses().collect();
        assert_eq!(
            addresses,
            vec![
                BANK_ADDRESS,
                WASMD_ADDRESS,
                ADDR_ADDRESS,
                STAKING_ADDRESS,
                GOV_ADDRESS,
                DISTRIBUTION_ADDRESS,
                ORACLE_ADDRESS,
                IBC_ADDRESS,
                POINTERVIEW_ADDRESS,
            ]
        );
        assert!(!registry.is_precompile(&address_from_low_u64(0x1003)));
        assert_eq!(registry.get(&BANK_ADDRESS).map(|p| p.name()), Some("bank"));
    }

    #[test]
    fn test_method_table() {
        let table = MethodTable::new(&[
            ("balance(address,string)", Access::Read),
            ("send(address,address,string,uint256)", Access::Write),
        ]);
        let input = abi::encode_call(abi::selector("send(address,address,string,uint256)"), &[]);
        let (sig, data) = table.resolve(&input).unwrap();
        assert_eq!(sig, "send(address,address,string,uint256)");
        assert!(data.is_empty());
        assert_eq!(table.gas_cost(&input), WRITE_GAS);
        assert_eq!(table.access(&input), Access::Write);
        assert_eq!(table.gas_cost(&[1, 2]), READ_GAS);
        assert_eq!(table.access(&[0xde, 0xad, 0xbe, 0xef]), Access::Read);

        let err = table.resolve(&[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert!(matches!(err, PrecompileError::UnknownSelector { .. }));
    }
}
