//! Bank precompile
//!
//! Balance and metadata views over the bank module, plus two sends:
//! `send` moves a denom on behalf of that denom's NATIVE pointer contract,
//! and `sendNative` moves the attached value to a bech32 recipient.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use dualvm_core::{AccountKeeper, BankKeeper};
use dualvm_types::{parse_evm_address, Coin, DenomMetadata, NativeAddress, PointerKind};
use tracing::debug;

use super::{
    address_topic, coin_array, event, next, single_address, single_string, Access, MethodTable,
    Precompile, PrecompileCall, PrecompileError, PrecompileOutput, BANK_ADDRESS, READ_GAS,
    WRITE_GAS,
};
use crate::abi::{self, ParamKind, Token};

const SEND: &str = "send(address,address,string,uint256)";
const SEND_NATIVE: &str = "sendNative(string)";
const BALANCE: &str = "balance(address,string)";
const ALL_BALANCES: &str = "all_balances(address)";
const SPENDABLE_BALANCES: &str = "spendable_balances(address)";
const LOCKED_BALANCES: &str = "locked_balances(address)";
const NAME: &str = "name(string)";
const SYMBOL: &str = "symbol(string)";
const DECIMALS: &str = "decimals(string)";
const SUPPLY: &str = "supply(string)";

const TRANSFER_EVENT: &str = "Transfer(address,address,string,uint256)";

/// Bank module precompile
pub struct BankPrecompile {
    bank: Arc<dyn BankKeeper>,
    accounts: Arc<dyn AccountKeeper>,
    methods: MethodTable,
}

impl BankPrecompile {
    /// Create the precompile
    pub fn new(bank: Arc<dyn BankKeeper>, accounts: Arc<dyn AccountKeeper>) -> Self {
        Self {
            bank,
            accounts,
            methods: MethodTable::new(&[
                (SEND, Access::Write),
                (SEND_NATIVE, Access::Write),
                (BALANCE, Access::Read),
                (ALL_BALANCES, Access::Read),
                (SPENDABLE_BALANCES, Access::Read),
                (LOCKED_BALANCES, Access::Read),
                (NAME, Access::Read),
                (SYMBOL, Access::Read),
                (DECIMALS, Access::Read),
                (SUPPLY, Access::Read),
            ]),
        }
    }

    fn metadata(
        &self,
        call: &PrecompileCall<'_, '_>,
        data: &[u8],
    ) -> Result<DenomMetadata, PrecompileError> {
        let denom = single_string(data)?;
        Ok(self
            .bank
            .get_denom_metadata(call.ctx, &denom)?
            .unwrap_or_else(|| DenomMetadata::fallback(&denom)))
    }

    fn ensure_account(
        &self,
        call: &mut PrecompileCall<'_, '_>,
        addr: &NativeAddress,
    ) -> Result<(), PrecompileError> {
        if !self.accounts.has_account(call.ctx, addr)? {
            self.accounts.new_account_with_address(call.ctx, addr)?;
        }
        Ok(())
    }

    fn send(
        &self,
        call: &mut PrecompileCall<'_, '_>,
        data: &[u8],
    ) -> Result<PrecompileOutput, PrecompileError> {
        call.require_no_value(SEND)?;
        let mut args = abi::decode(
            &[ParamKind::Address, ParamKind::Address, ParamKind::String, ParamKind::Uint],
            data,
        )?
        .into_iter();
        let from = next(&mut args)?.into_address()?;
        let to = next(&mut args)?.into_address()?;
        let denom = next(&mut args)?.into_string()?;
        let amount = next(&mut args)?.into_u128()?;

        let pointer = call
            .pointers
            .resolve_pointer(call.ctx, PointerKind::Native, &denom)?;
        if !pointer.exists || parse_evm_address(&pointer.address)? != call.caller {
            return Err(PrecompileError::Unauthorized(format!(
                "caller {} is not the pointer of {denom}",
                call.caller
            )));
        }
        if amount == 0 {
            return Err(PrecompileError::InvalidInput("zero amount".into()));
        }

        let sender = call.native_of(&from)?;
        let recipient = call.native_of(&to)?;
        self.bank
            .send_coins(call.ctx, &sender, &recipient, &[Coin::new(denom.clone(), amount)])?;
        self.ensure_account(call, &recipient)?;
        debug!(from = %sender, to = %recipient, denom = %denom, amount, "pointer send");

        let log = event(
            BANK_ADDRESS,
            TRANSFER_EVENT,
            vec![address_topic(&from), address_topic(&to)],
            abi::encode(&[Token::String(denom), Token::uint(amount)]),
        );
        Ok(PrecompileOutput::with_logs(
            abi::encode(&[Token::Bool(true)]),
            WRITE_GAS,
            vec![log],
        ))
    }

    fn send_native(
        &self,
        call: &mut PrecompileCall<'_, '_>,
        data: &[u8],
    ) -> Result<PrecompileOutput, PrecompileError> {
        let recipient = call.parse_native(&single_string(data)?)?;
        let coin = call.take_value()?;
        let sender = call.caller_native()?;
        self.bank
            .send_coins(call.ctx, &sender, &recipient, std::slice::from_ref(&coin))?;
        self.ensure_account(call, &recipient)?;
        debug!(from = %sender, to = %recipient, amount = %coin, "native send");
        Ok(PrecompileOutput::new(
            abi::encode(&[Token::Bool(true)]),
            WRITE_GAS,
        ))
    }

    fn coins_of(
        &self,
        call: &PrecompileCall<'_, '_>,
        data: &[u8],
        method: &'static str,
    ) -> Result<PrecompileOutput, PrecompileError> {
        let addr = single_address(data)?;
        let native = call.native_of(&addr)?;
        let coins = match method {
            SPENDABLE_BALANCES => self.bank.spendable_coins(call.ctx, &native)?,
            LOCKED_BALANCES => self.bank.locked_coins(call.ctx, &native)?,
            _ => self.bank.get_all_balances(call.ctx, &native)?,
        };
        Ok(PrecompileOutput::new(
            abi::encode(&[coin_array(coins)]),
            READ_GAS,
        ))
    }
}

impl Precompile for BankPrecompile {
    fn address(&self) -> Address {
        BANK_ADDRESS
    }

    fn name(&self) -> &'static str {
        "bank"
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
            SEND => return self.send(call, data),
            SEND_NATIVE => return self.send_native(call, data),
            _ => call.require_no_value(method)?,
        }

        let output = match method {
            BALANCE => {
                let mut args =
                    abi::decode(&[ParamKind::Address, ParamKind::String], data)?.into_iter();
                let addr = next(&mut args)?.into_address()?;
                let denom = next(&mut args)?.into_string()?;
                let native = call.native_of(&addr)?;
                let coin = self.bank.get_balance(call.ctx, &native, &denom)?;
                abi::encode(&[Token::uint(coin.amount)])
            }
            ALL_BALANCES | SPENDABLE_BALANCES | LOCKED_BALANCES => {
                return self.coins_of(call, data, method)
            }
            NAME => abi::encode(&[Token::String(self.metadata(call, data)?.name)]),
            SYMBOL => abi::encode(&[Token::String(self.metadata(call, data)?.symbol)]),
            DECIMALS => {
                abi::encode(&[Token::uint(U256::from(self.metadata(call, data)?.decimals))])
            }
            SUPPLY => {
                let denom = single_string(data)?;
                let supply = self.bank.get_supply(call.ctx, &denom)?;
                abi::encode(&[Token::uint(supply.amount)])
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
