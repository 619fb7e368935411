//! State adapter between revm and the ledger.
//!
//! revm reads accounts, code and storage through the [`Database`] impl;
//! the changes it reports are written back by
//! [`StateAdapter::apply_changes`]. Balances are bank balances of the mapped
//! native address, so every value transfer lands in the bank partition and
//! goes through whatever whitelist wraps the context.
//!
//! The adapter also carries what bridge precompiles called from contract
//! frames need between revm's handles: the frame being dispatched, the undo
//! log of completed calls, and a store failure to surface once revm unwinds.

use alloy_primitives::{Address, B256, U256};
use dualvm_core::{AddressMapper, Context, KeeperError};
use dualvm_storage::{partitions::EVM, ChangeSet, StorageError};
use dualvm_types::Coin;
use revm::primitives::{Account, AccountInfo, Bytecode, KECCAK_EMPTY};
use revm::Database;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::keeper::{module_address, u256_to_u128, EvmKeeper, StoredAccount};
use crate::keys::{account_key, code_key, storage_key, storage_prefix};
use crate::nested::NestedFrame;

/// Name of the module account journaled balance corrections are booked
/// against. It never holds a ledger balance.
pub(crate) const BALANCE_SINK_NAME: &str = "evm-balance-sink";

/// Errors of the state adapter
#[derive(Error, Debug)]
pub enum StateError {
    /// Store failure, including whitelist violations
    #[error(transparent)]
    Store(#[from] StorageError),

    /// Balance or address mapping call failed
    #[error(transparent)]
    Keeper(#[from] KeeperError),

    /// An account references code that is not stored
    #[error("code not found for hash {0}")]
    MissingCode(B256),

    /// A balance does not fit the bank's amount type
    #[error("balance of {0} exceeds the native amount range")]
    BalanceOverflow(Address),
}

impl StateError {
    /// Whether this error is a whitelist violation
    pub fn is_access_violation(&self) -> bool {
        match self {
            StateError::Store(e) => e.is_access_violation(),
            StateError::Keeper(e) => e.is_access_violation(),
            _ => false,
        }
    }
}

/// Per-message view of EVM state plus the gas refund counter
pub struct StateAdapter<'a, 'c> {
    pub(crate) keeper: &'a EvmKeeper,
    pub(crate) ctx: &'a mut Context<'c>,
    refund: u64,
    pub(crate) sink: Address,
    pub(crate) pending: Option<NestedFrame>,
    undo_log: Vec<(usize, ChangeSet)>,
    fatal: Option<StorageError>,
}

impl<'a, 'c> StateAdapter<'a, 'c> {
    /// Adapter over `ctx` with a zero refund counter
    pub fn new(keeper: &'a EvmKeeper, ctx: &'a mut Context<'c>) -> Self {
        Self {
            keeper,
            ctx,
            refund: 0,
            sink: module_address(BALANCE_SINK_NAME),
            pending: None,
            undo_log: Vec::new(),
            fatal: None,
        }
    }

    /// Context the adapter reads and writes
    pub fn ctx(&mut self) -> &mut Context<'c> {
        self.ctx
    }

    /// Accumulated gas refund.
    ///
    /// revm keeps the per-frame refund itself, including the reductions of
    /// storage slots set back to their original value. Once a message has
    /// run, the executor adds revm's final capped refund here, so transaction
    /// level code reads one number. [`StateAdapter::sub_refund`] is for
    /// callers adjusting the counter outside revm.
    pub fn get_refund(&self) -> u64 {
        self.refund
    }

    /// Add to the gas refund
    pub fn add_refund(&mut self, gas: u64) {
        trace!(gas, refund = self.refund, "adding refund");
        self.refund = self.refund.saturating_add(gas);
    }

    /// Remove from the gas refund.
    ///
    /// # Panics
    ///
    /// If `gas` exceeds the accumulated refund.
    pub fn sub_refund(&mut self, gas: u64) {
        trace!(gas, refund = self.refund, "subtracting refund");
        if gas > self.refund {
            panic!("refund counter below zero ({gas} > {})", self.refund);
        }
        self.refund -= gas;
    }

    /// Record the prior values of a completed nested precompile call made
    /// while the journal held `depth` levels
    pub(crate) fn push_undo(&mut self, depth: usize, undo: ChangeSet) {
        if !undo.is_empty() {
            self.undo_log.push((depth, undo));
        }
    }

    /// Undo the nested precompile calls made in frames the journal has
    /// since reverted, i.e. those recorded deeper than `depth`
    pub(crate) fn rewind_to(&mut self, depth: usize) -> Result<(), StateError> {
        while let Some((recorded, _)) = self.undo_log.last() {
            if *recorded <= depth {
                break;
            }
            if let Some((recorded, undo)) = self.undo_log.pop() {
                trace!(recorded, depth, entries = undo.len(), "undoing nested precompile call");
                self.ctx.store_mut().apply(undo)?;
            }
        }
        Ok(())
    }

    /// Undo every nested precompile call of the message
    pub(crate) fn rewind_all(&mut self) -> Result<(), StateError> {
        self.rewind_to(0)
    }

    /// Keep a store failure of a nested call for the executor
    pub(crate) fn set_fatal(&mut self, err: StorageError) {
        if self.fatal.is_none() {
            warn!(error = %err, "nested precompile call hit a store failure");
            self.fatal = Some(err);
        }
    }

    /// Store failure raised inside revm, if any
    pub(crate) fn take_fatal(&mut self) -> Option<StorageError> {
        self.fatal.take()
    }

    fn balance(&self, address: &Address) -> Result<U256, StateError> {
        read_balance(self.keeper, self.ctx, address)
    }

    fn set_balance(&mut self, address: &Address, target: U256) -> Result<(), StateError> {
        write_balance(self.keeper, self.ctx, address, target)
    }

    fn clear_storage(&self, address: &Address, changes: &mut ChangeSet) -> Result<(), StateError> {
        for (key, _) in self.ctx.prefix_scan(EVM, &storage_prefix(address))? {
            changes.delete(EVM, &key);
        }
        Ok(())
    }

    /// Write the state changes of one execution.
    ///
    /// Accounts are processed in address order. Self-destructed and empty
    /// touched accounts are removed.
    pub fn apply_changes<I>(&mut self, state: I) -> Result<(), StateError>
    where
        I: IntoIterator<Item = (Address, Account)>,
    {
        let sink = self.sink;
        let mut accounts: Vec<(Address, Account)> = state
            .into_iter()
            .filter(|(address, account)| *address != sink && account.is_touched())
            .collect();
        accounts.sort_by_key(|(address, _)| *address);

        let mut changes = ChangeSet::new();
        for (address, account) in &accounts {
            if account.is_selfdestructed() || account.info.is_empty() {
                trace!(address = %address, "removing account");
                changes.delete(EVM, &account_key(address));
                if account.is_selfdestructed() {
                    self.clear_storage(address, &mut changes)?;
                }
                continue;
            }

            if account.is_created() {
                self.clear_storage(address, &mut changes)?;
            }

            let code_hash = account.info.code_hash;
            if code_hash != KECCAK_EMPTY {
                let key = code_key(&code_hash);
                if let Some(code) = &account.info.code {
                    if self.ctx.get(EVM, &key)?.is_none() {
                        changes.set(EVM, &key, code.original_bytes().to_vec());
                    }
                }
            }
            let record = StoredAccount {
                nonce: account.info.nonce,
                code_hash: (code_hash != KECCAK_EMPTY).then_some(code_hash.0),
            };
            changes.set(EVM, &account_key(address), dualvm_storage::encode(&record)?);

            for (slot, value) in &account.storage {
                if !value.is_changed() {
                    continue;
                }
                let key = storage_key(address, slot);
                if value.present_value.is_zero() {
                    changes.delete(EVM, &key);
                } else {
                    changes.set(EVM, &key, value.present_value.to_be_bytes::<32>().to_vec());
                }
            }
        }

        let writes = changes.len();
        self.ctx.store_mut().apply(changes)?;

        for (address, account) in &accounts {
            let target = if account.is_selfdestructed() {
                U256::ZERO
            } else {
                account.info.balance
            };
            if target != self.balance(address)? {
                self.set_balance(address, target)?;
            }
        }
        debug!(accounts = accounts.len(), writes, "state changes applied");
        Ok(())
    }
}

/// Base-denom balance of `address` in `ctx`
pub(crate) fn read_balance(
    keeper: &EvmKeeper,
    ctx: &Context<'_>,
    address: &Address,
) -> Result<U256, StateError> {
    Ok(keeper.get_balance(ctx, address)?)
}

/// Move the base-denom balance of `address` in `ctx` to `target`
pub(crate) fn write_balance(
    keeper: &EvmKeeper,
    ctx: &mut Context<'_>,
    address: &Address,
    target: U256,
) -> Result<(), StateError> {
    let target = u256_to_u128(target).ok_or(StateError::BalanceOverflow(*address))?;
    let native = keeper.get_native_address_or_default(ctx, address)?;
    let denom = &keeper.params().base_denom;
    let current = keeper.evm_balance.get_balance(ctx, &native, denom)?.amount;

    if target > current {
        let coin = Coin::new(denom.clone(), target - current);
        keeper.evm_balance.add_coins(ctx, &native, &coin)?;
    } else if target < current {
        let coin = Coin::new(denom.clone(), current - target);
        keeper.evm_balance.sub_unlocked_coins(ctx, &native, &coin)?;
    }
    Ok(())
}

impl Database for StateAdapter<'_, '_> {
    type Error = StateError;

    fn basic(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        trace!(address = %address, "loading account");
        let stored = self.keeper.account(self.ctx, &address)?;
        let balance = self.balance(&address)?;
        if stored.is_none() && balance.is_zero() {
            return Ok(None);
        }
        let stored = stored.unwrap_or_default();
        Ok(Some(AccountInfo {
            balance,
            nonce: stored.nonce,
            code_hash: stored.code_hash(),
            code: None,
        }))
    }

    fn code_by_hash(&mut self, code_hash: B256) -> Result<Bytecode, Self::Error> {
        trace!(code_hash = %code_hash, "loading code");
        if code_hash == KECCAK_EMPTY {
            return Ok(Bytecode::default());
        }
        let code = self
            .keeper
            .code_by_hash(self.ctx, &code_hash)?
            .ok_or(StateError::MissingCode(code_hash))?;
        Ok(Bytecode::new_raw(code))
    }

    fn storage(&mut self, address: Address, index: U256) -> Result<U256, Self::Error> {
        trace!(address = %address, slot = %index, "loading storage");
        Ok(self.keeper.get_state(self.ctx, &address, &index)?)
    }

    fn block_hash(&mut self, number: u64) -> Result<B256, Self::Error> {
        trace!(number, "block hash requested");
        Ok(B256::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::PointerArtifacts;
    use crate::keeper::EvmParams;
    use dualvm_storage::Whitelist;
    use dualvm_test_utils::{test_header, test_store, MockModules, TEST_DENOM, TEST_PREFIX};

    fn keeper() -> (EvmKeeper, MockModules) {
        let mocks = MockModules::new();
        let keeper = EvmKeeper::new(
            EvmParams::new(TEST_PREFIX, TEST_DENOM),
            PointerArtifacts::default(),
            Whitelist::new(),
            &mocks.keepers(),
        );
        (keeper, mocks)
    }

    #[test]
    fn test_refund_add_and_sub() {
        let (keeper, _) = keeper();
        let mut store = test_store();
        let mut ctx = Context::new(&mut store, test_header());
        let mut adapter = StateAdapter::new(&keeper, &mut ctx);

        adapter.add_refund(2);
        assert_eq!(adapter.get_refund(), 2);
        adapter.sub_refund(1);
        assert_eq!(adapter.get_refund(), 1);
    }

    #[test]
    #[should_panic(expected = "refund counter below zero")]
    fn test_refund_underflow_panics() {
        let (keeper, _) = keeper();
        let mut store = test_store();
        let mut ctx = Context::new(&mut store, test_header());
        let mut adapter = StateAdapter::new(&keeper, &mut ctx);

        adapter.add_refund(2);
        adapter.sub_refund(1);
        adapter.sub_refund(2);
    }

    #[test]
    fn test_unknown_account_is_absent() {
        let (keeper, _) = keeper();
        let mut store = test_store();
        let mut ctx = Context::new(&mut store, test_header());
        let mut adapter = StateAdapter::new(&keeper, &mut ctx);

        assert!(adapter.basic(Address::repeat_byte(9)).unwrap().is_none());
        assert_eq!(
            adapter.storage(Address::repeat_byte(9), U256::from(1u8)).unwrap(),
            U256::ZERO
        );
        assert!(adapter.code_by_hash(B256::repeat_byte(1)).is_err());
        assert!(adapter.code_by_hash(KECCAK_EMPTY).unwrap().is_empty());
    }

    #[test]
    fn test_balance_reads_bank() {
        let (keeper, mocks) = keeper();
        let mut store = test_store();
        let mut ctx = Context::new(&mut store, test_header());
        let (native, evm) = dualvm_test_utils::mock_address_pair(5);
        mocks
            .bank
            .mint(&mut ctx, &native, &Coin::new(TEST_DENOM, 1_000))
            .unwrap();

        let mut adapter = StateAdapter::new(&keeper, &mut ctx);
        let info = adapter.basic(evm).unwrap().unwrap();
        assert_eq!(info.balance, U256::from(1_000u64));
        assert_eq!(info.code_hash, KECCAK_EMPTY);
    }
}
