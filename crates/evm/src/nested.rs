//! Bridge precompiles called from contract frames.
//!
//! revm reaches a bridge precompile through its own precompile set. A
//! wrapped call handle hands the frame's caller, value and static flag to the
//! precompile through the [`StateAdapter`].
//!
//! Native modules write to the ledger directly, outside revm's journal.
//! Before a call the journaled balances are written to the bank; after it the
//! bank balances of journaled accounts are read back, and every difference is
//! journaled as a transfer against the balance sink so that a revert restores
//! it. A completed call keeps the prior values of the keys it wrote, and when
//! the journal reverts past the call those values are written back.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use dualvm_core::{Context, KeeperError};
use dualvm_storage::{RecordingStore, StorageError};
use revm::handler::register::EvmHandler;
use revm::interpreter::{CallInputs, CallScheme};
use revm::primitives::{
    Account, EVMError, PrecompileError as HaltReason, PrecompileErrors,
    PrecompileOutput as FrameOutput, PrecompileResult,
};
use revm::{
    ContextPrecompile, ContextStatefulPrecompile, InnerEvmContext, JournalEntry, JournaledState,
};
use tracing::{debug, trace};

use crate::precompiles::{Access, Precompile, PrecompileCall, PrecompileError};
use crate::state_adapter::{read_balance, write_balance, StateAdapter, StateError};

/// The frame a bridge precompile is about to run in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NestedFrame {
    caller: Address,
    value: U256,
    scheme: CallScheme,
    is_static: bool,
}

impl NestedFrame {
    fn of(inputs: &CallInputs) -> Self {
        Self {
            caller: inputs.caller,
            value: inputs.call_value(),
            scheme: inputs.scheme,
            is_static: inputs.is_static,
        }
    }
}

/// revm entry for one bridge precompile address
struct BridgeEntry {
    address: Address,
}

impl<'s, 'a, 'c> ContextStatefulPrecompile<&'s mut StateAdapter<'a, 'c>> for BridgeEntry {
    fn call(
        &self,
        input: &Bytes,
        gas_limit: u64,
        evmctx: &mut InnerEvmContext<&'s mut StateAdapter<'a, 'c>>,
    ) -> PrecompileResult {
        let InnerEvmContext {
            journaled_state,
            db,
            ..
        } = evmctx;
        db.call_nested(self.address, input, gas_limit, journaled_state)
    }
}

/// Install the bridge precompiles at `addresses` into `handler`
pub(crate) fn register<'s, 'a, 'c>(
    handler: &mut EvmHandler<'_, (), &'s mut StateAdapter<'a, 'c>>,
    addresses: &[Address],
) {
    let addresses = addresses.to_vec();
    let load = handler.pre_execution.load_precompiles.clone();
    handler.pre_execution.load_precompiles = Arc::new(move || {
        let mut precompiles = load();
        precompiles.extend(addresses.iter().map(|address| {
            let entry: Arc<dyn ContextStatefulPrecompile<&'s mut StateAdapter<'a, 'c>>> =
                Arc::new(BridgeEntry { address: *address });
            (*address, ContextPrecompile::ContextStateful(entry))
        }));
        precompiles
    });

    let call = handler.execution.call.clone();
    handler.execution.call = Arc::new(move |ctx, inputs| {
        let adapter = &mut ctx.evm.db;
        if adapter.keeper.precompiles().is_precompile(&inputs.bytecode_address) {
            adapter.pending = Some(NestedFrame::of(&inputs));
        }
        call(ctx, inputs)
    });

    let call_return = handler.execution.call_return.clone();
    handler.execution.call_return = Arc::new(move |ctx, frame, result| {
        let outcome = call_return(ctx, frame, result)?;
        let depth = ctx.evm.journaled_state.journal.len();
        ctx.evm.db.rewind_to(depth).map_err(EVMError::Database)?;
        Ok(outcome)
    });

    let create_return = handler.execution.create_return.clone();
    handler.execution.create_return = Arc::new(move |ctx, frame, result| {
        let outcome = create_return(ctx, frame, result)?;
        let depth = ctx.evm.journaled_state.journal.len();
        ctx.evm.db.rewind_to(depth).map_err(EVMError::Database)?;
        Ok(outcome)
    });
}

fn reverted(reason: impl Into<String>) -> PrecompileErrors {
    PrecompileErrors::Error(HaltReason::other(reason))
}

fn from_state(err: StateError) -> PrecompileError {
    match err {
        StateError::Store(e) => PrecompileError::Store(e),
        StateError::Keeper(e) => PrecompileError::Keeper(e),
        other => PrecompileError::InvalidInput(other.to_string()),
    }
}

/// Write the journaled balance of every loaded account to the bank
fn sync_to_bank(
    adapter_sink: Address,
    keeper: &crate::EvmKeeper,
    ctx: &mut Context<'_>,
    journal: &JournaledState,
) -> Result<(), StateError> {
    for (address, account) in &journal.state {
        if *address == adapter_sink {
            continue;
        }
        if read_balance(keeper, ctx, address)? != account.info.balance {
            write_balance(keeper, ctx, address, account.info.balance)?;
        }
    }
    Ok(())
}

/// Bring journaled balances up to the bank, journaling each correction
fn sync_from_bank(
    sink: Address,
    keeper: &crate::EvmKeeper,
    ctx: &Context<'_>,
    journal: &mut JournaledState,
) -> Result<(), StateError> {
    let mut corrections = Vec::new();
    for (address, account) in &journal.state {
        if *address == sink {
            continue;
        }
        let bank = read_balance(keeper, ctx, address)?;
        if bank != account.info.balance {
            corrections.push((*address, account.info.balance, bank));
        }
    }
    corrections.sort_by_key(|(address, _, _)| *address);

    for (address, journaled, bank) in corrections {
        trace!(address = %address, %journaled, %bank, "balance moved by precompile");
        let entry = if bank > journaled {
            JournalEntry::BalanceTransfer {
                from: sink,
                to: address,
                balance: bank - journaled,
            }
        } else {
            JournalEntry::BalanceTransfer {
                from: address,
                to: sink,
                balance: journaled - bank,
            }
        };
        if let Some(account) = journal.state.get_mut(&address) {
            account.info.balance = bank;
        }
        if let Some(level) = journal.journal.last_mut() {
            level.push(entry);
        }
        journal.touch(&address);
    }
    Ok(())
}

impl StateAdapter<'_, '_> {
    /// Run the bridge precompile at `address` for the frame captured by the
    /// call handle
    fn call_nested(
        &mut self,
        address: Address,
        input: &Bytes,
        gas_limit: u64,
        journal: &mut JournaledState,
    ) -> PrecompileResult {
        let keeper = self.keeper;
        let Some(frame) = self.pending.take() else {
            return Err(reverted("precompile frame was not captured"));
        };
        let Some(precompile) = keeper.precompiles().get(&address) else {
            return Err(reverted(format!("no precompile at {address}")));
        };
        if !matches!(frame.scheme, CallScheme::Call | CallScheme::StaticCall) {
            return Err(reverted(format!(
                "{} only accepts CALL and STATICCALL",
                precompile.name()
            )));
        }
        let gas = precompile.gas_cost(input);
        if gas > gas_limit {
            return Err(PrecompileErrors::Error(HaltReason::OutOfGas));
        }
        if frame.is_static && precompile.access(input) == Access::Write {
            return Err(reverted(format!(
                "{} cannot change state in a static call",
                precompile.name()
            )));
        }
        debug!(
            precompile = precompile.name(),
            caller = %frame.caller,
            value = %frame.value,
            depth = journal.depth(),
            "Dispatching nested precompile"
        );

        let sink = self.sink;
        journal
            .state
            .entry(sink)
            .or_insert_with(Account::new_not_existing);

        let header = self.ctx.header().clone();
        let mut recording = RecordingStore::new(self.ctx.store_mut());
        let outcome = {
            let mut ctx = Context::new(&mut recording, header);
            run(keeper, precompile, &mut ctx, address, frame, input, journal, sink)
        };
        let undo = recording.into_undo();

        let failure = match outcome {
            Ok(output) if output.gas_used.max(gas) <= gas_limit => {
                for log in output.logs {
                    journal.log(log);
                }
                self.push_undo(journal.journal.len(), undo);
                return Ok(FrameOutput::new(output.gas_used.max(gas), output.output));
            }
            Ok(_) => PrecompileErrors::Error(HaltReason::OutOfGas),
            Err(PrecompileError::Store(err) | PrecompileError::Keeper(KeeperError::Store(err))) => {
                self.fatal(err)
            }
            Err(err) => {
                debug!(precompile = precompile.name(), error = %err, "nested precompile reverted");
                reverted(err.to_string())
            }
        };
        if let Err(err) = self.ctx.store_mut().apply(undo) {
            return Err(self.fatal(err));
        }
        Err(failure)
    }

    fn fatal(&mut self, err: StorageError) -> PrecompileErrors {
        let msg = err.to_string();
        self.set_fatal(err);
        PrecompileErrors::Fatal { msg }
    }
}

#[allow(clippy::too_many_arguments)]
fn run(
    keeper: &crate::EvmKeeper,
    precompile: &dyn Precompile,
    ctx: &mut Context<'_>,
    address: Address,
    frame: NestedFrame,
    input: &Bytes,
    journal: &mut JournaledState,
    sink: Address,
) -> Result<crate::PrecompileOutput, PrecompileError> {
    sync_to_bank(sink, keeper, ctx, journal).map_err(from_state)?;
    let output = {
        let mut call = PrecompileCall {
            ctx: &mut *ctx,
            address,
            caller: frame.caller,
            value: frame.value,
            balances: keeper.evm_balance.as_ref(),
            mapper: keeper,
            pointers: keeper.registry(),
            prefix: &keeper.params().bech32_prefix,
            base_denom: &keeper.params().base_denom,
        };
        precompile.execute(&mut call, input)?
    };
    sync_from_bank(sink, keeper, ctx, journal).map_err(from_state)?;
    Ok(output)
}
