//! EVM message execution.
//!
//! [`EvmKeeper::execute_message`] is the VM-crossing entry point: the context
//! store is wrapped in the keeper's write whitelist, a cache layer is opened
//! on top, and the layer is committed only if the message succeeds. Calls to
//! a bridge precompile address are dispatched directly, with any value moved
//! from the caller to the precompile's account first; everything else runs
//! in revm through the [`StateAdapter`], where contracts reach the same
//! precompiles through revm's precompile set.

use alloy_primitives::{Address, Bytes, B256, U256};
use dualvm_core::{AddressMapper, BlockHeader, Context, KeeperError};
use dualvm_storage::{StorageError, WhitelistedStore};
use dualvm_types::Coin;
use revm::primitives::{
    EVMError, Env, EnvWithHandlerCfg, ExecutionResult, Output, ResultAndState, TxKind,
};
use revm::handler::register::HandleRegisterBox;
use revm::Evm;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::keeper::{u256_to_u128, EvmKeeper};
use crate::nested;
use crate::precompiles::{Precompile, PrecompileCall, PrecompileError};
use crate::state_adapter::{StateAdapter, StateError};

/// Gas limit of messages that do not set one
pub const DEFAULT_MESSAGE_GAS_LIMIT: u64 = 10_000_000;

/// Errors that abort a message. Reverts and halts are not errors; they are
/// reported through [`MessageResult::success`].
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The message tried to write outside the whitelist
    #[error("access violation: {0}")]
    AccessViolation(#[source] StorageError),

    /// State read or write failed
    #[error("state error: {0}")]
    State(StateError),

    /// Store failure
    #[error("store error: {0}")]
    Store(StorageError),

    /// A native module call failed outside any precompile
    #[error("keeper error: {0}")]
    Keeper(KeeperError),

    /// revm rejected the transaction before execution
    #[error("EVM error: {0}")]
    Evm(String),
}

impl From<StorageError> for ExecutionError {
    fn from(err: StorageError) -> Self {
        if err.is_access_violation() {
            ExecutionError::AccessViolation(err)
        } else {
            ExecutionError::Store(err)
        }
    }
}

impl From<KeeperError> for ExecutionError {
    fn from(err: KeeperError) -> Self {
        match err {
            KeeperError::Store(e) => e.into(),
            other => ExecutionError::Keeper(other),
        }
    }
}

impl From<StateError> for ExecutionError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Store(e) => e.into(),
            StateError::Keeper(e) if e.is_access_violation() => e.into(),
            other => ExecutionError::State(other),
        }
    }
}

impl From<EVMError<StateError>> for ExecutionError {
    fn from(err: EVMError<StateError>) -> Self {
        match err {
            EVMError::Database(e) => e.into(),
            other => ExecutionError::Evm(format!("{other:?}")),
        }
    }
}

impl ExecutionError {
    /// Whether this error is a whitelist violation
    pub fn is_access_violation(&self) -> bool {
        matches!(self, ExecutionError::AccessViolation(_))
    }
}

/// A call or contract creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmMessage {
    /// Sender
    pub from: Address,
    /// Recipient, `None` for contract creation
    pub to: Option<Address>,
    /// Value in wei
    pub value: U256,
    /// Call data or init code
    pub data: Bytes,
    /// Gas limit
    pub gas_limit: u64,
}

impl EvmMessage {
    /// Call `to` with `data`
    pub fn call(from: Address, to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from,
            to: Some(to),
            value: U256::ZERO,
            data: data.into(),
            gas_limit: DEFAULT_MESSAGE_GAS_LIMIT,
        }
    }

    /// Deploy `init_code`
    pub fn create(from: Address, init_code: impl Into<Bytes>) -> Self {
        Self {
            from,
            to: None,
            value: U256::ZERO,
            data: init_code.into(),
            gas_limit: DEFAULT_MESSAGE_GAS_LIMIT,
        }
    }

    /// Attach value
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Set the gas limit
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}

/// Event log emitted during execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract address that emitted the log
    pub address: Address,
    /// Log topics (first is event signature hash)
    pub topics: Vec<B256>,
    /// Log data
    pub data: Bytes,
}

impl From<revm::primitives::Log> for Log {
    fn from(log: revm::primitives::Log) -> Self {
        Self {
            address: log.address,
            topics: log.data.topics().to_vec(),
            data: log.data.data.clone(),
        }
    }
}

/// Outcome of a message that ran to completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResult {
    /// Whether execution succeeded and its writes were kept
    pub success: bool,
    /// Gas used
    pub gas_used: u64,
    /// Gas refund accumulated by the state adapter
    pub gas_refunded: u64,
    /// Return data, revert data, or the created contract's runtime code
    pub output: Bytes,
    /// Address of the created contract
    pub contract_address: Option<Address>,
    /// Logs emitted
    pub logs: Vec<Log>,
    /// Revert or halt reason
    pub error: Option<String>,
}

impl MessageResult {
    fn failed(gas_used: u64, output: Bytes, error: String) -> Self {
        Self {
            success: false,
            gas_used,
            gas_refunded: 0,
            output,
            contract_address: None,
            logs: Vec::new(),
            error: Some(error),
        }
    }

    fn from_execution(result: ExecutionResult, gas_refunded: u64) -> Self {
        match result {
            ExecutionResult::Success {
                gas_used,
                logs,
                output,
                ..
            } => {
                let (output, contract_address) = match output {
                    Output::Call(bytes) => (bytes, None),
                    Output::Create(bytes, address) => (bytes, address),
                };
                Self {
                    success: true,
                    gas_used,
                    gas_refunded,
                    output,
                    contract_address,
                    logs: logs.into_iter().map(Log::from).collect(),
                    error: None,
                }
            }
            ExecutionResult::Revert { gas_used, output } => {
                Self::failed(gas_used, output, "execution reverted".into())
            }
            ExecutionResult::Halt { reason, gas_used } => {
                Self::failed(gas_used, Bytes::new(), format!("halted: {reason:?}"))
            }
        }
    }
}

impl EvmKeeper {
    /// Execute a message on the whitelist-enforced path.
    ///
    /// Writes are committed only if the message succeeds. A write outside the
    /// whitelist aborts the whole message with
    /// [`ExecutionError::AccessViolation`].
    pub fn execute_message(
        &self,
        ctx: &mut Context<'_>,
        msg: &EvmMessage,
    ) -> Result<MessageResult, ExecutionError> {
        trace!(
            from = %msg.from,
            to = ?msg.to,
            value = %msg.value,
            gas_limit = msg.gas_limit,
            "Executing message"
        );
        let header = ctx.header().clone();
        let mut guarded = WhitelistedStore::new(ctx.store_mut(), self.whitelist().clone());
        let mut guarded_ctx = Context::new(&mut guarded, header);
        let mut branch = guarded_ctx.branch();

        let outcome = {
            let mut inner = branch.ctx();
            match msg.to.and_then(|to| self.precompiles().get(&to)) {
                Some(precompile) => self.call_precompile(&mut inner, precompile, msg),
                None => self.transact(&mut inner, msg, true),
            }
        };

        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                if err.is_access_violation() {
                    warn!(from = %msg.from, to = ?msg.to, error = %err, "message aborted");
                }
                return Err(err);
            }
        };
        if result.success {
            branch.commit()?;
        }
        debug!(
            from = %msg.from,
            success = result.success,
            gas_used = result.gas_used,
            gas_refunded = result.gas_refunded,
            "Message executed"
        );
        Ok(result)
    }

    fn build_env(&self, header: &BlockHeader, msg: &EvmMessage) -> EnvWithHandlerCfg {
        let mut env = Env::default();
        env.cfg.chain_id = self.params().chain_id;

        env.block.number = U256::from(header.height);
        env.block.timestamp = U256::from(header.time);
        env.block.gas_limit = U256::from(msg.gas_limit);
        env.block.basefee = U256::ZERO;

        env.tx.caller = msg.from;
        env.tx.transact_to = match msg.to {
            Some(to) => TxKind::Call(to),
            None => TxKind::Create,
        };
        env.tx.value = msg.value;
        env.tx.data = msg.data.clone();
        env.tx.gas_limit = msg.gas_limit;
        env.tx.gas_price = U256::ZERO;
        env.tx.nonce = None;

        EnvWithHandlerCfg::new_with_spec_id(Box::new(env), self.params().spec)
    }

    /// Run `msg` in revm against `ctx` without any whitelist of its own.
    /// State changes are written back only if `commit` is set and the
    /// message succeeded.
    pub(crate) fn transact(
        &self,
        ctx: &mut Context<'_>,
        msg: &EvmMessage,
        commit: bool,
    ) -> Result<MessageResult, ExecutionError> {
        let env = self.build_env(ctx.header(), msg);
        let addresses: Vec<Address> = self.precompiles().addresses().collect();
        let mut adapter = StateAdapter::new(self, ctx);

        let outcome = {
            let bridge: HandleRegisterBox<'_, (), &mut StateAdapter<'_, '_>> =
                Box::new(move |handler| nested::register(handler, &addresses));
            let mut evm = Evm::builder()
                .with_db(&mut adapter)
                .with_env_with_handler_cfg(env)
                .append_handler_register_box(bridge)
                .build();
            evm.transact()
        };

        let ResultAndState { result, state } = match outcome {
            Ok(done) => done,
            Err(err) => {
                let fatal = adapter.take_fatal();
                adapter.rewind_all()?;
                return Err(match (err, fatal) {
                    (EVMError::Precompile(_), Some(store)) => store.into(),
                    (err, _) => err.into(),
                });
            }
        };

        if let ExecutionResult::Success { gas_refunded, .. } = &result {
            adapter.add_refund(*gas_refunded);
        }
        let out = MessageResult::from_execution(result, adapter.get_refund());
        if commit && out.success {
            adapter.apply_changes(state)?;
        } else {
            adapter.rewind_all()?;
        }
        Ok(out)
    }

    fn call_precompile(
        &self,
        ctx: &mut Context<'_>,
        precompile: &dyn Precompile,
        msg: &EvmMessage,
    ) -> Result<MessageResult, ExecutionError> {
        let gas = precompile.gas_cost(&msg.data);
        if gas > msg.gas_limit {
            return Ok(MessageResult::failed(msg.gas_limit, Bytes::new(), "out of gas".into()));
        }
        debug!(
            precompile = precompile.name(),
            caller = %msg.from,
            gas,
            "Dispatching precompile"
        );

        if !msg.value.is_zero() {
            let Some(amount) = u256_to_u128(msg.value) else {
                return Ok(MessageResult::failed(gas, Bytes::new(), "value out of range".into()));
            };
            let coin = Coin::new(self.params().base_denom.clone(), amount);
            let caller = self.get_native_address_or_default(ctx, &msg.from)?;
            let escrow = self.get_native_address_or_default(ctx, &precompile.address())?;
            match self.evm_balance.sub_unlocked_coins(ctx, &caller, &coin) {
                Ok(()) => {}
                Err(KeeperError::InsufficientFunds(_)) => {
                    return Ok(MessageResult::failed(
                        gas,
                        Bytes::new(),
                        "insufficient funds for value".into(),
                    ));
                }
                Err(err) => return Err(err.into()),
            }
            self.evm_balance.add_coins(ctx, &escrow, &coin)?;
        }

        let mut call = PrecompileCall {
            ctx,
            address: precompile.address(),
            caller: msg.from,
            value: msg.value,
            balances: self.evm_balance.as_ref(),
            mapper: self,
            pointers: self.registry(),
            prefix: &self.params().bech32_prefix,
            base_denom: &self.params().base_denom,
        };
        match precompile.execute(&mut call, &msg.data) {
            Ok(output) => Ok(MessageResult {
                success: true,
                gas_used: output.gas_used.max(gas),
                gas_refunded: 0,
                output: output.output,
                contract_address: None,
                logs: output.logs.into_iter().map(Log::from).collect(),
                error: None,
            }),
            Err(PrecompileError::Keeper(KeeperError::Store(err))) => Err(err.into()),
            Err(PrecompileError::Store(err)) => Err(err.into()),
            Err(err) => {
                debug!(precompile = precompile.name(), error = %err, "precompile reverted");
                Ok(MessageResult::failed(gas, Bytes::new(), err.to_string()))
            }
        }
    }
}
