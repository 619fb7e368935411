//! IBC transfer precompile
//!
//! `transfer` takes explicit timeouts. `transferWithDefaultTimeout` derives
//! them from the channel's light client: the client's latest height plus
//! [`DEFAULT_TIMEOUT_HEIGHT_DELTA`] and the matching consensus timestamp
//! plus [`DEFAULT_TIMEOUT_SECONDS`].

use std::sync::Arc;

use alloy_primitives::Address;
use dualvm_core::{
    ChannelKeeper, ChannelState, ClientKeeper, ConnectionKeeper, Context, Height, MsgTransfer,
    TransferKeeper,
};
use dualvm_types::Coin;
use tracing::debug;

use super::{
    next, Access, MethodTable, Precompile, PrecompileCall, PrecompileError, PrecompileOutput,
    IBC_ADDRESS, WRITE_GAS,
};
use crate::abi::{self, ParamKind, Token};
use crate::registry::is_valid_denom;

const TRANSFER: &str =
    "transfer(string,string,string,string,uint256,uint64,uint64,uint64,string)";
const TRANSFER_DEFAULT_TIMEOUT: &str =
    "transferWithDefaultTimeout(string,string,string,string,uint256,string)";

/// Blocks added to the client's latest height for the default timeout
pub const DEFAULT_TIMEOUT_HEIGHT_DELTA: u64 = 1_000;

/// Seconds added to the latest consensus timestamp for the default timeout
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 600;

/// IBC transfer precompile
pub struct IbcPrecompile {
    transfer: Arc<dyn TransferKeeper>,
    clients: Arc<dyn ClientKeeper>,
    connections: Arc<dyn ConnectionKeeper>,
    channels: Arc<dyn ChannelKeeper>,
    methods: MethodTable,
}

/// Arguments shared by both transfer methods
struct TransferArgs {
    receiver: String,
    port: String,
    channel: String,
    denom: String,
    amount: u128,
}

impl TransferArgs {
    fn take(args: &mut impl Iterator<Item = Token>) -> Result<Self, PrecompileError> {
        let receiver = next(args)?.into_string()?;
        let port = next(args)?.into_string()?;
        let channel = next(args)?.into_string()?;
        let denom = next(args)?.into_string()?;
        let amount = next(args)?.into_u128()?;

        if receiver.is_empty() {
            return Err(PrecompileError::InvalidInput("empty receiver".into()));
        }
        if port.is_empty() || channel.is_empty() {
            return Err(PrecompileError::InvalidInput("empty port or channel".into()));
        }
        if !is_valid_denom(&denom) {
            return Err(PrecompileError::InvalidInput(format!("invalid denom {denom}")));
        }
        if amount == 0 {
            return Err(PrecompileError::InvalidInput("zero amount".into()));
        }
        Ok(Self {
            receiver,
            port,
            channel,
            denom,
            amount,
        })
    }
}

impl IbcPrecompile {
    /// Create the precompile
    pub fn new(
        transfer: Arc<dyn TransferKeeper>,
        clients: Arc<dyn ClientKeeper>,
        connections: Arc<dyn ConnectionKeeper>,
        channels: Arc<dyn ChannelKeeper>,
    ) -> Self {
        Self {
            transfer,
            clients,
            connections,
            channels,
            methods: MethodTable::new(&[
                (TRANSFER, Access::Write),
                (TRANSFER_DEFAULT_TIMEOUT, Access::Write),
            ]),
        }
    }

    /// Timeout height and timestamp (unix ns) for a transfer over
    /// `port`/`channel` made now
    pub fn default_timeout(
        &self,
        ctx: &Context<'_>,
        port: &str,
        channel: &str,
    ) -> Result<(Height, u64), PrecompileError> {
        let chan = self
            .channels
            .get_channel(ctx, port, channel)?
            .ok_or_else(|| PrecompileError::InvalidInput(format!("channel {port}/{channel} not found")))?;
        if chan.state != ChannelState::Open {
            return Err(PrecompileError::InvalidInput(format!(
                "channel {port}/{channel} is not open"
            )));
        }
        let connection_id = chan
            .connection_hops
            .first()
            .ok_or_else(|| PrecompileError::InvalidInput("channel has no connection".into()))?;
        let connection = self
            .connections
            .get_connection(ctx, connection_id)?
            .ok_or_else(|| {
                PrecompileError::InvalidInput(format!("connection {connection_id} not found"))
            })?;
        let client = self
            .clients
            .get_client_state(ctx, &connection.client_id)?
            .ok_or_else(|| {
                PrecompileError::InvalidInput(format!("client {} not found", connection.client_id))
            })?;
        let consensus = self
            .clients
            .get_client_consensus_state(ctx, &connection.client_id, client.latest_height)?
            .ok_or_else(|| {
                PrecompileError::InvalidInput(format!(
                    "no consensus state for client {}",
                    connection.client_id
                ))
            })?;

        let height = Height {
            revision_number: client.latest_height.revision_number,
            revision_height: client
                .latest_height
                .revision_height
                .saturating_add(DEFAULT_TIMEOUT_HEIGHT_DELTA),
        };
        let timestamp = consensus
            .timestamp
            .saturating_add(DEFAULT_TIMEOUT_SECONDS * 1_000_000_000);
        Ok((height, timestamp))
    }

    fn send(
        &self,
        call: &mut PrecompileCall<'_, '_>,
        args: TransferArgs,
        timeout_height: Height,
        timeout_timestamp: u64,
        memo: String,
    ) -> Result<PrecompileOutput, PrecompileError> {
        if timeout_height == Height::default() && timeout_timestamp == 0 {
            return Err(PrecompileError::InvalidInput("no timeout given".into()));
        }
        let msg = MsgTransfer {
            source_port: args.port,
            source_channel: args.channel,
            token: Coin::new(args.denom, args.amount),
            sender: call.caller_native()?,
            receiver: args.receiver,
            timeout_height,
            timeout_timestamp,
            memo,
        };
        let sequence = self.transfer.transfer(call.ctx, &msg)?;
        debug!(
            sender = %msg.sender,
            receiver = %msg.receiver,
            channel = %msg.source_channel,
            token = %msg.token,
            sequence,
            "transfer sent"
        );
        Ok(PrecompileOutput::new(
            abi::encode(&[Token::uint(sequence)]),
            WRITE_GAS,
        ))
    }
}

impl Precompile for IbcPrecompile {
    fn address(&self) -> Address {
        IBC_ADDRESS
    }

    fn name(&self) -> &'static str {
        "ibc"
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
        let common = [
            ParamKind::String,
            ParamKind::String,
            ParamKind::String,
            ParamKind::String,
            ParamKind::Uint,
        ];
        match method {
            TRANSFER => {
                let mut kinds = common.to_vec();
                kinds.extend([ParamKind::Uint, ParamKind::Uint, ParamKind::Uint, ParamKind::String]);
                let mut args = abi::decode(&kinds, data)?.into_iter();
                let transfer = TransferArgs::take(&mut args)?;
                let timeout_height = Height {
                    revision_number: next(&mut args)?.into_u64()?,
                    revision_height: next(&mut args)?.into_u64()?,
                };
                let timeout_timestamp = next(&mut args)?.into_u64()?;
                let memo = next(&mut args)?.into_string()?;
                self.send(call, transfer, timeout_height, timeout_timestamp, memo)
            }
            TRANSFER_DEFAULT_TIMEOUT => {
                let mut kinds = common.to_vec();
                kinds.push(ParamKind::String);
                let mut args = abi::decode(&kinds, data)?.into_iter();
                let transfer = TransferArgs::take(&mut args)?;
                let memo = next(&mut args)?.into_string()?;
                let (height, timestamp) =
                    self.default_timeout(call.ctx, &transfer.port, &transfer.channel)?;
                self.send(call, transfer, height, timestamp, memo)
            }
            _ => Err(PrecompileError::InvalidInput(format!(
                "unhandled method {method}"
            ))),
        }
    }
}
