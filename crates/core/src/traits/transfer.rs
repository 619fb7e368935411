//! Cross-chain token transfer.

use dualvm_types::{Coin, NativeAddress};
use serde::{Deserialize, Serialize};

use super::ibc::Height;
use crate::{Context, KeeperResult};

/// Send tokens over a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTransfer {
    /// Source port
    pub source_port: String,
    /// Source channel
    pub source_channel: String,
    /// Tokens to send
    pub token: Coin,
    /// Sending account
    pub sender: NativeAddress,
    /// Receiver on the counterparty chain, in its own format
    pub receiver: String,
    /// Counterparty height after which the packet times out
    pub timeout_height: Height,
    /// Unix nanoseconds after which the packet times out; 0 disables
    pub timeout_timestamp: u64,
    /// Free-form memo
    pub memo: String,
}

/// Outbound transfers
pub trait TransferKeeper: Send + Sync {
    /// Send a packet; returns its sequence number
    fn transfer(&self, ctx: &mut Context<'_>, msg: &MsgTransfer) -> KeeperResult<u64>;
}
