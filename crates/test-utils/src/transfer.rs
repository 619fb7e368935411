use dualvm_core::{Context, KeeperError, KeeperResult, MsgTransfer, TransferKeeper};
use dualvm_storage::partitions::TRANSFER;

use crate::{read, write};

/// Next sequence under `sequence/{port}/{channel}`, sent packets under
/// `packets/{port}/{channel}/{sequence}`
#[derive(Debug, Default)]
pub struct MockTransfer;

impl MockTransfer {
    /// Create the mock
    pub fn new() -> Self {
        Self
    }

    /// A sent packet
    pub fn packet(&self, ctx: &Context<'_>, port: &str, channel: &str, sequence: u64) -> KeeperResult<Option<MsgTransfer>> {
        read(ctx, TRANSFER, &format!("packets/{port}/{channel}/{sequence}"))
    }
}

impl TransferKeeper for MockTransfer {
    fn transfer(&self, ctx: &mut Context<'_>, msg: &MsgTransfer) -> KeeperResult<u64> {
        if msg.token.is_zero() {
            return Err(KeeperError::InvalidRequest("zero transfer".into()));
        }
        if msg.receiver.is_empty() {
            return Err(KeeperError::InvalidRequest("empty receiver".into()));
        }
        if msg.timeout_height.revision_height == 0 && msg.timeout_timestamp == 0 {
            return Err(KeeperError::InvalidRequest("no timeout".into()));
        }
        let seq_key = format!("sequence/{}/{}", msg.source_port, msg.source_channel);
        let sequence: u64 = read(ctx, TRANSFER, &seq_key)?.unwrap_or(1);
        write(ctx, TRANSFER, &seq_key, &(sequence + 1))?;
        write(
            ctx,
            TRANSFER,
            &format!("packets/{}/{}/{sequence}", msg.source_port, msg.source_channel),
            msg,
        )?;
        Ok(sequence)
    }
}
