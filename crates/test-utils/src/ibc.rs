use dualvm_core::{
    Channel, ChannelKeeper, ClientKeeper, ClientState, ConnectionEnd, ConnectionKeeper,
    ConsensusState, Context, Height, KeeperResult,
};
use dualvm_storage::partitions::IBC;

use crate::{read, write};

/// Client, consensus, connection and channel records in the `ibc` partition
#[derive(Debug, Default)]
pub struct MockIbc;

impl MockIbc {
    /// Create the mock
    pub fn new() -> Self {
        Self
    }

    /// Store a client state
    pub fn set_client_state(&self, ctx: &mut Context<'_>, client_id: &str, state: &ClientState) -> KeeperResult<()> {
        write(ctx, IBC, &format!("clients/{client_id}"), state)
    }

    /// Store a consensus state
    pub fn set_consensus_state(
        &self,
        ctx: &mut Context<'_>,
        client_id: &str,
        height: Height,
        state: &ConsensusState,
    ) -> KeeperResult<()> {
        write(ctx, IBC, &consensus_key(client_id, height), state)
    }

    /// Store a connection
    pub fn set_connection(&self, ctx: &mut Context<'_>, connection_id: &str, conn: &ConnectionEnd) -> KeeperResult<()> {
        write(ctx, IBC, &format!("connections/{connection_id}"), conn)
    }

    /// Store a channel
    pub fn set_channel(&self, ctx: &mut Context<'_>, port: &str, channel_id: &str, channel: &Channel) -> KeeperResult<()> {
        write(ctx, IBC, &format!("channels/{port}/{channel_id}"), channel)
    }
}

fn consensus_key(client_id: &str, height: Height) -> String {
    format!(
        "consensus/{client_id}/{}-{}",
        height.revision_number, height.revision_height
    )
}

impl ClientKeeper for MockIbc {
    fn get_client_state(&self, ctx: &Context<'_>, client_id: &str) -> KeeperResult<Option<ClientState>> {
        read(ctx, IBC, &format!("clients/{client_id}"))
    }

    fn get_client_consensus_state(
        &self,
        ctx: &Context<'_>,
        client_id: &str,
        height: Height,
    ) -> KeeperResult<Option<ConsensusState>> {
        read(ctx, IBC, &consensus_key(client_id, height))
    }
}

impl ConnectionKeeper for MockIbc {
    fn get_connection(&self, ctx: &Context<'_>, connection_id: &str) -> KeeperResult<Option<ConnectionEnd>> {
        read(ctx, IBC, &format!("connections/{connection_id}"))
    }
}

impl ChannelKeeper for MockIbc {
    fn get_channel(&self, ctx: &Context<'_>, port_id: &str, channel_id: &str) -> KeeperResult<Option<Channel>> {
        read(ctx, IBC, &format!("channels/{port_id}/{channel_id}"))
    }
}
