//! Light-client, connection and channel state lookups.

use serde::{Deserialize, Serialize};

use crate::{Context, KeeperResult};

/// Height on a counterparty chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Height {
    /// Revision (chain upgrade) number
    pub revision_number: u64,
    /// Block height within the revision
    pub revision_height: u64,
}

/// Tracked state of a counterparty light client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    /// Counterparty chain id
    pub chain_id: String,
    /// Latest verified height
    pub latest_height: Height,
    /// Whether misbehaviour froze the client
    pub frozen: bool,
}

/// Counterparty consensus state at one height
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusState {
    /// Unix nanoseconds
    pub timestamp: u64,
    /// Commitment root
    pub root: Vec<u8>,
}

/// Connection handshake state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Handshake started locally
    Init,
    /// Handshake started by the counterparty
    TryOpen,
    /// Usable
    Open,
}

/// A connection end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEnd {
    /// Local client id
    pub client_id: String,
    /// Counterparty client id
    pub counterparty_client_id: String,
    /// Handshake state
    pub state: ConnectionState,
}

/// Channel state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelState {
    /// Handshake started locally
    Init,
    /// Handshake started by the counterparty
    TryOpen,
    /// Usable
    Open,
    /// No more packets
    Closed,
}

/// A channel end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Handshake state
    pub state: ChannelState,
    /// Whether packets are delivered in order
    pub ordered: bool,
    /// Counterparty port
    pub counterparty_port: String,
    /// Counterparty channel
    pub counterparty_channel: String,
    /// Connections the channel runs over
    pub connection_hops: Vec<String>,
    /// Application version
    pub version: String,
}

/// Light-client lookups
pub trait ClientKeeper: Send + Sync {
    /// Client state by id
    fn get_client_state(&self, ctx: &Context<'_>, client_id: &str)
        -> KeeperResult<Option<ClientState>>;

    /// Consensus state of a client at a height
    fn get_client_consensus_state(
        &self,
        ctx: &Context<'_>,
        client_id: &str,
        height: Height,
    ) -> KeeperResult<Option<ConsensusState>>;
}

/// Connection lookups
pub trait ConnectionKeeper: Send + Sync {
    /// Connection by id
    fn get_connection(&self, ctx: &Context<'_>, connection_id: &str)
        -> KeeperResult<Option<ConnectionEnd>>;
}

/// Channel lookups
pub trait ChannelKeeper: Send + Sync {
    /// Channel by port and id
    fn get_channel(&self, ctx: &Context<'_>, port_id: &str, channel_id: &str)
        -> KeeperResult<Option<Channel>>;
}
