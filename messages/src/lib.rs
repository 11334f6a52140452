//! Wire messages. Every message carries a small header naming the network
//! and protocol version; payloads are bincode-encoded. Duplicate
//! suppression and retransmission are the transport's problem.

use lattice_consensus::Vote;
use lattice_types::{Block, BlockHash, Root};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROTOCOL_VERSION: u8 = 1;

/// Network discriminator; a node drops messages from other networks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkId {
    Dev,
    Beta,
    Live,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub network: NetworkId,
    pub version: u8,
}

impl Header {
    pub fn new(network: NetworkId) -> Self {
        Self {
            network,
            version: PROTOCOL_VERSION,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Keepalive,
    /// A newly published or re-broadcast block.
    Publish(Block),
    /// Request for votes on the given roots, naming our current winner.
    ConfirmReq(Vec<(Root, BlockHash)>),
    /// A representative's vote.
    ConfirmAck(Vote),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub header: Header,
    pub payload: Payload,
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("encode failed: {0}")]
    Encode(#[source] bincode::Error),
    #[error("decode failed: {0}")]
    Decode(#[source] bincode::Error),
    #[error("wrong network")]
    WrongNetwork,
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
}

impl Message {
    pub fn new(network: NetworkId, payload: Payload) -> Self {
        Self {
            header: Header::new(network),
            payload,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, MessageError> {
        bincode::serialize(self).map_err(MessageError::Encode)
    }

    /// Decode and validate the header against our network.
    pub fn from_bytes(bytes: &[u8], network: NetworkId) -> Result<Self, MessageError> {
        let message: Message = bincode::deserialize(bytes).map_err(MessageError::Decode)?;
        if message.header.network != network {
            return Err(MessageError::WrongNetwork);
        }
        if message.header.version != PROTOCOL_VERSION {
            return Err(MessageError::UnsupportedVersion(message.header.version));
        }
        Ok(message)
    }
}
