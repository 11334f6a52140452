//! Pending (receivable) entries — sends awaiting their receive block.

use lattice_types::{Account, Amount, BlockHash};
use serde::{Deserialize, Serialize};

/// Key of a pending entry: the destination account and the send block that
/// funds it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PendingKey {
    pub receiver: Account,
    pub send_hash: BlockHash,
}

impl PendingKey {
    pub fn new(receiver: Account, send_hash: BlockHash) -> Self {
        Self {
            receiver,
            send_hash,
        }
    }
}

/// Value of a pending entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInfo {
    /// The account that sent the funds.
    pub source: Account,
    /// The amount in transit.
    pub amount: Amount,
}
