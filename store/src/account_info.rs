//! Per-account chain metadata.

use lattice_types::{Account, Amount, BlockHash, Timestamp};
use serde::{Deserialize, Serialize};

/// The stored head state of one account chain.
///
/// Invariant: `confirmation_height <= block_count`; the head is the only
/// block eligible for a new child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Hash of the most recent block in the chain.
    pub head: BlockHash,
    /// Current consensus representative.
    pub representative: Account,
    /// Balance after the head block.
    pub balance: Amount,
    /// Total number of blocks in the chain.
    pub block_count: u64,
    /// Height up to which the chain is cemented (0 = nothing confirmed).
    pub confirmation_height: u64,
    /// Hash of the chain-opening block.
    pub open_block: BlockHash,
    /// Local time of the last modification.
    pub modified: Timestamp,
}

impl AccountInfo {
    /// Number of blocks above the cemented frontier.
    pub fn unconfirmed_count(&self) -> u64 {
        self.block_count.saturating_sub(self.confirmation_height)
    }
}
