//! Latest accepted vote from one representative within one election.

use lattice_types::{BlockHash, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoteInfo {
    /// When the vote was accepted locally, for cooldown pacing.
    pub time: Timestamp,
    /// The voter-supplied timestamp (FINAL_TIMESTAMP for final votes).
    pub timestamp: u64,
    /// The candidate the representative backs.
    pub hash: BlockHash,
}

impl VoteInfo {
    pub fn is_final(&self) -> bool {
        self.timestamp == crate::vote::FINAL_TIMESTAMP
    }
}
