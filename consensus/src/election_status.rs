//! Summary of a finished (or force-finished) election, handed to observers
//! and the cementing worker.

use crate::election::ElectionBehavior;
use lattice_types::{Amount, Block, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElectionStatusType {
    /// Quorum reached through live votes.
    ActiveConfirmedQuorum,
    /// Confirmed from cached or operator evidence (hinted, force-confirm).
    ActiveConfirmationHeight,
    /// The election expired without quorum.
    InactiveConfirmationHeight,
}

#[derive(Clone, Debug)]
pub struct ElectionStatus {
    pub winner: Option<Block>,
    pub tally: Amount,
    pub final_tally: Amount,
    pub election_end: Timestamp,
    pub election_duration_secs: u64,
    pub confirmation_request_count: u32,
    pub block_count: u32,
    pub voter_count: u32,
    pub behavior: ElectionBehavior,
    pub status_type: ElectionStatusType,
}

impl Default for ElectionStatus {
    fn default() -> Self {
        Self {
            winner: None,
            tally: Amount::ZERO,
            final_tally: Amount::ZERO,
            election_end: Timestamp::EPOCH,
            election_duration_secs: 0,
            confirmation_request_count: 0,
            block_count: 0,
            voter_count: 0,
            behavior: ElectionBehavior::Normal,
            status_type: ElectionStatusType::InactiveConfirmationHeight,
        }
    }
}
