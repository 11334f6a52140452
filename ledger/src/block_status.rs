//! Typed result of applying a block to the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of `Ledger::process`.
///
/// Everything except `Progress` means the block was not applied. These are
/// protocol-data conditions, not errors: the offending block is dropped or
/// queued, the process never aborts on them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    /// Applied to the ledger.
    Progress,
    /// Already present (by hash, fully stored or pruned).
    Old,
    /// A different block already occupies this chain position.
    Fork,
    /// The referenced previous block is not yet known.
    GapPrevious,
    /// The referenced source (send) block is not yet known.
    GapSource,
    /// Signature does not verify against the signer.
    BadSignature,
    /// Balance would drop below zero (spent more than available).
    NegativeSpend,
    /// Receive references a send that is missing from pending (never sent
    /// here, or already claimed).
    Unreceivable,
    /// Receive amount disagrees with the pending entry.
    BalanceMismatch,
    /// Block violates chain-position rules (e.g. an epoch block changing
    /// the balance).
    BlockPosition,
    /// Work value below the network threshold.
    InsufficientWork,
    /// Epoch block changes the representative.
    RepresentativeMismatch,
}

impl BlockStatus {
    pub fn is_progress(&self) -> bool {
        matches!(self, BlockStatus::Progress)
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockStatus::Progress => "progress",
            BlockStatus::Old => "old",
            BlockStatus::Fork => "fork",
            BlockStatus::GapPrevious => "gap_previous",
            BlockStatus::GapSource => "gap_source",
            BlockStatus::BadSignature => "bad_signature",
            BlockStatus::NegativeSpend => "negative_spend",
            BlockStatus::Unreceivable => "unreceivable",
            BlockStatus::BalanceMismatch => "balance_mismatch",
            BlockStatus::BlockPosition => "block_position",
            BlockStatus::InsufficientWork => "insufficient_work",
            BlockStatus::RepresentativeMismatch => "representative_mismatch",
        };
        f.write_str(name)
    }
}
