//! Representative votes. A vote covers up to a dozen block hashes at one
//! timestamp; the final timestamp sentinel marks an irrevocable vote.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use lattice_types::{Account, BlockHash, KeyPair, Signature};
use serde::{Deserialize, Serialize};

/// Timestamp sentinel for final votes.
pub const FINAL_TIMESTAMP: u64 = u64::MAX;

/// Most hashes a single vote may carry.
pub const MAX_VOTE_HASHES: usize = 12;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// The representative that cast the vote.
    pub account: Account,
    pub timestamp: u64,
    pub hashes: Vec<BlockHash>,
    pub signature: Signature,
}

impl Vote {
    pub fn new(pair: &KeyPair, timestamp: u64, hashes: Vec<BlockHash>) -> Self {
        let mut vote = Self {
            account: Account::from(pair.public),
            timestamp,
            hashes,
            signature: Signature::ZERO,
        };
        vote.signature = pair.sign(&vote.digest());
        vote
    }

    pub fn new_final(pair: &KeyPair, hashes: Vec<BlockHash>) -> Self {
        Self::new(pair, FINAL_TIMESTAMP, hashes)
    }

    pub fn is_final(&self) -> bool {
        self.timestamp == FINAL_TIMESTAMP
    }

    /// The signed payload: blake2b-256 over the timestamp and the hash list.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(self.timestamp.to_be_bytes());
        for hash in &self.hashes {
            hasher.update(hash.as_bytes());
        }
        hasher.finalize().into()
    }

    pub fn verify(&self) -> bool {
        self.account
            .public_key()
            .verify(&self.digest(), &self.signature)
    }
}

/// Per-hash outcome of routing a vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteCode {
    /// Accepted and counted.
    Vote,
    /// Older than or identical to a vote already counted.
    Replay,
    /// No election for the hash; cached for later.
    Indeterminate,
    /// Bad signature.
    Invalid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteSource {
    Live,
    Cache,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_vote_verifies() {
        let pair = KeyPair::generate();
        let vote = Vote::new(&pair, 42, vec![BlockHash::new([1; 32])]);
        assert!(vote.verify());
        assert!(!vote.is_final());
    }

    #[test]
    fn tampered_vote_fails_verification() {
        let pair = KeyPair::generate();
        let mut vote = Vote::new(&pair, 42, vec![BlockHash::new([1; 32])]);
        vote.timestamp = 43;
        assert!(!vote.verify());
    }

    #[test]
    fn final_vote_uses_the_sentinel() {
        let pair = KeyPair::generate();
        let vote = Vote::new_final(&pair, vec![BlockHash::new([2; 32])]);
        assert!(vote.is_final());
        assert_eq!(vote.timestamp, FINAL_TIMESTAMP);
        assert!(vote.verify());
    }
}
