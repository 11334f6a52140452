//! Referenced-but-missing blocks. Votes naming an unknown hash accumulate
//! weight here; enough weight marks the hash as worth bootstrapping.

use lattice_ledger::WeightSnapshot;
use lattice_types::{Account, Amount, BlockHash, ProtocolParams, Timestamp};
use std::collections::HashMap;
use tracing::debug;

struct GapEntry {
    arrival: Timestamp,
    voters: Vec<Account>,
    bootstrap_started: bool,
}

pub struct GapCache {
    params: ProtocolParams,
    entries: HashMap<BlockHash, GapEntry>,
}

impl GapCache {
    pub fn new(params: ProtocolParams) -> Self {
        Self {
            params,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.entries.contains_key(hash)
    }

    /// Record a missing dependency.
    pub fn insert(&mut self, hash: BlockHash, now: Timestamp) {
        if !self.entries.contains_key(&hash) && self.entries.len() >= self.params.gap_cache_max_entries
        {
            self.trim_oldest();
        }
        self.entries.entry(hash).or_insert_with(|| GapEntry {
            arrival: now,
            voters: Vec::new(),
            bootstrap_started: false,
        });
    }

    /// Attribute a vote to a missing hash. Returns true when this vote pushed
    /// the accumulated weight over the bootstrap threshold for the first time.
    pub fn vote(
        &mut self,
        hash: &BlockHash,
        rep: Account,
        snapshot: &WeightSnapshot,
        online: Amount,
    ) -> bool {
        let threshold = online.multiply_bps(self.params.bootstrap_hint_bps);
        let Some(entry) = self.entries.get_mut(hash) else {
            return false;
        };
        if entry.bootstrap_started {
            return false;
        }
        if !entry.voters.contains(&rep) {
            entry.voters.push(rep);
        }
        let tally: Amount = entry
            .voters
            .iter()
            .map(|voter| snapshot.weight(voter))
            .sum();
        if tally >= threshold && !threshold.is_zero() {
            entry.bootstrap_started = true;
            debug!(%hash, %tally, "gap crossed bootstrap threshold");
            return true;
        }
        false
    }

    /// The block arrived (or got pruned away); forget it.
    pub fn erase(&mut self, hash: &BlockHash) {
        self.entries.remove(hash);
    }

    /// Hashes that crossed the bootstrap threshold.
    pub fn bootstrap_candidates(&self) -> Vec<BlockHash> {
        let mut candidates: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.bootstrap_started)
            .map(|(hash, _)| *hash)
            .collect();
        candidates.sort();
        candidates
    }

    fn trim_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(hash, entry)| (entry.arrival, **hash))
            .map(|(hash, _)| *hash);
        if let Some(hash) = oldest {
            self.entries.remove(&hash);
        }
    }
}
