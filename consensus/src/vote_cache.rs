//! Pre-election vote storage. Votes that arrive before their block (or
//! before an election starts) are remembered per hash and replayed when the
//! election opens; the hinted scheduler reads the same evidence.

use crate::vote::Vote;
use lattice_ledger::WeightSnapshot;
use lattice_types::{Account, Amount, BlockHash, ProtocolParams, Timestamp};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachedVote {
    pub rep: Account,
    pub timestamp: u64,
}

struct CacheEntry {
    voters: Vec<CachedVote>,
    last_vote: Timestamp,
}

impl CacheEntry {
    /// Keep the newest vote per representative, capped at `max_voters`.
    fn add(&mut self, rep: Account, timestamp: u64, max_voters: usize) {
        if let Some(existing) = self.voters.iter_mut().find(|cached| cached.rep == rep) {
            if timestamp > existing.timestamp {
                existing.timestamp = timestamp;
            }
            return;
        }
        if self.voters.len() < max_voters {
            self.voters.push(CachedVote { rep, timestamp });
        }
    }
}

pub struct VoteCache {
    params: ProtocolParams,
    entries: HashMap<BlockHash, CacheEntry>,
}

impl VoteCache {
    pub fn new(params: ProtocolParams) -> Self {
        Self {
            params,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, vote: &Vote, now: Timestamp) {
        for hash in &vote.hashes {
            if !self.entries.contains_key(hash) && self.entries.len() >= self.params.vote_cache_max_entries
            {
                self.trim_oldest();
            }
            let entry = self.entries.entry(*hash).or_insert_with(|| CacheEntry {
                voters: Vec::new(),
                last_vote: now,
            });
            entry.add(vote.account, vote.timestamp, self.params.vote_cache_max_voters);
            entry.last_vote = now;
        }
    }

    /// Cached votes for a hash, for replay into a fresh election.
    pub fn find(&self, hash: &BlockHash) -> Vec<CachedVote> {
        self.entries
            .get(hash)
            .map(|entry| entry.voters.clone())
            .unwrap_or_default()
    }

    pub fn erase(&mut self, hash: &BlockHash) {
        self.entries.remove(hash);
    }

    /// Cumulative cached weight behind a hash under the given snapshot.
    pub fn tally(&self, hash: &BlockHash, snapshot: &WeightSnapshot) -> Amount {
        self.entries
            .get(hash)
            .map(|entry| {
                entry
                    .voters
                    .iter()
                    .map(|cached| snapshot.weight(&cached.rep))
                    .sum()
            })
            .unwrap_or(Amount::ZERO)
    }

    /// Hashes whose cached tally meets `min_tally`, heaviest first.
    pub fn top(&self, snapshot: &WeightSnapshot, min_tally: Amount) -> Vec<(BlockHash, Amount)> {
        let mut hinted: Vec<_> = self
            .entries
            .keys()
            .map(|hash| (*hash, self.tally(hash, snapshot)))
            .filter(|(_, tally)| *tally >= min_tally)
            .collect();
        hinted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        hinted
    }

    /// Drop entries whose newest vote is older than the cache TTL.
    pub fn cleanup(&mut self, now: Timestamp) {
        let ttl = self.params.vote_cache_ttl_secs;
        self.entries
            .retain(|_, entry| !entry.last_vote.has_expired(ttl, now));
    }

    fn trim_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(hash, entry)| (entry.last_vote, **hash))
            .map(|(hash, _)| *hash);
        if let Some(hash) = oldest {
            self.entries.remove(&hash);
        }
    }
}
