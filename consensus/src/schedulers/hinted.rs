//! Hinted scheduler: starts elections for blocks the network is already
//! voting on, based on vote-cache evidence, ahead of the normal backlog.

use crate::active_elections::ActiveElections;
use crate::election::ElectionBehavior;
use crate::vote_cache::VoteCache;
use lattice_ledger::{Ledger, WeightSnapshot};
use lattice_types::{Amount, ProtocolParams, Timestamp};
use tracing::trace;

pub struct HintedScheduler {
    params: ProtocolParams,
}

impl HintedScheduler {
    pub fn new(params: ProtocolParams) -> Self {
        Self { params }
    }

    /// Evidence threshold: a fraction of the current quorum delta.
    pub fn threshold(&self, quorum_delta: Amount) -> Amount {
        quorum_delta.multiply_bps(self.params.hinted_threshold_bps)
    }

    /// Start hinted elections for cached hashes whose tally clears the
    /// threshold. Returns the number of elections started.
    pub fn run(
        &self,
        vote_cache: &VoteCache,
        ledger: &Ledger,
        active: &mut ActiveElections,
        snapshot: &WeightSnapshot,
        quorum_delta: Amount,
        now: Timestamp,
    ) -> usize {
        let mut started = 0;
        for (hash, tally) in vote_cache.top(snapshot, self.threshold(quorum_delta)) {
            if active.active(&hash) {
                continue;
            }
            let Some(saved) = ledger.block_get(&hash) else {
                // Unknown block; the gap cache owns this hash.
                continue;
            };
            if ledger.block_confirmed(&hash) {
                continue;
            }
            if !ledger.dependents_confirmed(&saved.block) {
                continue;
            }
            if active.insert(saved.block, ElectionBehavior::Hinted, tally, snapshot, now) {
                trace!(%hash, %tally, "hinted election started");
                started += 1;
            }
        }
        started
    }
}
