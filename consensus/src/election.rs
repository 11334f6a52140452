//! A single election: one qualified root, up to `max_election_blocks`
//! candidate blocks, one vote per representative.

use crate::election_status::{ElectionStatus, ElectionStatusType};
use crate::tally::Tally;
use crate::vote::{VoteCode, VoteSource, FINAL_TIMESTAMP};
use crate::vote_info::VoteInfo;
use lattice_ledger::WeightSnapshot;
use lattice_types::{Account, Amount, Block, BlockHash, ProtocolParams, QualifiedRoot, Timestamp};
use std::collections::HashMap;
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElectionState {
    /// Just scheduled; soliciting nothing yet.
    Passive,
    /// Requesting confirmations and counting votes.
    Active,
    /// Quorum reached.
    Confirmed,
    /// Confirmed and past its grace period; ready to drop.
    ExpiredConfirmed,
    /// Gave up without quorum.
    ExpiredUnconfirmed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElectionBehavior {
    Normal,
    /// Started from vote-cache evidence.
    Hinted,
    /// Started from a deep unconfirmed chain, ahead of the backlog.
    Optimistic,
    /// Operator requested.
    Manual,
}

impl ElectionBehavior {
    pub fn ttl_secs(self, params: &ProtocolParams) -> u64 {
        match self {
            Self::Normal | Self::Manual => params.election_ttl_secs,
            Self::Hinted | Self::Optimistic => params.election_ttl_short_secs,
        }
    }
}

pub struct Election {
    pub qualified_root: QualifiedRoot,
    pub behavior: ElectionBehavior,
    state: ElectionState,
    state_start: Timestamp,
    election_start: Timestamp,
    last_votes: HashMap<Account, VoteInfo>,
    last_blocks: HashMap<BlockHash, Block>,
    winner: BlockHash,
    confirmation_request_count: u32,
    last_request: Option<Timestamp>,
    final_status: Option<ElectionStatus>,
}

impl Election {
    pub fn new(block: Block, behavior: ElectionBehavior, now: Timestamp) -> Self {
        let hash = block.hash();
        let qualified_root = block.qualified_root();
        let mut last_blocks = HashMap::new();
        last_blocks.insert(hash, block);
        Self {
            qualified_root,
            behavior,
            state: ElectionState::Passive,
            state_start: now,
            election_start: now,
            last_votes: HashMap::new(),
            last_blocks,
            winner: hash,
            confirmation_request_count: 0,
            last_request: None,
            final_status: None,
        }
    }

    pub fn state(&self) -> ElectionState {
        self.state
    }

    pub fn winner_hash(&self) -> BlockHash {
        self.winner
    }

    pub fn winner_block(&self) -> Option<&Block> {
        self.last_blocks.get(&self.winner)
    }

    pub fn confirmed(&self) -> bool {
        matches!(
            self.state,
            ElectionState::Confirmed | ElectionState::ExpiredConfirmed
        )
    }

    pub fn failed(&self) -> bool {
        self.state == ElectionState::ExpiredUnconfirmed
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.last_blocks.contains_key(hash)
    }

    pub fn candidate_hashes(&self) -> impl Iterator<Item = &BlockHash> {
        self.last_blocks.keys()
    }

    pub fn block_count(&self) -> usize {
        self.last_blocks.len()
    }

    pub fn voter_count(&self) -> usize {
        self.last_votes.len()
    }

    pub fn status(&self) -> Option<&ElectionStatus> {
        self.final_status.as_ref()
    }

    /// Count a vote. Final votes always supersede; non-final votes are paced
    /// by a per-representative cooldown inversely proportional to weight, so
    /// heavy representatives can re-vote quickly during a fork while light
    /// ones cannot churn the tally.
    pub fn vote(
        &mut self,
        rep: Account,
        timestamp: u64,
        hash: BlockHash,
        weight: Amount,
        online: Amount,
        source: VoteSource,
        now: Timestamp,
    ) -> VoteCode {
        if !self.last_blocks.contains_key(&hash) {
            return VoteCode::Indeterminate;
        }
        if let Some(last) = self.last_votes.get(&rep) {
            if last.is_final() && !(timestamp == FINAL_TIMESTAMP && last.hash != hash) {
                return VoteCode::Replay;
            }
            if timestamp != FINAL_TIMESTAMP {
                // A non-final vote must carry a strictly newer timestamp and
                // respect the cooldown, whichever candidate it names.
                if timestamp <= last.timestamp {
                    return VoteCode::Replay;
                }
                if !last.time.has_expired(cooldown_secs(weight, online), now) {
                    return VoteCode::Replay;
                }
            }
        }
        self.last_votes.insert(
            rep,
            VoteInfo {
                time: now,
                timestamp,
                hash,
            },
        );
        trace!(root = %self.qualified_root, %rep, %hash, ?source, "vote counted");
        VoteCode::Vote
    }

    /// Add a fork candidate backed by `support` weight (its cached vote
    /// tally). When the election is full the weakest non-winner is evicted,
    /// but only for a newcomer that outweighs it. Returns false if the block
    /// could not be admitted.
    pub fn publish(
        &mut self,
        block: Block,
        snapshot: &WeightSnapshot,
        max_blocks: usize,
        support: Amount,
    ) -> bool {
        let hash = block.hash();
        if self.last_blocks.contains_key(&hash) {
            return true;
        }
        if self.last_blocks.len() >= max_blocks {
            let tally = self.tally(snapshot);
            let weakest = self
                .last_blocks
                .keys()
                .filter(|candidate| **candidate != self.winner)
                .min_by_key(|candidate| (tally.weight_of(candidate), **candidate))
                .copied();
            match weakest {
                Some(weakest) if support > tally.weight_of(&weakest) => {
                    self.last_blocks.remove(&weakest);
                    debug!(root = %self.qualified_root, evicted = %weakest, admitted = %hash, "fork candidate replaced");
                }
                _ => return false,
            }
        }
        self.last_blocks.insert(hash, block);
        true
    }

    pub fn tally(&self, snapshot: &WeightSnapshot) -> Tally {
        Tally::from_votes(&self.last_votes, snapshot)
    }

    /// Re-tally and confirm when the leader clears quorum. Called after every
    /// counted vote. Returns the final status when this call confirmed the
    /// election.
    pub fn confirm_if_quorum(
        &mut self,
        snapshot: &WeightSnapshot,
        quorum_delta: Amount,
        now: Timestamp,
    ) -> Option<ElectionStatus> {
        if self.confirmed() || self.failed() {
            return None;
        }
        let tally = self.tally(snapshot);
        let (leader, leader_weight) = tally.leader()?;
        if leader != self.winner {
            debug!(root = %self.qualified_root, old = %self.winner, new = %leader, "election leader changed");
            self.winner = leader;
        }
        if leader_weight >= quorum_delta {
            let status = self.build_status(
                &tally,
                ElectionStatusType::ActiveConfirmedQuorum,
                now,
            );
            self.transition(ElectionState::Confirmed, now);
            debug!(root = %self.qualified_root, winner = %leader, tally = %leader_weight, "election confirmed");
            self.final_status = Some(status.clone());
            return Some(status);
        }
        None
    }

    /// Confirm regardless of tally (operator or dependency-driven).
    pub fn force_confirm(&mut self, snapshot: &WeightSnapshot, now: Timestamp) -> Option<ElectionStatus> {
        if self.confirmed() || self.failed() {
            return None;
        }
        let tally = self.tally(snapshot);
        let status = self.build_status(&tally, ElectionStatusType::ActiveConfirmationHeight, now);
        self.transition(ElectionState::Confirmed, now);
        self.final_status = Some(status.clone());
        Some(status)
    }

    /// Time-driven transitions. Returns the new state if one fired.
    pub fn transition_time(
        &mut self,
        params: &ProtocolParams,
        now: Timestamp,
    ) -> Option<ElectionState> {
        match self.state {
            ElectionState::Passive => {
                let passive_secs =
                    params.base_latency_secs * params.passive_duration_factor as u64;
                if self.state_start.has_expired(passive_secs, now) {
                    self.transition(ElectionState::Active, now);
                    return Some(ElectionState::Active);
                }
                self.expire_if_due(params, now)
            }
            ElectionState::Active => self.expire_if_due(params, now),
            ElectionState::Confirmed => {
                if self.state_start.has_expired(params.election_ttl_short_secs, now) {
                    self.transition(ElectionState::ExpiredConfirmed, now);
                    return Some(ElectionState::ExpiredConfirmed);
                }
                None
            }
            ElectionState::ExpiredConfirmed | ElectionState::ExpiredUnconfirmed => None,
        }
    }

    fn expire_if_due(&mut self, params: &ProtocolParams, now: Timestamp) -> Option<ElectionState> {
        let expired = self
            .election_start
            .has_expired(self.behavior.ttl_secs(params), now)
            && self.confirmation_request_count >= params.active_request_count_min;
        if expired {
            self.transition(ElectionState::ExpiredUnconfirmed, now);
            debug!(root = %self.qualified_root, requests = self.confirmation_request_count, "election expired unconfirmed");
            return Some(ElectionState::ExpiredUnconfirmed);
        }
        None
    }

    /// Whether a confirm-req should go out now. Requests back off
    /// exponentially with the number already sent.
    pub fn request_due(&self, params: &ProtocolParams, now: Timestamp) -> bool {
        if !matches!(self.state, ElectionState::Passive | ElectionState::Active) {
            return false;
        }
        match self.last_request {
            None => true,
            Some(last) => {
                let backoff = params.base_latency_secs
                    << self.confirmation_request_count.min(4);
                last.has_expired(backoff, now)
            }
        }
    }

    pub fn record_request(&mut self, now: Timestamp) {
        self.confirmation_request_count += 1;
        self.last_request = Some(now);
    }

    pub fn confirmation_request_count(&self) -> u32 {
        self.confirmation_request_count
    }

    /// Candidate list for an outgoing confirm-req.
    pub fn request_roots(&self) -> (QualifiedRoot, BlockHash) {
        (self.qualified_root, self.winner)
    }

    pub fn build_status(
        &self,
        tally: &Tally,
        status_type: ElectionStatusType,
        now: Timestamp,
    ) -> ElectionStatus {
        ElectionStatus {
            winner: self.last_blocks.get(&self.winner).cloned(),
            tally: tally.weight_of(&self.winner),
            final_tally: tally.final_weight_of(&self.winner),
            election_end: now,
            election_duration_secs: self.election_start.elapsed(now),
            confirmation_request_count: self.confirmation_request_count,
            block_count: self.last_blocks.len() as u32,
            voter_count: self.last_votes.len() as u32,
            behavior: self.behavior,
            status_type,
        }
    }

    fn transition(&mut self, state: ElectionState, now: Timestamp) {
        self.state = state;
        self.state_start = now;
    }
}

/// Cooldown before a representative may re-announce the same candidate.
/// Weight above 5% of online weight cools in 1s, above 1% in 5s, everyone
/// else in 15s.
fn cooldown_secs(weight: Amount, online: Amount) -> u64 {
    if weight >= online.multiply_bps(500) {
        1
    } else if weight >= online.multiply_bps(100) {
        5
    } else {
        15
    }
}
