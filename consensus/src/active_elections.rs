//! Bounded container of running elections, indexed by qualified root and by
//! candidate hash.

use crate::election::{Election, ElectionBehavior, ElectionState};
use crate::election_status::{ElectionStatus, ElectionStatusType};
use crate::vote::{Vote, VoteCode, VoteSource};
use crate::vote_cache::CachedVote;
use lattice_ledger::WeightSnapshot;
use lattice_types::{Amount, Block, BlockHash, ProtocolParams, QualifiedRoot, Timestamp};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace};

pub struct VoteResults {
    pub codes: HashMap<BlockHash, VoteCode>,
    /// Elections this vote pushed over quorum.
    pub confirmed: Vec<ElectionStatus>,
}

#[derive(Default)]
pub struct TickResult {
    /// Elections that gave up without quorum this tick.
    pub expired: Vec<ElectionStatus>,
    /// Roots due an outgoing confirm-req, with their current winner.
    pub requests: Vec<(QualifiedRoot, BlockHash)>,
}

pub struct ActiveElections {
    params: ProtocolParams,
    roots: HashMap<QualifiedRoot, Election>,
    hash_index: HashMap<BlockHash, QualifiedRoot>,
    recently_confirmed: VecDeque<(QualifiedRoot, BlockHash)>,
}

impl ActiveElections {
    pub fn new(params: ProtocolParams) -> Self {
        Self {
            params,
            roots: HashMap::new(),
            hash_index: HashMap::new(),
            recently_confirmed: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn count_by_behavior(&self, behavior: ElectionBehavior) -> usize {
        self.roots
            .values()
            .filter(|election| election.behavior == behavior)
            .count()
    }

    pub fn active(&self, hash: &BlockHash) -> bool {
        self.hash_index.contains_key(hash)
    }

    pub fn active_root(&self, root: &QualifiedRoot) -> bool {
        self.roots.contains_key(root)
    }

    pub fn election(&self, root: &QualifiedRoot) -> Option<&Election> {
        self.roots.get(root)
    }

    pub fn recently_confirmed(&self, hash: &BlockHash) -> bool {
        self.recently_confirmed.iter().any(|(_, h)| h == hash)
    }

    pub fn recently_confirmed_root(&self, root: &QualifiedRoot) -> bool {
        self.recently_confirmed.iter().any(|(r, _)| r == root)
    }

    fn behavior_limit(&self, behavior: ElectionBehavior) -> usize {
        match behavior {
            ElectionBehavior::Normal => self.params.active_elections_size,
            ElectionBehavior::Hinted => self.params.hinted_limit(),
            ElectionBehavior::Optimistic => self.params.optimistic_limit(),
            ElectionBehavior::Manual => self.params.manual_limit,
        }
    }

    /// Start an election for `block`, or add it as a fork candidate to the
    /// election already occupying its root. Returns true when the block is
    /// part of an election afterwards.
    pub fn insert(
        &mut self,
        block: Block,
        behavior: ElectionBehavior,
        support: Amount,
        snapshot: &WeightSnapshot,
        now: Timestamp,
    ) -> bool {
        let root = block.qualified_root();
        let hash = block.hash();
        if self.recently_confirmed_root(&root) {
            return false;
        }
        if self.roots.contains_key(&root) {
            let max_blocks = self.params.max_election_blocks;
            let admitted = self
                .roots
                .get_mut(&root)
                .map(|election| election.publish(block, snapshot, max_blocks, support))
                .unwrap_or(false);
            if admitted {
                self.reindex(&root);
            }
            return admitted;
        }
        if self.count_by_behavior(behavior) >= self.behavior_limit(behavior)
            && !self.evict_weakest(behavior, snapshot)
        {
            trace!(%root, ?behavior, "election rejected, container full");
            return false;
        }
        let election = Election::new(block, behavior, now);
        self.hash_index.insert(hash, root);
        self.roots.insert(root, election);
        debug!(%root, %hash, ?behavior, "election started");
        true
    }

    /// Drop the unconfirmed election of `behavior` with the weakest leading
    /// tally. Returns false when every election of that behavior is confirmed.
    fn evict_weakest(&mut self, behavior: ElectionBehavior, snapshot: &WeightSnapshot) -> bool {
        let weakest = self
            .roots
            .values()
            .filter(|election| election.behavior == behavior && !election.confirmed())
            .min_by_key(|election| {
                (
                    election.tally(snapshot).weight_of(&election.winner_hash()),
                    election.winner_hash(),
                )
            })
            .map(|election| election.qualified_root);
        match weakest {
            Some(root) => {
                self.erase(&root);
                debug!(%root, ?behavior, "weakest election evicted");
                true
            }
            None => false,
        }
    }

    /// Route a verified vote to the elections covering its hashes and re-check
    /// quorum on each affected election.
    pub fn vote(
        &mut self,
        vote: &Vote,
        snapshot: &WeightSnapshot,
        online: Amount,
        quorum_delta: Amount,
        source: VoteSource,
        now: Timestamp,
    ) -> VoteResults {
        let weight = snapshot.weight(&vote.account);
        let mut results = VoteResults {
            codes: HashMap::new(),
            confirmed: Vec::new(),
        };
        for hash in &vote.hashes {
            if results.codes.contains_key(hash) {
                continue;
            }
            let Some(root) = self.hash_index.get(hash).copied() else {
                let code = if self.recently_confirmed(hash) {
                    VoteCode::Replay
                } else {
                    VoteCode::Indeterminate
                };
                results.codes.insert(*hash, code);
                continue;
            };
            let Some(election) = self.roots.get_mut(&root) else {
                results.codes.insert(*hash, VoteCode::Indeterminate);
                continue;
            };
            let code =
                election.vote(vote.account, vote.timestamp, *hash, weight, online, source, now);
            if code == VoteCode::Vote {
                if let Some(status) = election.confirm_if_quorum(snapshot, quorum_delta, now) {
                    let winner = election.winner_hash();
                    self.push_recently_confirmed(root, winner);
                    results.confirmed.push(status);
                }
            }
            results.codes.insert(*hash, code);
        }
        results
    }

    /// Replay cached votes into the election covering `hash` (used to seed
    /// elections started after the votes arrived). Returns the status when
    /// the cached tally alone reaches quorum.
    pub fn seed_cached(
        &mut self,
        hash: &BlockHash,
        cached: &[CachedVote],
        snapshot: &WeightSnapshot,
        online: Amount,
        quorum_delta: Amount,
        now: Timestamp,
    ) -> Option<ElectionStatus> {
        let root = self.hash_index.get(hash).copied()?;
        let election = self.roots.get_mut(&root)?;
        let mut counted = false;
        for vote in cached {
            let weight = snapshot.weight(&vote.rep);
            let code = election.vote(
                vote.rep,
                vote.timestamp,
                *hash,
                weight,
                online,
                VoteSource::Cache,
                now,
            );
            counted |= code == VoteCode::Vote;
        }
        if !counted {
            return None;
        }
        let status = election.confirm_if_quorum(snapshot, quorum_delta, now)?;
        let winner = election.winner_hash();
        self.push_recently_confirmed(root, winner);
        Some(status)
    }

    pub fn candidate_hashes(&self) -> impl Iterator<Item = &BlockHash> {
        self.hash_index.keys()
    }

    pub fn erase(&mut self, root: &QualifiedRoot) -> Option<Election> {
        let election = self.roots.remove(root)?;
        self.hash_index.retain(|_, r| r != root);
        Some(election)
    }

    pub fn force_confirm(
        &mut self,
        root: &QualifiedRoot,
        snapshot: &WeightSnapshot,
        now: Timestamp,
    ) -> Option<ElectionStatus> {
        let election = self.roots.get_mut(root)?;
        let status = election.force_confirm(snapshot, now)?;
        let winner = election.winner_hash();
        self.push_recently_confirmed(*root, winner);
        Some(status)
    }

    /// Drive time-based transitions: passive elections go active, stale ones
    /// expire and are dropped, live ones due a confirm-req are reported.
    pub fn tick(&mut self, snapshot: &WeightSnapshot, now: Timestamp) -> TickResult {
        let mut result = TickResult::default();
        let roots: Vec<_> = self.roots.keys().copied().collect();
        for root in roots {
            let Some(election) = self.roots.get_mut(&root) else {
                continue;
            };
            election.transition_time(&self.params, now);
            match election.state() {
                ElectionState::ExpiredUnconfirmed => {
                    let tally = election.tally(snapshot);
                    let status = election.build_status(
                        &tally,
                        ElectionStatusType::InactiveConfirmationHeight,
                        now,
                    );
                    self.erase(&root);
                    result.expired.push(status);
                }
                ElectionState::ExpiredConfirmed => {
                    self.erase(&root);
                }
                _ => {
                    if election.request_due(&self.params, now) {
                        election.record_request(now);
                        result.requests.push(election.request_roots());
                    }
                }
            }
        }
        result
    }

    fn push_recently_confirmed(&mut self, root: QualifiedRoot, winner: BlockHash) {
        self.recently_confirmed.push_back((root, winner));
        while self.recently_confirmed.len() > self.params.active_elections_size {
            self.recently_confirmed.pop_front();
        }
    }

    /// Candidate hashes can change as forks are published; refresh the index
    /// for one root.
    fn reindex(&mut self, root: &QualifiedRoot) {
        let Some(election) = self.roots.get(root) else {
            return;
        };
        let hashes: Vec<_> = election.candidate_hashes().copied().collect();
        self.hash_index.retain(|hash, r| r != root || hashes.contains(hash));
        for hash in hashes {
            self.hash_index.insert(hash, *root);
        }
    }
}
