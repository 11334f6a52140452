//! Node wiring: the block and vote pipelines, election driving and
//! cementing, glued over the ledger and the consensus containers.
//!
//! Every driving method takes an explicit `now` and runs to completion, so
//! integration tests can step the node deterministically; `run` wraps the
//! same methods in tokio intervals for the daemon.

use crate::block_processor::{BlockProcessor, BlockSource, QueuedBlock};
use crate::config::NodeConfig;
use crate::confirming_set::ConfirmingSet;
use crate::network::NetworkSink;
use crate::observers::Observers;
use crate::unchecked::Unchecked;
use crate::vote_processor::VoteProcessor;
use lattice_consensus::{
    ActiveElections, ElectionBehavior, ElectionStatus, GapCache, HintedScheduler,
    ManualScheduler, OnlineWeightSampler, OptimisticScheduler, PriorityScheduler, Vote,
    VoteCache, VoteCode, VoteSource,
};
use lattice_ledger::{dev_genesis_block, BlockStatus, Ledger};
use lattice_messages::{Message, Payload};
use lattice_store::Store;
use lattice_types::{Account, Block, BlockHash, Timestamp};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Blocks removed per pruning target per tick.
const PRUNING_BATCH_SIZE: u64 = 128;

pub struct Node {
    pub config: NodeConfig,
    pub ledger: Arc<Ledger>,
    pub observers: Arc<Observers>,
    network: Arc<dyn NetworkSink>,
    active: Mutex<ActiveElections>,
    vote_cache: Mutex<VoteCache>,
    gap_cache: Mutex<GapCache>,
    sampler: Mutex<OnlineWeightSampler>,
    priority: Mutex<PriorityScheduler>,
    hinted: HintedScheduler,
    optimistic: Mutex<OptimisticScheduler>,
    manual: Mutex<ManualScheduler>,
    block_processor: Mutex<BlockProcessor>,
    unchecked: Mutex<Unchecked>,
    vote_processor: Mutex<VoteProcessor>,
    confirming_set: Mutex<ConfirmingSet>,
    /// Election outcomes awaiting their cement notification.
    winner_statuses: Mutex<HashMap<BlockHash, ElectionStatus>>,
}

impl Node {
    pub fn new(config: NodeConfig, network: Arc<dyn NetworkSink>, now: Timestamp) -> Self {
        let params = config.params.clone();
        let genesis = dev_genesis_block(&params);
        let ledger = Arc::new(Ledger::new(Arc::new(Store::new()), params.clone(), genesis));
        ledger.initialize(now);
        info!(network = ?config.network, "node starting");
        Self {
            active: Mutex::new(ActiveElections::new(params.clone())),
            vote_cache: Mutex::new(VoteCache::new(params.clone())),
            gap_cache: Mutex::new(GapCache::new(params.clone())),
            sampler: Mutex::new(OnlineWeightSampler::new(params.clone())),
            priority: Mutex::new(PriorityScheduler::new(config.backlog_max)),
            hinted: HintedScheduler::new(params.clone()),
            optimistic: Mutex::new(OptimisticScheduler::new(params)),
            manual: Mutex::new(ManualScheduler::new()),
            block_processor: Mutex::new(BlockProcessor::new(config.block_queue_max)),
            unchecked: Mutex::new(Unchecked::new(config.unchecked_max)),
            vote_processor: Mutex::new(VoteProcessor::new(config.vote_queue_max)),
            confirming_set: Mutex::new(ConfirmingSet::new()),
            winner_statuses: Mutex::new(HashMap::new()),
            observers: Arc::new(Observers::new()),
            network,
            ledger,
            config,
        }
    }

    // ── Ingest ───────────────────────────────────────────────────────────

    pub fn submit_block(&self, block: Block, source: BlockSource) -> bool {
        self.block_processor.lock().unwrap().add(block, source)
    }

    pub fn submit_vote(&self, vote: Vote) -> bool {
        self.vote_processor.lock().unwrap().add(vote)
    }

    /// Operator request: elect this block regardless of backlog order.
    pub fn election_request(&self, block: Block) {
        self.manual.lock().unwrap().push(block);
    }

    // ── Pipelines ────────────────────────────────────────────────────────

    /// Apply everything in the block queue, including dependents released
    /// from the unchecked buffer along the way.
    pub fn drain_blocks(&self, now: Timestamp) {
        let mut work = self.block_processor.lock().unwrap().drain();
        while !work.is_empty() {
            let mut released = Vec::new();
            for queued in work {
                released.extend(self.process_block(queued, now));
            }
            work = released;
        }
    }

    fn process_block(&self, queued: QueuedBlock, now: Timestamp) -> Vec<QueuedBlock> {
        let block = queued.block;
        let hash = block.hash();
        match self.ledger.process(block.clone(), now) {
            Ok(saved) => {
                self.gap_cache.lock().unwrap().erase(&hash);
                let account = saved.block.account;
                self.priority.lock().unwrap().activate(&self.ledger, &account);
                self.optimistic.lock().unwrap().activate(&self.ledger, &account);
                self.observers.notify_account_balance(&account);
                self.network.flood(Message::new(
                    self.config.network,
                    Payload::Publish(block),
                ));
                self.unchecked
                    .lock()
                    .unwrap()
                    .pop(&hash)
                    .into_iter()
                    .map(|dependent| QueuedBlock {
                        block: dependent,
                        source: BlockSource::Live,
                    })
                    .collect()
            }
            Err(BlockStatus::Fork) => {
                debug!(%hash, "fork received, joining election");
                let snapshot = self.ledger.rep_weights().snapshot();
                let support = self.vote_cache.lock().unwrap().tally(&hash, &snapshot);
                self.active.lock().unwrap().insert(
                    block,
                    ElectionBehavior::Normal,
                    support,
                    &snapshot,
                    now,
                );
                Vec::new()
            }
            Err(status @ (BlockStatus::GapPrevious | BlockStatus::GapSource)) => {
                let dependency = if status == BlockStatus::GapPrevious {
                    block.previous
                } else {
                    block.link
                };
                debug!(%hash, %dependency, %status, "gapped block buffered");
                self.unchecked.lock().unwrap().put(dependency, block);
                self.gap_cache.lock().unwrap().insert(dependency, now);
                Vec::new()
            }
            Err(status) => {
                debug!(%hash, %status, "block dropped");
                Vec::new()
            }
        }
    }

    /// Verify and count everything in the vote queue.
    pub fn drain_votes(&self, now: Timestamp) {
        let votes = self.vote_processor.lock().unwrap().drain_verified();
        if votes.is_empty() {
            return;
        }
        let snapshot = self.ledger.rep_weights().snapshot();
        let (online, quorum_delta) = {
            let mut sampler = self.sampler.lock().unwrap();
            for vote in &votes {
                sampler.observe(vote.account, now);
            }
            (sampler.online(), sampler.quorum_delta())
        };
        for vote in votes {
            self.observers.notify_vote(&vote);
            let results = self.active.lock().unwrap().vote(
                &vote,
                &snapshot,
                online,
                quorum_delta,
                VoteSource::Live,
                now,
            );
            for status in results.confirmed {
                self.on_election_won(status, now);
            }
            let uncovered: Vec<BlockHash> = results
                .codes
                .iter()
                .filter(|(_, code)| **code == VoteCode::Indeterminate)
                .map(|(hash, _)| *hash)
                .collect();
            if uncovered.is_empty() {
                continue;
            }
            let cached = Vote {
                hashes: uncovered.clone(),
                ..vote.clone()
            };
            self.vote_cache.lock().unwrap().insert(&cached, now);
            let mut gap_cache = self.gap_cache.lock().unwrap();
            for hash in uncovered {
                if !self.ledger.block_or_pruned_exists(&hash) {
                    gap_cache.insert(hash, now);
                    if gap_cache.vote(&hash, vote.account, &snapshot, online) {
                        warn!(%hash, "missing block has significant vote weight, bootstrap candidate");
                    }
                }
            }
        }
    }

    fn on_election_won(&self, status: ElectionStatus, now: Timestamp) {
        if let Some(winner) = &status.winner {
            let hash = winner.hash();
            // A fork can win while the losing branch occupies the chain.
            if !self.ledger.block_exists(&hash) && !self.settle_fork(winner, now) {
                warn!(%hash, "election winner could not be applied");
                return;
            }
            self.confirming_set.lock().unwrap().add(hash);
            self.winner_statuses.lock().unwrap().insert(hash, status);
        }
    }

    // ── Driving ──────────────────────────────────────────────────────────

    /// Move scheduler backlogs into elections, then replay cached votes
    /// into the elections started this pass.
    pub fn run_schedulers(&self, now: Timestamp) {
        let snapshot = self.ledger.rep_weights().snapshot();
        let (online, quorum_delta) = {
            let sampler = self.sampler.lock().unwrap();
            (sampler.online(), sampler.quorum_delta())
        };
        let confirmed = {
            let mut active = self.active.lock().unwrap();
            let before: HashSet<BlockHash> = active.candidate_hashes().copied().collect();
            self.manual.lock().unwrap().run(&mut active, &snapshot, now);
            self.hinted.run(
                &self.vote_cache.lock().unwrap(),
                &self.ledger,
                &mut active,
                &snapshot,
                quorum_delta,
                now,
            );
            self.optimistic
                .lock()
                .unwrap()
                .run(&self.ledger, &mut active, &snapshot, now);
            self.priority.lock().unwrap().run(&mut active, &snapshot, now);

            let started: Vec<BlockHash> = active
                .candidate_hashes()
                .filter(|hash| !before.contains(hash))
                .copied()
                .collect();
            let mut confirmed = Vec::new();
            if !started.is_empty() {
                let cache = self.vote_cache.lock().unwrap();
                for hash in started {
                    let cached = cache.find(&hash);
                    if cached.is_empty() {
                        continue;
                    }
                    if let Some(status) = active.seed_cached(
                        &hash,
                        &cached,
                        &snapshot,
                        online,
                        quorum_delta,
                        now,
                    ) {
                        confirmed.push(status);
                    }
                }
            }
            confirmed
        };
        for status in confirmed {
            self.on_election_won(status, now);
        }
    }

    /// Queue elections for every account with unconfirmed blocks. Run at
    /// startup and periodically to catch anything vote traffic missed.
    pub fn scan_backlog(&self) {
        let accounts: Vec<Account> = {
            let txn = self.ledger.store().begin_read();
            txn.accounts().map(|(account, _)| *account).collect()
        };
        let mut priority = self.priority.lock().unwrap();
        let mut optimistic = self.optimistic.lock().unwrap();
        for account in accounts {
            priority.activate(&self.ledger, &account);
            optimistic.activate(&self.ledger, &account);
        }
    }

    /// Time-based election driving: confirm-req solicitation, expiry,
    /// cementing, cache cleanup and optional pruning.
    pub fn tick(&self, now: Timestamp) {
        let snapshot = self.ledger.rep_weights().snapshot();
        let tick = self.active.lock().unwrap().tick(&snapshot, now);
        for status in tick.expired {
            debug!(
                requests = status.confirmation_request_count,
                voters = status.voter_count,
                "election expired without quorum"
            );
        }
        if !tick.requests.is_empty() {
            let roots = tick
                .requests
                .iter()
                .map(|(root, winner)| (root.root, *winner))
                .collect();
            self.network
                .flood(Message::new(self.config.network, Payload::ConfirmReq(roots)));
        }

        let cemented = self.confirming_set.lock().unwrap().run(&self.ledger);
        if !cemented.is_empty() {
            let mut statuses = self.winner_statuses.lock().unwrap();
            for saved in &cemented {
                let status = statuses.remove(&saved.hash());
                self.observers.notify_block_confirmed(saved, status.as_ref());
                self.priority
                    .lock()
                    .unwrap()
                    .activate(&self.ledger, &saved.block.account);
            }
        }

        self.vote_cache.lock().unwrap().cleanup(now);
        if self.config.enable_pruning {
            for target in self.ledger.pruning_targets(now) {
                self.ledger.pruning_action(&target, PRUNING_BATCH_SIZE);
            }
        }
    }

    /// Refresh online weight and the quorum trend.
    pub fn sample_online_weight(&self, now: Timestamp) {
        let snapshot = self.ledger.rep_weights().snapshot();
        self.sampler.lock().unwrap().sample(&snapshot, now);
    }

    /// One full deterministic pass of every pipeline.
    pub fn step(&self, now: Timestamp) {
        self.drain_blocks(now);
        self.drain_votes(now);
        self.run_schedulers(now);
        self.tick(now);
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn election_active(&self, hash: &BlockHash) -> bool {
        self.active.lock().unwrap().active(hash)
    }

    pub fn active_election_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    pub fn block_confirmed(&self, hash: &BlockHash) -> bool {
        self.ledger.block_confirmed(hash)
    }

    pub fn quorum_delta(&self) -> lattice_types::Amount {
        self.sampler.lock().unwrap().quorum_delta()
    }

    /// Force-confirm an election (test and operator hook).
    pub fn force_confirm(&self, hash: &BlockHash, now: Timestamp) -> bool {
        let snapshot = self.ledger.rep_weights().snapshot();
        let Some(saved) = self.ledger.block_get(hash) else {
            return false;
        };
        let root = saved.block.qualified_root();
        let status = self
            .active
            .lock()
            .unwrap()
            .force_confirm(&root, &snapshot, now);
        match status {
            Some(status) => {
                self.on_election_won(status, now);
                true
            }
            None => false,
        }
    }

    /// Settle a fork the network decided against us: roll the losing branch
    /// back so the winner can apply.
    pub fn settle_fork(&self, winner: &Block, now: Timestamp) -> bool {
        let info = self.ledger.account_info(&winner.account);
        let Some(info) = info else {
            return false;
        };
        if info.head == winner.hash() {
            return true;
        }
        // The losing branch starts where the winner's chain position is.
        let Some(occupant) = self.find_sibling(winner) else {
            return false;
        };
        match self.ledger.rollback(&occupant) {
            Ok(rolled_back) => {
                debug!(count = rolled_back.len(), winner = %winner.hash(), "losing branch rolled back");
                self.submit_block(winner.clone(), BlockSource::Live);
                self.drain_blocks(now);
                true
            }
            Err(error) => {
                warn!(%error, "fork rollback failed");
                false
            }
        }
    }

    /// The stored block occupying the winner's chain position, if different.
    fn find_sibling(&self, winner: &Block) -> Option<BlockHash> {
        if winner.is_open() {
            return self
                .ledger
                .account_info(&winner.account)
                .map(|info| info.open_block);
        }
        let previous = self.ledger.block_get(&winner.previous)?;
        let successor = previous.sideband.successor;
        if successor.is_zero() || successor == winner.hash() {
            None
        } else {
            Some(successor)
        }
    }

    // ── Daemon loops ─────────────────────────────────────────────────────

    /// Spawn the periodic driving tasks and run until shutdown.
    pub async fn run(self: Arc<Self>) {
        self.scan_backlog();

        let stepper = self.clone();
        let step_task = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_millis(stepper.config.tick_interval_ms));
            loop {
                interval.tick().await;
                stepper.step(Timestamp::now());
            }
        });

        let sampler = self.clone();
        let sampler_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(
                sampler.config.sampler_interval_secs,
            ));
            loop {
                interval.tick().await;
                sampler.sample_online_weight(Timestamp::now());
            }
        });

        if tokio::signal::ctrl_c().await.is_err() {
            warn!("shutdown signal listener failed, stopping");
        }
        info!("shutting down");
        step_task.abort();
        sampler_task.abort();
    }
}
