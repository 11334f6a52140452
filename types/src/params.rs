//! Protocol parameters — consensus tunables shared by every node.
//!
//! The quorum formula, election pacing and container capacities are
//! protocol constants in spirit but configuration in practice: the exact
//! supermajority fraction and trended-versus-instant weighting are tunable
//! per network rather than hardcoded derivations.

use crate::amount::Amount;
use crate::hash::BlockHash;
use serde::{Deserialize, Serialize};

/// All consensus parameters stored by every node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolParams {
    // ── Quorum ───────────────────────────────────────────────────────────
    /// Supermajority fraction for confirmation, in basis points (6700 = 67%).
    pub quorum_bps: u32,

    /// Floor for the online-weight denominator; prevents quorum collapse
    /// when few representatives are online.
    pub online_weight_minimum: Amount,

    /// A representative counts as online if it voted within this window.
    pub online_weight_window_secs: u64,

    /// EMA decay for the trended online weight, in percent (95 = slow decay).
    pub online_trend_decay_pct: u32,

    // ── Election pacing ──────────────────────────────────────────────────
    /// Minimum interval between winner broadcasts / confirm-req rounds.
    pub base_latency_secs: u64,

    /// A passive election activates after `passive_duration_factor *
    /// base_latency_secs` without an explicit trigger.
    pub passive_duration_factor: u32,

    /// Confirm-req rounds sent at full rate before backoff starts.
    pub active_request_count_min: u32,

    /// Lifetime of a normal election without quorum.
    pub election_ttl_secs: u64,

    /// Lifetime of hinted/optimistic elections, shorter than normal.
    pub election_ttl_short_secs: u64,

    // ── Container capacities ─────────────────────────────────────────────
    /// Maximum candidate blocks per election before replace-by-weight.
    pub max_election_blocks: usize,

    /// Capacity of the active-elections container (normal behavior).
    pub active_elections_size: usize,

    /// Hinted election quota, in basis points of `active_elections_size`.
    pub hinted_limit_bps: u32,

    /// Optimistic election quota, in basis points of `active_elections_size`.
    pub optimistic_limit_bps: u32,

    /// Fixed quota for operator-requested (manual) elections.
    pub manual_limit: usize,

    // ── Vote / gap caches ────────────────────────────────────────────────
    /// Maximum distinct hashes in the pre-election vote cache.
    pub vote_cache_max_entries: usize,

    /// Maximum voters remembered per cached hash.
    pub vote_cache_max_voters: usize,

    /// Age after which cached votes are dropped.
    pub vote_cache_ttl_secs: u64,

    /// Maximum missing-dependency entries tracked by the gap cache.
    pub gap_cache_max_entries: usize,

    /// Accumulated voter weight (basis points of online weight) at which a
    /// missing block becomes a bootstrap candidate.
    pub bootstrap_hint_bps: u32,

    /// Cached vote weight (basis points of the quorum delta) at which the
    /// hinted scheduler starts an election.
    pub hinted_threshold_bps: u32,

    /// Unconfirmed chain depth beyond which the optimistic scheduler
    /// activates an account frontier.
    pub optimistic_unconfirmed_gap: u64,

    // ── Ledger ───────────────────────────────────────────────────────────
    /// Minimum proof-of-work value for block admission.
    pub work_threshold: u64,

    /// Confirmed blocks younger than this are never pruned.
    pub max_pruning_age_secs: u64,

    /// Number of most recent confirmed blocks per chain kept un-pruned.
    pub max_pruning_depth: u64,

    /// Total supply minted by the genesis block.
    pub genesis_supply: Amount,

    /// Link value marking epoch (upgrade) blocks.
    pub epoch_link: BlockHash,
}

impl ProtocolParams {
    /// Development-network defaults: tiny work, fast elections.
    pub fn dev_defaults() -> Self {
        let mut epoch_link = [0u8; 32];
        epoch_link[..15].copy_from_slice(b"epoch v1 block\0");

        Self {
            quorum_bps: 6_700,
            online_weight_minimum: Amount::raw(60_000_000),
            online_weight_window_secs: 300,
            online_trend_decay_pct: 95,

            base_latency_secs: 1,
            passive_duration_factor: 5,
            active_request_count_min: 2,
            election_ttl_secs: 300,
            election_ttl_short_secs: 30,

            max_election_blocks: 10,
            active_elections_size: 5_000,
            hinted_limit_bps: 2_000,
            optimistic_limit_bps: 1_000,
            manual_limit: 256,

            vote_cache_max_entries: 65_536,
            vote_cache_max_voters: 64,
            vote_cache_ttl_secs: 900,
            gap_cache_max_entries: 256,
            bootstrap_hint_bps: 50,
            hinted_threshold_bps: 1_000,
            optimistic_unconfirmed_gap: 64,

            // Nearly every nonce passes on dev networks; the check still
            // rejects adversarially chosen low values.
            work_threshold: 1 << 48,
            max_pruning_age_secs: 300,
            max_pruning_depth: 64,
            genesis_supply: Amount::MAX,
            epoch_link: BlockHash::new(epoch_link),
        }
    }

    /// Quota for a behavior class given the container base size.
    pub fn hinted_limit(&self) -> usize {
        self.active_elections_size * self.hinted_limit_bps as usize / 10_000
    }

    pub fn optimistic_limit(&self) -> usize {
        self.active_elections_size * self.optimistic_limit_bps as usize / 10_000
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self::dev_defaults()
    }
}
