//! Open representative voting. Representatives vote on block hashes; an
//! election per contested root tallies those votes against ledger weight and
//! confirms once a candidate holds a supermajority of online weight.

mod active_elections;
mod election;
mod election_status;
mod gap_cache;
mod online_weight;
mod schedulers;
mod tally;
mod vote;
mod vote_cache;
mod vote_info;

pub use active_elections::{ActiveElections, TickResult, VoteResults};
pub use election::{Election, ElectionBehavior, ElectionState};
pub use election_status::{ElectionStatus, ElectionStatusType};
pub use gap_cache::GapCache;
pub use online_weight::OnlineWeightSampler;
pub use schedulers::{HintedScheduler, ManualScheduler, OptimisticScheduler, PriorityScheduler};
pub use tally::Tally;
pub use vote::{Vote, VoteCode, VoteSource, FINAL_TIMESTAMP, MAX_VOTE_HASHES};
pub use vote_cache::{CachedVote, VoteCache};
pub use vote_info::VoteInfo;
