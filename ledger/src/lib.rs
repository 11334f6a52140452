//! Block lattice ledger: validation, application, rollback, cementing and
//! pruning, plus the representative weight table driving consensus.

mod block_status;
mod genesis;
mod ledger;
mod pruning;
mod rep_weights;
mod rollback;
mod validation;

pub use block_status::BlockStatus;
pub use genesis::{dev_genesis_block, dev_genesis_key, DEV_GENESIS_SEED};
pub use ledger::Ledger;
pub use rep_weights::{RepWeights, WeightSnapshot};
