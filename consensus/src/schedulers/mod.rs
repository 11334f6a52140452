//! Election schedulers. Each one decides which roots deserve an election
//! next and feeds the active-elections container; admission always passes
//! the `dependents_confirmed` causal gate.

mod hinted;
mod manual;
mod optimistic;
mod priority;

pub use hinted::HintedScheduler;
pub use manual::ManualScheduler;
pub use optimistic::OptimisticScheduler;
pub use priority::PriorityScheduler;

use lattice_ledger::Ledger;
use lattice_types::{Account, SavedBlock};

/// The lowest unconfirmed block of an account's chain, the only one its
/// election may currently target.
fn next_unconfirmed(ledger: &Ledger, account: &Account) -> Option<SavedBlock> {
    let info = ledger.account_info(account)?;
    if info.confirmation_height >= info.block_count {
        return None;
    }
    let target = info.confirmation_height + 1;
    let mut cursor = info.head;
    loop {
        let saved = ledger.block_get(&cursor)?;
        if saved.height() == target {
            return Some(saved);
        }
        cursor = saved.block.previous;
    }
}
