//! Backlog scheduler: accounts waiting for an election, admitted in balance
//! order so high-value chains confirm first.

use crate::active_elections::ActiveElections;
use crate::election::ElectionBehavior;
use lattice_ledger::{Ledger, WeightSnapshot};
use lattice_types::{Account, Amount, SavedBlock, Timestamp};
use std::collections::HashMap;
use tracing::trace;

struct Candidate {
    balance: Amount,
    block: SavedBlock,
}

pub struct PriorityScheduler {
    /// One queued candidate per account; re-activation replaces it.
    queue: HashMap<Account, Candidate>,
    max_len: usize,
}

impl PriorityScheduler {
    pub fn new(max_len: usize) -> Self {
        Self {
            queue: HashMap::new(),
            max_len,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queue the account's next unconfirmed block, if it passes the causal
    /// gate. Priority is the larger of the block balance and its
    /// predecessor's, so draining an account does not deprioritize it.
    pub fn activate(&mut self, ledger: &Ledger, account: &Account) -> bool {
        let Some(saved) = super::next_unconfirmed(ledger, account) else {
            return false;
        };
        if !ledger.dependents_confirmed(&saved.block) {
            return false;
        }
        let balance = saved.block.balance.max(
            ledger
                .block_get(&saved.block.previous)
                .map(|prev| prev.block.balance)
                .unwrap_or(Amount::ZERO),
        );
        if self.queue.len() >= self.max_len && !self.queue.contains_key(account) {
            // Full: only admit if it outranks the current minimum.
            let weakest = self
                .queue
                .iter()
                .min_by_key(|(_, candidate)| candidate.balance)
                .map(|(account, candidate)| (*account, candidate.balance));
            match weakest {
                Some((weakest_account, weakest_balance)) if weakest_balance < balance => {
                    self.queue.remove(&weakest_account);
                }
                _ => return false,
            }
        }
        trace!(%account, %balance, "backlog candidate queued");
        self.queue.insert(*account, Candidate { balance, block: saved });
        true
    }

    /// Move the heaviest candidates into elections while the container admits
    /// them. Returns the number of elections started.
    pub fn run(
        &mut self,
        active: &mut ActiveElections,
        snapshot: &WeightSnapshot,
        now: Timestamp,
    ) -> usize {
        let mut started = 0;
        loop {
            let next = self
                .queue
                .iter()
                .max_by_key(|&(account, candidate)| (candidate.balance, *account))
                .map(|(account, _)| *account);
            let Some(account) = next else {
                break;
            };
            let Some(candidate) = self.queue.remove(&account) else {
                break;
            };
            if !active.insert(
                candidate.block.block,
                ElectionBehavior::Normal,
                Amount::ZERO,
                snapshot,
                now,
            ) {
                break;
            }
            started += 1;
        }
        started
    }
}
