//! Optimistic scheduler: accounts whose unconfirmed tail has grown deep get
//! an election ahead of the balance-ordered backlog, so long chains drain
//! instead of starving.

use crate::active_elections::ActiveElections;
use crate::election::ElectionBehavior;
use lattice_ledger::{Ledger, WeightSnapshot};
use lattice_types::{Account, Amount, ProtocolParams, Timestamp};
use std::collections::VecDeque;
use tracing::trace;

pub struct OptimisticScheduler {
    params: ProtocolParams,
    queue: VecDeque<Account>,
}

impl OptimisticScheduler {
    pub fn new(params: ProtocolParams) -> Self {
        Self {
            params,
            queue: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Queue the account if its unconfirmed depth crosses the gap threshold.
    pub fn activate(&mut self, ledger: &Ledger, account: &Account) -> bool {
        let Some(info) = ledger.account_info(account) else {
            return false;
        };
        if info.unconfirmed_count() < self.params.optimistic_unconfirmed_gap {
            return false;
        }
        if self.queue.contains(account) {
            return false;
        }
        if self.queue.len() >= self.params.optimistic_limit() {
            return false;
        }
        trace!(%account, depth = info.unconfirmed_count(), "deep chain queued");
        self.queue.push_back(*account);
        true
    }

    /// Drain queued accounts into elections, one block per account per pass.
    pub fn run(
        &mut self,
        ledger: &Ledger,
        active: &mut ActiveElections,
        snapshot: &WeightSnapshot,
        now: Timestamp,
    ) -> usize {
        let mut started = 0;
        for _ in 0..self.queue.len() {
            let Some(account) = self.queue.pop_front() else {
                break;
            };
            let Some(saved) = super::next_unconfirmed(ledger, &account) else {
                continue;
            };
            if !ledger.dependents_confirmed(&saved.block) {
                continue;
            }
            if active.insert(saved.block, ElectionBehavior::Optimistic, Amount::ZERO, snapshot, now) {
                started += 1;
            }
        }
        started
    }
}
