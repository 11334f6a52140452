//! Manual scheduler: operator-pushed blocks go straight to an election.

use crate::active_elections::ActiveElections;
use crate::election::ElectionBehavior;
use lattice_ledger::WeightSnapshot;
use lattice_types::{Amount, Block, Timestamp};
use std::collections::VecDeque;

#[derive(Default)]
pub struct ManualScheduler {
    queue: VecDeque<Block>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn push(&mut self, block: Block) {
        self.queue.push_back(block);
    }

    pub fn run(
        &mut self,
        active: &mut ActiveElections,
        snapshot: &WeightSnapshot,
        now: Timestamp,
    ) -> usize {
        let mut started = 0;
        while let Some(block) = self.queue.pop_front() {
            if active.insert(block, ElectionBehavior::Manual, Amount::ZERO, snapshot, now) {
                started += 1;
            }
        }
        started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_ledger::WeightSnapshot;
    use lattice_types::{Account, Amount, BlockHash, ProtocolParams, Signature};
    use std::collections::HashMap;

    #[test]
    fn pushed_blocks_become_manual_elections() {
        let mut scheduler = ManualScheduler::new();
        let block = Block {
            account: Account::from_bytes([1; 32]),
            previous: BlockHash::new([2; 32]),
            representative: Account::from_bytes([1; 32]),
            balance: Amount::raw(1),
            link: BlockHash::ZERO,
            work: 0,
            signature: Signature::ZERO,
        };
        let hash = block.hash();
        scheduler.push(block);
        let mut active = ActiveElections::new(ProtocolParams::dev_defaults());
        let snapshot = WeightSnapshot::from_map(HashMap::new());
        assert_eq!(scheduler.run(&mut active, &snapshot, Timestamp::new(1)), 1);
        assert!(scheduler.is_empty());
        assert!(active.active(&hash));
        assert_eq!(active.count_by_behavior(ElectionBehavior::Manual), 1);
    }
}
