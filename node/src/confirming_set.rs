//! Batch cementing worker: hashes whose elections won quorum, waiting for
//! `Ledger::confirm` to write confirmation heights.

use lattice_ledger::Ledger;
use lattice_types::{BlockHash, SavedBlock};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

pub struct ConfirmingSet {
    queue: VecDeque<BlockHash>,
    queued: HashSet<BlockHash>,
}

impl ConfirmingSet {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.queued.contains(hash)
    }

    pub fn add(&mut self, hash: BlockHash) {
        if self.queued.insert(hash) {
            self.queue.push_back(hash);
        }
    }

    /// Cement everything queued. Returns the newly cemented blocks in
    /// dependency order across the whole batch.
    pub fn run(&mut self, ledger: &Ledger) -> Vec<SavedBlock> {
        let mut cemented = Vec::new();
        while let Some(hash) = self.queue.pop_front() {
            self.queued.remove(&hash);
            let batch = ledger.confirm(hash);
            if !batch.is_empty() {
                debug!(target_hash = %hash, count = batch.len(), "batch cemented");
            }
            cemented.extend(batch);
        }
        cemented
    }
}

impl Default for ConfirmingSet {
    fn default() -> Self {
        Self::new()
    }
}
