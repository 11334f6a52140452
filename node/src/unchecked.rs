//! Gapped blocks waiting for a dependency, keyed by the dependency hash.
//! When the dependency lands its dependents go back through the block
//! processor.

use lattice_types::{Block, BlockHash};
use std::collections::HashMap;

pub struct Unchecked {
    entries: HashMap<BlockHash, Vec<Block>>,
    count: usize,
    max_entries: usize,
}

impl Unchecked {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            count: 0,
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Buffer `block` until `dependency` arrives. Silently drops when full.
    pub fn put(&mut self, dependency: BlockHash, block: Block) {
        if self.count >= self.max_entries {
            return;
        }
        let dependents = self.entries.entry(dependency).or_default();
        let hash = block.hash();
        if dependents.iter().any(|existing| existing.hash() == hash) {
            return;
        }
        dependents.push(block);
        self.count += 1;
    }

    /// Blocks that were waiting on `dependency`.
    pub fn pop(&mut self, dependency: &BlockHash) -> Vec<Block> {
        let dependents = self.entries.remove(dependency).unwrap_or_default();
        self.count -= dependents.len();
        dependents
    }

    pub fn waiting_on(&self, dependency: &BlockHash) -> usize {
        self.entries
            .get(dependency)
            .map(|dependents| dependents.len())
            .unwrap_or(0)
    }
}
