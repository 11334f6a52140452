//! Block ingest queue. Bounded; when full, peer-sourced blocks are dropped
//! before locally originated ones.

use lattice_types::Block;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockSource {
    /// Published by a peer.
    Live,
    /// Created on this node (wallet, RPC).
    Local,
}

pub struct QueuedBlock {
    pub block: Block,
    pub source: BlockSource,
}

pub struct BlockProcessor {
    queue: VecDeque<QueuedBlock>,
    max_len: usize,
}

impl BlockProcessor {
    pub fn new(max_len: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            max_len,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queue a block for processing. Returns false when it was dropped.
    pub fn add(&mut self, block: Block, source: BlockSource) -> bool {
        if self.queue.len() >= self.max_len {
            if source == BlockSource::Local {
                // Make room by dropping the oldest peer-sourced entry.
                let victim = self
                    .queue
                    .iter()
                    .position(|queued| queued.source == BlockSource::Live);
                match victim {
                    Some(index) => {
                        let dropped = self.queue.remove(index);
                        if let Some(dropped) = dropped {
                            debug!(hash = %dropped.block.hash(), "peer block dropped for local work");
                        }
                    }
                    None => return false,
                }
            } else {
                debug!(hash = %block.hash(), "peer block dropped, queue full");
                return false;
            }
        }
        self.queue.push_back(QueuedBlock { block, source });
        true
    }

    pub fn drain(&mut self) -> Vec<QueuedBlock> {
        self.queue.drain(..).collect()
    }
}
