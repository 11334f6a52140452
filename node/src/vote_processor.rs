//! Vote ingest queue. Signature verification happens at drain time so a
//! flood of garbage votes costs the queue, not the election lock.

use lattice_consensus::{Vote, MAX_VOTE_HASHES};
use std::collections::VecDeque;
use tracing::debug;

pub struct VoteProcessor {
    queue: VecDeque<Vote>,
    max_len: usize,
}

impl VoteProcessor {
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

    pub fn add(&mut self, vote: Vote) -> bool {
        if vote.hashes.is_empty() || vote.hashes.len() > MAX_VOTE_HASHES {
            debug!(rep = %vote.account, count = vote.hashes.len(), "vote dropped, bad hash count");
            return false;
        }
        if self.queue.len() >= self.max_len {
            debug!(rep = %vote.account, "vote dropped, queue full");
            return false;
        }
        self.queue.push_back(vote);
        true
    }

    /// Drain the queue, keeping only votes whose signature verifies.
    pub fn drain_verified(&mut self) -> Vec<Vote> {
        self.queue
            .drain(..)
            .filter(|vote| {
                let valid = vote.verify();
                if !valid {
                    debug!(rep = %vote.account, "vote signature invalid");
                }
                valid
            })
            .collect()
    }
}
