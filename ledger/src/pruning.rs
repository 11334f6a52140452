//! Pruning of cemented history. Bodies of old confirmed blocks are dropped;
//! a hash to height entry stays behind so duplicates and receives still
//! resolve.

use crate::ledger::Ledger;
use lattice_types::{BlockHash, Timestamp};
use tracing::debug;

impl Ledger {
    /// Walk backwards from `hash`, moving confirmed non-frontier blocks into
    /// the pruned table. Stops at the account frontier, an open block, an
    /// already pruned block, or after `batch_size` removals. Returns the
    /// number of blocks pruned.
    pub fn pruning_action(&self, hash: &BlockHash, batch_size: u64) -> u64 {
        let mut txn = self.store().begin_write();
        let mut pruned = 0;
        let mut cursor = *hash;
        while pruned < batch_size && !cursor.is_zero() {
            if txn.pruned_exists(&cursor) {
                break;
            }
            let Some(saved) = txn.block_get(&cursor).cloned() else {
                break;
            };
            let Some(info) = txn.account_get(&saved.block.account).cloned() else {
                break;
            };
            // Frontiers and unconfirmed blocks keep their bodies.
            if info.head == cursor || saved.sideband.height > info.confirmation_height {
                cursor = saved.block.previous;
                continue;
            }
            txn.pruned_put(cursor, saved.sideband.height);
            txn.block_del(&cursor);
            pruned += 1;
            debug!(hash = %cursor, height = saved.sideband.height, "block pruned");
            cursor = saved.block.previous;
        }
        pruned
    }

    /// Confirmed non-frontier blocks older than the configured age, capped at
    /// the configured depth per account. Candidates feed `pruning_action`.
    pub fn pruning_targets(&self, now: Timestamp) -> Vec<BlockHash> {
        let params = self.params();
        let txn = self.store().begin_read();
        let mut targets = Vec::new();
        for (_, info) in txn.accounts() {
            if info.confirmation_height < 2 {
                continue;
            }
            // Start below the frontier so the head always survives.
            let Some(head) = txn.block_get(&info.head) else {
                continue;
            };
            let mut cursor = head.block.previous;
            let mut depth = 0;
            while !cursor.is_zero() && depth < params.max_pruning_depth {
                let Some(saved) = txn.block_get(&cursor) else {
                    break;
                };
                if saved.sideband.height <= info.confirmation_height
                    && saved.sideband.timestamp.has_expired(params.max_pruning_age_secs, now)
                {
                    targets.push(cursor);
                    break;
                }
                cursor = saved.block.previous;
                depth += 1;
            }
        }
        targets
    }
}
