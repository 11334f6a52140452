//! In-memory store with explicit transaction guards.

use crate::account_info::AccountInfo;
use crate::pending::{PendingInfo, PendingKey};
use lattice_types::{Account, BlockHash, SavedBlock};
use std::collections::{BTreeMap, HashMap};
use std::ops::{Deref, DerefMut};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The raw tables. Reachable only through a transaction guard.
#[derive(Default)]
pub struct Tables {
    blocks: HashMap<BlockHash, SavedBlock>,
    accounts: HashMap<Account, AccountInfo>,
    pending: BTreeMap<PendingKey, PendingInfo>,
    pruned: HashMap<BlockHash, u64>,
}

impl Tables {
    // ── Blocks ───────────────────────────────────────────────────────────

    pub fn block_get(&self, hash: &BlockHash) -> Option<&SavedBlock> {
        self.blocks.get(hash)
    }

    pub fn block_exists(&self, hash: &BlockHash) -> bool {
        self.blocks.contains_key(hash)
    }

    /// Whether the block exists either in full or as pruned metadata.
    pub fn block_or_pruned_exists(&self, hash: &BlockHash) -> bool {
        self.blocks.contains_key(hash) || self.pruned.contains_key(hash)
    }

    pub fn block_count(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn block_put(&mut self, hash: BlockHash, block: SavedBlock) {
        self.blocks.insert(hash, block);
    }

    pub fn block_del(&mut self, hash: &BlockHash) {
        self.blocks.remove(hash);
    }

    /// Update the successor pointer in a stored block's sideband.
    pub fn set_successor(&mut self, hash: &BlockHash, successor: BlockHash) {
        if let Some(saved) = self.blocks.get_mut(hash) {
            saved.sideband.successor = successor;
        }
    }

    // ── Accounts ─────────────────────────────────────────────────────────

    pub fn account_get(&self, account: &Account) -> Option<&AccountInfo> {
        self.accounts.get(account)
    }

    pub fn account_count(&self) -> u64 {
        self.accounts.len() as u64
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Account, &AccountInfo)> {
        self.accounts.iter()
    }

    pub fn account_put(&mut self, account: Account, info: AccountInfo) {
        self.accounts.insert(account, info);
    }

    pub fn account_del(&mut self, account: &Account) {
        self.accounts.remove(account);
    }

    // ── Pending ──────────────────────────────────────────────────────────

    pub fn pending_get(&self, key: &PendingKey) -> Option<&PendingInfo> {
        self.pending.get(key)
    }

    pub fn pending_exists(&self, key: &PendingKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_count(&self) -> u64 {
        self.pending.len() as u64
    }

    pub fn pending_put(&mut self, key: PendingKey, info: PendingInfo) {
        self.pending.insert(key, info);
    }

    pub fn pending_del(&mut self, key: &PendingKey) -> Option<PendingInfo> {
        self.pending.remove(key)
    }

    // ── Pruned metadata ──────────────────────────────────────────────────

    pub fn pruned_exists(&self, hash: &BlockHash) -> bool {
        self.pruned.contains_key(hash)
    }

    pub fn pruned_height(&self, hash: &BlockHash) -> Option<u64> {
        self.pruned.get(hash).copied()
    }

    pub fn pruned_count(&self) -> u64 {
        self.pruned.len() as u64
    }

    pub fn pruned_put(&mut self, hash: BlockHash, height: u64) {
        self.pruned.insert(hash, height);
    }
}

/// The store: tables behind a single-writer, multi-reader lock.
#[derive(Default)]
pub struct Store {
    tables: RwLock<Tables>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a read transaction. Multiple may run concurrently.
    pub fn begin_read(&self) -> ReadTxn<'_> {
        ReadTxn {
            tables: self.tables.read().expect("store lock poisoned"),
        }
    }

    /// Begin a write transaction. Serialized against all other access.
    pub fn begin_write(&self) -> WriteTxn<'_> {
        WriteTxn {
            tables: self.tables.write().expect("store lock poisoned"),
        }
    }
}

/// A read transaction handle.
pub struct ReadTxn<'a> {
    tables: RwLockReadGuard<'a, Tables>,
}

impl Deref for ReadTxn<'_> {
    type Target = Tables;

    fn deref(&self) -> &Tables {
        &self.tables
    }
}

/// A write transaction handle.
pub struct WriteTxn<'a> {
    tables: RwLockWriteGuard<'a, Tables>,
}

impl Deref for WriteTxn<'_> {
    type Target = Tables;

    fn deref(&self) -> &Tables {
        &self.tables
    }
}

impl DerefMut for WriteTxn<'_> {
    fn deref_mut(&mut self) -> &mut Tables {
        &mut self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_types::{Amount, Block, BlockSideband, Signature, Timestamp};

    fn saved_block(byte: u8) -> SavedBlock {
        SavedBlock {
            block: Block {
                account: Account::from_bytes([byte; 32]),
                previous: BlockHash::ZERO,
                representative: Account::from_bytes([byte; 32]),
                balance: Amount::raw(byte as u128),
                link: BlockHash::ZERO,
                work: 0,
                signature: Signature::ZERO,
            },
            sideband: BlockSideband {
                height: 1,
                successor: BlockHash::ZERO,
                timestamp: Timestamp::EPOCH,
            },
        }
    }

    #[test]
    fn block_put_get() {
        let store = Store::new();
        let block = saved_block(1);
        let hash = block.hash();

        {
            let mut txn = store.begin_write();
            txn.block_put(hash, block.clone());
        }

        let txn = store.begin_read();
        assert!(txn.block_exists(&hash));
        assert_eq!(txn.block_get(&hash), Some(&block));
        assert_eq!(txn.block_count(), 1);
    }

    #[test]
    fn successor_update() {
        let store = Store::new();
        let block = saved_block(1);
        let hash = block.hash();
        let next = BlockHash::new([9; 32]);

        let mut txn = store.begin_write();
        txn.block_put(hash, block);
        txn.set_successor(&hash, next);
        assert_eq!(txn.block_get(&hash).unwrap().sideband.successor, next);
    }

    #[test]
    fn pending_round_trip() {
        let store = Store::new();
        let key = PendingKey::new(Account::from_bytes([1; 32]), BlockHash::new([2; 32]));
        let info = PendingInfo {
            source: Account::from_bytes([3; 32]),
            amount: Amount::raw(50),
        };

        let mut txn = store.begin_write();
        txn.pending_put(key, info);
        assert!(txn.pending_exists(&key));
        assert_eq!(txn.pending_del(&key), Some(info));
        assert!(!txn.pending_exists(&key));
    }

    #[test]
    fn pruned_metadata_counts_as_existing() {
        let store = Store::new();
        let hash = BlockHash::new([7; 32]);

        let mut txn = store.begin_write();
        txn.pruned_put(hash, 42);
        assert!(!txn.block_exists(&hash));
        assert!(txn.block_or_pruned_exists(&hash));
        assert_eq!(txn.pruned_height(&hash), Some(42));
    }

    #[test]
    fn concurrent_readers() {
        let store = Store::new();
        let a = store.begin_read();
        let b = store.begin_read();
        assert_eq!(a.block_count(), 0);
        assert_eq!(b.block_count(), 0);
    }
}
