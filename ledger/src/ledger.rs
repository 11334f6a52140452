//! The block lattice: one chain per account, funds moving between chains as
//! send/receive pairs through the pending table.

use crate::block_status::BlockStatus;
use crate::rep_weights::RepWeights;
use crate::validation::BlockValidator;
use lattice_store::{AccountInfo, Store, Tables};
use lattice_types::{
    Account, Amount, Block, BlockHash, BlockSideband, ProtocolParams, SavedBlock, Timestamp,
};
use std::sync::Arc;
use tracing::{debug, info};

pub struct Ledger {
    store: Arc<Store>,
    rep_weights: Arc<RepWeights>,
    params: ProtocolParams,
    genesis: Block,
}

impl Ledger {
    pub fn new(store: Arc<Store>, params: ProtocolParams, genesis: Block) -> Self {
        Self {
            store,
            rep_weights: Arc::new(RepWeights::new()),
            params,
            genesis,
        }
    }

    /// Seed the genesis block if the store is empty. Genesis is cemented from
    /// the start; it never goes through an election.
    pub fn initialize(&self, now: Timestamp) {
        let mut txn = self.store.begin_write();
        if txn.block_count() > 0 {
            return;
        }
        let hash = self.genesis.hash();
        txn.block_put(
            hash,
            SavedBlock {
                block: self.genesis.clone(),
                sideband: BlockSideband {
                    height: 1,
                    successor: BlockHash::ZERO,
                    timestamp: now,
                },
            },
        );
        txn.account_put(
            self.genesis.account,
            AccountInfo {
                head: hash,
                representative: self.genesis.representative,
                balance: self.genesis.balance,
                block_count: 1,
                confirmation_height: 1,
                open_block: hash,
                modified: now,
            },
        );
        self.rep_weights
            .representation_add(self.genesis.representative, self.genesis.balance);
        info!(genesis = %hash, supply = %self.genesis.balance, "ledger initialized");
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn rep_weights(&self) -> &Arc<RepWeights> {
        &self.rep_weights
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn genesis_hash(&self) -> BlockHash {
        self.genesis.hash()
    }

    pub fn genesis_account(&self) -> Account {
        self.genesis.account
    }

    /// Validate and apply a block. On success the block is stored with its
    /// sideband, the account record advances and representative weights move.
    pub fn process(&self, block: Block, now: Timestamp) -> Result<SavedBlock, BlockStatus> {
        let mut txn = self.store.begin_write();
        let validator = BlockValidator::new(&txn, &self.params, self.genesis.account);
        let instructions = validator.validate(&block)?;

        if let Some((rep, balance)) = instructions.remove_weight {
            self.rep_weights.representation_sub(rep, balance);
        }
        self.rep_weights
            .representation_add(block.representative, block.balance);

        if let Some(key) = instructions.pending_erase {
            txn.pending_del(&key);
        }
        if let Some((key, pending)) = instructions.pending_insert {
            txn.pending_put(key, pending);
        }

        let saved = SavedBlock {
            block,
            sideband: BlockSideband {
                height: instructions.height,
                successor: BlockHash::ZERO,
                timestamp: now,
            },
        };
        if !saved.block.is_open() {
            txn.set_successor(&saved.block.previous, instructions.hash);
        }
        let confirmation_height = txn
            .account_get(&saved.block.account)
            .map(|info| info.confirmation_height)
            .unwrap_or(0);
        txn.account_put(
            saved.block.account,
            AccountInfo {
                head: instructions.hash,
                representative: saved.block.representative,
                balance: saved.block.balance,
                block_count: instructions.height,
                confirmation_height,
                open_block: instructions.open_block,
                modified: now,
            },
        );
        txn.block_put(instructions.hash, saved.clone());
        debug!(hash = %instructions.hash, account = %saved.block.account, height = instructions.height, "block processed");
        Ok(saved)
    }

    pub fn block_get(&self, hash: &BlockHash) -> Option<SavedBlock> {
        self.store.begin_read().block_get(hash).cloned()
    }

    pub fn block_exists(&self, hash: &BlockHash) -> bool {
        self.store.begin_read().block_exists(hash)
    }

    pub fn block_or_pruned_exists(&self, hash: &BlockHash) -> bool {
        self.store.begin_read().block_or_pruned_exists(hash)
    }

    pub fn account_info(&self, account: &Account) -> Option<AccountInfo> {
        self.store.begin_read().account_get(account).cloned()
    }

    pub fn account_balance(&self, account: &Account) -> Option<Amount> {
        self.store
            .begin_read()
            .account_get(account)
            .map(|info| info.balance)
    }

    pub fn balance(&self, hash: &BlockHash) -> Option<Amount> {
        self.store
            .begin_read()
            .block_get(hash)
            .map(|saved| saved.block.balance)
    }

    pub fn weight(&self, rep: &Account) -> Amount {
        self.rep_weights.weight(rep)
    }

    pub fn block_count(&self) -> u64 {
        self.store.begin_read().block_count()
    }

    pub fn account_count(&self) -> u64 {
        self.store.begin_read().account_count()
    }

    pub fn pruned_count(&self) -> u64 {
        self.store.begin_read().pruned_count()
    }

    pub fn cemented_count(&self) -> u64 {
        let txn = self.store.begin_read();
        txn.accounts()
            .map(|(_, info)| info.confirmation_height)
            .sum::<u64>()
            + txn.pruned_count()
    }

    /// A pruned block was confirmed before it was pruned, so pruned counts as
    /// confirmed.
    pub fn block_confirmed(&self, hash: &BlockHash) -> bool {
        let txn = self.store.begin_read();
        Self::confirmed_in(&txn, hash)
    }

    fn confirmed_in(tables: &Tables, hash: &BlockHash) -> bool {
        if tables.pruned_exists(hash) {
            return true;
        }
        let Some(saved) = tables.block_get(hash) else {
            return false;
        };
        tables
            .account_get(&saved.block.account)
            .map(|info| saved.sideband.height <= info.confirmation_height)
            .unwrap_or(false)
    }

    /// Hashes this block cannot be confirmed before: its predecessor and, for
    /// receives, the funding send.
    pub fn dependent_blocks(&self, block: &Block) -> Vec<BlockHash> {
        let txn = self.store.begin_read();
        let mut deps = Vec::new();
        if !block.previous.is_zero() {
            deps.push(block.previous);
        }
        if !block.link.is_zero() && block.link != self.params.epoch_link {
            let receives = if block.is_open() {
                true
            } else {
                // Unknown predecessor: assume the link is a source until the
                // chain fills in and proves otherwise.
                match txn.block_get(&block.previous) {
                    Some(prev) => block.balance > prev.block.balance,
                    None => true,
                }
            };
            if receives {
                deps.push(block.link);
            }
        }
        deps
    }

    pub fn dependents_confirmed(&self, block: &Block) -> bool {
        let deps = self.dependent_blocks(block);
        let txn = self.store.begin_read();
        deps.iter().all(|dep| Self::confirmed_in(&txn, dep))
    }

    /// Cement a block and everything it causally depends on. Returns the newly
    /// cemented blocks in dependency order.
    pub fn confirm(&self, hash: BlockHash) -> Vec<SavedBlock> {
        let mut txn = self.store.begin_write();
        let mut cemented = Vec::new();
        let mut stack = vec![hash];
        while let Some(&top) = stack.last() {
            let Some(saved) = txn.block_get(&top).cloned() else {
                stack.pop();
                continue;
            };
            let Some(info) = txn.account_get(&saved.block.account).cloned() else {
                stack.pop();
                continue;
            };
            if saved.sideband.height <= info.confirmation_height {
                stack.pop();
                continue;
            }
            let mut pending_deps = Vec::new();
            if saved.sideband.height > info.confirmation_height + 1 {
                pending_deps.push(saved.block.previous);
            }
            if !saved.block.link.is_zero()
                && saved.block.link != self.params.epoch_link
                && self.is_receive(&txn, &saved)
                && !Self::confirmed_in(&txn, &saved.block.link)
            {
                pending_deps.push(saved.block.link);
            }
            if pending_deps.is_empty() {
                debug_assert_eq!(saved.sideband.height, info.confirmation_height + 1);
                let mut updated = info;
                updated.confirmation_height = saved.sideband.height;
                txn.account_put(saved.block.account, updated);
                debug!(hash = %top, height = saved.sideband.height, "block cemented");
                cemented.push(saved);
                stack.pop();
            } else {
                stack.extend(pending_deps);
            }
        }
        cemented
    }

    fn is_receive(&self, tables: &Tables, saved: &SavedBlock) -> bool {
        if saved.block.is_open() {
            return true;
        }
        match tables.block_get(&saved.block.previous) {
            Some(prev) => saved.block.balance > prev.block.balance,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::{dev_genesis_block, dev_genesis_key};
    use lattice_types::{generate_work, KeyPair, Signature};

    fn test_ledger() -> Ledger {
        let params = ProtocolParams::dev_defaults();
        let genesis = dev_genesis_block(&params);
        let ledger = Ledger::new(Arc::new(Store::new()), params, genesis);
        ledger.initialize(Timestamp::new(1));
        ledger
    }

    fn build_block(
        ledger: &Ledger,
        pair: &KeyPair,
        previous: BlockHash,
        representative: Account,
        balance: Amount,
        link: BlockHash,
    ) -> Block {
        let mut block = Block {
            account: Account::from(pair.public),
            previous,
            representative,
            balance,
            link,
            work: 0,
            signature: Signature::ZERO,
        };
        block.work = generate_work(&block.root(), ledger.params().work_threshold);
        block.sign(pair);
        block
    }

    fn send_from_genesis(ledger: &Ledger, destination: Account, amount: Amount) -> Block {
        let pair = dev_genesis_key();
        let info = ledger.account_info(&ledger.genesis_account()).unwrap();
        build_block(
            ledger,
            &pair,
            info.head,
            info.representative,
            info.balance.checked_sub(amount).unwrap(),
            BlockHash::new(*destination.as_bytes()),
        )
    }

    #[test]
    fn genesis_is_seeded_and_cemented() {
        let ledger = test_ledger();
        assert_eq!(ledger.block_count(), 1);
        assert!(ledger.block_confirmed(&ledger.genesis_hash()));
        assert_eq!(
            ledger.weight(&ledger.genesis_account()),
            ledger.params().genesis_supply
        );
    }

    #[test]
    fn send_moves_funds_to_pending() {
        let ledger = test_ledger();
        let receiver = KeyPair::generate();
        let send = send_from_genesis(&ledger, Account::from(receiver.public), Amount::raw(500));
        let saved = ledger.process(send, Timestamp::new(2)).unwrap();
        assert_eq!(saved.height(), 2);
        assert_eq!(
            ledger.account_balance(&ledger.genesis_account()).unwrap(),
            ledger.params().genesis_supply.checked_sub(Amount::raw(500)).unwrap()
        );
        assert_eq!(ledger.store().begin_read().pending_count(), 1);
    }

    #[test]
    fn receive_opens_the_destination_account() {
        let ledger = test_ledger();
        let receiver = KeyPair::generate();
        let receiver_account = Account::from(receiver.public);
        let send = send_from_genesis(&ledger, receiver_account, Amount::raw(500));
        let send_hash = send.hash();
        ledger.process(send, Timestamp::new(2)).unwrap();

        let open = build_block(
            &ledger,
            &receiver,
            BlockHash::ZERO,
            receiver_account,
            Amount::raw(500),
            send_hash,
        );
        ledger.process(open, Timestamp::new(3)).unwrap();
        assert_eq!(ledger.account_balance(&receiver_account), Some(Amount::raw(500)));
        assert_eq!(ledger.weight(&receiver_account), Amount::raw(500));
        assert_eq!(ledger.store().begin_read().pending_count(), 0);
    }

    #[test]
    fn duplicate_block_is_old() {
        let ledger = test_ledger();
        let receiver = KeyPair::generate();
        let send = send_from_genesis(&ledger, Account::from(receiver.public), Amount::raw(1));
        ledger.process(send.clone(), Timestamp::new(2)).unwrap();
        assert_eq!(
            ledger.process(send, Timestamp::new(2)),
            Err(BlockStatus::Old)
        );
    }

    #[test]
    fn sibling_of_head_is_a_fork() {
        let ledger = test_ledger();
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let send_a = send_from_genesis(&ledger, Account::from(a.public), Amount::raw(1));
        let send_b = send_from_genesis(&ledger, Account::from(b.public), Amount::raw(2));
        ledger.process(send_a, Timestamp::new(2)).unwrap();
        assert_eq!(
            ledger.process(send_b, Timestamp::new(2)),
            Err(BlockStatus::Fork)
        );
    }

    #[test]
    fn missing_previous_is_a_gap() {
        let ledger = test_ledger();
        let pair = dev_genesis_key();
        let block = build_block(
            &ledger,
            &pair,
            BlockHash::new([7; 32]),
            ledger.genesis_account(),
            Amount::raw(1),
            BlockHash::ZERO,
        );
        assert_eq!(
            ledger.process(block, Timestamp::new(2)),
            Err(BlockStatus::GapPrevious)
        );
    }

    #[test]
    fn open_without_send_is_a_source_gap() {
        let ledger = test_ledger();
        let receiver = KeyPair::generate();
        let open = build_block(
            &ledger,
            &receiver,
            BlockHash::ZERO,
            Account::from(receiver.public),
            Amount::raw(500),
            BlockHash::new([9; 32]),
        );
        assert_eq!(
            ledger.process(open, Timestamp::new(2)),
            Err(BlockStatus::GapSource)
        );
    }

    #[test]
    fn double_receive_is_unreceivable() {
        let ledger = test_ledger();
        let receiver = KeyPair::generate();
        let receiver_account = Account::from(receiver.public);
        let send = send_from_genesis(&ledger, receiver_account, Amount::raw(500));
        let send_hash = send.hash();
        ledger.process(send, Timestamp::new(2)).unwrap();
        let open = build_block(
            &ledger,
            &receiver,
            BlockHash::ZERO,
            receiver_account,
            Amount::raw(500),
            send_hash,
        );
        let open_hash = open.hash();
        ledger.process(open, Timestamp::new(3)).unwrap();

        let second = build_block(
            &ledger,
            &receiver,
            open_hash,
            receiver_account,
            Amount::raw(1000),
            send_hash,
        );
        assert_eq!(
            ledger.process(second, Timestamp::new(4)),
            Err(BlockStatus::Unreceivable)
        );
    }

    #[test]
    fn receive_amount_must_match_the_send() {
        let ledger = test_ledger();
        let receiver = KeyPair::generate();
        let receiver_account = Account::from(receiver.public);
        let send = send_from_genesis(&ledger, receiver_account, Amount::raw(500));
        let send_hash = send.hash();
        ledger.process(send, Timestamp::new(2)).unwrap();
        let open = build_block(
            &ledger,
            &receiver,
            BlockHash::ZERO,
            receiver_account,
            Amount::raw(499),
            send_hash,
        );
        assert_eq!(
            ledger.process(open, Timestamp::new(3)),
            Err(BlockStatus::BalanceMismatch)
        );
    }

    #[test]
    fn bad_signature_is_rejected() {
        let ledger = test_ledger();
        let receiver = KeyPair::generate();
        let mut send = send_from_genesis(&ledger, Account::from(receiver.public), Amount::raw(1));
        send.signature = Signature::ZERO;
        assert_eq!(
            ledger.process(send, Timestamp::new(2)),
            Err(BlockStatus::BadSignature)
        );
    }

    #[test]
    fn insufficient_work_is_rejected() {
        let params = ProtocolParams::dev_defaults();
        let genesis = dev_genesis_block(&params);
        let mut strict = params.clone();
        // Raise the bar after genesis so any nonce the builder found fails.
        strict.work_threshold = u64::MAX;
        let ledger = Ledger::new(Arc::new(Store::new()), strict, genesis);
        ledger.initialize(Timestamp::new(1));
        let pair = dev_genesis_key();
        let info = ledger.account_info(&ledger.genesis_account()).unwrap();
        let mut block = Block {
            account: ledger.genesis_account(),
            previous: info.head,
            representative: info.representative,
            balance: info.balance.checked_sub(Amount::raw(1)).unwrap(),
            link: BlockHash::new([3; 32]),
            work: 0,
            signature: Signature::ZERO,
        };
        block.sign(&pair);
        assert_eq!(
            ledger.process(block, Timestamp::new(2)),
            Err(BlockStatus::InsufficientWork)
        );
    }

    #[test]
    fn change_block_rotates_weight() {
        let ledger = test_ledger();
        let pair = dev_genesis_key();
        let rep = Account::from(KeyPair::generate().public);
        let info = ledger.account_info(&ledger.genesis_account()).unwrap();
        let change = build_block(&ledger, &pair, info.head, rep, info.balance, BlockHash::ZERO);
        ledger.process(change, Timestamp::new(2)).unwrap();
        assert_eq!(ledger.weight(&ledger.genesis_account()), Amount::ZERO);
        assert_eq!(ledger.weight(&rep), ledger.params().genesis_supply);
    }

    #[test]
    fn epoch_block_keeps_balance_and_representative() {
        let ledger = test_ledger();
        let pair = dev_genesis_key();
        let info = ledger.account_info(&ledger.genesis_account()).unwrap();
        let mut epoch = Block {
            account: ledger.genesis_account(),
            previous: info.head,
            representative: info.representative,
            balance: info.balance,
            link: ledger.params().epoch_link,
            work: 0,
            signature: Signature::ZERO,
        };
        epoch.work = generate_work(&epoch.root(), ledger.params().work_threshold);
        epoch.sign(&pair);
        let saved = ledger.process(epoch, Timestamp::new(2)).unwrap();
        assert_eq!(saved.height(), 2);
    }

    #[test]
    fn epoch_block_must_not_move_funds() {
        let ledger = test_ledger();
        let pair = dev_genesis_key();
        let info = ledger.account_info(&ledger.genesis_account()).unwrap();
        let mut epoch = Block {
            account: ledger.genesis_account(),
            previous: info.head,
            representative: info.representative,
            balance: info.balance.checked_sub(Amount::raw(1)).unwrap(),
            link: ledger.params().epoch_link,
            work: 0,
            signature: Signature::ZERO,
        };
        epoch.work = generate_work(&epoch.root(), ledger.params().work_threshold);
        epoch.sign(&pair);
        assert_eq!(
            ledger.process(epoch, Timestamp::new(2)),
            Err(BlockStatus::BlockPosition)
        );
    }

    #[test]
    fn confirm_cements_the_whole_chain() {
        let ledger = test_ledger();
        let receiver = KeyPair::generate();
        let s1 = send_from_genesis(&ledger, Account::from(receiver.public), Amount::raw(1));
        ledger.process(s1, Timestamp::new(2)).unwrap();
        let s2 = send_from_genesis(&ledger, Account::from(receiver.public), Amount::raw(1));
        let s2_hash = s2.hash();
        ledger.process(s2, Timestamp::new(3)).unwrap();

        let cemented = ledger.confirm(s2_hash);
        assert_eq!(cemented.len(), 2);
        assert!(ledger.block_confirmed(&s2_hash));
    }

    #[test]
    fn confirming_a_receive_cements_the_send_first() {
        let ledger = test_ledger();
        let receiver = KeyPair::generate();
        let receiver_account = Account::from(receiver.public);
        let send = send_from_genesis(&ledger, receiver_account, Amount::raw(500));
        let send_hash = send.hash();
        ledger.process(send, Timestamp::new(2)).unwrap();
        let open = build_block(
            &ledger,
            &receiver,
            BlockHash::ZERO,
            receiver_account,
            Amount::raw(500),
            send_hash,
        );
        let open_hash = open.hash();
        ledger.process(open, Timestamp::new(3)).unwrap();

        assert!(!ledger.dependents_confirmed(&ledger.block_get(&open_hash).unwrap().block));
        let cemented = ledger.confirm(open_hash);
        let order: Vec<_> = cemented.iter().map(|saved| saved.hash()).collect();
        assert_eq!(order, vec![send_hash, open_hash]);
        assert!(ledger.block_confirmed(&send_hash));
    }
}
