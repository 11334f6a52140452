//! Transitive rollback of unconfirmed blocks, used when an election settles a
//! fork against the locally applied branch.

use crate::ledger::Ledger;
use anyhow::{bail, Result};
use lattice_store::{PendingInfo, PendingKey, WriteTxn};
use lattice_types::{Account, BlockHash, SavedBlock};
use tracing::debug;

impl Ledger {
    /// Remove `hash` and every block that builds on it, across accounts.
    /// Rolling back a send whose funds were already received rolls back the
    /// receive chain first. Confirmed blocks are never rolled back; hitting
    /// one is an error and leaves the store partially unwound.
    pub fn rollback(&self, hash: &BlockHash) -> Result<Vec<SavedBlock>> {
        let mut txn = self.store().begin_write();
        let mut rolled_back = Vec::new();
        self.rollback_in(&mut txn, hash, &mut rolled_back)?;
        Ok(rolled_back)
    }

    fn rollback_in(
        &self,
        txn: &mut WriteTxn<'_>,
        hash: &BlockHash,
        rolled_back: &mut Vec<SavedBlock>,
    ) -> Result<()> {
        while txn.block_exists(hash) {
            let account = txn
                .block_get(hash)
                .map(|saved| saved.block.account)
                .unwrap_or(Account::ZERO);
            let head = match txn.account_get(&account) {
                Some(info) => info.head,
                None => bail!("account record missing while rolling back {hash}"),
            };
            self.rollback_head(txn, account, head, rolled_back)?;
        }
        Ok(())
    }

    fn rollback_head(
        &self,
        txn: &mut WriteTxn<'_>,
        account: Account,
        head: BlockHash,
        rolled_back: &mut Vec<SavedBlock>,
    ) -> Result<()> {
        let Some(saved) = txn.block_get(&head).cloned() else {
            bail!("head block {head} missing while rolling back");
        };
        let Some(info) = txn.account_get(&account).cloned() else {
            bail!("account record missing while rolling back {head}");
        };
        if saved.sideband.height <= info.confirmation_height {
            bail!("refusing to roll back cemented block {head}");
        }

        let block = &saved.block;
        if block.is_open() {
            // Re-insert the receivable entry the open consumed.
            let source = txn
                .block_get(&block.link)
                .map(|send| send.block.account)
                .unwrap_or(Account::ZERO);
            txn.pending_put(
                PendingKey::new(account, block.link),
                PendingInfo {
                    source,
                    amount: block.balance,
                },
            );
            self.rep_weights()
                .representation_sub(block.representative, block.balance);
            txn.account_del(&account);
            txn.block_del(&head);
            debug!(hash = %head, %account, "rolled back open block");
            rolled_back.push(saved);
            return Ok(());
        }

        let Some(prev) = txn.block_get(&block.previous).cloned() else {
            bail!("predecessor of {head} missing while rolling back");
        };
        let prev_balance = prev.block.balance;

        if block.balance < prev_balance {
            // Send: reclaim the receivable entry, unwinding the receive chain
            // if the destination already claimed it.
            let destination = block.link_as_account();
            let key = PendingKey::new(destination, head);
            if txn.pending_del(&key).is_none() {
                let Some(receive) = Self::find_receive(txn, &destination, &head) else {
                    bail!("receive for send {head} not found while rolling back");
                };
                self.rollback_in(txn, &receive, rolled_back)?;
                if txn.pending_del(&key).is_none() {
                    bail!("receivable entry for send {head} still missing after unwind");
                }
            }
        } else if block.balance > prev_balance && block.link != self.params().epoch_link {
            // Receive: the consumed entry becomes receivable again.
            let Some(amount) = block.balance.checked_sub(prev_balance) else {
                bail!("receive delta underflow while rolling back {head}");
            };
            let source = txn
                .block_get(&block.link)
                .map(|send| send.block.account)
                .unwrap_or(Account::ZERO);
            txn.pending_put(
                PendingKey::new(account, block.link),
                PendingInfo { source, amount },
            );
        }

        self.rep_weights()
            .representation_sub(block.representative, block.balance);
        self.rep_weights()
            .representation_add(prev.block.representative, prev_balance);

        let mut restored = info;
        restored.head = block.previous;
        restored.representative = prev.block.representative;
        restored.balance = prev_balance;
        restored.block_count -= 1;
        txn.account_put(account, restored);
        txn.set_successor(&block.previous, BlockHash::ZERO);
        txn.block_del(&head);
        debug!(hash = %head, %account, "rolled back block");
        rolled_back.push(saved);
        Ok(())
    }

    /// Scan the destination chain from its head for the receive that claimed
    /// `send_hash`.
    fn find_receive(
        txn: &WriteTxn<'_>,
        destination: &Account,
        send_hash: &BlockHash,
    ) -> Option<BlockHash> {
        let mut cursor = txn.account_get(destination)?.head;
        while !cursor.is_zero() {
            let saved = txn.block_get(&cursor)?;
            if saved.block.link == *send_hash {
                return Some(cursor);
            }
            cursor = saved.block.previous;
        }
        None
    }

    /// Convenience used by fork resolution: the receive block that claimed a
    /// given send, if any.
    pub fn find_receive_block_by_send_hash(
        &self,
        destination: &Account,
        send_hash: &BlockHash,
    ) -> Option<SavedBlock> {
        let txn = self.store().begin_read();
        let mut cursor = txn.account_get(destination)?.head;
        while !cursor.is_zero() {
            let saved = txn.block_get(&cursor)?;
            if saved.block.link == *send_hash {
                return Some(saved.clone());
            }
            cursor = saved.block.previous;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::{dev_genesis_block, dev_genesis_key};
    use lattice_types::{generate_work, Amount, Block, KeyPair, ProtocolParams, Signature, Timestamp};
    use std::sync::Arc;

    fn test_ledger() -> Ledger {
        let params = ProtocolParams::dev_defaults();
        let genesis = dev_genesis_block(&params);
        let ledger = Ledger::new(Arc::new(lattice_store::Store::new()), params, genesis);
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
    fn rollback_of_send_restores_balance_and_pending() {
        let ledger = test_ledger();
        let receiver = KeyPair::generate();
        let send = send_from_genesis(&ledger, Account::from(receiver.public), Amount::raw(500));
        let send_hash = send.hash();
        ledger.process(send, Timestamp::new(2)).unwrap();

        let rolled_back = ledger.rollback(&send_hash).unwrap();
        assert_eq!(rolled_back.len(), 1);
        assert!(!ledger.block_exists(&send_hash));
        assert_eq!(
            ledger.account_balance(&ledger.genesis_account()),
            Some(ledger.params().genesis_supply)
        );
        assert_eq!(ledger.store().begin_read().pending_count(), 0);
        assert_eq!(
            ledger.weight(&ledger.genesis_account()),
            ledger.params().genesis_supply
        );
    }

    #[test]
    fn rollback_of_claimed_send_unwinds_the_receive_chain() {
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

        let rolled_back = ledger.rollback(&send_hash).unwrap();
        let hashes: Vec<_> = rolled_back.iter().map(|saved| saved.hash()).collect();
        assert_eq!(hashes, vec![open_hash, send_hash]);
        assert!(ledger.account_info(&receiver_account).is_none());
        assert_eq!(ledger.weight(&receiver_account), Amount::ZERO);
        assert_eq!(
            ledger.account_balance(&ledger.genesis_account()),
            Some(ledger.params().genesis_supply)
        );
    }

    #[test]
    fn rollback_of_receive_restores_the_receivable_entry() {
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

        ledger.rollback(&open_hash).unwrap();
        let txn = ledger.store().begin_read();
        let pending = txn
            .pending_get(&PendingKey::new(receiver_account, send_hash))
            .unwrap();
        assert_eq!(pending.amount, Amount::raw(500));
        assert_eq!(pending.source, ledger.genesis_account());
        assert!(ledger.block_exists(&send_hash));
    }

    #[test]
    fn cemented_blocks_refuse_rollback() {
        let ledger = test_ledger();
        let receiver = KeyPair::generate();
        let send = send_from_genesis(&ledger, Account::from(receiver.public), Amount::raw(1));
        let send_hash = send.hash();
        ledger.process(send, Timestamp::new(2)).unwrap();
        ledger.confirm(send_hash);
        assert!(ledger.rollback(&send_hash).is_err());
    }

    #[test]
    fn rollback_is_transitive_within_one_chain() {
        let ledger = test_ledger();
        let receiver = KeyPair::generate();
        let s1 = send_from_genesis(&ledger, Account::from(receiver.public), Amount::raw(1));
        let s1_hash = s1.hash();
        ledger.process(s1, Timestamp::new(2)).unwrap();
        let s2 = send_from_genesis(&ledger, Account::from(receiver.public), Amount::raw(1));
        let s2_hash = s2.hash();
        ledger.process(s2, Timestamp::new(3)).unwrap();

        let rolled_back = ledger.rollback(&s1_hash).unwrap();
        let hashes: Vec<_> = rolled_back.iter().map(|saved| saved.hash()).collect();
        assert_eq!(hashes, vec![s2_hash, s1_hash]);
        assert_eq!(ledger.block_count(), 1);
    }
}
