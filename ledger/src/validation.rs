//! Block validation — turns an incoming block into apply instructions or a
//! typed rejection.
//!
//! The checks run in a fixed order so the reported status is stable:
//! duplicate, signature, work, chain position, then balance semantics.
//! Operation kind (send / receive / change / epoch) is inferred from the
//! balance delta against the predecessor and the link field.

use crate::block_status::BlockStatus;
use lattice_store::{PendingInfo, PendingKey, Tables};
use lattice_types::{work_valid, Account, Amount, Block, BlockHash, ProtocolParams};

/// Everything `Ledger::process` must write once validation passed.
pub(crate) struct ApplyInstructions {
    pub hash: BlockHash,
    pub height: u64,
    pub open_block: BlockHash,
    /// Representative weight to remove: the account's pre-block (rep, balance).
    pub remove_weight: Option<(Account, Amount)>,
    pub pending_erase: Option<PendingKey>,
    pub pending_insert: Option<(PendingKey, PendingInfo)>,
}

pub(crate) struct BlockValidator<'a> {
    tables: &'a Tables,
    params: &'a ProtocolParams,
    epoch_signer: Account,
}

impl<'a> BlockValidator<'a> {
    pub fn new(tables: &'a Tables, params: &'a ProtocolParams, epoch_signer: Account) -> Self {
        Self {
            tables,
            params,
            epoch_signer,
        }
    }

    pub fn validate(&self, block: &Block) -> Result<ApplyInstructions, BlockStatus> {
        let hash = block.hash();

        if self.tables.block_or_pruned_exists(&hash) {
            return Err(BlockStatus::Old);
        }

        let is_epoch = !block.is_open() && block.link == self.params.epoch_link;
        let signer = if is_epoch {
            self.epoch_signer
        } else {
            block.account
        };
        if !block.verify_signature(&signer) {
            return Err(BlockStatus::BadSignature);
        }

        if !work_valid(&block.root(), block.work, self.params.work_threshold) {
            return Err(BlockStatus::InsufficientWork);
        }

        if block.is_open() {
            self.validate_open(block, hash)
        } else {
            self.validate_successor(block, hash, is_epoch)
        }
    }

    fn validate_open(&self, block: &Block, hash: BlockHash) -> Result<ApplyInstructions, BlockStatus> {
        // Position 1 is contested if the account already has a chain.
        if self.tables.account_get(&block.account).is_some() {
            return Err(BlockStatus::Fork);
        }

        let key = PendingKey::new(block.account, block.link);
        let pending = match self.tables.pending_get(&key) {
            Some(pending) => *pending,
            None => {
                return if self.tables.block_or_pruned_exists(&block.link) {
                    Err(BlockStatus::Unreceivable)
                } else {
                    Err(BlockStatus::GapSource)
                };
            }
        };
        if block.balance != pending.amount {
            return Err(BlockStatus::BalanceMismatch);
        }

        Ok(ApplyInstructions {
            hash,
            height: 1,
            open_block: hash,
            remove_weight: None,
            pending_erase: Some(key),
            pending_insert: None,
        })
    }

    fn validate_successor(
        &self,
        block: &Block,
        hash: BlockHash,
        is_epoch: bool,
    ) -> Result<ApplyInstructions, BlockStatus> {
        let Some(info) = self.tables.account_get(&block.account) else {
            return Err(BlockStatus::GapPrevious);
        };
        let Some(prev) = self.tables.block_get(&block.previous) else {
            return if self.tables.pruned_exists(&block.previous) {
                // A pruned predecessor is cemented with a fixed successor;
                // any new child is a fork against confirmed history.
                Err(BlockStatus::Fork)
            } else {
                Err(BlockStatus::GapPrevious)
            };
        };
        if info.head != block.previous {
            return Err(BlockStatus::Fork);
        }

        let prev_balance = prev.block.balance;
        let mut pending_erase = None;
        let mut pending_insert = None;

        if is_epoch {
            if block.balance != prev_balance {
                return Err(BlockStatus::BlockPosition);
            }
            if block.representative != prev.block.representative {
                return Err(BlockStatus::RepresentativeMismatch);
            }
        } else if block.balance < prev_balance {
            // Send.
            let amount = prev_balance
                .checked_sub(block.balance)
                .ok_or(BlockStatus::NegativeSpend)?;
            pending_insert = Some((
                PendingKey::new(block.link_as_account(), hash),
                PendingInfo {
                    source: block.account,
                    amount,
                },
            ));
        } else if block.balance > prev_balance {
            // Receive.
            let key = PendingKey::new(block.account, block.link);
            let pending = match self.tables.pending_get(&key) {
                Some(pending) => *pending,
                None => {
                    return if self.tables.block_or_pruned_exists(&block.link) {
                        Err(BlockStatus::Unreceivable)
                    } else {
                        Err(BlockStatus::GapSource)
                    };
                }
            };
            let delta = block
                .balance
                .checked_sub(prev_balance)
                .ok_or(BlockStatus::NegativeSpend)?;
            if delta != pending.amount {
                return Err(BlockStatus::BalanceMismatch);
            }
            pending_erase = Some(key);
        } else {
            // Change: same balance, no funds moved.
            if !block.link.is_zero() {
                return Err(BlockStatus::BalanceMismatch);
            }
        }

        Ok(ApplyInstructions {
            hash,
            height: prev.sideband.height + 1,
            open_block: info.open_block,
            remove_weight: Some((info.representative, info.balance)),
            pending_erase,
            pending_insert,
        })
    }
}
