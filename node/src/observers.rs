//! Fire-and-forget callback registries. Observers run inline on the calling
//! thread; they must not block.

use lattice_consensus::{ElectionStatus, Vote};
use lattice_types::{Account, SavedBlock};
use std::sync::RwLock;

type BlockObserver = Box<dyn Fn(&SavedBlock, Option<&ElectionStatus>) + Send + Sync>;
type VoteObserver = Box<dyn Fn(&Vote) + Send + Sync>;
type BalanceObserver = Box<dyn Fn(&Account) + Send + Sync>;

#[derive(Default)]
pub struct Observers {
    blocks: RwLock<Vec<BlockObserver>>,
    votes: RwLock<Vec<VoteObserver>>,
    account_balance: RwLock<Vec<BalanceObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_block_confirmed(
        &self,
        observer: impl Fn(&SavedBlock, Option<&ElectionStatus>) + Send + Sync + 'static,
    ) {
        self.blocks.write().unwrap().push(Box::new(observer));
    }

    pub fn on_vote(&self, observer: impl Fn(&Vote) + Send + Sync + 'static) {
        self.votes.write().unwrap().push(Box::new(observer));
    }

    pub fn on_account_balance(&self, observer: impl Fn(&Account) + Send + Sync + 'static) {
        self.account_balance.write().unwrap().push(Box::new(observer));
    }

    pub fn notify_block_confirmed(&self, block: &SavedBlock, status: Option<&ElectionStatus>) {
        for observer in self.blocks.read().unwrap().iter() {
            observer(block, status);
        }
    }

    pub fn notify_vote(&self, vote: &Vote) {
        for observer in self.votes.read().unwrap().iter() {
            observer(vote);
        }
    }

    pub fn notify_account_balance(&self, account: &Account) {
        for observer in self.account_balance.read().unwrap().iter() {
            observer(account);
        }
    }
}
