//! State blocks — the unified block format for the block-lattice.
//!
//! Every block carries the full account state after its operation
//! (balance, representative), so send/receive/change/open semantics are
//! inferred by the ledger from the delta against the predecessor rather
//! than from an explicit block kind. Pruned history therefore never loses
//! balance information.

use crate::account::Account;
use crate::amount::Amount;
use crate::hash::BlockHash;
use crate::keys::{KeyPair, Signature};
use crate::root::{QualifiedRoot, Root};
use crate::time::Timestamp;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};

type Blake2b256 = Blake2b<U32>;

/// A state block in an account's chain.
///
/// Immutable once signed; the ledger attaches a [`BlockSideband`] at
/// insertion time but never alters the signed fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The account this block belongs to.
    pub account: Account,
    /// Hash of the previous block in this account's chain (zero for the
    /// chain-opening block).
    pub previous: BlockHash,
    /// The account's consensus representative after this block.
    pub representative: Account,
    /// The account balance after this block.
    pub balance: Amount,
    /// Context-dependent link field:
    /// - send: destination account key
    /// - receive/open: hash of the send block being claimed
    /// - change: zero
    /// - epoch: the protocol's epoch link marker
    pub link: BlockHash,
    /// Proof-of-work nonce over the block root.
    pub work: u64,
    /// Signature by the account holder (or epoch signer).
    pub signature: Signature,
}

impl Block {
    /// Compute this block's hash: Blake2b-256 over the signed fields in
    /// canonical order. Work and signature are not part of the hash.
    pub fn hash(&self) -> BlockHash {
        let mut hasher = Blake2b256::new();
        hasher.update(self.account.as_bytes());
        hasher.update(self.previous.as_bytes());
        hasher.update(self.representative.as_bytes());
        hasher.update(self.balance.value().to_be_bytes());
        hasher.update(self.link.as_bytes());
        BlockHash::new(hasher.finalize().into())
    }

    /// The contested chain position this block occupies.
    pub fn root(&self) -> Root {
        if self.previous.is_zero() {
            Root::from(self.account)
        } else {
            Root::from(self.previous)
        }
    }

    pub fn qualified_root(&self) -> QualifiedRoot {
        QualifiedRoot::new(self.root(), self.previous)
    }

    /// Whether this is the first block in an account chain.
    pub fn is_open(&self) -> bool {
        self.previous.is_zero()
    }

    /// Interpret the link field as a destination account (send blocks).
    pub fn link_as_account(&self) -> Account {
        Account::from_bytes(*self.link.as_bytes())
    }

    /// Sign the block hash with `pair`, replacing any existing signature.
    pub fn sign(&mut self, pair: &KeyPair) {
        self.signature = pair.sign(self.hash().as_bytes());
    }

    /// Verify the signature against `signer` (usually `self.account`; the
    /// epoch signer for epoch blocks).
    pub fn verify_signature(&self, signer: &Account) -> bool {
        signer
            .public_key()
            .verify(self.hash().as_bytes(), &self.signature)
    }
}

/// Ledger bookkeeping attached to a block at insertion time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSideband {
    /// Height of this block in its account chain (open block = 1).
    pub height: u64,
    /// Hash of the next block in the chain, zero while this is the head.
    pub successor: BlockHash,
    /// Local time the block was inserted.
    pub timestamp: Timestamp,
}

/// A block together with its sideband, as held in the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedBlock {
    pub block: Block,
    pub sideband: BlockSideband,
}

impl SavedBlock {
    pub fn hash(&self) -> BlockHash {
        self.block.hash()
    }

    pub fn height(&self) -> u64 {
        self.sideband.height
    }
}
