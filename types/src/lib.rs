//! Fundamental types for the Lattice protocol.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: accounts, amounts, hashes, roots, keys, state blocks,
//! timestamps, protocol parameters and the proof-of-work check.

pub mod account;
pub mod amount;
pub mod block;
pub mod error;
pub mod hash;
pub mod keys;
pub mod params;
pub mod root;
pub mod time;
pub mod work;

pub use account::Account;
pub use amount::Amount;
pub use block::{Block, BlockSideband, SavedBlock};
pub use error::ParseError;
pub use hash::BlockHash;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use params::ProtocolParams;
pub use root::{QualifiedRoot, Root};
pub use time::Timestamp;
pub use work::{generate_work, work_valid, work_value};
