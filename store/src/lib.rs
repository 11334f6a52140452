//! Transactional store for the block-lattice ledger.
//!
//! The ledger only ever touches storage through explicit transaction
//! handles: read transactions run concurrently, write transactions are
//! serialized (single-writer, multi-reader). This crate provides the
//! contract plus an in-memory backend; the on-disk page format is a
//! non-goal of the node core.

pub mod account_info;
pub mod pending;
pub mod store;

pub use account_info::AccountInfo;
pub use pending::{PendingInfo, PendingKey};
pub use store::{ReadTxn, Store, Tables, WriteTxn};
