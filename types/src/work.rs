//! Proof-of-work threshold check.
//!
//! Work generation strategy is out of scope for the node core; only the
//! validity check the ledger applies to incoming blocks lives here, plus a
//! brute-force helper the tests use against the easy dev threshold.

use crate::root::Root;
use blake2::digest::consts::U8;
use blake2::{Blake2b, Digest};

type Blake2b64 = Blake2b<U8>;

/// Work value for `nonce` against `root`: an 8-byte Blake2b digest read as
/// a little-endian u64. Higher is better.
pub fn work_value(root: &Root, nonce: u64) -> u64 {
    let mut hasher = Blake2b64::new();
    hasher.update(nonce.to_le_bytes());
    hasher.update(root.as_bytes());
    u64::from_le_bytes(hasher.finalize().into())
}

/// Whether `nonce` satisfies `threshold` for `root`.
pub fn work_valid(root: &Root, nonce: u64, threshold: u64) -> bool {
    work_value(root, nonce) >= threshold
}

/// Brute-force a valid nonce. Only sensible against dev thresholds.
pub fn generate_work(root: &Root, threshold: u64) -> u64 {
    let mut nonce = 0u64;
    while !work_valid(root, nonce, threshold) {
        nonce = nonce.wrapping_add(1);
    }
    nonce
}
