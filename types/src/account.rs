//! Account identifier — an Ed25519 public key with `lat_` display prefix.

use crate::error::ParseError;
use crate::keys::PublicKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A Lattice account: the 32-byte public key of the account holder.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Account([u8; 32]);

impl Account {
    /// The display prefix for all Lattice accounts.
    pub const PREFIX: &'static str = "lat_";

    pub const ZERO: Self = Self([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0)
    }

    pub fn decode(s: &str) -> Result<Self, ParseError> {
        let hex_part = s
            .strip_prefix(Self::PREFIX)
            .ok_or(ParseError::InvalidPrefix(Self::PREFIX))?;
        let bytes = hex::decode(hex_part)?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            ParseError::InvalidLength {
                expected: 32,
                got: bytes.len(),
            }
        })?;
        Ok(Self(arr))
    }
}

impl From<PublicKey> for Account {
    fn from(key: PublicKey) -> Self {
        Self(key.0)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account(lat_{}\u{2026})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, hex::encode(self.0))
    }
}
