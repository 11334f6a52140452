use thiserror::Error;

/// Failure to parse a textual representation of a core type.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("invalid prefix: expected {0}")]
    InvalidPrefix(&'static str),

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
