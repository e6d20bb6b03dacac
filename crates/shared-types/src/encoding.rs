//! # Hex Encoding Helpers
//!
//! The peer speaks lowercase hex for every binary identifier.

use thiserror::Error;

/// Failure to parse a fixed-width hex identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HexError {
    /// Input is not valid hex.
    #[error("invalid hex: {0}")]
    Invalid(String),

    /// Decoded length differs from the expected width.
    #[error("expected {expected} bytes, got {got}")]
    Length {
        /// Expected byte count
        expected: usize,
        /// Decoded byte count
        got: usize,
    },
}

/// Decode a hex string into a fixed-size array.
pub fn decode_fixed<const N: usize>(input: &str) -> Result<[u8; N], HexError> {
    let bytes = hex::decode(input).map_err(|e| HexError::Invalid(e.to_string()))?;
    let got = bytes.len();
    bytes
        .try_into()
        .map_err(|_| HexError::Length { expected: N, got })
}

/// First eight hex characters of a hash, for log lines.
pub fn short_hex(bytes: &[u8]) -> String {
    let take = bytes.len().min(4);
    hex::encode(&bytes[..take])
}
