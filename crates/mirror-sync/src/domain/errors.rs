//! # Domain Errors
//!
//! Error types for the mirror client.
//!
//! Peer requests use a three-way result: `Ok(Some(data))`, `Ok(None)` when
//! the peer is unavailable or the data is not ready yet, and `Err(..)` when
//! the reply could not be decoded. "Nothing yet" is never an error.

use shared_types::{HexError, Hash};
use thiserror::Error;

/// Outcome of a peer round trip.
///
/// - `Ok(Some(data))` - the peer answered and the answer decoded
/// - `Ok(None)` - transport unavailable / data not ready; stop quietly
/// - `Err(MirrorError::Decode(..))` - the answer was malformed
pub type FetchResult<T> = Result<Option<T>, MirrorError>;

/// Failure to turn peer bytes into a domain object.
///
/// Fatal to the single fetch that produced it; other in-flight operations
/// are unaffected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A reply did not match the command's response schema.
    #[error("malformed {command} reply: {reason}")]
    Schema {
        /// Command whose reply was rejected
        command: &'static str,
        /// Parser message
        reason: String,
    },

    /// Block bytes failed to decode.
    #[error("invalid block: {0}")]
    Block(String),

    /// Transaction bytes failed to decode.
    #[error("invalid transaction: {0}")]
    Transaction(String),

    /// Offer bytes failed to decode.
    #[error("invalid offer: {0}")]
    Offer(String),

    /// Address text failed to decode.
    #[error("invalid address {address}: {reason}")]
    Address {
        /// Offending input
        address: String,
        /// Codec message
        reason: String,
    },

    /// Hex field failed to decode.
    #[error(transparent)]
    Hex(#[from] HexError),

    /// The peer served an object whose hash differs from the one requested.
    #[error("hash mismatch at height {height}: expected {}, got {}", hex::encode(expected), hex::encode(got))]
    HashMismatch {
        /// Height of the object
        height: u64,
        /// Hash that was asked for
        expected: Hash,
        /// Hash that was served
        got: Hash,
    },
}

/// Mirror client error types.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// A peer reply could not be decoded.
    #[error("decode failure: {0}")]
    Decode(#[from] DecodeError),

    /// The peer identified itself as a different application.
    #[error("peer identity mismatch: expected {expected}, got {got}")]
    IdentityMismatch {
        /// Our application identifier
        expected: String,
        /// The peer's application identifier
        got: String,
    },

    /// A request payload could not be encoded.
    #[error("failed to encode {command} request: {reason}")]
    Encode {
        /// Command being issued
        command: &'static str,
        /// Serializer message
        reason: String,
    },

    /// Configuration rejected at construction time.
    #[error("invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),
}
