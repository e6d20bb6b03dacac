//! # Domain Invariants
//!
//! Checks applied at the peer boundary before anything reaches the mirror.

use shared_types::Hash;

use super::errors::{DecodeError, MirrorError};
use super::value_objects::{DecodedBlock, IdentityDescriptor};

/// Invariant: a peer must identify as the same application.
///
/// A mismatch closes the connection; nothing else is attempted.
pub fn invariant_same_application(
    expected: &str,
    peer: &IdentityDescriptor,
) -> Result<(), MirrorError> {
    if peer.short != expected {
        return Err(MirrorError::IdentityMismatch {
            expected: expected.to_string(),
            got: peer.short.clone(),
        });
    }
    Ok(())
}

/// Invariant: a block fetched for a known header carries that header's hash.
pub fn invariant_block_hash(expected: &Hash, block: &DecodedBlock) -> Result<(), DecodeError> {
    if block.hash != *expected {
        return Err(DecodeError::HashMismatch {
            height: block.height,
            expected: *expected,
            got: block.hash,
        });
    }
    Ok(())
}

/// Invariant: a block fetched by height is the block at that height.
pub fn invariant_block_height(requested: u64, block: &DecodedBlock) -> Result<(), DecodeError> {
    if block.height != requested {
        return Err(DecodeError::Block(format!(
            "requested height {requested}, peer served height {}",
            block.height
        )));
    }
    Ok(())
}
