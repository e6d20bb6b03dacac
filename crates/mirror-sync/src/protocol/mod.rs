//! # Peer Protocol
//!
//! Command names and typed request/response schemas for every round trip the
//! client makes. Replies are validated here; a reply that does not fit its
//! schema becomes a [`DecodeError::Schema`].

pub mod blocks;
pub mod requests;
pub mod responses;

pub use blocks::{JsonBlock, JsonOffer, JsonTransaction};
pub use requests::*;
pub use responses::*;

use serde::de::DeserializeOwned;
use std::fmt;

use crate::domain::DecodeError;

/// Emit sent on connect carrying our identity descriptor.
pub const EMIT_HANDSHAKE: &str = "handshake";

/// Emit acknowledging an accepted handshake.
pub const EMIT_READY: &str = "ready!";

/// Payload of the acknowledgement emit.
pub const READY_PAYLOAD: &str = "go!";

/// Request/response commands understood by the peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Command {
    /// Current chain summary.
    ChainGetInfo,
    /// Header (hash, kernel hash) at a height.
    ChainGetBlockHeader,
    /// Raw block at a height.
    ChainGetBlockByHeight,
    /// Raw block with a hash.
    ChainGetBlockByHash,
    /// Genesis descriptor.
    ChainGetGenesis,
    /// Account balances, nonce and delegation.
    AccountGetAccount,
    /// Account nonce counting mempool transactions.
    AccountGetNonceIncludingPending,
    /// One transaction with inclusion markers.
    TxGetTransaction,
    /// Confirmed transaction count of an account.
    TxAccountTransactionCount,
    /// Page of confirmed transaction ids of an account.
    TxAccountTransactionIds,
    /// Mempool size, optionally for one account.
    MempoolContentCount,
    /// Page of mempool ids, optionally for one account.
    MempoolContentIds,
    /// Offer count of a type.
    OffersContentCount,
    /// Page of offer ids of a type.
    OffersContentIds,
    /// Raw offer.
    OffersGetOffer,
}

impl Command {
    /// Every command, for metric pre-registration and tests.
    pub const ALL: [Command; 15] = [
        Command::ChainGetInfo,
        Command::ChainGetBlockHeader,
        Command::ChainGetBlockByHeight,
        Command::ChainGetBlockByHash,
        Command::ChainGetGenesis,
        Command::AccountGetAccount,
        Command::AccountGetNonceIncludingPending,
        Command::TxGetTransaction,
        Command::TxAccountTransactionCount,
        Command::TxAccountTransactionIds,
        Command::MempoolContentCount,
        Command::MempoolContentIds,
        Command::OffersContentCount,
        Command::OffersContentIds,
        Command::OffersGetOffer,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChainGetInfo => "chain/get-info",
            Self::ChainGetBlockHeader => "chain/get-block-header",
            Self::ChainGetBlockByHeight => "chain/get-block-by-height",
            Self::ChainGetBlockByHash => "chain/get-block-by-hash",
            Self::ChainGetGenesis => "chain/get-genesis",
            Self::AccountGetAccount => "account/get-account",
            Self::AccountGetNonceIncludingPending => "account/get-nonce-including-pending",
            Self::TxGetTransaction => "tx/get-transaction",
            Self::TxAccountTransactionCount => "tx/account-transaction-count",
            Self::TxAccountTransactionIds => "tx/account-transaction-ids",
            Self::MempoolContentCount => "mempool/content-count",
            Self::MempoolContentIds => "mempool/content-ids",
            Self::OffersContentCount => "offers/content-count",
            Self::OffersContentIds => "offers/content-ids",
            Self::OffersGetOffer => "offers/get-offer",
        }
    }

    /// Whether the reply is raw bytes rather than a JSON document.
    pub fn replies_raw(self) -> bool {
        matches!(
            self,
            Self::ChainGetBlockByHeight | Self::ChainGetBlockByHash | Self::OffersGetOffer
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a JSON reply.
///
/// A JSON `null` means the peer has nothing to give and yields `Ok(None)`.
pub fn parse_reply<T: DeserializeOwned>(
    command: Command,
    bytes: &[u8],
) -> Result<Option<T>, DecodeError> {
    serde_json::from_slice::<Option<T>>(bytes).map_err(|e| DecodeError::Schema {
        command: command.as_str(),
        reason: e.to_string(),
    })
}
