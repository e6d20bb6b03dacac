//! # Core Chain Entities
//!
//! ## Clusters
//!
//! - **Chain**: `Hash`, `ChainSummary`, `GenesisInfo`
//! - **Accounts**: `Address`, `CurrencyId`, `AccountSnapshot`, `DelegateInfo`
//! - **Exchange**: `OfferType`

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{hex::Hex, serde_as};
use std::collections::BTreeMap;
use std::fmt;

use crate::encoding::{decode_fixed, HexError};

// Re-export U256 from primitive-types for cumulative chain work
pub use primitive_types::U256;

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// A 32-byte block, kernel or transaction hash.
pub type Hash = [u8; 32];

/// The all-zero hash used before any summary has been received.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Peer-reported snapshot of the chain tip.
///
/// Replaced wholesale on every info push; never partially mutated.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChainSummary {
    /// First height the peer still serves.
    pub start_height: u64,
    /// Number of blocks in the peer's chain (one past the tip block).
    pub tip_height: u64,
    /// Hash of the tip block.
    #[serde_as(as = "Hex")]
    pub tip_hash: Hash,
    /// Kernel hash of the tip block.
    #[serde_as(as = "Hex")]
    pub tip_kernel_hash: Hash,
    /// Hash of the block before the tip.
    #[serde_as(as = "Hex")]
    pub prev_hash: Hash,
    /// Kernel hash of the block before the tip.
    #[serde_as(as = "Hex")]
    pub prev_kernel_hash: Hash,
    /// Accumulated chain work.
    pub cumulative_work: U256,
}

/// Genesis descriptor served by the peer.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisInfo {
    /// Hash of the genesis block.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
    /// Genesis timestamp (unix seconds).
    pub timestamp: u64,
}

// =============================================================================
// CLUSTER B: ACCOUNTS
// =============================================================================

/// A normalized account address as understood by the peer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap an already-normalized address string.
    pub fn new(normalized: impl Into<String>) -> Self {
        Self(normalized.into())
    }

    /// Borrow the address text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 20-byte asset identifier. The all-zero id is the native coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CurrencyId(pub [u8; 20]);

impl CurrencyId {
    /// The native coin.
    pub const NATIVE: CurrencyId = CurrencyId([0u8; 20]);

    /// Parse a hex currency id. An empty string is the native coin.
    pub fn from_hex(input: &str) -> Result<Self, HexError> {
        if input.is_empty() {
            return Ok(Self::NATIVE);
        }
        decode_fixed(input).map(Self)
    }
}

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for CurrencyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for CurrencyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        CurrencyId::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// Staking-delegation metadata attached to an account.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DelegateInfo {
    /// Delegate nonce (incremented on every delegation change).
    pub delegate_nonce: u64,
    /// Public key of the delegate.
    #[serde_as(as = "Hex")]
    pub delegate_public_key: Vec<u8>,
    /// Stake currently available for delegation.
    pub stake_available: u64,
}

/// Per-account state as last reported by the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AccountSnapshot {
    /// Balance per currency.
    pub balances: BTreeMap<CurrencyId, u64>,
    /// Account nonce.
    pub nonce: u64,
    /// Delegation info, if the account delegates stake.
    pub delegate: Option<DelegateInfo>,
}

impl AccountSnapshot {
    /// Delegate nonce, or zero when the account has no delegation.
    pub fn delegate_nonce(&self) -> u64 {
        self.delegate.as_ref().map_or(0, |d| d.delegate_nonce)
    }
}

// =============================================================================
// CLUSTER C: EXCHANGE
// =============================================================================

/// Exchange offer category (e.g. 0 = buy, 1 = sell).
pub type OfferType = u8;
