//! # Domain Value Objects
//!
//! Immutable value types exchanged between the mirror and its collaborators.

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{CurrencyId, Hash, OfferType};

/// Connection/session status.
///
/// `Online`/`Offline` follow the transport alone; `Syncing`/`Synced` are only
/// reachable after an accepted handshake on the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No transport connection.
    #[default]
    Offline,
    /// Connected, handshake not yet accepted.
    Online,
    /// Handshake accepted, first chain summary not yet processed.
    Syncing,
    /// First chain summary processed.
    Synced,
}

impl SessionStatus {
    /// Numeric code exported as a gauge.
    pub fn code(self) -> u8 {
        match self {
            Self::Offline => 0,
            Self::Online => 1,
            Self::Syncing => 2,
            Self::Synced => 3,
        }
    }

    /// Whether the handshake was accepted on the current connection.
    pub fn is_handshaken(self) -> bool {
        matches!(self, Self::Syncing | Self::Synced)
    }
}

/// Network the client expects to join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Production network.
    Mainnet,
    /// Public test network.
    Testnet,
    /// Local development network.
    Devnet,
}

impl std::str::FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "devnet" => Ok(Self::Devnet),
            other => Err(format!("unknown network type `{other}`")),
        }
    }
}

/// Consensus participation requested from the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusMode {
    /// Full consensus participant.
    Full,
    /// Request/response client (this mirror).
    Rpc,
    /// No consensus traffic.
    None,
}

/// Block body encoding requested from the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockEncoding {
    /// JSON document.
    Json,
    /// Native binary serialization.
    Binary,
}

/// Network sub-descriptor of the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    /// Network type.
    #[serde(rename = "type")]
    pub network_type: NetworkType,
}

/// Identity exchanged in both directions on connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDescriptor {
    /// Application identifier; must match on both sides.
    pub short: String,
    /// Build version.
    pub build: String,
    /// Network descriptor.
    pub net: NetworkDescriptor,
    /// Advertised address (empty for clients).
    #[serde(default)]
    pub address: String,
    /// Consensus mode.
    pub consensus: ConsensusMode,
}

/// A block as produced by the external decoder/validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlock {
    /// Block hash.
    pub hash: Hash,
    /// Kernel hash.
    pub kernel_hash: Hash,
    /// Block height.
    pub height: u64,
    /// Block timestamp (unix seconds).
    pub timestamp: u64,
    /// Contained transactions, in block order.
    pub transactions: Vec<DecodedTransaction>,
}

/// A transaction as produced by the external decoder/validator.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedTransaction {
    /// Transaction hash.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
    /// Encoded transaction, kept opaque.
    #[serde_as(as = "Hex")]
    pub raw: Vec<u8>,
}

/// An exchange offer as produced by the external decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedOffer {
    /// Offer hash.
    pub hash: Hash,
    /// Offer category.
    pub offer_type: OfferType,
    /// Traded currency.
    pub currency: CurrencyId,
    /// Offered amount.
    pub amount: u64,
    /// Unit price.
    pub price: u64,
}

/// Direction of a unit counter step applied to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// +1
    Up,
    /// -1
    Down,
}

impl Step {
    /// Apply the step to a counter, saturating at zero.
    pub fn apply(self, value: u64) -> u64 {
        match self {
            Self::Up => value.saturating_add(1),
            Self::Down => value.saturating_sub(1),
        }
    }
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Heights whose header was (re)stored, in scan order.
    pub stored: Vec<u64>,
    /// Heights rolled back, in scan order.
    pub removed: Vec<u64>,
    /// Height at which the scan met an agreeing header.
    pub matched_at: Option<u64>,
    /// Heights whose header or replacement block failed to decode.
    pub failed: Vec<u64>,
    /// The peer stopped answering mid-pass.
    pub aborted: bool,
}
