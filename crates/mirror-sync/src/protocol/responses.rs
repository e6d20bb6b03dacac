//! Response schemas and their conversion into domain types.

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{
    AccountSnapshot, ChainSummary, CurrencyId, DelegateInfo, GenesisInfo, Hash, U256,
};

use crate::domain::{DecodeError, TxInclusion};

/// `chain/get-info` reply.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfoResponse {
    /// Number of blocks in the chain.
    pub tip_height: u64,
    /// First height the peer still serves.
    #[serde(default)]
    pub start_height: u64,
    /// Tip block hash.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
    /// Tip kernel hash.
    #[serde_as(as = "Hex")]
    #[serde(default)]
    pub kernel_hash: Hash,
    /// Hash of the block before the tip.
    #[serde_as(as = "Hex")]
    pub prev_hash: Hash,
    /// Kernel hash of the block before the tip.
    #[serde_as(as = "Hex")]
    pub prev_kernel_hash: Hash,
    /// Cumulative work, compressed.
    pub chainwork: String,
}

impl ChainInfoResponse {
    /// Convert into a summary, decompressing the chain work.
    pub fn into_summary(self) -> Result<ChainSummary, DecodeError> {
        Ok(ChainSummary {
            start_height: self.start_height,
            tip_height: self.tip_height,
            tip_hash: self.hash,
            tip_kernel_hash: self.kernel_hash,
            prev_hash: self.prev_hash,
            prev_kernel_hash: self.prev_kernel_hash,
            cumulative_work: decompress_work(&self.chainwork)?,
        })
    }
}

/// Decode compressed chain work: big-endian hex with leading zero bytes
/// stripped. An empty string is zero work.
pub fn decompress_work(compressed: &str) -> Result<U256, DecodeError> {
    let text = compressed.trim_start_matches("0x");
    let padded;
    let text = if text.len() % 2 == 1 {
        padded = format!("0{text}");
        padded.as_str()
    } else {
        text
    };

    let bytes = hex::decode(text).map_err(|e| DecodeError::Schema {
        command: "chain/get-info",
        reason: format!("chainwork: {e}"),
    })?;
    if bytes.len() > 32 {
        return Err(DecodeError::Schema {
            command: "chain/get-info",
            reason: format!("chainwork spans {} bytes", bytes.len()),
        });
    }
    Ok(U256::from_big_endian(&bytes))
}

/// Compress chain work the way the peer does.
pub fn compress_work(work: U256) -> String {
    let mut bytes = [0u8; 32];
    work.to_big_endian(&mut bytes);
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    hex::encode(&bytes[first..])
}

/// `chain/get-block-header` reply.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeaderResponse {
    /// Block hash.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
    /// Kernel hash.
    #[serde_as(as = "Hex")]
    pub kernel_hash: Hash,
}

/// `chain/get-genesis` reply.
pub type GenesisResponse = GenesisInfo;

/// One balance line of an account reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    /// Currency id, hex; empty for the native coin.
    #[serde(default)]
    pub currency: CurrencyId,
    /// Amount.
    pub amount: u64,
}

/// Delegation block of an account reply.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateEntry {
    /// Delegate nonce.
    pub delegate_nonce: u64,
    /// Delegate public key.
    #[serde_as(as = "Hex")]
    pub delegate_public_key: Vec<u8>,
    /// Stake available for delegation.
    #[serde(default)]
    pub delegate_stake_available: u64,
}

/// `account/get-account` reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountResponse {
    /// Balance lines.
    #[serde(default)]
    pub balances: Vec<BalanceEntry>,
    /// Account nonce.
    #[serde(default)]
    pub nonce: u64,
    /// Delegation, if any.
    #[serde(default)]
    pub delegate: Option<DelegateEntry>,
}

impl From<AccountResponse> for AccountSnapshot {
    fn from(response: AccountResponse) -> Self {
        let mut snapshot = AccountSnapshot {
            nonce: response.nonce,
            delegate: response.delegate.map(|d| DelegateInfo {
                delegate_nonce: d.delegate_nonce,
                delegate_public_key: d.delegate_public_key,
                stake_available: d.delegate_stake_available,
            }),
            ..AccountSnapshot::default()
        };
        for entry in response.balances.into_iter().filter(|e| e.amount != 0) {
            let slot = snapshot.balances.entry(entry.currency).or_insert(0);
            *slot = slot.saturating_add(entry.amount);
        }
        snapshot
    }
}

/// `tx/get-transaction` reply.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Encoded transaction.
    #[serde_as(as = "Hex")]
    pub tx: Vec<u8>,
    /// Including block height.
    #[serde(default)]
    pub block_height: Option<u64>,
    /// Including block timestamp.
    #[serde(default)]
    pub block_timestamp: Option<u64>,
    /// Confirmations.
    #[serde(default)]
    pub confirmations: u64,
    /// Queued for the next block.
    #[serde(default)]
    pub pending_queued: bool,
    /// In the mempool.
    #[serde(default)]
    pub pending: bool,
}

impl TransactionResponse {
    /// Classify from the peer's markers.
    ///
    /// The `pending` flag wins; otherwise a reported height confirms the
    /// transaction, and a missing height leaves it pending.
    pub fn inclusion(&self) -> TxInclusion {
        match (self.pending, self.block_height) {
            (false, Some(height)) => TxInclusion::Confirmed {
                height,
                timestamp: self.block_timestamp.unwrap_or_default(),
                confirmations: self.confirmations,
            },
            _ => TxInclusion::Pending {
                queued: self.pending_queued,
            },
        }
    }
}

/// Paged id reply.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdsResponse {
    /// Ids on the page.
    #[serde_as(as = "Vec<Hex>")]
    #[serde(default)]
    pub ids: Vec<Hash>,
    /// Index of the next page, absent on the last page.
    #[serde(default)]
    pub next: Option<u64>,
}
