//! # Domain Entities
//!
//! Records cached by the entity mirror.

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{Address, CurrencyId, Hash, OfferType};
use std::collections::BTreeSet;

use super::value_objects::{DecodedBlock, DecodedOffer, DecodedTransaction};

/// Header agreed with the peer at one height of the lookback window.
///
/// Authoritative proxy for "do we agree with the peer at this height".
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderRecord {
    /// Block height.
    pub height: u64,
    /// Block hash.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
    /// Kernel hash.
    #[serde_as(as = "Hex")]
    pub kernel_hash: Hash,
}

impl BlockHeaderRecord {
    /// Create a header record.
    pub fn new(height: u64, hash: Hash, kernel_hash: Hash) -> Self {
        Self {
            height,
            hash,
            kernel_hash,
        }
    }
}

/// A decoded block owned by the mirror.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Block height.
    pub height: u64,
    /// Block hash.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
    /// Kernel hash.
    #[serde_as(as = "Hex")]
    pub kernel_hash: Hash,
    /// Block timestamp.
    pub timestamp: u64,
    /// Hashes of the contained transactions, in block order.
    #[serde_as(as = "Vec<Hex>")]
    pub tx_hashes: Vec<Hash>,
}

impl From<&DecodedBlock> for BlockRecord {
    fn from(block: &DecodedBlock) -> Self {
        Self {
            height: block.height,
            hash: block.hash,
            kernel_hash: block.kernel_hash,
            timestamp: block.timestamp,
            tx_hashes: block.transactions.iter().map(|tx| tx.hash).collect(),
        }
    }
}

/// Where a transaction currently stands.
///
/// A transaction is either pending or confirmed, never both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxInclusion {
    /// Known to the peer's mempool, not yet in a block.
    Pending {
        /// Whether the peer has queued it for the next block.
        queued: bool,
    },
    /// Included in a block.
    Confirmed {
        /// Block height.
        height: u64,
        /// Block timestamp.
        timestamp: u64,
        /// Confirmations as of the last answer.
        confirmations: u64,
    },
}

/// A decoded transaction plus inclusion metadata.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction hash.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
    /// Encoded transaction.
    #[serde_as(as = "Hex")]
    pub raw: Vec<u8>,
    /// Pending or confirmed.
    pub inclusion: TxInclusion,
}

impl TransactionRecord {
    /// Build a record from a decoded transaction.
    pub fn new(tx: DecodedTransaction, inclusion: TxInclusion) -> Self {
        Self {
            hash: tx.hash,
            raw: tx.raw,
            inclusion,
        }
    }

    /// Whether the transaction has no height yet.
    pub fn is_pending(&self) -> bool {
        matches!(self.inclusion, TxInclusion::Pending { .. })
    }

    /// Block height, for confirmed transactions.
    pub fn height(&self) -> Option<u64> {
        match self.inclusion {
            TxInclusion::Confirmed { height, .. } => Some(height),
            TxInclusion::Pending { .. } => None,
        }
    }
}

/// A decoded exchange offer; immutable once cached.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeOfferRecord {
    /// Offer hash.
    #[serde_as(as = "Hex")]
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

impl From<DecodedOffer> for ExchangeOfferRecord {
    fn from(offer: DecodedOffer) -> Self {
        Self {
            hash: offer.hash,
            offer_type: offer.offer_type,
            currency: offer.currency,
            amount: offer.amount,
            price: offer.price,
        }
    }
}

/// The set of tracked addresses.
///
/// Only ever replaced as a whole.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountWatch {
    addresses: BTreeSet<Address>,
}

impl AccountWatch {
    /// Create a watch over the given addresses.
    pub fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
        Self {
            addresses: addresses.into_iter().collect(),
        }
    }

    /// Whether the address is tracked.
    pub fn contains(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    /// Tracked addresses in order.
    pub fn addresses(&self) -> Vec<Address> {
        self.addresses.iter().cloned().collect()
    }

    /// Number of tracked addresses.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded_block() -> DecodedBlock {
        DecodedBlock {
            hash: [1u8; 32],
            kernel_hash: [2u8; 32],
            height: 7,
            timestamp: 1_700_000_000,
            transactions: vec![
                DecodedTransaction {
                    hash: [3u8; 32],
                    raw: vec![0xde],
                },
                DecodedTransaction {
                    hash: [4u8; 32],
                    raw: vec![0xad],
                },
            ],
        }
    }

    #[test]
    fn test_block_record_keeps_tx_order() {
        let record = BlockRecord::from(&decoded_block());
        assert_eq!(record.height, 7);
        assert_eq!(record.tx_hashes, vec![[3u8; 32], [4u8; 32]]);
    }

    #[test]
    fn test_transaction_inclusion() {
        let tx = DecodedTransaction {
            hash: [9u8; 32],
            raw: vec![],
        };
        let pending = TransactionRecord::new(tx.clone(), TxInclusion::Pending { queued: true });
        assert!(pending.is_pending());
        assert_eq!(pending.height(), None);

        let confirmed = TransactionRecord::new(
            tx,
            TxInclusion::Confirmed {
                height: 12,
                timestamp: 5,
                confirmations: 3,
            },
        );
        assert!(!confirmed.is_pending());
        assert_eq!(confirmed.height(), Some(12));
    }

    #[test]
    fn test_account_watch_deduplicates() {
        let watch = AccountWatch::new(vec![
            Address::new("b"),
            Address::new("a"),
            Address::new("b"),
        ]);
        assert_eq!(watch.len(), 2);
        assert_eq!(watch.addresses(), vec![Address::new("a"), Address::new("b")]);
        assert!(watch.contains(&Address::new("a")));
        assert!(!AccountWatch::default().contains(&Address::new("a")));
    }
}
