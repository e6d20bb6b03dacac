//! JSON encodings of blocks, transactions and offers.
//!
//! These are what a peer returns for `encoding: "json"`. The binary encoding
//! is left to an external decoder.

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{CurrencyId, Hash, OfferType};

use crate::domain::{DecodedBlock, DecodedOffer, DecodedTransaction, DecodeError};

/// JSON transaction.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonTransaction {
    /// Transaction hash.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
    /// Opaque body.
    #[serde_as(as = "Hex")]
    #[serde(default)]
    pub data: Vec<u8>,
}

impl JsonTransaction {
    /// Encoded form, as served in `tx/get-transaction` replies.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        serde_json::to_vec(self).map_err(|e| DecodeError::Transaction(e.to_string()))
    }

    /// Decode an encoded transaction, keeping the bytes as its raw form.
    pub fn decode(bytes: &[u8]) -> Result<DecodedTransaction, DecodeError> {
        let tx: JsonTransaction =
            serde_json::from_slice(bytes).map_err(|e| DecodeError::Transaction(e.to_string()))?;
        Ok(DecodedTransaction {
            hash: tx.hash,
            raw: bytes.to_vec(),
        })
    }
}

/// JSON block.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonBlock {
    /// Block hash.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
    /// Kernel hash.
    #[serde_as(as = "Hex")]
    pub kernel_hash: Hash,
    /// Height.
    pub height: u64,
    /// Timestamp.
    pub timestamp: u64,
    /// Transactions in block order.
    #[serde(default)]
    pub transactions: Vec<JsonTransaction>,
}

impl JsonBlock {
    /// Encoded form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        serde_json::to_vec(self).map_err(|e| DecodeError::Block(e.to_string()))
    }

    /// Decode an encoded block.
    pub fn decode(bytes: &[u8]) -> Result<DecodedBlock, DecodeError> {
        let block: JsonBlock =
            serde_json::from_slice(bytes).map_err(|e| DecodeError::Block(e.to_string()))?;

        let transactions = block
            .transactions
            .iter()
            .map(|tx| {
                Ok(DecodedTransaction {
                    hash: tx.hash,
                    raw: tx.to_bytes()?,
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        Ok(DecodedBlock {
            hash: block.hash,
            kernel_hash: block.kernel_hash,
            height: block.height,
            timestamp: block.timestamp,
            transactions,
        })
    }
}

/// JSON exchange offer.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonOffer {
    /// Offer hash.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
    /// Offer category.
    #[serde(rename = "type")]
    pub offer_type: OfferType,
    /// Traded currency.
    #[serde(default)]
    pub currency: CurrencyId,
    /// Amount.
    pub amount: u64,
    /// Unit price.
    pub price: u64,
}

impl JsonOffer {
    /// Encoded form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        serde_json::to_vec(self).map_err(|e| DecodeError::Offer(e.to_string()))
    }

    /// Decode an encoded offer.
    pub fn decode(bytes: &[u8]) -> Result<DecodedOffer, DecodeError> {
        let offer: JsonOffer =
            serde_json::from_slice(bytes).map_err(|e| DecodeError::Offer(e.to_string()))?;
        Ok(DecodedOffer {
            hash: offer.hash,
            offer_type: offer.offer_type,
            currency: offer.currency,
            amount: offer.amount,
            price: offer.price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_transactions_keep_served_bytes() {
        let tx = JsonTransaction {
            hash: [7u8; 32],
            data: vec![1, 2, 3],
        };
        let block = JsonBlock {
            hash: [1u8; 32],
            kernel_hash: [2u8; 32],
            height: 3,
            timestamp: 44,
            transactions: vec![tx.clone()],
        };

        let decoded = JsonBlock::decode(&block.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.height, 3);
        assert_eq!(decoded.transactions[0].raw, tx.to_bytes().unwrap());

        // The same transaction fetched on its own decodes identically.
        let single = JsonTransaction::decode(&tx.to_bytes().unwrap()).unwrap();
        assert_eq!(single, decoded.transactions[0]);
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        assert!(matches!(
            JsonBlock::decode(b"\x00\x01"),
            Err(DecodeError::Block(_))
        ));
        assert!(matches!(
            JsonOffer::decode(b"{}"),
            Err(DecodeError::Offer(_))
        ));
    }
}
