//! Request payloads, one per command.

use serde::Serialize;
use serde_with::{hex::Hex, serde_as};
use shared_types::{Address, Hash, OfferType};

use crate::domain::BlockEncoding;

/// Payload of commands that take no argument.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct EmptyRequest {}

/// `chain/get-block-header`
#[derive(Clone, Copy, Debug, Serialize)]
pub struct HeaderRequest {
    /// Height.
    pub height: u64,
}

/// `chain/get-block-by-height`
#[derive(Clone, Copy, Debug, Serialize)]
pub struct BlockByHeightRequest {
    /// Height.
    pub height: u64,
    /// Requested encoding.
    pub encoding: BlockEncoding,
}

/// `chain/get-block-by-hash`
#[serde_as]
#[derive(Clone, Copy, Debug, Serialize)]
pub struct BlockByHashRequest {
    /// Block hash.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
    /// Requested encoding.
    pub encoding: BlockEncoding,
}

/// Account-scoped commands taking only an address.
#[derive(Clone, Debug, Serialize)]
pub struct AddressRequest {
    /// Account address.
    pub address: Address,
}

/// `tx/get-transaction`
#[serde_as]
#[derive(Clone, Copy, Debug, Serialize)]
pub struct TransactionRequest {
    /// Transaction hash.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
}

/// Paged id requests (`tx/account-transaction-ids`, `mempool/content-ids`).
#[derive(Clone, Debug, Serialize)]
pub struct IdsPageRequest {
    /// Account scope; `None` means the whole mempool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// First index of the page.
    pub index: u64,
    /// Page length.
    pub limit: u64,
}

/// `mempool/content-count`
#[derive(Clone, Debug, Default, Serialize)]
pub struct MempoolCountRequest {
    /// Account scope; `None` means the whole mempool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

/// `offers/content-count`
#[derive(Clone, Copy, Debug, Serialize)]
pub struct OffersCountRequest {
    /// Offer category.
    #[serde(rename = "type")]
    pub offer_type: OfferType,
}

/// `offers/content-ids`
#[derive(Clone, Copy, Debug, Serialize)]
pub struct OffersIdsRequest {
    /// Offer category.
    #[serde(rename = "type")]
    pub offer_type: OfferType,
    /// First index of the page.
    pub index: u64,
    /// Page length.
    pub limit: u64,
}

/// `offers/get-offer`
#[serde_as]
#[derive(Clone, Copy, Debug, Serialize)]
pub struct OfferRequest {
    /// Offer hash.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
    /// Offer category.
    #[serde(rename = "type")]
    pub offer_type: OfferType,
}
