//! JSON Decoder Adapter
//!
//! Implements `Decoder` for peers serving the JSON block encoding.

use crate::domain::{BlockEncoding, DecodeError, DecodedBlock, DecodedOffer, DecodedTransaction};
use crate::ports::outbound::Decoder;
use crate::protocol::{JsonBlock, JsonOffer, JsonTransaction};

/// Decoder for JSON-encoded blocks, transactions and offers.
///
/// Binary blocks need a decoder that understands the chain's wire format.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode_block(
        &self,
        bytes: &[u8],
        encoding: BlockEncoding,
    ) -> Result<DecodedBlock, DecodeError> {
        match encoding {
            BlockEncoding::Json => JsonBlock::decode(bytes),
            BlockEncoding::Binary => Err(DecodeError::Block(
                "binary blocks need an external decoder".to_string(),
            )),
        }
    }

    fn decode_transaction(&self, bytes: &[u8]) -> Result<DecodedTransaction, DecodeError> {
        JsonTransaction::decode(bytes)
    }

    fn decode_offer(&self, bytes: &[u8]) -> Result<DecodedOffer, DecodeError> {
        JsonOffer::decode(bytes)
    }
}
