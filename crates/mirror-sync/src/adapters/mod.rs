//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implementations of the outbound ports:
//!
//! | Adapter | Port |
//! |---------|------|
//! | [`ChannelTransport`] | `PeerTransport` |
//! | [`JsonDecoder`] | `Decoder` |
//! | [`InMemoryLedger`] | `Ledger` |
//! | [`HexAddressCodec`] | `AddressCodec` |

mod address_codec;
mod channel_transport;
mod json_decoder;
mod ledger;

pub use address_codec::HexAddressCodec;
pub use channel_transport::{ChannelTransport, OutboundMessage, DEFAULT_REQUEST_TIMEOUT};
pub use json_decoder::JsonDecoder;
pub use ledger::InMemoryLedger;
