//! # Mirror Sync
//!
//! Light client that mirrors a remote peer's chain state (headers, blocks,
//! transactions, mempool, exchange offers) over an asynchronous
//! request/event channel, tolerating reorganizations within a bounded
//! lookback window.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Flow
//!
//! ```text
//! connect ──► handshake ──► chain summary ──► reconciliation ──► events
//!                                 ▲
//!                   new-block ────┘
//!
//! mempool / offers feeds run independently and also update the mirror
//! ```
//!
//! ## Guarantees
//!
//! | Property | Where |
//! |----------|-------|
//! | Nothing is requested before an accepted handshake | `application::session` |
//! | A cached block is only served while it matches its header | `domain::mirror` |
//! | Eviction happens only as an explicit rollback step | `application::reconcile` |
//! | Pending and confirmed are mutually exclusive | `domain::TxInclusion` |
//! | "Nothing yet" is never an error | `domain::FetchResult` |
//!
//! ## Module Structure
//!
//! ```text
//! mirror-sync/
//! ├── domain/          # Records, entity mirror, errors, invariants
//! ├── algorithms/      # Scan window, ledger delta
//! ├── protocol/        # Commands and request/response schemas
//! ├── ports/           # API trait (inbound) + collaborator traits (outbound)
//! ├── application/     # MirrorClient: session, reconcile, resolve, accounts, feeds
//! ├── adapters/        # Channel transport, JSON decoder, ledger, address codec
//! └── config.rs        # MirrorConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod protocol;

// Re-exports
pub use adapters::{ChannelTransport, HexAddressCodec, InMemoryLedger, JsonDecoder, OutboundMessage};
pub use algorithms::{compute_delta, LedgerDelta, ScanWindow};
pub use application::{AccountTransactions, Feed, MirrorClient};
pub use config::{ConfigError, MirrorConfig, DEFAULT_LOOKBACK_DEPTH, DEFAULT_PAGE_SIZE};
pub use domain::{
    BlockHeaderRecord, BlockRecord, DecodeError, EntityMirror, ExchangeOfferRecord, FetchResult,
    MirrorError, ReconcileReport, SessionStatus, TransactionRecord, TxInclusion,
};
pub use ports::{
    AddressCodec, ChainMirrorApi, Decoder, Ledger, MockPeer, MockPeerState, PeerEvent,
    PeerTransport,
};
pub use protocol::Command;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
