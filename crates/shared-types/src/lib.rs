//! # Shared Types Crate
//!
//! Chain primitives shared by the event bus (`shared-bus`) and the mirror
//! client (`mirror-sync`).
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Every type that crosses a crate boundary
//!   (event payloads, ledger snapshots) is defined here.
//! - **Hex on the wire**: Hashes, addresses and currency identifiers are
//!   carried as lowercase hex strings in every JSON document.

pub mod encoding;
pub mod entities;

pub use encoding::{decode_fixed, short_hex, HexError};
pub use entities::*;
