//! # Chain-Mirror Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Client construction over a scripted peer
//! └── integration/
//!     ├── scenarios.rs  # Reorg, identity mismatch, duplicate feed start
//!     ├── properties.rs # Short-circuit, reorg, idempotence, ledger delta, disjointness
//!     └── transport.rs  # Full session over the channel transport
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p mirror-tests
//!
//! # By category
//! cargo test -p mirror-tests integration::scenarios::
//! cargo test -p mirror-tests integration::properties::
//!
//! # Benchmarks
//! cargo bench -p mirror-tests
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
