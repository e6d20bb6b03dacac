//! # Integration Tests
//!
//! End-to-end behaviour of the mirror client against a scripted peer.

pub mod properties;
pub mod scenarios;
pub mod transport;
