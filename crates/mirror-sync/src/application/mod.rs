//! # Application Module
//!
//! The mirror client service: session handling, reconciliation, resolution,
//! account tracking and feeds, all as methods of [`MirrorClient`].

mod accounts;
mod feeds;
mod reconcile;
mod resolve;
pub mod service;
mod session;

pub use accounts::AccountTransactions;
pub use feeds::{Feed, FeedControl};
pub use service::MirrorClient;
pub use session::SessionFlags;
