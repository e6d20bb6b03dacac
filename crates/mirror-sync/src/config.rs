//! # Mirror Configuration
//!
//! Configuration for the mirror client.
//!
//! Every tunable that the client used to hard-code (lookback depth, page
//! sizes, poll intervals) lives here so that deployments can pick their own
//! policy.

use crate::domain::{BlockEncoding, ConsensusMode, NetworkType};
use serde::{Deserialize, Serialize};
use shared_types::OfferType;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default number of recent heights re-verified per reconciliation pass.
pub const DEFAULT_LOOKBACK_DEPTH: u64 = 15;

/// Default page size for paginated id requests.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Lookback depth must cover at least one height.
    #[error("lookback_depth cannot be 0")]
    ZeroLookback,

    /// A page or history limit is zero.
    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    /// The application identifier is empty.
    #[error("application_short cannot be empty")]
    EmptyApplication,

    /// The offers feed has nothing to poll.
    #[error("offer_types cannot be empty")]
    NoOfferTypes,
}

/// Mirror client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Application identifier; a peer announcing another one is dropped.
    pub application_short: String,

    /// Build version sent in the identity descriptor.
    pub build_version: String,

    /// Network this client expects to join.
    pub network_type: NetworkType,

    /// Consensus mode requested from the peer.
    pub consensus_mode: ConsensusMode,

    /// Number of recent heights re-verified per reconciliation pass.
    /// Reorgs deeper than this are not reconciled.
    pub lookback_depth: u64,

    /// Encoding requested for block bodies.
    pub block_encoding: BlockEncoding,

    /// Page size for mempool and offer id requests.
    pub page_size: u64,

    /// Upper bound on recent account transactions fetched per refresh.
    pub account_history_limit: u64,

    /// Mempool feed poll interval in milliseconds.
    pub mempool_poll_interval_ms: u64,

    /// Offers feed poll interval in milliseconds.
    pub offers_poll_interval_ms: u64,

    /// Offer categories polled by the offers feed.
    pub offer_types: Vec<OfferType>,

    /// Capacity of the event bus built by [`MirrorConfig::event_bus`].
    pub event_capacity: usize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            application_short: "PANDORA".to_string(),
            build_version: env!("CARGO_PKG_VERSION").to_string(),
            network_type: NetworkType::Testnet,
            consensus_mode: ConsensusMode::Rpc,
            lookback_depth: DEFAULT_LOOKBACK_DEPTH,
            block_encoding: BlockEncoding::Binary,
            page_size: DEFAULT_PAGE_SIZE,
            account_history_limit: 20,
            mempool_poll_interval_ms: 5_000,
            offers_poll_interval_ms: 10_000,
            offer_types: vec![0, 1],
            event_capacity: 1_000,
        }
    }
}

impl MirrorConfig {
    /// Create a config for testing (JSON blocks, small pages, fast polls).
    pub fn for_testing() -> Self {
        Self {
            block_encoding: BlockEncoding::Json,
            page_size: 2,
            account_history_limit: 4,
            mempool_poll_interval_ms: 20,
            offers_poll_interval_ms: 20,
            offer_types: vec![0],
            event_capacity: 256,
            ..Self::default()
        }
    }

    /// Build a config from the environment, falling back to defaults.
    ///
    /// # Environment Variables
    ///
    /// - `MIRROR_APP_SHORT`: application identifier (default: PANDORA)
    /// - `MIRROR_BUILD_VERSION`: advertised build (default: crate version)
    /// - `MIRROR_NETWORK`: mainnet / testnet / devnet (default: testnet)
    /// - `MIRROR_LOOKBACK_DEPTH`: reconciliation lookback (default: 15)
    /// - `MIRROR_PAGE_SIZE`: id page size (default: 20)
    /// - `MIRROR_MEMPOOL_POLL_MS`: mempool poll interval (default: 5000)
    /// - `MIRROR_OFFERS_POLL_MS`: offers poll interval (default: 10000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            application_short: env::var("MIRROR_APP_SHORT")
                .unwrap_or(defaults.application_short),

            build_version: env::var("MIRROR_BUILD_VERSION").unwrap_or(defaults.build_version),

            network_type: env::var("MIRROR_NETWORK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.network_type),

            lookback_depth: parse_env("MIRROR_LOOKBACK_DEPTH").unwrap_or(defaults.lookback_depth),

            page_size: parse_env("MIRROR_PAGE_SIZE").unwrap_or(defaults.page_size),

            mempool_poll_interval_ms: parse_env("MIRROR_MEMPOOL_POLL_MS")
                .unwrap_or(defaults.mempool_poll_interval_ms),

            offers_poll_interval_ms: parse_env("MIRROR_OFFERS_POLL_MS")
                .unwrap_or(defaults.offers_poll_interval_ms),

            ..defaults
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback_depth == 0 {
            return Err(ConfigError::ZeroLookback);
        }

        if self.page_size == 0 {
            return Err(ConfigError::InvalidLimit("page_size cannot be 0".into()));
        }

        if self.account_history_limit == 0 {
            return Err(ConfigError::InvalidLimit(
                "account_history_limit cannot be 0".into(),
            ));
        }

        if self.application_short.is_empty() {
            return Err(ConfigError::EmptyApplication);
        }

        if self.offer_types.is_empty() {
            return Err(ConfigError::NoOfferTypes);
        }

        Ok(())
    }

    /// Mempool poll interval.
    pub fn mempool_poll_interval(&self) -> Duration {
        Duration::from_millis(self.mempool_poll_interval_ms)
    }

    /// Offers poll interval.
    pub fn offers_poll_interval(&self) -> Duration {
        Duration::from_millis(self.offers_poll_interval_ms)
    }

    /// Event bus sized for this configuration.
    pub fn event_bus(&self) -> shared_bus::InMemoryEventBus {
        shared_bus::InMemoryEventBus::with_capacity(self.event_capacity)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
