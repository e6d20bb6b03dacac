//! Prometheus metrics for the mirror client.
//!
//! All metrics follow the naming convention: `mirror_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., blocks_downloaded_total)
//! - **Gauge**: Value that can go up or down (e.g., tip_height)

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // PEER METRICS
    // =========================================================================

    /// Requests issued to the peer, by command
    pub static ref PEER_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("mirror_peer_requests_total", "Requests issued to the peer"),
        &["command"]
    ).expect("metric creation failed");

    /// Requests that came back empty (peer unavailable)
    pub static ref PEER_UNAVAILABLE: Counter = Counter::new(
        "mirror_peer_unavailable_total",
        "Peer requests answered with no data"
    ).expect("metric creation failed");

    /// Session status (0 offline, 1 online, 2 syncing, 3 synced)
    pub static ref SESSION_STATUS: Gauge = Gauge::new(
        "mirror_session_status",
        "Current session status code"
    ).expect("metric creation failed");

    // =========================================================================
    // CHAIN METRICS
    // =========================================================================

    /// Latest reported tip height
    pub static ref TIP_HEIGHT: Gauge = Gauge::new(
        "mirror_tip_height",
        "Tip height of the latest chain summary"
    ).expect("metric creation failed");

    /// Reconciliation passes started
    pub static ref RECONCILIATION_PASSES: Counter = Counter::new(
        "mirror_reconciliation_passes_total",
        "Reconciliation passes started"
    ).expect("metric creation failed");

    /// Blocks fetched and cached
    pub static ref BLOCKS_DOWNLOADED: Counter = Counter::new(
        "mirror_blocks_downloaded_total",
        "Blocks fetched, decoded and cached"
    ).expect("metric creation failed");

    /// Blocks rolled back
    pub static ref BLOCKS_REMOVED: Counter = Counter::new(
        "mirror_blocks_removed_total",
        "Cached blocks evicted by a rollback"
    ).expect("metric creation failed");

    /// Transactions fetched and cached
    pub static ref TRANSACTIONS_DOWNLOADED: Counter = Counter::new(
        "mirror_transactions_downloaded_total",
        "Transactions cached from blocks or direct fetches"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Calling this twice reports the duplicate registration as an error.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Peer
        Box::new(PEER_REQUESTS.clone()),
        Box::new(PEER_UNAVAILABLE.clone()),
        Box::new(SESSION_STATUS.clone()),
        // Chain
        Box::new(TIP_HEIGHT.clone()),
        Box::new(RECONCILIATION_PASSES.clone()),
        Box::new(BLOCKS_DOWNLOADED.clone()),
        Box::new(BLOCKS_REMOVED.clone()),
        Box::new(TRANSACTIONS_DOWNLOADED.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
