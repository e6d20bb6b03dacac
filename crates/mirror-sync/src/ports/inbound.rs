//! # Inbound Ports
//!
//! API trait defining what the mirror client offers to its embedder.

use async_trait::async_trait;
use shared_types::{AccountSnapshot, Address, Hash};
use std::sync::Arc;

use crate::application::{AccountTransactions, Feed};
use crate::domain::{BlockRecord, FetchResult, MirrorError, ReconcileReport, SessionStatus, TransactionRecord};

/// Chain mirror API - inbound port.
///
/// Every fetching operation returns a [`FetchResult`]: `Ok(None)` when the
/// peer is unavailable, `Err` only when a reply failed to decode.
#[async_trait]
pub trait ChainMirrorApi: Send + Sync {
    /// Fetch the chain summary and run a reconciliation pass.
    ///
    /// No-op (`Ok(None)`) while another summary request is in flight.
    async fn request_chain_info(&self) -> FetchResult<ReconcileReport>;

    /// Block at a height, from cache or peer.
    async fn get_block_by_height(&self, height: u64) -> FetchResult<Arc<BlockRecord>>;

    /// Block with a hash, from cache or peer.
    async fn get_block_by_hash(&self, hash: Hash) -> FetchResult<Arc<BlockRecord>>;

    /// Transaction by hash; the cache answers only when its pending/confirmed
    /// classification matches `want_pending`.
    async fn get_transaction_by_hash(
        &self,
        hash: Hash,
        want_pending: bool,
    ) -> FetchResult<Arc<TransactionRecord>>;

    /// Atomically replace the tracked-address set.
    fn set_accounts(&self, addresses: &[String]) -> Result<Vec<Address>, MirrorError>;

    /// Fetch an account and apply the delta to the ledger.
    async fn download_account_data(&self, address: &Address) -> FetchResult<AccountSnapshot>;

    /// Fetch an account's recent confirmed and pending transactions.
    async fn download_account_transactions(
        &self,
        address: &Address,
    ) -> FetchResult<AccountTransactions>;

    /// Account nonce counting mempool transactions.
    async fn get_nonce_including_pending(&self, address: &Address) -> FetchResult<u64>;

    /// Start a feed. Returns `false` if it was already running.
    fn start_feed(self: Arc<Self>, feed: Feed) -> bool;

    /// Stop a feed after its in-flight request.
    fn stop_feed(&self, feed: Feed);

    /// Current session status.
    fn status(&self) -> SessionStatus;
}
