//! # Mirror Client
//!
//! Application service owning the entity mirror and driving every round
//! trip to the peer.
//!
//! The behaviour is split by concern:
//!
//! | File | Concern |
//! |------|---------|
//! | `session.rs` | connection lifecycle and handshake gating |
//! | `reconcile.rs` | bounded-lookback reconciliation |
//! | `resolve.rs` | block and transaction resolution |
//! | `accounts.rs` | tracked accounts and ledger deltas |
//! | `feeds.rs` | mempool and exchange-offer feeds |

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_bus::{EventPublisher, MirrorEvent};
use shared_types::{AccountSnapshot, Address, ChainSummary, GenesisInfo, Hash, OfferType};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, trace};

use mirror_telemetry::metrics::{PEER_REQUESTS, PEER_UNAVAILABLE};

use super::accounts::AccountTransactions;
use super::feeds::{Feed, FeedControl};
use super::session::SessionFlags;
use crate::config::MirrorConfig;
use crate::domain::{
    BlockHeaderRecord, BlockRecord, EntityMirror, ExchangeOfferRecord, FetchResult, MirrorError,
    ReconcileReport, SessionStatus, TransactionRecord,
};
use crate::ports::{AddressCodec, ChainMirrorApi, Decoder, Ledger, PeerTransport};
use crate::protocol::{parse_reply, Command};

/// Mirror client - keeps a local mirror of a remote peer's chain.
pub struct MirrorClient {
    /// Configuration.
    pub(crate) config: MirrorConfig,
    /// Peer transport.
    pub(crate) transport: Arc<dyn PeerTransport>,
    /// Block/transaction/offer decoder.
    pub(crate) decoder: Arc<dyn Decoder>,
    /// Account ledger.
    pub(crate) ledger: Arc<dyn Ledger>,
    /// Address codec.
    pub(crate) codec: Arc<dyn AddressCodec>,
    /// Event bus.
    pub(crate) events: Arc<dyn EventPublisher>,
    /// Entity cache. Never held across an await.
    pub(crate) mirror: RwLock<EntityMirror>,
    /// Session status.
    pub(crate) status: watch::Sender<SessionStatus>,
    /// Per-connection flags.
    pub(crate) session: SessionFlags,
    /// One reconciliation pass at a time.
    pub(crate) reconcile_lock: Mutex<()>,
    /// Mempool feed.
    pub(crate) mempool: FeedControl,
    /// Offers feed.
    pub(crate) offers: FeedControl,
}

impl MirrorClient {
    /// Create a client over its collaborators.
    ///
    /// # Errors
    /// - `MirrorError::Config` if the configuration does not validate
    pub fn new(
        config: MirrorConfig,
        transport: Arc<dyn PeerTransport>,
        decoder: Arc<dyn Decoder>,
        ledger: Arc<dyn Ledger>,
        codec: Arc<dyn AddressCodec>,
        events: Arc<dyn EventPublisher>,
    ) -> Result<Self, MirrorError> {
        config.validate()?;
        let (status, _) = watch::channel(SessionStatus::Offline);

        Ok(Self {
            config,
            transport,
            decoder,
            ledger,
            codec,
            events,
            mirror: RwLock::new(EntityMirror::new()),
            status,
            session: SessionFlags::default(),
            reconcile_lock: Mutex::new(()),
            mempool: FeedControl::default(),
            offers: FeedControl::default(),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    // =========================================================================
    // INTROSPECTION
    // =========================================================================

    /// Current session status.
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Observe session status changes.
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Last chain summary.
    pub fn chain_summary(&self) -> Option<ChainSummary> {
        self.mirror.read().summary().cloned()
    }

    /// Genesis descriptor, once retrieved.
    pub fn genesis(&self) -> Option<GenesisInfo> {
        self.mirror.read().genesis().cloned()
    }

    /// Header record at `height`.
    pub fn header_at(&self, height: u64) -> Option<BlockHeaderRecord> {
        self.mirror.read().header(height)
    }

    /// Number of cached blocks.
    pub fn cached_block_count(&self) -> usize {
        self.mirror.read().block_count()
    }

    /// Cached transaction, without contacting the peer.
    pub fn cached_transaction(&self, hash: &Hash) -> Option<Arc<TransactionRecord>> {
        self.mirror.read().transaction(hash)
    }

    /// Cached offer.
    pub fn offer(&self, hash: &Hash, offer_type: OfferType) -> Option<Arc<ExchangeOfferRecord>> {
        self.mirror.read().offer(hash, offer_type)
    }

    /// Number of cached offers.
    pub fn cached_offer_count(&self) -> usize {
        self.mirror.read().offer_count()
    }

    /// Tracked addresses.
    pub fn tracked_accounts(&self) -> Vec<Address> {
        self.mirror.read().tracked_accounts()
    }

    // =========================================================================
    // PEER PRIMITIVES
    // =========================================================================

    /// Issue a request and return the raw reply.
    ///
    /// An absent or empty reply is `Ok(None)`.
    pub(crate) async fn fetch_raw<P: Serialize + Sync>(
        &self,
        command: Command,
        payload: &P,
    ) -> FetchResult<Vec<u8>> {
        let payload = serde_json::to_value(payload).map_err(|e| MirrorError::Encode {
            command: command.as_str(),
            reason: e.to_string(),
        })?;

        PEER_REQUESTS.with_label_values(&[command.as_str()]).inc();
        trace!(command = command.as_str(), "[mirror] Request");

        match self.transport.request(command, payload).await {
            Some(bytes) if !bytes.is_empty() => Ok(Some(bytes)),
            _ => {
                PEER_UNAVAILABLE.inc();
                debug!(command = command.as_str(), "[mirror] Peer returned nothing");
                Ok(None)
            }
        }
    }

    /// Issue a request and parse the JSON reply against its schema.
    pub(crate) async fn fetch_json<P, T>(&self, command: Command, payload: &P) -> FetchResult<T>
    where
        P: Serialize + Sync,
        T: DeserializeOwned,
    {
        let Some(bytes) = self.fetch_raw(command, payload).await? else {
            return Ok(None);
        };

        let parsed = parse_reply(command, &bytes)?;
        if parsed.is_none() {
            PEER_UNAVAILABLE.inc();
            debug!(command = command.as_str(), "[mirror] Peer has no data yet");
        }
        Ok(parsed)
    }

    /// Publish an event to observers.
    pub(crate) async fn publish(&self, event: MirrorEvent) {
        let name = event.name();
        let receivers = self.events.publish(event).await;
        trace!(event = name, receivers, "[mirror] Event published");
    }
}

#[async_trait]
impl ChainMirrorApi for MirrorClient {
    async fn request_chain_info(&self) -> FetchResult<ReconcileReport> {
        MirrorClient::request_chain_info(self).await
    }

    async fn get_block_by_height(&self, height: u64) -> FetchResult<Arc<BlockRecord>> {
        MirrorClient::get_block_by_height(self, height).await
    }

    async fn get_block_by_hash(&self, hash: Hash) -> FetchResult<Arc<BlockRecord>> {
        MirrorClient::get_block_by_hash(self, hash).await
    }

    async fn get_transaction_by_hash(
        &self,
        hash: Hash,
        want_pending: bool,
    ) -> FetchResult<Arc<TransactionRecord>> {
        MirrorClient::get_transaction_by_hash(self, hash, want_pending).await
    }

    fn set_accounts(&self, addresses: &[String]) -> Result<Vec<Address>, MirrorError> {
        MirrorClient::set_accounts(self, addresses)
    }

    async fn download_account_data(&self, address: &Address) -> FetchResult<AccountSnapshot> {
        MirrorClient::download_account_data(self, address).await
    }

    async fn download_account_transactions(
        &self,
        address: &Address,
    ) -> FetchResult<AccountTransactions> {
        MirrorClient::download_account_transactions(self, address).await
    }

    async fn get_nonce_including_pending(&self, address: &Address) -> FetchResult<u64> {
        MirrorClient::get_nonce_including_pending(self, address).await
    }

    fn start_feed(self: Arc<Self>, feed: Feed) -> bool {
        MirrorClient::start_feed(&self, feed)
    }

    fn stop_feed(&self, feed: Feed) {
        MirrorClient::stop_feed(self, feed)
    }

    fn status(&self) -> SessionStatus {
        MirrorClient::status(self)
    }
}
