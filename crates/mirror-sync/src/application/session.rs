//! # Session State Machine
//!
//! `offline -> online -> syncing -> synced`.
//!
//! `online`/`offline` follow the transport. The deeper states are reached
//! only after the peer's handshake is accepted on the current connection,
//! and are discarded on disconnect.

use serde_json::Value;
use shared_bus::MirrorEvent;
use shared_types::{ChainSummary, GenesisInfo};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use mirror_telemetry::log_peer_event;
use mirror_telemetry::metrics::{SESSION_STATUS, TIP_HEIGHT};

use super::service::MirrorClient;
use crate::domain::{
    invariant_same_application, DecodeError, FetchResult, IdentityDescriptor,
    MirrorError, NetworkDescriptor, ReconcileReport, SessionStatus,
};
use crate::ports::PeerEvent;
use crate::protocol::{
    parse_reply, ChainInfoResponse, Command, EmptyRequest, GenesisResponse, EMIT_HANDSHAKE,
    EMIT_READY, READY_PAYLOAD,
};

/// Per-connection session flags.
#[derive(Debug, Default)]
pub struct SessionFlags {
    /// Bumped on every connect and disconnect.
    epoch: AtomicU64,
    /// The handshake of the current connection was seen.
    handshake_seen: AtomicBool,
    /// Token of the outstanding chain summary request, 0 when idle.
    info_in_flight: AtomicU64,
    /// Token of the outstanding genesis request, 0 when idle.
    genesis_in_flight: AtomicU64,
}

impl SessionFlags {
    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn next_epoch(&self) -> u64 {
        self.handshake_seen.store(false, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// In-flight guard tagged with the connection epoch.
///
/// A request left over from an earlier epoch does not block a new one; the
/// new request takes the slot over and the stale guard leaves it alone when
/// dropped.
struct InFlight<'a> {
    slot: &'a AtomicU64,
    token: u64,
}

impl<'a> InFlight<'a> {
    fn try_acquire(slot: &'a AtomicU64, epoch: u64) -> Option<Self> {
        let token = epoch.wrapping_add(1).max(1);
        let mut current = slot.load(Ordering::SeqCst);
        loop {
            if current == token {
                return None;
            }
            match slot.compare_exchange(current, token, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return Some(Self { slot, token }),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let _ = self
            .slot
            .compare_exchange(self.token, 0, Ordering::SeqCst, Ordering::SeqCst);
    }
}

impl MirrorClient {
    /// Drain push events until the transport drops its sender.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<PeerEvent>) {
        info!(peer = self.transport.peer_address(), "[mirror] Session loop started");
        while let Some(event) = events.recv().await {
            self.handle_peer_event(event).await;
        }
        debug!("[mirror] Peer event channel closed");
    }

    /// Handle one push event.
    pub async fn handle_peer_event(&self, event: PeerEvent) {
        match event {
            PeerEvent::Connected => self.on_connected(),
            PeerEvent::Disconnected => self.on_disconnected(),
            PeerEvent::Handshake(bytes) => self.on_handshake(&bytes).await,
            PeerEvent::NewBlock(bytes) => self.on_new_block(&bytes).await,
        }
    }

    /// Identity descriptor sent on connect.
    pub fn identity(&self) -> IdentityDescriptor {
        IdentityDescriptor {
            short: self.config.application_short.clone(),
            build: self.config.build_version.clone(),
            net: NetworkDescriptor {
                network_type: self.config.network_type,
            },
            address: String::new(),
            consensus: self.config.consensus_mode,
        }
    }

    pub(crate) fn set_status(&self, status: SessionStatus) {
        let previous = self.status.send_replace(status);
        SESSION_STATUS.set(f64::from(status.code()));
        if previous != status {
            info!(from = ?previous, to = ?status, "[mirror] Session status changed");
        }
    }

    fn mark_synced(&self, epoch: u64) {
        if self.session.epoch() != epoch {
            return;
        }
        let changed = self.status.send_if_modified(|status| {
            if *status == SessionStatus::Syncing {
                *status = SessionStatus::Synced;
                return true;
            }
            false
        });
        if changed {
            SESSION_STATUS.set(f64::from(SessionStatus::Synced.code()));
            info!("[mirror] Session synced");
        }
    }

    fn on_connected(&self) {
        self.session.next_epoch();
        self.set_status(SessionStatus::Online);
        log_peer_event!(info, "session", "Connected", self.transport.peer_address());

        match serde_json::to_value(self.identity()) {
            Ok(payload) => self.transport.emit(EMIT_HANDSHAKE, payload),
            Err(e) => warn!(error = %e, "[mirror] Cannot encode identity"),
        }
    }

    fn on_disconnected(&self) {
        self.session.next_epoch();
        self.set_status(SessionStatus::Offline);
        log_peer_event!(info, "session", "Disconnected", self.transport.peer_address());
    }

    async fn on_handshake(&self, bytes: &[u8]) {
        if self.status() == SessionStatus::Offline {
            debug!("[mirror] Handshake while offline ignored");
            return;
        }
        if self.session.handshake_seen.swap(true, Ordering::SeqCst) {
            debug!("[mirror] Repeated handshake ignored");
            return;
        }

        let accepted = serde_json::from_slice::<IdentityDescriptor>(bytes)
            .map_err(|e| {
                MirrorError::from(DecodeError::Schema {
                    command: EMIT_HANDSHAKE,
                    reason: e.to_string(),
                })
            })
            .and_then(|peer| invariant_same_application(&self.config.application_short, &peer));

        if let Err(err) = accepted {
            log_peer_event!(
                warn,
                "session",
                "Rejecting peer",
                self.transport.peer_address(),
                error = %err
            );
            self.transport.close();
            self.session.next_epoch();
            self.set_status(SessionStatus::Offline);
            return;
        }

        let epoch = self.session.epoch();
        self.set_status(SessionStatus::Syncing);
        self.transport.emit(EMIT_READY, Value::from(READY_PAYLOAD));

        if let Err(err) = self.download_genesis().await {
            warn!(error = %err, "[mirror] Genesis retrieval failed");
        }
        match self.fetch_chain_info().await {
            Ok(Some(_)) => self.mark_synced(epoch),
            Ok(None) => debug!("[mirror] Chain summary not available yet"),
            Err(err) => warn!(error = %err, "[mirror] Chain summary rejected"),
        }
    }

    async fn on_new_block(&self, bytes: &[u8]) {
        if !self.status().is_handshaken() {
            debug!("[mirror] New block before handshake ignored");
            return;
        }
        let epoch = self.session.epoch();

        let summary = parse_reply::<ChainInfoResponse>(Command::ChainGetInfo, bytes)
            .and_then(|info| info.map(ChainInfoResponse::into_summary).transpose());
        let summary = match summary {
            Ok(Some(summary)) => summary,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "[mirror] Malformed new-block push");
                return;
            }
        };

        match self.process_chain_info(summary).await {
            Ok(_) => self.mark_synced(epoch),
            Err(err) => warn!(error = %err, "[mirror] New block reconciliation failed"),
        }
    }

    /// Request the chain summary and run a reconciliation pass.
    ///
    /// A second call while one is outstanding is a no-op.
    pub async fn request_chain_info(&self) -> FetchResult<ReconcileReport> {
        let epoch = self.session.epoch();
        let report = self.fetch_chain_info().await?;
        if report.is_some() {
            self.mark_synced(epoch);
        }
        Ok(report)
    }

    async fn fetch_chain_info(&self) -> FetchResult<ReconcileReport> {
        let Some(_in_flight) = InFlight::try_acquire(&self.session.info_in_flight, self.session.epoch()) else {
            debug!("[mirror] Chain summary request already in flight");
            return Ok(None);
        };

        let Some(info) = self
            .fetch_json::<_, ChainInfoResponse>(Command::ChainGetInfo, &EmptyRequest {})
            .await?
        else {
            return Ok(None);
        };

        let summary = info.into_summary()?;
        self.process_chain_info(summary).await.map(Some)
    }

    /// Replace the summary, reconcile, then refresh tracked accounts.
    pub(crate) async fn process_chain_info(
        &self,
        summary: ChainSummary,
    ) -> Result<ReconcileReport, MirrorError> {
        let tip = summary.tip_height;
        self.mirror.write().set_summary(summary.clone());
        TIP_HEIGHT.set(tip as f64);
        info!(tip_height = tip, "[mirror] Chain summary updated");
        self.publish(MirrorEvent::ChainInfoUpdated(summary)).await;

        let report = self.reconcile().await?;
        self.refresh_accounts().await;
        Ok(report)
    }

    /// Retrieve the genesis descriptor once.
    pub async fn download_genesis(&self) -> FetchResult<GenesisInfo> {
        let Some(_in_flight) = InFlight::try_acquire(&self.session.genesis_in_flight, self.session.epoch()) else {
            return Ok(None);
        };

        let cached = self.mirror.read().genesis().cloned();
        if cached.is_some() {
            return Ok(cached);
        }

        let Some(genesis) = self
            .fetch_json::<_, GenesisResponse>(Command::ChainGetGenesis, &EmptyRequest {})
            .await?
        else {
            return Ok(None);
        };

        self.mirror.write().set_genesis(genesis.clone());
        self.publish(MirrorEvent::GenesisUpdated(genesis.clone())).await;
        Ok(Some(genesis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{HexAddressCodec, InMemoryLedger, JsonDecoder};
    use crate::config::MirrorConfig;
    use crate::ports::MockPeer;
    use shared_bus::InMemoryEventBus;

    fn client(peer: Arc<MockPeer>) -> MirrorClient {
        MirrorClient::new(
            MirrorConfig::for_testing(),
            peer,
            Arc::new(JsonDecoder),
            Arc::new(InMemoryLedger::new()),
            Arc::new(HexAddressCodec::default()),
            Arc::new(InMemoryEventBus::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_connect_emits_identity() {
        let peer = Arc::new(MockPeer::new());
        let client = client(peer.clone());

        client.handle_peer_event(PeerEvent::Connected).await;

        assert_eq!(client.status(), SessionStatus::Online);
        let emits = peer.emits();
        assert_eq!(emits.len(), 1);
        assert_eq!(emits[0].0, "handshake");
        assert_eq!(emits[0].1["short"], "PANDORA");
        assert_eq!(emits[0].1["consensus"], "rpc");
        // Nothing is requested before the handshake.
        assert_eq!(peer.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_accepted_handshake_syncs() {
        let peer = Arc::new(MockPeer::new());
        peer.build_chain(5, 1, 0);
        let client = client(peer.clone());

        client.handle_peer_event(PeerEvent::Connected).await;
        client
            .handle_peer_event(PeerEvent::Handshake(MockPeer::identity_bytes("PANDORA")))
            .await;

        assert_eq!(client.status(), SessionStatus::Synced);
        assert!(peer
            .emits()
            .iter()
            .any(|(name, payload)| name == "ready!" && payload == "go!"));
        assert_eq!(peer.request_count(Command::ChainGetInfo), 1);
        assert_eq!(peer.request_count(Command::ChainGetGenesis), 1);
        assert_eq!(client.chain_summary().unwrap().tip_height, 5);
    }

    #[tokio::test]
    async fn test_mismatched_handshake_closes() {
        let peer = Arc::new(MockPeer::new());
        peer.build_chain(5, 1, 0);
        let client = client(peer.clone());

        client.handle_peer_event(PeerEvent::Connected).await;
        client
            .handle_peer_event(PeerEvent::Handshake(MockPeer::identity_bytes("OTHER")))
            .await;

        assert_eq!(peer.close_count(), 1);
        assert_eq!(client.status(), SessionStatus::Offline);
        assert_eq!(peer.request_count(Command::ChainGetInfo), 0);
    }

    #[tokio::test]
    async fn test_malformed_handshake_closes() {
        let peer = Arc::new(MockPeer::new());
        let client = client(peer.clone());

        client.handle_peer_event(PeerEvent::Connected).await;
        client
            .handle_peer_event(PeerEvent::Handshake(b"not json".to_vec()))
            .await;

        assert_eq!(peer.close_count(), 1);
        assert_eq!(client.status(), SessionStatus::Offline);
    }

    #[tokio::test]
    async fn test_handshake_is_one_time_per_connection() {
        let peer = Arc::new(MockPeer::new());
        peer.build_chain(3, 1, 0);
        let client = client(peer.clone());

        client.handle_peer_event(PeerEvent::Connected).await;
        let identity = MockPeer::identity_bytes("PANDORA");
        client
            .handle_peer_event(PeerEvent::Handshake(identity.clone()))
            .await;
        client.handle_peer_event(PeerEvent::Handshake(identity)).await;

        assert_eq!(peer.request_count(Command::ChainGetInfo), 1);
    }

    #[tokio::test]
    async fn test_disconnect_discards_sync_state() {
        let peer = Arc::new(MockPeer::new());
        peer.build_chain(3, 1, 0);
        let client = client(peer.clone());

        client.handle_peer_event(PeerEvent::Connected).await;
        client
            .handle_peer_event(PeerEvent::Handshake(MockPeer::identity_bytes("PANDORA")))
            .await;
        client.handle_peer_event(PeerEvent::Disconnected).await;
        assert_eq!(client.status(), SessionStatus::Offline);

        // A new block after reconnecting but before the handshake is ignored.
        client.handle_peer_event(PeerEvent::Connected).await;
        client
            .handle_peer_event(PeerEvent::NewBlock(peer.chain_info_bytes()))
            .await;
        assert_eq!(client.status(), SessionStatus::Online);
        assert_eq!(peer.request_count(Command::ChainGetInfo), 1);

        // The handshake starts again from scratch.
        client
            .handle_peer_event(PeerEvent::Handshake(MockPeer::identity_bytes("PANDORA")))
            .await;
        assert_eq!(client.status(), SessionStatus::Synced);
        assert_eq!(peer.request_count(Command::ChainGetInfo), 2);
    }

    #[tokio::test]
    async fn test_chain_info_in_flight_guard() {
        let peer = Arc::new(MockPeer::new());
        peer.build_chain(3, 1, 0);
        peer.with_state(|s| s.delay = Some(std::time::Duration::from_millis(30)));
        let client = client(peer.clone());

        let (first, second) = tokio::join!(client.request_chain_info(), client.request_chain_info());
        let completed = [first.unwrap(), second.unwrap()]
            .iter()
            .filter(|r| r.is_some())
            .count();
        assert_eq!(completed, 1);
        assert_eq!(peer.request_count(Command::ChainGetInfo), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_request_does_not_block_next_handshake() {
        let peer = Arc::new(MockPeer::new());
        peer.build_chain(8, 1, 0);
        peer.with_state(|s| {
            s.genesis = Some(GenesisInfo {
                hash: [7u8; 32],
                timestamp: 1_500_000_000,
            });
            s.delay = Some(std::time::Duration::from_millis(50));
        });
        let client = client(peer.clone());
        client.download_genesis().await.unwrap();
        client.handle_peer_event(PeerEvent::Connected).await;

        // A request issued on the first connection is still outstanding
        // when the peer reconnects and handshakes.
        let (stale, ()) = tokio::join!(client.request_chain_info(), async {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            client.handle_peer_event(PeerEvent::Disconnected).await;
            client.handle_peer_event(PeerEvent::Connected).await;
            client
                .handle_peer_event(PeerEvent::Handshake(MockPeer::identity_bytes("PANDORA")))
                .await;
        });

        assert!(stale.unwrap().is_some());
        assert_eq!(client.status(), SessionStatus::Synced);
        assert_eq!(peer.request_count(Command::ChainGetInfo), 2);
    }

    #[test]
    fn test_in_flight_slot_is_per_epoch() {
        let slot = AtomicU64::new(0);
        let first = InFlight::try_acquire(&slot, 1);
        assert!(first.is_some());
        assert!(InFlight::try_acquire(&slot, 1).is_none());

        let second = InFlight::try_acquire(&slot, 2);
        assert!(second.is_some());
        drop(first);
        assert!(InFlight::try_acquire(&slot, 2).is_none());
        drop(second);
        assert!(InFlight::try_acquire(&slot, 2).is_some());
    }

    #[tokio::test]
    async fn test_genesis_retrieved_once() {
        let peer = Arc::new(MockPeer::new());
        peer.with_state(|s| {
            s.genesis = Some(GenesisInfo {
                hash: [7u8; 32],
                timestamp: 1_500_000_000,
            })
        });
        let client = client(peer.clone());

        assert_eq!(client.download_genesis().await.unwrap().unwrap().hash, [7u8; 32]);
        assert!(client.download_genesis().await.unwrap().is_some());
        assert_eq!(peer.request_count(Command::ChainGetGenesis), 1);
        assert_eq!(client.genesis().unwrap().timestamp, 1_500_000_000);
    }
}
