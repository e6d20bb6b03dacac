//! # Test Fixtures
//!
//! A mirror client wired to a [`MockPeer`], an event bus and a ledger that
//! records every operation it receives.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{EventFilter, InMemoryEventBus, MirrorEvent, Subscription};
use shared_types::{AccountSnapshot, Address, CurrencyId, DelegateInfo};
use std::sync::Arc;

use mirror_sync::domain::Step;
use mirror_sync::{HexAddressCodec, InMemoryLedger, JsonDecoder, Ledger, MirrorClient, MirrorConfig, MockPeer, PeerEvent};

/// One call received by a [`RecordingLedger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerOp {
    /// `add_balance`
    Balance(CurrencyId, i128),
    /// `step_nonce`
    Nonce(Step),
    /// `step_delegate_nonce`
    DelegateNonce(Step),
    /// `set_delegate`
    Delegate(Option<DelegateInfo>),
}

/// In-memory ledger that also logs the operations applied to it.
#[derive(Debug, Default)]
pub struct RecordingLedger {
    inner: InMemoryLedger,
    ops: Mutex<Vec<LedgerOp>>,
}

impl RecordingLedger {
    /// Operations received since the last call.
    pub fn take_ops(&self) -> Vec<LedgerOp> {
        std::mem::take(&mut *self.ops.lock())
    }
}

#[async_trait]
impl Ledger for RecordingLedger {
    async fn snapshot(&self, address: &Address) -> AccountSnapshot {
        self.inner.snapshot(address).await
    }

    async fn add_balance(&self, address: &Address, currency: CurrencyId, amount: i128) {
        self.ops.lock().push(LedgerOp::Balance(currency, amount));
        self.inner.add_balance(address, currency, amount).await;
    }

    async fn step_nonce(&self, address: &Address, step: Step) {
        self.ops.lock().push(LedgerOp::Nonce(step));
        self.inner.step_nonce(address, step).await;
    }

    async fn step_delegate_nonce(&self, address: &Address, step: Step) {
        self.ops.lock().push(LedgerOp::DelegateNonce(step));
        self.inner.step_delegate_nonce(address, step).await;
    }

    async fn set_delegate(&self, address: &Address, delegate: Option<DelegateInfo>) {
        self.ops.lock().push(LedgerOp::Delegate(delegate.clone()));
        self.inner.set_delegate(address, delegate).await;
    }
}

/// Everything a test needs to drive a client.
pub struct Harness {
    /// Scripted peer.
    pub peer: Arc<MockPeer>,
    /// Event bus the client publishes to.
    pub bus: Arc<InMemoryEventBus>,
    /// Ledger the client applies account deltas to.
    pub ledger: Arc<RecordingLedger>,
    /// The client.
    pub client: Arc<MirrorClient>,
}

impl Harness {
    /// Harness with the test configuration.
    pub fn new() -> Self {
        Self::with_config(MirrorConfig::for_testing())
    }

    /// Harness with a custom configuration.
    pub fn with_config(config: MirrorConfig) -> Self {
        let peer = Arc::new(MockPeer::new());
        let bus = Arc::new(config.event_bus());
        let ledger = Arc::new(RecordingLedger::default());
        let client = MirrorClient::new(
            config,
            peer.clone(),
            Arc::new(JsonDecoder),
            ledger.clone(),
            Arc::new(HexAddressCodec::default()),
            bus.clone(),
        )
        .expect("test config is valid");

        Self {
            peer,
            bus,
            ledger,
            client: Arc::new(client),
        }
    }

    /// Subscribe to every event.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe(EventFilter::all())
    }

    /// Connect and complete an accepted handshake.
    pub async fn handshake(&self) {
        self.client.handle_peer_event(PeerEvent::Connected).await;
        self.client
            .handle_peer_event(PeerEvent::Handshake(MockPeer::identity_bytes(
                &self.client.config().application_short,
            )))
            .await;
    }

    /// Deliver a `new-block` push for the peer's current chain.
    pub async fn push_new_block(&self) {
        self.client
            .handle_peer_event(PeerEvent::NewBlock(self.peer.chain_info_bytes()))
            .await;
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Heights of every `BlockRemoved` event, in publication order.
pub fn removed_heights(events: &[MirrorEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            MirrorEvent::BlockRemoved { height, .. } => Some(*height),
            _ => None,
        })
        .collect()
}
