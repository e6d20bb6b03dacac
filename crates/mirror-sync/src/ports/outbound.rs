//! # Outbound Ports
//!
//! Traits for the collaborators the client is constructed with: the peer
//! transport, the block/transaction/offer decoder, the account ledger and
//! the address codec.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{AccountSnapshot, Address, CurrencyId, DelegateInfo, GenesisInfo, Hash, OfferType};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::domain::{
    BlockEncoding, ConsensusMode, DecodeError, DecodedBlock, DecodedOffer, DecodedTransaction,
    IdentityDescriptor, NetworkDescriptor, NetworkType, Step,
};
use crate::protocol::{
    compress_work, AccountResponse, BlockHeaderResponse, ChainInfoResponse, Command, IdsResponse,
    JsonBlock, JsonOffer, JsonTransaction, TransactionResponse,
};

/// Push traffic delivered by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerEvent {
    /// Transport connected.
    Connected,
    /// Transport disconnected.
    Disconnected,
    /// The peer's one-time identity descriptor, as received.
    Handshake(Vec<u8>),
    /// Unsolicited new-block push carrying a chain-info document.
    NewBlock(Vec<u8>),
}

/// Peer transport - outbound port.
///
/// Every request may come back empty: `None` (or an empty body) means the
/// peer is unreachable or has nothing yet. The transport never retries.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Fire-and-forget emit.
    fn emit(&self, event: &str, payload: Value);

    /// Request/acknowledgement round trip.
    async fn request(&self, command: Command, payload: Value) -> Option<Vec<u8>>;

    /// Close the connection.
    fn close(&self);

    /// Peer address (for logging).
    fn peer_address(&self) -> &str;
}

/// Block/transaction/offer decoder and validator - outbound port.
pub trait Decoder: Send + Sync {
    /// Decode a block served in `encoding`.
    fn decode_block(&self, bytes: &[u8], encoding: BlockEncoding)
        -> Result<DecodedBlock, DecodeError>;

    /// Decode an encoded transaction.
    fn decode_transaction(&self, bytes: &[u8]) -> Result<DecodedTransaction, DecodeError>;

    /// Decode an encoded offer.
    fn decode_offer(&self, bytes: &[u8]) -> Result<DecodedOffer, DecodeError>;
}

/// Append-only counting ledger - outbound port.
///
/// Balances move by signed adjustments and counters by unit steps; nothing
/// is ever overwritten.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Last-known state of an account.
    async fn snapshot(&self, address: &Address) -> AccountSnapshot;

    /// Adjust one balance.
    async fn add_balance(&self, address: &Address, currency: CurrencyId, amount: i128);

    /// Move the nonce by one.
    async fn step_nonce(&self, address: &Address, step: Step);

    /// Move the delegate nonce by one.
    async fn step_delegate_nonce(&self, address: &Address, step: Step);

    /// Store delegation metadata (key and stake). The delegate nonce is
    /// only moved through [`Ledger::step_delegate_nonce`].
    async fn set_delegate(&self, address: &Address, delegate: Option<DelegateInfo>);
}

/// Address text normalization - outbound port.
pub trait AddressCodec: Send + Sync {
    /// Normalize a user-supplied address.
    fn normalize(&self, input: &str) -> Result<Address, DecodeError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Scripted state behind a [`MockPeer`].
#[derive(Debug, Default)]
pub struct MockPeerState {
    /// Answer requests at all?
    pub online: bool,
    /// First height served.
    pub start_height: u64,
    /// Blocks by height; headers are derived from them.
    pub blocks: BTreeMap<u64, JsonBlock>,
    /// Genesis descriptor.
    pub genesis: Option<GenesisInfo>,
    /// Transaction replies by hash.
    pub transactions: HashMap<Hash, TransactionResponse>,
    /// Account replies by address.
    pub accounts: HashMap<String, AccountResponse>,
    /// Nonces including pending by address.
    pub pending_nonces: HashMap<String, u64>,
    /// Confirmed transaction ids by address, most recent first.
    pub account_tx_ids: HashMap<String, Vec<Hash>>,
    /// Whole mempool ids.
    pub mempool: Vec<Hash>,
    /// Mempool ids by address.
    pub account_mempool: HashMap<String, Vec<Hash>>,
    /// Offers by type.
    pub offers: BTreeMap<OfferType, Vec<JsonOffer>>,
    /// Every request, in order.
    pub requests: Vec<(Command, Value)>,
    /// Every emit, in order.
    pub emits: Vec<(String, Value)>,
    /// Number of `close` calls.
    pub closes: usize,
    /// Delay applied before answering.
    pub delay: Option<Duration>,
}

/// Scripted peer for testing.
///
/// Serves every command from in-memory tables, records requests and emits,
/// and can be switched offline.
#[derive(Debug)]
pub struct MockPeer {
    address: String,
    state: Mutex<MockPeerState>,
}

impl Default for MockPeer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPeer {
    /// Online peer with no chain.
    pub fn new() -> Self {
        Self {
            address: "mock-peer-1".to_string(),
            state: Mutex::new(MockPeerState {
                online: true,
                ..MockPeerState::default()
            }),
        }
    }

    /// Mutate the scripted state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockPeerState) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Deterministic hash for a height on a given fork.
    pub fn block_hash(height: u64, fork: u8) -> Hash {
        let mut hash = [fork; 32];
        hash[..8].copy_from_slice(&height.to_be_bytes());
        hash
    }

    /// Deterministic transaction hash.
    pub fn tx_hash(height: u64, fork: u8, index: u8) -> Hash {
        let mut hash = Self::block_hash(height, fork);
        hash[31] = index;
        hash[30] = 0xee;
        hash
    }

    /// Build a chain of `len` blocks on `fork`, each with `txs` transactions.
    pub fn build_chain(&self, len: u64, fork: u8, txs: u8) {
        for height in 0..len {
            self.put_block(height, fork, txs);
        }
    }

    /// Replace the block at `height` with one on `fork`.
    pub fn put_block(&self, height: u64, fork: u8, txs: u8) {
        let block = JsonBlock {
            hash: Self::block_hash(height, fork),
            kernel_hash: Self::block_hash(height, fork.wrapping_add(0x80)),
            height,
            timestamp: 1_600_000_000 + height * 60,
            transactions: (0..txs)
                .map(|i| JsonTransaction {
                    hash: Self::tx_hash(height, fork, i),
                    data: vec![fork, i],
                })
                .collect(),
        };
        self.state.lock().blocks.insert(height, block);
    }

    /// Serve `tx/get-transaction` for every transaction of the block at
    /// `height`, as confirmed.
    pub fn serve_block_transactions(&self, height: u64) {
        let mut state = self.state.lock();
        let tip_height = state.blocks.keys().next_back().map_or(0, |h| h + 1);
        let Some(block) = state.blocks.get(&height).cloned() else {
            return;
        };
        for tx in &block.transactions {
            let Ok(bytes) = tx.to_bytes() else {
                continue;
            };
            state.transactions.insert(
                tx.hash,
                TransactionResponse {
                    tx: bytes,
                    block_height: Some(height),
                    block_timestamp: Some(block.timestamp),
                    confirmations: tip_height.saturating_sub(height),
                    pending_queued: false,
                    pending: false,
                },
            );
        }
    }

    /// Serve `tx/get-transaction` for a mempool transaction.
    pub fn put_pending_transaction(&self, hash: Hash, queued: bool) {
        let tx = JsonTransaction {
            hash,
            data: vec![0xaa],
        };
        let Ok(bytes) = tx.to_bytes() else {
            return;
        };
        self.state.lock().transactions.insert(
            hash,
            TransactionResponse {
                tx: bytes,
                block_height: None,
                block_timestamp: None,
                confirmations: 0,
                pending_queued: queued,
                pending: true,
            },
        );
    }

    /// Encoded identity descriptor announcing `short`.
    pub fn identity_bytes(short: &str) -> Vec<u8> {
        let identity = IdentityDescriptor {
            short: short.to_string(),
            build: "1.0.0".to_string(),
            net: NetworkDescriptor {
                network_type: NetworkType::Testnet,
            },
            address: "127.0.0.1:4006".to_string(),
            consensus: ConsensusMode::Full,
        };
        serde_json::to_vec(&identity).unwrap_or_default()
    }

    /// Drop every block at or above `height`.
    pub fn truncate(&self, height: u64) {
        self.state.lock().blocks.retain(|h, _| *h < height);
    }

    /// Chain-info document for the current blocks.
    pub fn chain_info(&self) -> ChainInfoResponse {
        Self::chain_info_of(&self.state.lock())
    }

    fn chain_info_of(state: &MockPeerState) -> ChainInfoResponse {
        let tip_height = state.blocks.keys().next_back().map_or(0, |h| h + 1);
        let tip = state.blocks.values().next_back();
        let prev = tip_height
            .checked_sub(2)
            .and_then(|h| state.blocks.get(&h));
        ChainInfoResponse {
            tip_height,
            start_height: state.start_height,
            hash: tip.map(|b| b.hash).unwrap_or_default(),
            kernel_hash: tip.map(|b| b.kernel_hash).unwrap_or_default(),
            prev_hash: prev.map(|b| b.hash).unwrap_or_default(),
            prev_kernel_hash: prev.map(|b| b.kernel_hash).unwrap_or_default(),
            chainwork: compress_work(tip_height.into()),
        }
    }

    /// Encoded chain-info document, as pushed with `new-block`.
    pub fn chain_info_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.chain_info()).unwrap_or_default()
    }

    /// Number of requests issued for `command`.
    pub fn request_count(&self, command: Command) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|(c, _)| *c == command)
            .count()
    }

    /// Total number of requests issued.
    pub fn total_requests(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Payloads of every request issued for `command`.
    pub fn payloads(&self, command: Command) -> Vec<Value> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|(c, _)| *c == command)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Emits, in order.
    pub fn emits(&self) -> Vec<(String, Value)> {
        self.state.lock().emits.clone()
    }

    /// Number of `close` calls.
    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    /// Switch the peer on or off.
    pub fn set_online(&self, online: bool) {
        self.state.lock().online = online;
    }

    fn answer(state: &MockPeerState, command: Command, payload: &Value) -> Option<Vec<u8>> {
        let address = payload["address"].as_str().map(str::to_string);
        let hash_of = |key: &str| -> Option<Hash> {
            let text = payload[key].as_str()?;
            shared_types::decode_fixed::<32>(text).ok()
        };

        let json = |value: Value| serde_json::to_vec(&value).ok();

        match command {
            Command::ChainGetInfo => json(serde_json::to_value(Self::chain_info_of(state)).ok()?),
            Command::ChainGetGenesis => json(serde_json::to_value(&state.genesis).ok()?),
            Command::ChainGetBlockHeader => {
                let block = state.blocks.get(&payload["height"].as_u64()?)?;
                json(serde_json::to_value(BlockHeaderResponse {
                    hash: block.hash,
                    kernel_hash: block.kernel_hash,
                })
                .ok()?)
            }
            Command::ChainGetBlockByHeight => {
                state.blocks.get(&payload["height"].as_u64()?)?.to_bytes().ok()
            }
            Command::ChainGetBlockByHash => {
                let hash = hash_of("hash")?;
                state
                    .blocks
                    .values()
                    .find(|b| b.hash == hash)?
                    .to_bytes()
                    .ok()
            }
            Command::AccountGetAccount => {
                json(serde_json::to_value(state.accounts.get(&address?)).ok()?)
            }
            Command::AccountGetNonceIncludingPending => {
                json(serde_json::to_value(state.pending_nonces.get(&address?)).ok()?)
            }
            Command::TxGetTransaction => {
                json(serde_json::to_value(state.transactions.get(&hash_of("hash")?)).ok()?)
            }
            Command::TxAccountTransactionCount => {
                let ids = state.account_tx_ids.get(&address?);
                json(Value::from(ids.map_or(0, |ids| ids.len() as u64)))
            }
            Command::TxAccountTransactionIds => {
                let ids = state.account_tx_ids.get(&address?)?;
                json(Self::page(ids, payload))
            }
            Command::MempoolContentCount => {
                let ids = match &address {
                    Some(a) => state.account_mempool.get(a).map_or(0, Vec::len),
                    None => state.mempool.len(),
                };
                json(Value::from(ids as u64))
            }
            Command::MempoolContentIds => {
                let ids = match &address {
                    Some(a) => state.account_mempool.get(a)?,
                    None => &state.mempool,
                };
                json(Self::page(ids, payload))
            }
            Command::OffersContentCount => {
                let offer_type = u8::try_from(payload["type"].as_u64()?).ok()?;
                let count = state.offers.get(&offer_type).map_or(0, Vec::len);
                json(Value::from(count as u64))
            }
            Command::OffersContentIds => {
                let offer_type = u8::try_from(payload["type"].as_u64()?).ok()?;
                let ids: Vec<Hash> = state
                    .offers
                    .get(&offer_type)?
                    .iter()
                    .map(|o| o.hash)
                    .collect();
                json(Self::page(&ids, payload))
            }
            Command::OffersGetOffer => {
                let offer_type = u8::try_from(payload["type"].as_u64()?).ok()?;
                let hash = hash_of("hash")?;
                state
                    .offers
                    .get(&offer_type)?
                    .iter()
                    .find(|o| o.hash == hash)?
                    .to_bytes()
                    .ok()
            }
        }
    }

    fn page(ids: &[Hash], payload: &Value) -> Value {
        let index = payload["index"].as_u64().unwrap_or(0) as usize;
        let limit = payload["limit"].as_u64().unwrap_or(1) as usize;
        let end = index.saturating_add(limit).min(ids.len());
        let page = ids.get(index..end).unwrap_or(&[]).to_vec();
        let next = (end < ids.len()).then_some(end as u64);
        serde_json::to_value(IdsResponse { ids: page, next }).unwrap_or(Value::Null)
    }
}

#[async_trait]
impl PeerTransport for MockPeer {
    fn emit(&self, event: &str, payload: Value) {
        self.state.lock().emits.push((event.to_string(), payload));
    }

    async fn request(&self, command: Command, payload: Value) -> Option<Vec<u8>> {
        let delay = {
            let mut state = self.state.lock();
            if !state.online {
                return None;
            }
            state.requests.push((command, payload.clone()));
            state.delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        if !state.online {
            return None;
        }
        Self::answer(&state, command, &payload)
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.closes += 1;
        state.online = false;
    }

    fn peer_address(&self) -> &str {
        &self.address
    }
}
