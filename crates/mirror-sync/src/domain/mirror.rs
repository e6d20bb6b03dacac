//! # Entity Mirror
//!
//! In-memory cache of everything the client has learned from the peer.
//!
//! The mirror itself is plain synchronous state. The client wraps it in a
//! lock that is only taken between round trips, never across one.
//!
//! ## Invariants
//!
//! - A block cached at height `h` is only served while its hash equals the
//!   header record at `h` (when there is one).
//! - Entries leave the cache only through [`EntityMirror::evict_height`],
//!   which the reconciliation engine calls as an explicit rollback step.
//! - Transaction records are replaced whole, never merged.

use shared_types::{Address, ChainSummary, GenesisInfo, Hash, OfferType};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::entities::{
    AccountWatch, BlockHeaderRecord, BlockRecord, ExchangeOfferRecord, TransactionRecord,
    TxInclusion,
};
use super::value_objects::DecodedBlock;

/// What a rollback removed at one height.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eviction {
    /// Rolled-back height.
    pub height: u64,
    /// Hash of the superseded header (or of the cached block when no header
    /// was stored).
    pub hash: Hash,
    /// Every transaction that was attributed to the height, each once.
    pub tx_hashes: Vec<Hash>,
}

/// The entity cache.
#[derive(Debug, Default)]
pub struct EntityMirror {
    summary: Option<ChainSummary>,
    genesis: Option<GenesisInfo>,
    headers: BTreeMap<u64, BlockHeaderRecord>,
    blocks_by_height: BTreeMap<u64, Arc<BlockRecord>>,
    blocks_by_hash: HashMap<Hash, Arc<BlockRecord>>,
    transactions: HashMap<Hash, Arc<TransactionRecord>>,
    accounts: AccountWatch,
    offers: HashMap<(Hash, OfferType), Arc<ExchangeOfferRecord>>,
}

impl EntityMirror {
    /// Create an empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // CHAIN
    // =========================================================================

    /// Last chain summary.
    pub fn summary(&self) -> Option<&ChainSummary> {
        self.summary.as_ref()
    }

    /// Replace the chain summary wholesale.
    pub fn set_summary(&mut self, summary: ChainSummary) {
        self.summary = Some(summary);
    }

    /// Peer tip height, zero before the first summary.
    pub fn tip_height(&self) -> u64 {
        self.summary.as_ref().map_or(0, |s| s.tip_height)
    }

    /// Genesis descriptor, once retrieved.
    pub fn genesis(&self) -> Option<&GenesisInfo> {
        self.genesis.as_ref()
    }

    /// Store the genesis descriptor.
    pub fn set_genesis(&mut self, genesis: GenesisInfo) {
        self.genesis = Some(genesis);
    }

    // =========================================================================
    // HEADERS AND BLOCKS
    // =========================================================================

    /// Header record at `height`.
    pub fn header(&self, height: u64) -> Option<BlockHeaderRecord> {
        self.headers.get(&height).copied()
    }

    /// Store the header record for its height.
    pub fn put_header(&mut self, header: BlockHeaderRecord) {
        self.headers.insert(header.height, header);
    }

    /// Number of stored header records.
    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    /// Cached block at `height`, if it agrees with the header there.
    pub fn block_at(&self, height: u64) -> Option<Arc<BlockRecord>> {
        let block = self.blocks_by_height.get(&height)?;
        match self.headers.get(&height) {
            Some(header) if header.hash != block.hash => None,
            _ => Some(Arc::clone(block)),
        }
    }

    /// Hash of whatever block is cached at `height`, consistent or not.
    pub fn cached_block_hash(&self, height: u64) -> Option<Hash> {
        self.blocks_by_height.get(&height).map(|b| b.hash)
    }

    /// Cached block with the given hash.
    pub fn block_by_hash(&self, hash: &Hash) -> Option<Arc<BlockRecord>> {
        self.blocks_by_hash.get(hash).cloned()
    }

    /// Number of cached blocks (by hash).
    pub fn block_count(&self) -> usize {
        self.blocks_by_hash.len()
    }

    /// Include a decoded block and tag its transactions confirmed.
    ///
    /// The block is always indexed by hash. It is indexed by height only when
    /// `index_height` is set, which callers do when the block agrees with
    /// the header at its height.
    pub fn include_block(&mut self, block: DecodedBlock, index_height: bool) -> Arc<BlockRecord> {
        let record = Arc::new(BlockRecord::from(&block));
        let confirmations = self.tip_height().saturating_sub(block.height);

        for tx in block.transactions {
            let inclusion = TxInclusion::Confirmed {
                height: block.height,
                timestamp: block.timestamp,
                confirmations,
            };
            self.transactions
                .insert(tx.hash, Arc::new(TransactionRecord::new(tx, inclusion)));
        }

        self.blocks_by_hash.insert(record.hash, Arc::clone(&record));
        if index_height {
            self.blocks_by_height
                .insert(record.height, Arc::clone(&record));
        }
        record
    }

    /// Heights at or above `tip` holding a header or a block, highest first.
    pub fn heights_from(&self, tip: u64) -> Vec<u64> {
        let mut heights: Vec<u64> = self
            .headers
            .range(tip..)
            .map(|(h, _)| *h)
            .chain(self.blocks_by_height.range(tip..).map(|(h, _)| *h))
            .chain(
                self.blocks_by_hash
                    .values()
                    .map(|record| record.height)
                    .filter(|h| *h >= tip),
            )
            .collect();
        heights.sort_unstable_by(|a, b| b.cmp(a));
        heights.dedup();
        heights
    }

    /// Roll back one height.
    ///
    /// Removes the header, every block at the height (indexed or cached
    /// only by hash) and every transaction still attributed to the height.
    /// Returns `None` when nothing was cached there.
    pub fn evict_height(&mut self, height: u64) -> Option<Eviction> {
        let header = self.headers.remove(&height);
        let block = self.blocks_by_height.remove(&height);
        let mut by_hash: Vec<Hash> = self
            .blocks_by_hash
            .values()
            .filter(|record| record.height == height)
            .map(|record| record.hash)
            .collect();
        if header.is_none() && block.is_none() && by_hash.is_empty() {
            return None;
        }
        by_hash.sort_unstable();

        let mut tx_hashes: Vec<Hash> = Vec::new();
        if let Some(block) = &block {
            self.blocks_by_hash.remove(&block.hash);
            tx_hashes.extend(block.tx_hashes.iter().copied());
        }
        if let Some(header) = &header {
            if let Some(stale) = self.blocks_by_hash.remove(&header.hash) {
                tx_hashes.extend(stale.tx_hashes.iter().copied());
            }
        }
        for hash in &by_hash {
            if let Some(stale) = self.blocks_by_hash.remove(hash) {
                tx_hashes.extend(stale.tx_hashes.iter().copied());
            }
        }

        let mut attributed: Vec<Hash> = self
            .transactions
            .values()
            .filter(|tx| tx.height() == Some(height))
            .map(|tx| tx.hash)
            .collect();
        attributed.sort_unstable();
        tx_hashes.extend(attributed);

        let mut seen = std::collections::HashSet::new();
        tx_hashes.retain(|hash| seen.insert(*hash));

        for hash in &tx_hashes {
            if self
                .transactions
                .get(hash)
                .is_some_and(|tx| tx.height() == Some(height))
            {
                self.transactions.remove(hash);
            }
        }

        let hash = header
            .map(|h| h.hash)
            .or(block.map(|b| b.hash))
            .or(by_hash.first().copied())
            .unwrap_or_default();

        Some(Eviction {
            height,
            hash,
            tx_hashes,
        })
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Cached transaction.
    pub fn transaction(&self, hash: &Hash) -> Option<Arc<TransactionRecord>> {
        self.transactions.get(hash).cloned()
    }

    /// Replace the cache entry for a transaction.
    pub fn put_transaction(&mut self, record: TransactionRecord) -> Arc<TransactionRecord> {
        let record = Arc::new(record);
        self.transactions.insert(record.hash, Arc::clone(&record));
        record
    }

    /// Number of cached transactions.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    // =========================================================================
    // ACCOUNTS
    // =========================================================================

    /// Replace the tracked-address set.
    pub fn set_accounts(&mut self, watch: AccountWatch) {
        self.accounts = watch;
    }

    /// Tracked addresses.
    pub fn tracked_accounts(&self) -> Vec<Address> {
        self.accounts.addresses()
    }

    /// Whether an address is tracked.
    pub fn is_tracked(&self, address: &Address) -> bool {
        self.accounts.contains(address)
    }

    // =========================================================================
    // OFFERS
    // =========================================================================

    /// Cached offer.
    pub fn offer(&self, hash: &Hash, offer_type: OfferType) -> Option<Arc<ExchangeOfferRecord>> {
        self.offers.get(&(*hash, offer_type)).cloned()
    }

    /// Cache an offer unless one is already cached under the same key.
    ///
    /// Returns `true` when the offer was newly inserted.
    pub fn put_offer(&mut self, offer: ExchangeOfferRecord) -> bool {
        let key = (offer.hash, offer.offer_type);
        if self.offers.contains_key(&key) {
            return false;
        }
        self.offers.insert(key, Arc::new(offer));
        true
    }

    /// Number of cached offers.
    pub fn offer_count(&self) -> usize {
        self.offers.len()
    }
}
