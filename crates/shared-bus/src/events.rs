//! # Mirror Events
//!
//! The closed set of domain events the mirror client publishes to external
//! observers (ledger updater, UI).

use serde::{Deserialize, Serialize};
use shared_types::{AccountSnapshot, Address, ChainSummary, GenesisInfo, Hash, OfferType};

/// All events that can be published to the event bus.
///
/// Events produced within one reconciliation pass are published in the
/// height-descending order in which they were generated. Events from
/// independent feeds may interleave in any relative order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirrorEvent {
    // =========================================================================
    // CHAIN
    // =========================================================================
    /// A new chain summary replaced the previous one.
    ChainInfoUpdated(ChainSummary),

    /// The genesis descriptor was retrieved.
    GenesisUpdated(GenesisInfo),

    // =========================================================================
    // BLOCKS
    // =========================================================================
    /// A header record was stored for a height.
    HeaderDownloaded {
        /// Height of the header.
        height: u64,
        /// Block hash.
        hash: Hash,
        /// Kernel hash.
        kernel_hash: Hash,
    },

    /// A block body was fetched, decoded and cached.
    BlockDownloaded {
        /// Height of the block.
        height: u64,
        /// Block hash.
        hash: Hash,
        /// Number of contained transactions.
        tx_count: usize,
    },

    /// A previously accepted block was superseded and evicted.
    BlockRemoved {
        /// Height that was rolled back.
        height: u64,
        /// Hash of the evicted header.
        hash: Hash,
    },

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================
    /// Transactions were fetched or re-classified.
    TransactionDownloaded {
        /// Hashes of the cached transactions.
        hashes: Vec<Hash>,
    },

    /// Transactions of an evicted block.
    TransactionRemoved {
        /// Height of the evicted block.
        height: u64,
        /// Hashes of every transaction the block contained.
        hashes: Vec<Hash>,
    },

    // =========================================================================
    // ACCOUNTS
    // =========================================================================
    /// Fresh account state was applied to the ledger.
    AccountUpdated {
        /// Account address.
        address: Address,
        /// The newly reported state.
        snapshot: AccountSnapshot,
    },

    /// Confirmed and pending transaction counts of an account.
    AccountTransactionCountUpdated {
        /// Account address.
        address: Address,
        /// Confirmed transaction count.
        confirmed: u64,
        /// Pending transaction count.
        pending: u64,
    },

    /// Recent confirmed transaction ids of an account.
    AccountTransactionsUpdated {
        /// Account address.
        address: Address,
        /// Transaction hashes, in peer order.
        hashes: Vec<Hash>,
    },

    /// Pending transaction ids of an account.
    AccountPendingTransactionsUpdated {
        /// Account address.
        address: Address,
        /// Transaction hashes, in peer order.
        hashes: Vec<Hash>,
    },

    // =========================================================================
    // MEMPOOL
    // =========================================================================
    /// Number of transactions in the peer's mempool.
    PendingTransactionsCount {
        /// Mempool size.
        count: u64,
    },

    /// One page of mempool ids.
    PendingTransactionsUpdated {
        /// Transaction hashes on the page.
        hashes: Vec<Hash>,
    },

    // =========================================================================
    // OFFERS
    // =========================================================================
    /// Number of offers of a type.
    OffersCount {
        /// Offer category.
        offer_type: OfferType,
        /// Offer count.
        count: u64,
    },

    /// One page of offer ids.
    OffersIds {
        /// Offer category.
        offer_type: OfferType,
        /// Offer hashes on the page.
        hashes: Vec<Hash>,
    },

    /// Offers newly decoded and cached.
    OffersUpdated {
        /// Offer category.
        offer_type: OfferType,
        /// Hashes of the cached offers.
        hashes: Vec<Hash>,
    },
}

impl MirrorEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::ChainInfoUpdated(_) | Self::GenesisUpdated(_) => EventTopic::Chain,
            Self::HeaderDownloaded { .. }
            | Self::BlockDownloaded { .. }
            | Self::BlockRemoved { .. } => EventTopic::Blocks,
            Self::TransactionDownloaded { .. } | Self::TransactionRemoved { .. } => {
                EventTopic::Transactions
            }
            Self::AccountUpdated { .. }
            | Self::AccountTransactionCountUpdated { .. }
            | Self::AccountTransactionsUpdated { .. }
            | Self::AccountPendingTransactionsUpdated { .. } => EventTopic::Accounts,
            Self::PendingTransactionsCount { .. } | Self::PendingTransactionsUpdated { .. } => {
                EventTopic::Mempool
            }
            Self::OffersCount { .. } | Self::OffersIds { .. } | Self::OffersUpdated { .. } => {
                EventTopic::Offers
            }
        }
    }

    /// Account the event concerns, if any.
    #[must_use]
    pub fn address(&self) -> Option<&Address> {
        match self {
            Self::AccountUpdated { address, .. }
            | Self::AccountTransactionCountUpdated { address, .. }
            | Self::AccountTransactionsUpdated { address, .. }
            | Self::AccountPendingTransactionsUpdated { address, .. } => Some(address),
            _ => None,
        }
    }

    /// Stable kebab-case name, used in log lines.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChainInfoUpdated(_) => "chain-info-updated",
            Self::GenesisUpdated(_) => "genesis-updated",
            Self::HeaderDownloaded { .. } => "header-downloaded",
            Self::BlockDownloaded { .. } => "block-downloaded",
            Self::BlockRemoved { .. } => "block-removed",
            Self::TransactionDownloaded { .. } => "transaction-downloaded",
            Self::TransactionRemoved { .. } => "transaction-removed",
            Self::AccountUpdated { .. } => "account-updated",
            Self::AccountTransactionCountUpdated { .. } => "account-transaction-count-updated",
            Self::AccountTransactionsUpdated { .. } => "account-transactions-updated",
            Self::AccountPendingTransactionsUpdated { .. } => {
                "account-pending-transactions-updated"
            }
            Self::PendingTransactionsCount { .. } => "pending-transactions-count",
            Self::PendingTransactionsUpdated { .. } => "pending-transactions-updated",
            Self::OffersCount { .. } => "offers-count",
            Self::OffersIds { .. } => "offers-ids",
            Self::OffersUpdated { .. } => "offers-updated",
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Chain summary and genesis.
    Chain,
    /// Headers and block bodies.
    Blocks,
    /// Transaction download/removal.
    Transactions,
    /// Tracked account updates.
    Accounts,
    /// Mempool feed.
    Mempool,
    /// Exchange offers feed.
    Offers,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Accounts to include. Empty means all accounts; events without an
    /// account always pass.
    pub addresses: Vec<Address>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            addresses: Vec::new(),
        }
    }

    /// Create a filter for account events of specific addresses.
    #[must_use]
    pub fn for_accounts(addresses: Vec<Address>) -> Self {
        Self {
            topics: vec![EventTopic::Accounts],
            addresses,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &MirrorEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let address_match = match event.address() {
            Some(address) => self.addresses.is_empty() || self.addresses.contains(address),
            None => true,
        };

        topic_match && address_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn removed(height: u64) -> MirrorEvent {
        MirrorEvent::BlockRemoved {
            height,
            hash: Hash::default(),
        }
    }

    fn account_event(address: &str) -> MirrorEvent {
        MirrorEvent::AccountTransactionCountUpdated {
            address: Address::new(address),
            confirmed: 1,
            pending: 0,
        }
    }

    #[test]
    fn test_event_topic_mapping() {
        assert_eq!(removed(1).topic(), EventTopic::Blocks);
        assert_eq!(
            MirrorEvent::PendingTransactionsCount { count: 3 }.topic(),
            EventTopic::Mempool
        );
        assert_eq!(account_event("a").topic(), EventTopic::Accounts);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(removed(1).name(), "block-removed");
        assert_eq!(
            MirrorEvent::OffersIds {
                offer_type: 0,
                hashes: vec![]
            }
            .name(),
            "offers-ids"
        );
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        assert!(filter.matches(&removed(5)));
        assert!(filter.matches(&account_event("a")));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Blocks]);
        assert!(filter.matches(&removed(5)));
        assert!(!filter.matches(&MirrorEvent::PendingTransactionsCount { count: 1 }));
    }

    #[test]
    fn test_filter_by_account() {
        let filter = EventFilter::for_accounts(vec![Address::new("a")]);
        assert!(filter.matches(&account_event("a")));
        assert!(!filter.matches(&account_event("b")));
        assert!(!filter.matches(&removed(5)));
    }
}
