//! In-Memory Ledger Adapter
//!
//! Implements `Ledger` as a counting store: balances only move by signed
//! adjustments and nonces only by unit steps.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{AccountSnapshot, Address, CurrencyId, DelegateInfo};
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

use crate::domain::Step;
use crate::ports::outbound::Ledger;

#[derive(Debug, Default)]
struct LedgerEntry {
    balances: BTreeMap<CurrencyId, i128>,
    nonce: u64,
    delegate_nonce: u64,
    delegate: Option<DelegateInfo>,
}

impl LedgerEntry {
    fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            balances: self
                .balances
                .iter()
                .filter(|(_, amount)| **amount > 0)
                .map(|(currency, amount)| (*currency, u64::try_from(*amount).unwrap_or(u64::MAX)))
                .collect(),
            nonce: self.nonce,
            delegate: self.delegate.clone().map(|mut info| {
                info.delegate_nonce = self.delegate_nonce;
                info
            }),
        }
    }
}

/// Ledger held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    accounts: Mutex<HashMap<Address, LedgerEntry>>,
}

impl InMemoryLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts with any state.
    pub fn account_count(&self) -> usize {
        self.accounts.lock().len()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn snapshot(&self, address: &Address) -> AccountSnapshot {
        self.accounts
            .lock()
            .get(address)
            .map(LedgerEntry::snapshot)
            .unwrap_or_default()
    }

    async fn add_balance(&self, address: &Address, currency: CurrencyId, amount: i128) {
        let mut accounts = self.accounts.lock();
        let entry = accounts.entry(address.clone()).or_default();
        let balance = entry.balances.entry(currency).or_insert(0);
        *balance += amount;
        if *balance == 0 {
            entry.balances.remove(&currency);
        }
        trace!(%address, %currency, amount = %amount, "[mirror] Balance adjusted");
    }

    async fn step_nonce(&self, address: &Address, step: Step) {
        let mut accounts = self.accounts.lock();
        let entry = accounts.entry(address.clone()).or_default();
        entry.nonce = step.apply(entry.nonce);
    }

    async fn step_delegate_nonce(&self, address: &Address, step: Step) {
        let mut accounts = self.accounts.lock();
        let entry = accounts.entry(address.clone()).or_default();
        entry.delegate_nonce = step.apply(entry.delegate_nonce);
    }

    async fn set_delegate(&self, address: &Address, delegate: Option<DelegateInfo>) {
        let mut accounts = self.accounts.lock();
        let entry = accounts.entry(address.clone()).or_default();
        entry.delegate = delegate;
    }
}
