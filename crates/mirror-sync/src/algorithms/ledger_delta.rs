//! # Ledger Delta
//!
//! Turns two account snapshots into the operations an append-only counting
//! ledger needs to move from the first to the second.
//!
//! Balances are netted fully: every previously known balance is subtracted
//! before every newly reported one is added. Counters move by unit steps
//! whose sign follows the difference.

use shared_types::{AccountSnapshot, CurrencyId, DelegateInfo};

use crate::domain::Step;

/// Operations taking a ledger from one account snapshot to the next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerDelta {
    /// Signed balance adjustments in application order.
    pub balance_ops: Vec<(CurrencyId, i128)>,
    /// New minus old nonce.
    pub nonce_diff: i128,
    /// New minus old delegate nonce.
    pub delegate_nonce_diff: i128,
    /// Delegation metadata to store.
    pub delegate: Option<DelegateInfo>,
}

impl LedgerDelta {
    /// Unit steps for the nonce.
    pub fn nonce_steps(&self) -> impl Iterator<Item = Step> {
        unit_steps(self.nonce_diff)
    }

    /// Unit steps for the delegate nonce.
    pub fn delegate_nonce_steps(&self) -> impl Iterator<Item = Step> {
        unit_steps(self.delegate_nonce_diff)
    }
}

/// Compute the delta from `prev` to `next`.
pub fn compute_delta(prev: &AccountSnapshot, next: &AccountSnapshot) -> LedgerDelta {
    let mut balance_ops: Vec<(CurrencyId, i128)> = prev
        .balances
        .iter()
        .filter(|(_, amount)| **amount != 0)
        .map(|(currency, amount)| (*currency, -i128::from(*amount)))
        .collect();

    balance_ops.extend(
        next.balances
            .iter()
            .filter(|(_, amount)| **amount != 0)
            .map(|(currency, amount)| (*currency, i128::from(*amount))),
    );

    LedgerDelta {
        balance_ops,
        nonce_diff: i128::from(next.nonce) - i128::from(prev.nonce),
        delegate_nonce_diff: i128::from(next.delegate_nonce())
            - i128::from(prev.delegate_nonce()),
        delegate: next.delegate.clone(),
    }
}

/// `|diff|` steps in the direction of `diff`.
pub fn unit_steps(diff: i128) -> impl Iterator<Item = Step> {
    let step = if diff < 0 { Step::Down } else { Step::Up };
    let count = diff.unsigned_abs();
    (0..count).map(move |_| step)
}

/// Apply a delta to a snapshot without a ledger.
///
/// Mirrors what a counting ledger ends up holding; zero balances are
/// dropped.
pub fn apply_to_snapshot(prev: &AccountSnapshot, delta: &LedgerDelta) -> AccountSnapshot {
    let mut balances: std::collections::BTreeMap<CurrencyId, i128> = prev
        .balances
        .iter()
        .map(|(c, a)| (*c, i128::from(*a)))
        .collect();
    for (currency, amount) in &delta.balance_ops {
        *balances.entry(*currency).or_insert(0) += amount;
    }

    let nonce = delta.nonce_steps().fold(prev.nonce, |n, s| s.apply(n));
    let delegate = delta.delegate.clone().map(|mut info| {
        info.delegate_nonce = delta
            .delegate_nonce_steps()
            .fold(prev.delegate_nonce(), |n, s| s.apply(n));
        info
    });

    AccountSnapshot {
        balances: balances
            .into_iter()
            .filter(|(_, amount)| *amount > 0)
            .map(|(c, a)| (c, u64::try_from(a).unwrap_or(u64::MAX)))
            .collect(),
        nonce,
        delegate,
    }
}
