//! # Algorithms Module
//!
//! Pure computations used by the reconciliation engine and account tracking.

pub mod ledger_delta;
pub mod window;

pub use ledger_delta::{apply_to_snapshot, compute_delta, unit_steps, LedgerDelta};
pub use window::ScanWindow;
