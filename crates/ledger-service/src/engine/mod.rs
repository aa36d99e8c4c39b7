//! The ledger engine.
//!
//! [`Ledger`] owns the business rules: it validates requests, checks
//! existence and sufficiency, builds the ledger entries for an operation and
//! hands them to [`Store::settle`] as one unit. It never logs; every failure
//! comes back as a [`LedgerError`](ledger_core::LedgerError).
//!
//! Operations are split by concern:
//!
//! - [`accounts`]: account lifecycle, balances, deposits and withdrawals
//! - [`transfer`]: single and multi-recipient transfers, history
//! - [`refund`]: reversal of a single entry or a whole group

use std::sync::Arc;

use ledger_store::Store;

pub mod accounts;
pub mod refund;
pub mod transfer;

/// Ledger engine over an injected store.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
}

impl Ledger {
    /// Create an engine that reads and writes through `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").finish_non_exhaustive()
    }
}
