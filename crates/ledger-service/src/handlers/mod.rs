//! API handlers.

use ledger_core::{AccountId, Transaction};
use serde::Serialize;

use crate::error::ApiError;

pub mod accounts;
pub mod health;
pub mod transactions;

/// Ledger entries written by a mutation.
#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    /// Entries in the order they were settled.
    pub transactions: Vec<Transaction>,
}

impl From<Vec<Transaction>> for TransactionsResponse {
    fn from(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }
}

/// Parse the `{id}` path segment.
fn account_id(raw: &str) -> Result<AccountId, ApiError> {
    Ok(raw.parse()?)
}
