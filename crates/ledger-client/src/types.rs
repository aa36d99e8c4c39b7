//! Request and response types for the ledger API.

use ledger_core::{AccountId, Decimal, Transaction};
use serde::{Deserialize, Serialize};

/// Balance response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// The account.
    pub account_id: AccountId,
    /// Current balance.
    pub balance: Decimal,
}

/// Ledger entries written by a mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionsResponse {
    /// Entries in the order they were settled.
    pub transactions: Vec<Transaction>,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code (`not_found`, `insufficient_funds`, ...).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Additional details.
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}
