//! Client error types.

use rust_decimal::Decimal;

/// Errors that can occur when using the ledger client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The account does not exist.
    #[error("account not found: {account_id}")]
    AccountNotFound {
        /// The account that was looked up.
        account_id: String,
    },

    /// The balance is too low for the requested movement.
    #[error("insufficient funds on {account_id}: balance={balance}, required={required}")]
    InsufficientFunds {
        /// The account that would have been overdrawn.
        account_id: String,
        /// Current balance.
        balance: Decimal,
        /// Required amount.
        required: Decimal,
    },

    /// The owner already holds an account.
    #[error("duplicate owner: {message}")]
    DuplicateOwner {
        /// Server message.
        message: String,
    },

    /// The entry is a refund or was already refunded.
    #[error("cannot refund a refund: {message}")]
    CannotRefundARefund {
        /// Server message.
        message: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
