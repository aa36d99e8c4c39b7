//! Error types for ledger operations.

use rust_decimal::Decimal;

use crate::ids::{AccountId, IdError, TransactionId};

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Malformed or semantically invalid input.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced account does not exist.
    #[error("account not found: {account_id}")]
    AccountNotFound {
        /// The account that was looked up.
        account_id: String,
    },

    /// The referenced ledger entry (or group of entries) does not exist.
    #[error("transaction not found: {transaction_id}")]
    TransactionNotFound {
        /// The transaction or group id that was looked up.
        transaction_id: String,
    },

    /// The owner already holds an account.
    #[error("owner already holds an account: {owner_id}")]
    DuplicateOwner {
        /// The owner that was already taken.
        owner_id: String,
    },

    /// The account balance is too low for the requested movement.
    #[error("insufficient funds on {account_id}: balance={balance}, required={required}")]
    InsufficientFunds {
        /// The account that would have been overdrawn.
        account_id: AccountId,
        /// Balance at the time of the check.
        balance: Decimal,
        /// Amount the operation needed.
        required: Decimal,
    },

    /// The entry is itself a refund, or has already been refunded.
    #[error("cannot refund a refund: {transaction_id}")]
    CannotRefundARefund {
        /// The entry whose reversal was refused.
        transaction_id: TransactionId,
    },

    /// Storage or transport failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a missing account.
    #[must_use]
    pub fn account_not_found(account_id: &AccountId) -> Self {
        Self::AccountNotFound {
            account_id: account_id.to_string(),
        }
    }
}

impl From<IdError> for LedgerError {
    fn from(err: IdError) -> Self {
        Self::Validation(err.to_string())
    }
}
