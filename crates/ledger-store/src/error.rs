//! Error types for ledger storage.

use ledger_core::{AccountId, Decimal, LedgerError, TransactionId};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Another live account already belongs to this owner.
    #[error("owner already holds an account: {owner_id}")]
    DuplicateOwner {
        /// The owner id.
        owner_id: String,
    },

    /// A debit would take the balance below zero.
    #[error("insufficient funds on {account_id}: balance={balance}, required={required}")]
    InsufficientFunds {
        /// The account that would be overdrawn.
        account_id: AccountId,
        /// Balance seen inside the failed write.
        balance: Decimal,
        /// Amount of the debit.
        required: Decimal,
    },

    /// A refund entry already points at this transaction.
    #[error("transaction already refunded: {transaction_id}")]
    AlreadyRefunded {
        /// The original transaction.
        transaction_id: TransactionId,
    },

    /// Balance deltas must be strictly positive, fit the stored precision,
    /// and leave the balance within range.
    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),
}

impl StoreError {
    pub(crate) fn account_not_found(id: &AccountId) -> Self {
        Self::NotFound {
            entity: "account",
            id: id.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound {
                entity: "account",
                id,
            } => Self::AccountNotFound { account_id: id },
            StoreError::NotFound { id, .. } => Self::TransactionNotFound { transaction_id: id },
            StoreError::DuplicateOwner { owner_id } => Self::DuplicateOwner { owner_id },
            StoreError::InsufficientFunds {
                account_id,
                balance,
                required,
            } => Self::InsufficientFunds {
                account_id,
                balance,
                required,
            },
            StoreError::AlreadyRefunded { transaction_id } => {
                Self::CannotRefundARefund { transaction_id }
            }
            StoreError::InvalidAmount(amount) => {
                Self::Validation(format!("invalid amount: {amount}"))
            }
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Storage(msg),
        }
    }
}
