//! API error types and responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ledger_core::{Decimal, IdError, LedgerError};
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input or a rejected business operation.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The owner already holds an account.
    #[error("duplicate owner: {0}")]
    DuplicateOwner(String),

    /// The account balance is too low.
    #[error("insufficient funds: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Account that would have been overdrawn.
        account_id: String,
        /// Current balance.
        balance: Decimal,
        /// Required amount.
        required: Decimal,
    },

    /// Refund of a refund, or a second refund of the same entry.
    #[error("cannot refund a refund: {0}")]
    CannotRefundARefund(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Treat a missing referenced entity as a bad request rather than a 404.
    ///
    /// Mutations answer 400 when an account or entry they reference is
    /// missing; only lookups of the addressed resource answer 404.
    #[must_use]
    pub fn missing_as_bad_request(self) -> Self {
        match self {
            Self::NotFound(msg) => Self::BadRequest(msg),
            other => other,
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::DuplicateOwner(owner) => (
                StatusCode::BAD_REQUEST,
                "duplicate_owner",
                format!("Owner {owner} already holds an account"),
                None,
            ),
            Self::InsufficientFunds {
                account_id,
                balance,
                required,
            } => (
                StatusCode::BAD_REQUEST,
                "insufficient_funds",
                self.to_string(),
                Some(serde_json::json!({
                    "account_id": account_id,
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::CannotRefundARefund(id) => (
                StatusCode::BAD_REQUEST,
                "cannot_refund_a_refund",
                format!("Transaction {id} is a refund or has already been refunded"),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(msg) => Self::BadRequest(msg),
            LedgerError::AccountNotFound { account_id } => {
                Self::NotFound(format!("account not found: {account_id}"))
            }
            LedgerError::TransactionNotFound { transaction_id } => {
                Self::NotFound(format!("transaction not found: {transaction_id}"))
            }
            LedgerError::DuplicateOwner { owner_id } => Self::DuplicateOwner(owner_id),
            LedgerError::InsufficientFunds {
                account_id,
                balance,
                required,
            } => Self::InsufficientFunds {
                account_id: account_id.to_string(),
                balance,
                required,
            },
            LedgerError::CannotRefundARefund { transaction_id } => {
                Self::CannotRefundARefund(transaction_id.to_string())
            }
            LedgerError::Storage(msg) => Self::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<IdError> for ApiError {
    fn from(err: IdError) -> Self {
        Self::BadRequest(err.to_string())
    }
}
