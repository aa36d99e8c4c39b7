//! Transfer, history and refund handlers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use ledger_core::{Page, RefundRequest, Transaction, TransferRequest};

use super::{account_id, TransactionsResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Transfer money from the account in the path to the listed recipients.
pub async fn transfer_money(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let id = account_id(&id)?;
    let Json(body) = body?;
    let source = body.source(id)?;

    let legs = state
        .ledger
        .transfer(source, &body)
        .await
        .map_err(|e| ApiError::from(e).missing_as_bad_request())?;

    tracing::info!(
        from = %source,
        amount = %body.amount,
        recipients = body.recipients.len(),
        multi_beneficiary_id = ?legs.first().and_then(|t| t.multi_beneficiary_id),
        "Transfer settled"
    );

    Ok(Json(legs.into()))
}

/// History query parameters.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Page size (default: 10, max: 100).
    pub limit: Option<i64>,
    /// One-based page number (default: 1).
    pub page: Option<i64>,
}

/// List the ledger entries of an account, newest first.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let id = account_id(&id)?;
    let Query(query) = query?;

    let page = Page::new(query.limit, query.page);
    Ok(Json(state.ledger.transaction_history(id, page).await?))
}

/// Refund a single entry or a multi-beneficiary group.
///
/// The account in the path is only checked for shape; the request body
/// decides what is refunded.
pub async fn refund_money(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<RefundRequest>, JsonRejection>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    account_id(&id)?;
    let Json(body) = body?;

    let refunds = state
        .ledger
        .refund(&body)
        .await
        .map_err(|e| ApiError::from(e).missing_as_bad_request())?;

    for refund in &refunds {
        tracing::info!(
            transaction_id = %refund.id,
            refunded_transaction_id = ?refund.refunded_transaction_id,
            amount = %refund.amount,
            "Refund settled"
        );
    }

    Ok(Json(refunds.into()))
}
