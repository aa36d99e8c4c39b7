//! Account, balance, deposit and withdrawal handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use ledger_core::{Account, AccountFilter, AccountId, Decimal, NewAccount, Page};

use super::{account_id, TransactionsResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Create an account.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewAccount>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let Json(body) = body?;

    let account = state.ledger.create_account(body).await?;

    tracing::info!(
        account_id = %account.id,
        owner_id = %account.owner_id,
        balance = %account.balance,
        "Account created"
    );

    Ok((StatusCode::CREATED, Json(account)))
}

/// Account list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    /// Page size (default: 10, max: 100).
    pub limit: Option<i64>,
    /// One-based page number (default: 1).
    pub page: Option<i64>,
    /// Only list the account of this owner.
    pub owner_id: Option<String>,
}

/// List accounts in creation order.
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListAccountsQuery>, QueryRejection>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let Query(query) = query?;

    let filter = AccountFilter {
        owner_id: query.owner_id.filter(|o| !o.trim().is_empty()),
        page: Page::new(query.limit, query.page),
    };

    Ok(Json(state.ledger.list_accounts(filter).await?))
}

/// Get a single account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Account>, ApiError> {
    let id = account_id(&id)?;
    Ok(Json(state.ledger.get_account(id).await?))
}

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// The account.
    pub account_id: AccountId,
    /// Current balance.
    pub balance: Decimal,
}

/// Get the current balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let id = account_id(&id)?;
    let balance = state.ledger.get_account_balance(id).await?;

    Ok(Json(BalanceResponse {
        account_id: id,
        balance,
    }))
}

/// `?amount=` query of deposits and withdrawals.
#[derive(Debug, Deserialize)]
pub struct AmountQuery {
    /// Amount to move.
    pub amount: Option<String>,
}

impl AmountQuery {
    fn amount(&self) -> Result<Decimal, ApiError> {
        let raw = self
            .amount
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| ApiError::BadRequest("amount is required".into()))?;

        Decimal::from_str(raw)
            .map_err(|e| ApiError::BadRequest(format!("invalid amount {raw:?}: {e}")))
    }
}

/// Deposit money into an account.
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<AmountQuery>, QueryRejection>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let id = account_id(&id)?;
    let Query(query) = query?;
    let amount = query.amount()?;

    let entry = state
        .ledger
        .deposit(id, amount)
        .await
        .map_err(|e| ApiError::from(e).missing_as_bad_request())?;

    tracing::info!(
        account_id = %id,
        amount = %amount,
        transaction_id = %entry.id,
        "Deposit settled"
    );

    Ok(Json(vec![entry].into()))
}

/// Withdraw money from an account.
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<AmountQuery>, QueryRejection>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let id = account_id(&id)?;
    let Query(query) = query?;
    let amount = query.amount()?;

    let entry = state
        .ledger
        .withdraw(id, amount)
        .await
        .map_err(|e| ApiError::from(e).missing_as_bad_request())?;

    tracing::info!(
        account_id = %id,
        amount = %amount,
        transaction_id = %entry.id,
        "Withdrawal settled"
    );

    Ok(Json(vec![entry].into()))
}
