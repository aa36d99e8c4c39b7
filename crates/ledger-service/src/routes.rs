//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, health, transactions};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// - `GET /health` - Health check
///
/// ## Accounts
/// - `POST /accounts` - Create an account
/// - `GET /accounts` - List accounts (`limit`, `page`, `owner_id`)
/// - `GET /accounts/{id}` - Get an account
/// - `GET /accounts/{id}/balance` - Get the balance
/// - `POST /accounts/{id}/deposit?amount=` - Deposit
/// - `POST /accounts/{id}/withdraw?amount=` - Withdraw
///
/// ## Transactions
/// - `POST /accounts/{id}/transfer_money` - Transfer to one or more recipients
/// - `GET /accounts/{id}/transactions` - History (`limit`, `page`)
/// - `POST /accounts/{id}/refund_money` - Refund an entry or a group
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;
    let max_concurrent_requests = state.config.max_concurrent_requests.max(1);

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health))
        // Accounts
        .route(
            "/accounts",
            post(accounts::create_account).get(accounts::list_accounts),
        )
        .route("/accounts/:id", get(accounts::get_account))
        .route("/accounts/:id/balance", get(accounts::get_balance))
        .route("/accounts/:id/deposit", post(accounts::deposit))
        .route("/accounts/:id/withdraw", post(accounts::withdraw))
        // Transactions
        .route(
            "/accounts/:id/transfer_money",
            post(transactions::transfer_money),
        )
        .route(
            "/accounts/:id/transactions",
            get(transactions::list_transactions),
        )
        .route("/accounts/:id/refund_money", post(transactions::refund_money))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
