//! Ledger HTTP API Service.
//!
//! This crate provides the ledger engine and its HTTP API:
//!
//! - Account creation, listing and balances
//! - Deposits and withdrawals
//! - Single and multi-recipient transfers
//! - Refunds of single entries and of multi-recipient groups
//! - Paginated transaction history
//!
//! The engine ([`Ledger`]) is independent of HTTP and of the storage
//! backend; the router ([`create_router`]) wires it to `axum` handlers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use engine::Ledger;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
