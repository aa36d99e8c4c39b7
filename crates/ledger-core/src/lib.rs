//! Core types for the ledger service.
//!
//! This crate provides the data model shared by the store, the service and
//! the client:
//!
//! - **Identifiers**: `AccountId`, `TransactionId`, `MultiBeneficiaryId`
//! - **Accounts**: `Account`, `NewAccount`
//! - **Ledger entries**: `Transaction`, `Operation`
//! - **Amounts**: precision and range rules for money
//! - **Requests**: `TransferRequest`, `RefundRequest`, `Page`, `AccountFilter`
//! - **Errors**: `LedgerError`
//!
//! # Amounts
//!
//! Money is carried as [`rust_decimal::Decimal`] so that split transfers add
//! up exactly. Balances never go below zero after a committed operation,
//! and every amount fits the stored precision (see [`amount`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod amount;
pub mod error;
pub mod ids;
pub mod request;
pub mod transaction;

pub use account::{Account, NewAccount};
pub use amount::{
    checked_sum, ensure_positive, ensure_representable, is_representable, max_money, MONEY_SCALE,
};
pub use error::{LedgerError, Result};
pub use ids::{AccountId, IdError, MultiBeneficiaryId, TransactionId};
pub use request::{
    AccountFilter, Page, Recipient, RefundRequest, RefundTarget, TransferRequest,
    DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
pub use rust_decimal::Decimal;
pub use transaction::{Operation, Transaction, UnknownOperation};
