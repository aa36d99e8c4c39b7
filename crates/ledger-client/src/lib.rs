//! Ledger Client SDK.
//!
//! This crate provides a typed async client for the ledger HTTP API.
//!
//! # Example
//!
//! ```no_run
//! use ledger_client::LedgerClient;
//! use ledger_core::{Decimal, Recipient, TransferRequest};
//!
//! # async fn example() -> Result<(), ledger_client::ClientError> {
//! let client = LedgerClient::new("http://ledger:8080")?;
//!
//! let alice = client.create_account("alice", Decimal::ONE_HUNDRED).await?;
//! let bob = client.create_account("bob", Decimal::ZERO).await?;
//!
//! let legs = client
//!     .transfer(
//!         alice.id,
//!         &TransferRequest {
//!             from: None,
//!             amount: Decimal::TEN,
//!             subject: "lunch".to_string(),
//!             recipients: vec![Recipient {
//!                 account_id: bob.id,
//!                 amount: Decimal::TEN,
//!             }],
//!         },
//!     )
//!     .await?;
//!
//! client.refund_transaction(alice.id, legs[0].id).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, LedgerClient};
pub use error::ClientError;
pub use types::*;
