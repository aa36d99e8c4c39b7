//! Storage layer for the ledger service.
//!
//! This crate persists accounts and ledger entries behind the [`Store`]
//! trait. Two backends are provided:
//!
//! - [`PgStore`]: PostgreSQL through `sqlx`, with embedded migrations
//! - [`MemoryStore`]: in-process maps, for tests and local runs
//!
//! # Settlement
//!
//! Balance changes and the ledger entries that explain them are written
//! together by [`Store::settle`]. A settlement is all-or-nothing: either
//! every leg is applied and every entry appended, or nothing is.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{Account, Decimal, Transaction};
//! use ledger_store::{PgStore, Store};
//!
//! # async fn example() -> ledger_store::Result<()> {
//! let store = PgStore::connect("postgres://localhost/ledger", 5).await?;
//! store.migrate().await?;
//!
//! let account = Account::new("alice", Decimal::ZERO);
//! store.create_account(&account).await?;
//!
//! // Deposit: credit the balance and append the entry in one unit
//! store
//!     .settle(&[Transaction::deposit(account.id, Decimal::ONE_HUNDRED)])
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use ledger_core::{
    Account, AccountFilter, AccountId, Decimal, MultiBeneficiaryId, Transaction, TransactionId,
};

/// The storage trait defining all database operations.
///
/// Implementations must make every balance change an atomic arithmetic
/// update on the stored value, never a read-modify-write in application
/// code, so concurrent requests on the same account serialize correctly.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateOwner` if a live account already
    /// belongs to the same owner.
    async fn create_account(&self, account: &Account) -> Result<()>;

    /// Get an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>>;

    /// Get the live account held by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_account_by_owner(&self, owner_id: &str) -> Result<Option<Account>>;

    /// List live accounts in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>>;

    /// Current balance of an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_balance(&self, id: &AccountId) -> Result<Option<Decimal>>;

    /// Add `amount` to the balance. Returns the new balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidAmount` if `amount <= 0`, is finer than the
    ///   stored precision, or the new balance would overflow.
    /// - `StoreError::NotFound` if the account doesn't exist.
    async fn increment_balance(&self, id: &AccountId, amount: Decimal) -> Result<Decimal>;

    /// Subtract `amount` from the balance. Returns the new balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidAmount` if `amount <= 0` or is finer than the
    ///   stored precision.
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InsufficientFunds` if the balance is below `amount`.
    async fn decrement_balance(&self, id: &AccountId, amount: Decimal) -> Result<Decimal>;

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// Append a ledger entry without touching any balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyRefunded` if the entry is a second refund
    /// of the same original.
    async fn put_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Get a ledger entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>>;

    /// Entries where the account is on either side, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_transactions_by_account(
        &self,
        id: &AccountId,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Transaction>>;

    /// All entries of a multi-beneficiary group, in the order they were written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_transactions_by_group(
        &self,
        group: &MultiBeneficiaryId,
    ) -> Result<Vec<Transaction>>;

    /// The refund entry that reverses `id`, if one was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_refund_of(&self, id: &TransactionId) -> Result<Option<Transaction>>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Settle ledger entries atomically.
    ///
    /// For each entry, in order: debit `entry.debit()`, credit
    /// `entry.credit()`, append the entry. Every debit is guarded against
    /// taking a balance below zero. If any step fails nothing is applied.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidAmount` if an entry amount is not positive, is
    ///   finer than the stored precision, or a credit would overflow.
    /// - `StoreError::NotFound` if a debited or credited account doesn't exist.
    /// - `StoreError::InsufficientFunds` if a debit would overdraw an account.
    /// - `StoreError::AlreadyRefunded` if a refund entry targets an entry
    ///   that was already refunded. This is checked before any balance
    ///   moves.
    async fn settle(&self, entries: &[Transaction]) -> Result<()>;
}

pub(crate) fn ensure_delta(amount: Decimal) -> Result<()> {
    if amount > Decimal::ZERO && ledger_core::is_representable(amount) {
        Ok(())
    } else {
        Err(StoreError::InvalidAmount(amount))
    }
}
