//! Account types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amount::ensure_representable;
use crate::error::{LedgerError, Result};
use crate::AccountId;

/// A ledger account.
///
/// Each owner holds at most one account. The balance never drops below
/// zero once an operation has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier, fixed at creation.
    pub id: AccountId,

    /// The owner of the account.
    pub owner_id: String,

    /// Current balance.
    pub balance: Decimal,

    /// When the account was opened.
    pub created_at: DateTime<Utc>,

    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker. Kept for schema compatibility, nothing sets it.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Open a new account with a fresh identifier.
    #[must_use]
    pub fn new(owner_id: impl Into<String>, balance: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::generate(),
            owner_id: owner_id.into(),
            balance,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether `amount` can be taken out of this account.
    #[must_use]
    pub fn covers(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}

/// Account creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    /// The owner of the new account.
    pub owner_id: String,

    /// Opening balance.
    #[serde(default)]
    pub balance: Decimal,
}

impl NewAccount {
    /// Check the owner is present and the opening balance is not negative
    /// and fits the stored precision.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if self.owner_id.trim().is_empty() {
            return Err(LedgerError::validation("owner_id must not be empty"));
        }
        if self.balance < Decimal::ZERO {
            return Err(LedgerError::validation("balance must not be negative"));
        }
        ensure_representable(self.balance)
    }

    /// Build the account this request describes.
    #[must_use]
    pub fn into_account(self) -> Account {
        Account::new(self.owner_id.trim(), self.balance)
    }
}
