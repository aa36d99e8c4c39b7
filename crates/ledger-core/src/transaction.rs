//! Ledger entries.
//!
//! Every settled money movement appends exactly one [`Transaction`]. Entries
//! are never updated: a refund is a new entry pointing back at the entry it
//! reverses.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, MultiBeneficiaryId, TransactionId};

/// Memo stamped on deposit entries.
pub const DEPOSIT_SUBJECT: &str = "Deposit";

/// Memo stamped on withdrawal entries.
pub const WITHDRAWAL_SUBJECT: &str = "Withdrawal";

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Entry identifier (ULID, time ordered).
    pub id: TransactionId,

    /// Account the money left. `None` for deposits.
    pub from: Option<AccountId>,

    /// Account the money reached. `None` for withdrawals.
    pub to: Option<AccountId>,

    /// Free-text memo.
    pub subject: String,

    /// Kind of movement.
    pub operation: Operation,

    /// Amount moved, always positive.
    pub amount: Decimal,

    /// Group shared by all legs of a multi-recipient transfer.
    pub multi_beneficiary_id: Option<MultiBeneficiaryId>,

    /// Whether this entry reverses an earlier one.
    pub is_refund: bool,

    /// The entry this one reverses.
    pub refunded_transaction_id: Option<TransactionId>,

    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    fn new(
        operation: Operation,
        from: Option<AccountId>,
        to: Option<AccountId>,
        amount: Decimal,
        subject: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            from,
            to,
            subject,
            operation,
            amount,
            multi_beneficiary_id: None,
            is_refund: false,
            refunded_transaction_id: None,
            created_at: Utc::now(),
        }
    }

    /// A deposit into `account`.
    #[must_use]
    pub fn deposit(account: AccountId, amount: Decimal) -> Self {
        Self::new(
            Operation::Deposit,
            None,
            Some(account),
            amount,
            DEPOSIT_SUBJECT.into(),
        )
    }

    /// A withdrawal out of `account`.
    #[must_use]
    pub fn withdrawal(account: AccountId, amount: Decimal) -> Self {
        Self::new(
            Operation::Withdraw,
            Some(account),
            None,
            amount,
            WITHDRAWAL_SUBJECT.into(),
        )
    }

    /// One leg of a transfer from `from` to `to`.
    #[must_use]
    pub fn transfer(
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        subject: impl Into<String>,
        group: Option<MultiBeneficiaryId>,
    ) -> Self {
        let mut entry = Self::new(
            Operation::Transfer,
            Some(from),
            Some(to),
            amount,
            subject.into(),
        );
        entry.multi_beneficiary_id = group;
        entry
    }

    /// The reversal of `original`: same amount and memo, direction swapped.
    ///
    /// Refund entries never carry a group id, even when the original did.
    #[must_use]
    pub fn refund_of(original: &Self) -> Self {
        let mut entry = Self::new(
            Operation::Refund,
            original.to,
            original.from,
            original.amount,
            original.subject.clone(),
        );
        entry.is_refund = true;
        entry.refunded_transaction_id = Some(original.id);
        entry
    }

    /// The account charged by this entry and by how much.
    #[must_use]
    pub fn debit(&self) -> Option<(AccountId, Decimal)> {
        self.from.map(|account| (account, self.amount))
    }

    /// The account credited by this entry and by how much.
    #[must_use]
    pub fn credit(&self) -> Option<(AccountId, Decimal)> {
        self.to.map(|account| (account, self.amount))
    }

    /// Whether `account` is on either side of the entry.
    #[must_use]
    pub fn involves(&self, account: &AccountId) -> bool {
        self.from.as_ref() == Some(account) || self.to.as_ref() == Some(account)
    }
}

/// Kind of money movement recorded by a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    /// Money entering an account from outside the ledger.
    Deposit,

    /// Money leaving an account to outside the ledger.
    Withdraw,

    /// Money moving between two accounts.
    Transfer,

    /// Reversal of an earlier transfer.
    Refund,
}

impl Operation {
    /// The wire and column representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdraw => "WITHDRAW",
            Self::Transfer => "TRANSFER",
            Self::Refund => "REFUND",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an operation code is not one of the four known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation: {0}")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAW" => Ok(Self::Withdraw),
            "TRANSFER" => Ok(Self::Transfer),
            "REFUND" => Ok(Self::Refund),
            other => Err(UnknownOperation(other.to_string())),
        }
    }
}
