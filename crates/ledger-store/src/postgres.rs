//! PostgreSQL storage implementation.
//!
//! Balance updates are single `UPDATE ... SET balance = balance ± $1`
//! statements; debits carry a `balance >= $1` guard so the check and the
//! write happen under the same row lock. Settlements run inside one
//! database transaction and roll back on the first failing leg.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use uuid::Uuid;

use ledger_core::{
    Account, AccountFilter, AccountId, Decimal, MultiBeneficiaryId, Operation, Transaction,
    TransactionId,
};

use crate::error::{Result, StoreError};
use crate::schema::constraint;
use crate::{ensure_delta, Store};

/// SQLSTATE for `numeric_value_out_of_range`.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database at `url` with a pool of up to `max_connections`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be established.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        tracing::debug!(max_connections, "Connected to PostgreSQL");

        Ok(Self { pool })
    }

    /// Apply the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::debug!("Database migrations applied");
        Ok(())
    }

    async fn credit(conn: &mut PgConnection, id: &AccountId, amount: Decimal) -> Result<Decimal> {
        let balance: Option<Decimal> = sqlx::query_scalar(
            "UPDATE accounts SET balance = balance + $1, updated_at = now() \
             WHERE id = $2 AND deleted_at IS NULL \
             RETURNING balance",
        )
        .bind(amount)
        .bind(*id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|err| {
            if is_out_of_range(&err) {
                StoreError::InvalidAmount(amount)
            } else {
                StoreError::from(err)
            }
        })?;

        balance.ok_or_else(|| StoreError::account_not_found(id))
    }

    async fn debit(conn: &mut PgConnection, id: &AccountId, amount: Decimal) -> Result<Decimal> {
        let balance: Option<Decimal> = sqlx::query_scalar(
            "UPDATE accounts SET balance = balance - $1, updated_at = now() \
             WHERE id = $2 AND deleted_at IS NULL AND balance >= $1 \
             RETURNING balance",
        )
        .bind(amount)
        .bind(*id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(balance) = balance {
            return Ok(balance);
        }

        // The guarded update matched nothing: either the account is gone or
        // it cannot cover the debit.
        let current: Option<Decimal> = sqlx::query_scalar(
            "SELECT balance FROM accounts WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?;

        match current {
            None => Err(StoreError::account_not_found(id)),
            Some(balance) => Err(StoreError::InsufficientFunds {
                account_id: *id,
                balance,
                required: amount,
            }),
        }
    }

    /// Fail with `AlreadyRefunded` if a refund entry already reverses `original`.
    async fn ensure_not_refunded(conn: &mut PgConnection, original: TransactionId) -> Result<()> {
        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM transactions WHERE refunded_transaction_id = $1")
                .bind(original.to_string())
                .fetch_optional(&mut *conn)
                .await?;

        match existing {
            Some(_) => Err(StoreError::AlreadyRefunded {
                transaction_id: original,
            }),
            None => Ok(()),
        }
    }

    async fn insert_transaction(conn: &mut PgConnection, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            "INSERT INTO transactions \
             (id, from_account, to_account, subject, operation, amount, \
              multi_beneficiary_id, is_refund, refunded_transaction_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(transaction.id.to_string())
        .bind(transaction.from.map(|id| *id.as_uuid()))
        .bind(transaction.to.map(|id| *id.as_uuid()))
        .bind(&transaction.subject)
        .bind(transaction.operation.as_str())
        .bind(transaction.amount)
        .bind(transaction.multi_beneficiary_id.map(|id| *id.as_uuid()))
        .bind(transaction.is_refund)
        .bind(transaction.refunded_transaction_id.map(|id| id.to_string()))
        .bind(transaction.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|err| match (violated_constraint(&err), transaction.refunded_transaction_id) {
            (Some(constraint::TRANSACTIONS_REFUND_UNIQUE), Some(original)) => {
                StoreError::AlreadyRefunded {
                    transaction_id: original,
                }
            }
            _ => StoreError::from(err),
        })?;

        Ok(())
    }
}

/// Whether the database rejected a value as out of the column's range.
fn is_out_of_range(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE),
        _ => false,
    }
}

/// Name of the constraint a database error tripped, if any.
fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) => db.constraint(),
        _ => None,
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    owner_id: String,
    balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: AccountId::from_uuid(row.id),
            owner_id: row.owner_id,
            balance: row.balance,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: String,
    from_account: Option<Uuid>,
    to_account: Option<Uuid>,
    subject: String,
    operation: String,
    amount: Decimal,
    multi_beneficiary_id: Option<Uuid>,
    is_refund: bool,
    refunded_transaction_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        let decode = |e: &dyn std::fmt::Display| StoreError::Serialization(e.to_string());

        Ok(Self {
            id: row.id.parse::<TransactionId>().map_err(|e| decode(&e))?,
            from: row.from_account.map(AccountId::from_uuid),
            to: row.to_account.map(AccountId::from_uuid),
            subject: row.subject,
            operation: row.operation.parse::<Operation>().map_err(|e| decode(&e))?,
            amount: row.amount,
            multi_beneficiary_id: row.multi_beneficiary_id.map(MultiBeneficiaryId::from_uuid),
            is_refund: row.is_refund,
            refunded_transaction_id: row
                .refunded_transaction_id
                .map(|id| id.parse::<TransactionId>())
                .transpose()
                .map_err(|e| decode(&e))?,
            created_at: row.created_at,
        })
    }
}

fn into_transactions(rows: Vec<TransactionRow>) -> Result<Vec<Transaction>> {
    rows.into_iter().map(Transaction::try_from).collect()
}

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    async fn create_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            "INSERT INTO accounts (id, owner_id, balance, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(*account.id.as_uuid())
        .bind(&account.owner_id)
        .bind(account.balance)
        .bind(account.created_at)
        .bind(account.updated_at)
        .bind(account.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match violated_constraint(&err) {
            Some(constraint::ACCOUNTS_OWNER_UNIQUE) => StoreError::DuplicateOwner {
                owner_id: account.owner_id.clone(),
            },
            _ => StoreError::from(err),
        })?;

        Ok(())
    }

    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, owner_id, balance, created_at, updated_at, deleted_at \
             FROM accounts WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Account::from))
    }

    async fn get_account_by_owner(&self, owner_id: &str) -> Result<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, owner_id, balance, created_at, updated_at, deleted_at \
             FROM accounts WHERE owner_id = $1 AND deleted_at IS NULL",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Account::from))
    }

    async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            "SELECT id, owner_id, balance, created_at, updated_at, deleted_at \
             FROM accounts \
             WHERE deleted_at IS NULL AND ($1::TEXT IS NULL OR owner_id = $1) \
             ORDER BY created_at, id \
             LIMIT $2 OFFSET $3",
        )
        .bind(filter.owner_id.as_deref())
        .bind(i64::from(filter.page.limit))
        .bind(i64::try_from(filter.page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn get_balance(&self, id: &AccountId) -> Result<Option<Decimal>> {
        let balance = sqlx::query_scalar(
            "SELECT balance FROM accounts WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    async fn increment_balance(&self, id: &AccountId, amount: Decimal) -> Result<Decimal> {
        ensure_delta(amount)?;
        let mut conn = self.pool.acquire().await?;
        Self::credit(&mut conn, id, amount).await
    }

    async fn decrement_balance(&self, id: &AccountId, amount: Decimal) -> Result<Decimal> {
        ensure_delta(amount)?;
        let mut conn = self.pool.acquire().await?;
        Self::debit(&mut conn, id, amount).await
    }

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    async fn put_transaction(&self, transaction: &Transaction) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_transaction(&mut conn, transaction).await
    }

    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let row: Option<TransactionRow> = sqlx::query_as(
            "SELECT id, from_account, to_account, subject, operation, amount, \
                    multi_beneficiary_id, is_refund, refunded_transaction_id, created_at \
             FROM transactions WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Transaction::try_from).transpose()
    }

    async fn list_transactions_by_account(
        &self,
        id: &AccountId,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            "SELECT id, from_account, to_account, subject, operation, amount, \
                    multi_beneficiary_id, is_refund, refunded_transaction_id, created_at \
             FROM transactions \
             WHERE from_account = $1 OR to_account = $1 \
             ORDER BY seq DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(*id.as_uuid())
        .bind(i64::from(limit))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        into_transactions(rows)
    }

    async fn list_transactions_by_group(
        &self,
        group: &MultiBeneficiaryId,
    ) -> Result<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            "SELECT id, from_account, to_account, subject, operation, amount, \
                    multi_beneficiary_id, is_refund, refunded_transaction_id, created_at \
             FROM transactions \
             WHERE multi_beneficiary_id = $1 \
             ORDER BY seq",
        )
        .bind(*group.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        into_transactions(rows)
    }

    async fn find_refund_of(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let row: Option<TransactionRow> = sqlx::query_as(
            "SELECT id, from_account, to_account, subject, operation, amount, \
                    multi_beneficiary_id, is_refund, refunded_transaction_id, created_at \
             FROM transactions WHERE refunded_transaction_id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Transaction::try_from).transpose()
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    async fn settle(&self, entries: &[Transaction]) -> Result<()> {
        let mut refunded: Vec<TransactionId> = Vec::new();
        for entry in entries {
            ensure_delta(entry.amount)?;
            if let Some(original) = entry.refunded_transaction_id {
                if refunded.contains(&original) {
                    return Err(StoreError::AlreadyRefunded {
                        transaction_id: original,
                    });
                }
                refunded.push(original);
            }
        }

        let mut tx = self.pool.begin().await?;

        // Lock every touched account up front in a fixed order so two
        // settlements over the same accounts cannot deadlock.
        let mut touched: Vec<Uuid> = entries
            .iter()
            .flat_map(|e| [e.from, e.to])
            .flatten()
            .map(|id| *id.as_uuid())
            .collect();
        touched.sort_unstable();
        touched.dedup();

        sqlx::query("SELECT id FROM accounts WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(touched.as_slice())
            .execute(&mut *tx)
            .await?;

        // Report a repeated refund before any debit can fail on the
        // already-reversed balance. The unique index still backs this up
        // against a concurrent refund.
        for original in refunded {
            Self::ensure_not_refunded(&mut tx, original).await?;
        }

        for entry in entries {
            if let Some((account, amount)) = entry.debit() {
                Self::debit(&mut tx, &account, amount).await?;
            }
            if let Some((account, amount)) = entry.credit() {
                Self::credit(&mut tx, &account, amount).await?;
            }
            Self::insert_transaction(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
