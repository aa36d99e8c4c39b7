//! In-memory storage implementation.
//!
//! All state sits behind one async mutex, so every operation, including a
//! multi-leg settlement, observes and mutates a consistent snapshot.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use ledger_core::{
    Account, AccountFilter, AccountId, Decimal, MultiBeneficiaryId, Transaction, TransactionId,
};

use crate::error::{Result, StoreError};
use crate::{ensure_delta, Store};

/// In-memory `Store`, used by tests and when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<AccountId, Account>,
    /// Account ids in creation order.
    account_order: Vec<AccountId>,
    /// Ledger entries in append order.
    transactions: Vec<Transaction>,
    /// Position of each entry in `transactions`.
    by_id: HashMap<TransactionId, usize>,
    /// Original entry id to the id of the refund that reverses it.
    refunds: HashMap<TransactionId, TransactionId>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn live_account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id).filter(|a| a.deleted_at.is_none())
    }

    fn balance(&self, id: &AccountId) -> Result<Decimal> {
        self.live_account(id)
            .map(|a| a.balance)
            .ok_or_else(|| StoreError::account_not_found(id))
    }

    fn set_balance(&mut self, id: &AccountId, balance: Decimal) {
        if let Some(account) = self.accounts.get_mut(id) {
            account.balance = balance;
            account.updated_at = Utc::now();
        }
    }

    fn append(&mut self, transaction: &Transaction) {
        if let Some(original) = transaction.refunded_transaction_id {
            self.refunds.insert(original, transaction.id);
        }
        self.by_id.insert(transaction.id, self.transactions.len());
        self.transactions.push(transaction.clone());
    }

    fn check_refund_slot(&self, transaction: &Transaction) -> Result<()> {
        match transaction.refunded_transaction_id {
            Some(original) if self.refunds.contains_key(&original) => {
                Err(StoreError::AlreadyRefunded {
                    transaction_id: original,
                })
            }
            _ => Ok(()),
        }
    }
}

fn credited(balance: Decimal, amount: Decimal) -> Result<Decimal> {
    balance
        .checked_add(amount)
        .filter(|b| ledger_core::is_representable(*b))
        .ok_or(StoreError::InvalidAmount(amount))
}

#[async_trait]
impl Store for MemoryStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    async fn create_account(&self, account: &Account) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let owner_taken = inner
            .accounts
            .values()
            .any(|a| a.deleted_at.is_none() && a.owner_id == account.owner_id);
        if owner_taken {
            return Err(StoreError::DuplicateOwner {
                owner_id: account.owner_id.clone(),
            });
        }
        if inner.accounts.contains_key(&account.id) {
            return Err(StoreError::Database(format!(
                "duplicate account id: {}",
                account.id
            )));
        }

        inner.account_order.push(account.id);
        inner.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        let inner = self.inner.lock().await;
        Ok(inner.live_account(id).cloned())
    }

    async fn get_account_by_owner(&self, owner_id: &str) -> Result<Option<Account>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .accounts
            .values()
            .find(|a| a.deleted_at.is_none() && a.owner_id == owner_id)
            .cloned())
    }

    async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>> {
        let inner = self.inner.lock().await;
        let offset = usize::try_from(filter.page.offset()).unwrap_or(usize::MAX);

        Ok(inner
            .account_order
            .iter()
            .filter_map(|id| inner.live_account(id))
            .filter(|a| {
                filter
                    .owner_id
                    .as_deref()
                    .map_or(true, |owner| a.owner_id == owner)
            })
            .skip(offset)
            .take(filter.page.limit as usize)
            .cloned()
            .collect())
    }

    async fn get_balance(&self, id: &AccountId) -> Result<Option<Decimal>> {
        let inner = self.inner.lock().await;
        Ok(inner.live_account(id).map(|a| a.balance))
    }

    async fn increment_balance(&self, id: &AccountId, amount: Decimal) -> Result<Decimal> {
        ensure_delta(amount)?;
        let mut inner = self.inner.lock().await;

        let balance = credited(inner.balance(id)?, amount)?;
        inner.set_balance(id, balance);
        Ok(balance)
    }

    async fn decrement_balance(&self, id: &AccountId, amount: Decimal) -> Result<Decimal> {
        ensure_delta(amount)?;
        let mut inner = self.inner.lock().await;

        let balance = inner.balance(id)?;
        if balance < amount {
            return Err(StoreError::InsufficientFunds {
                account_id: *id,
                balance,
                required: amount,
            });
        }
        inner.set_balance(id, balance - amount);
        Ok(balance - amount)
    }

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    async fn put_transaction(&self, transaction: &Transaction) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.check_refund_slot(transaction)?;
        inner.append(transaction);
        Ok(())
    }

    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .by_id
            .get(id)
            .map(|&index| inner.transactions[index].clone()))
    }

    async fn list_transactions_by_account(
        &self,
        id: &AccountId,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Transaction>> {
        let inner = self.inner.lock().await;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);

        Ok(inner
            .transactions
            .iter()
            .rev()
            .filter(|t| t.involves(id))
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_transactions_by_group(
        &self,
        group: &MultiBeneficiaryId,
    ) -> Result<Vec<Transaction>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .transactions
            .iter()
            .filter(|t| t.multi_beneficiary_id.as_ref() == Some(group))
            .cloned()
            .collect())
    }

    async fn find_refund_of(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .refunds
            .get(id)
            .and_then(|refund_id| inner.by_id.get(refund_id))
            .map(|&index| inner.transactions[index].clone()))
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    async fn settle(&self, entries: &[Transaction]) -> Result<()> {
        let mut inner = self.inner.lock().await;

        // Stage every leg against a scratch copy of the touched balances and
        // only write back once all of them have passed.
        let mut staged: HashMap<AccountId, Decimal> = HashMap::new();
        let mut refunded: Vec<TransactionId> = Vec::new();

        for entry in entries {
            ensure_delta(entry.amount)?;
            inner.check_refund_slot(entry)?;
            if let Some(original) = entry.refunded_transaction_id {
                if refunded.contains(&original) {
                    return Err(StoreError::AlreadyRefunded {
                        transaction_id: original,
                    });
                }
                refunded.push(original);
            }

            if let Some((account, amount)) = entry.debit() {
                let balance = match staged.get(&account) {
                    Some(balance) => *balance,
                    None => inner.balance(&account)?,
                };
                if balance < amount {
                    return Err(StoreError::InsufficientFunds {
                        account_id: account,
                        balance,
                        required: amount,
                    });
                }
                staged.insert(account, balance - amount);
            }

            if let Some((account, amount)) = entry.credit() {
                let balance = match staged.get(&account) {
                    Some(balance) => *balance,
                    None => inner.balance(&account)?,
                };
                staged.insert(account, credited(balance, amount)?);
            }
        }

        for (account, balance) in staged {
            inner.set_balance(&account, balance);
        }
        for entry in entries {
            inner.append(entry);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::Page;
    use rust_decimal_macros::dec;

    async fn store_with(balances: &[Decimal]) -> (MemoryStore, Vec<AccountId>) {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for (i, balance) in balances.iter().enumerate() {
            let account = Account::new(format!("owner-{i}"), *balance);
            ids.push(account.id);
            store.create_account(&account).await.unwrap();
        }
        (store, ids)
    }

    async fn balance(store: &MemoryStore, id: &AccountId) -> Decimal {
        store.get_balance(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn owner_is_unique() {
        let store = MemoryStore::new();
        store
            .create_account(&Account::new("alice", dec!(0)))
            .await
            .unwrap();

        let result = store.create_account(&Account::new("alice", dec!(5))).await;
        assert!(matches!(result, Err(StoreError::DuplicateOwner { .. })));

        let found = store.get_account_by_owner("alice").await.unwrap().unwrap();
        assert_eq!(found.balance, dec!(0));
        assert!(store.get_account_by_owner("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn increment_and_decrement() {
        let (store, ids) = store_with(&[dec!(100)]).await;

        assert_eq!(store.increment_balance(&ids[0], dec!(25)).await.unwrap(), dec!(125));
        assert_eq!(store.decrement_balance(&ids[0], dec!(125)).await.unwrap(), dec!(0));

        let overdraw = store.decrement_balance(&ids[0], dec!(0.01)).await;
        assert!(matches!(overdraw, Err(StoreError::InsufficientFunds { .. })));
        assert_eq!(balance(&store, &ids[0]).await, dec!(0));

        let zero = store.increment_balance(&ids[0], dec!(0)).await;
        assert!(matches!(zero, Err(StoreError::InvalidAmount(_))));

        let too_fine = store.increment_balance(&ids[0], dec!(0.00001)).await;
        assert!(matches!(too_fine, Err(StoreError::InvalidAmount(_))));

        let missing = store.increment_balance(&AccountId::generate(), dec!(1)).await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn list_accounts_paginates_in_creation_order() {
        let (store, ids) = store_with(&[dec!(1), dec!(2), dec!(3)]).await;

        let first = store
            .list_accounts(&AccountFilter {
                owner_id: None,
                page: Page::new(Some(2), Some(1)),
            })
            .await
            .unwrap();
        assert_eq!(
            first.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![ids[0], ids[1]]
        );

        let second = store
            .list_accounts(&AccountFilter {
                owner_id: None,
                page: Page::new(Some(2), Some(2)),
            })
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, ids[2]);

        let by_owner = store
            .list_accounts(&AccountFilter {
                owner_id: Some("owner-1".into()),
                page: Page::default(),
            })
            .await
            .unwrap();
        assert_eq!(by_owner.len(), 1);
        assert_eq!(by_owner[0].id, ids[1]);
    }

    #[tokio::test]
    async fn settle_applies_every_leg() {
        let (store, ids) = store_with(&[dec!(100), dec!(0), dec!(0)]).await;
        let group = MultiBeneficiaryId::generate();
        let legs = vec![
            Transaction::transfer(ids[0], ids[1], dec!(20), "split", Some(group)),
            Transaction::transfer(ids[0], ids[2], dec!(30), "split", Some(group)),
        ];

        store.settle(&legs).await.unwrap();

        assert_eq!(balance(&store, &ids[0]).await, dec!(50));
        assert_eq!(balance(&store, &ids[1]).await, dec!(20));
        assert_eq!(balance(&store, &ids[2]).await, dec!(30));

        let grouped = store.list_transactions_by_group(&group).await.unwrap();
        assert_eq!(grouped, legs);
    }

    #[tokio::test]
    async fn settle_is_all_or_nothing() {
        let (store, ids) = store_with(&[dec!(40), dec!(0), dec!(0)]).await;
        let legs = vec![
            Transaction::transfer(ids[0], ids[1], dec!(30), "split", None),
            Transaction::transfer(ids[0], ids[2], dec!(30), "split", None),
        ];

        let result = store.settle(&legs).await;

        assert!(matches!(
            result,
            Err(StoreError::InsufficientFunds { balance: seen, .. }) if seen == dec!(10)
        ));
        assert_eq!(balance(&store, &ids[0]).await, dec!(40));
        assert_eq!(balance(&store, &ids[1]).await, dec!(0));
        assert!(store.get_transaction(&legs[0].id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn credit_past_the_ceiling_is_rejected() {
        let ceiling = ledger_core::max_money() - dec!(0.0001);
        let (store, ids) = store_with(&[ceiling, dec!(1)]).await;

        let deposit = store.increment_balance(&ids[0], dec!(0.0001)).await;
        assert!(matches!(deposit, Err(StoreError::InvalidAmount(_))));

        let result = store
            .settle(&[Transaction::transfer(ids[1], ids[0], dec!(1), "x", None)])
            .await;
        assert!(matches!(result, Err(StoreError::InvalidAmount(_))));
        assert_eq!(balance(&store, &ids[0]).await, ceiling);
        assert_eq!(balance(&store, &ids[1]).await, dec!(1));
    }

    #[tokio::test]
    async fn huge_balances_do_not_panic() {
        let (store, ids) = store_with(&[Decimal::MAX]).await;

        let result = store
            .settle(&[Transaction::deposit(ids[0], Decimal::ONE)])
            .await;

        assert!(matches!(result, Err(StoreError::InvalidAmount(_))));
        assert_eq!(balance(&store, &ids[0]).await, Decimal::MAX);
    }

    #[tokio::test]
    async fn settle_rejects_unknown_accounts() {
        let (store, ids) = store_with(&[dec!(40)]).await;
        let ghost = AccountId::generate();

        let result = store
            .settle(&[Transaction::transfer(ids[0], ghost, dec!(5), "x", None)])
            .await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        assert_eq!(balance(&store, &ids[0]).await, dec!(40));
    }

    #[tokio::test]
    async fn second_refund_of_same_entry_is_rejected() {
        let (store, ids) = store_with(&[dec!(10), dec!(0)]).await;
        let original = Transaction::transfer(ids[0], ids[1], dec!(10), "x", None);
        store.settle(&[original.clone()]).await.unwrap();

        let refund = Transaction::refund_of(&original);
        store.settle(&[refund.clone()]).await.unwrap();
        assert_eq!(
            store.find_refund_of(&original.id).await.unwrap(),
            Some(refund)
        );

        store.increment_balance(&ids[1], dec!(10)).await.unwrap();
        let again = store.settle(&[Transaction::refund_of(&original)]).await;
        assert!(matches!(again, Err(StoreError::AlreadyRefunded { .. })));
        assert_eq!(balance(&store, &ids[0]).await, dec!(10));
    }

    #[tokio::test]
    async fn history_is_newest_first_for_both_sides() {
        let (store, ids) = store_with(&[dec!(0), dec!(0)]).await;
        let deposit = Transaction::deposit(ids[0], dec!(10));
        let transfer = Transaction::transfer(ids[0], ids[1], dec!(4), "x", None);
        let withdrawal = Transaction::withdrawal(ids[1], dec!(1));
        store
            .settle(&[deposit.clone(), transfer.clone(), withdrawal.clone()])
            .await
            .unwrap();

        let first = store.list_transactions_by_account(&ids[0], 10, 0).await.unwrap();
        assert_eq!(first, vec![transfer.clone(), deposit]);

        let second = store.list_transactions_by_account(&ids[1], 1, 0).await.unwrap();
        assert_eq!(second, vec![withdrawal]);
        let second_page = store.list_transactions_by_account(&ids[1], 1, 1).await.unwrap();
        assert_eq!(second_page, vec![transfer]);

        let empty = store.list_transactions_by_account(&ids[1], 10, 5).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn put_transaction_leaves_balances_alone() {
        let (store, ids) = store_with(&[dec!(7)]).await;
        let entry = Transaction::deposit(ids[0], dec!(3));

        store.put_transaction(&entry).await.unwrap();

        assert_eq!(balance(&store, &ids[0]).await, dec!(7));
        assert_eq!(store.get_transaction(&entry.id).await.unwrap(), Some(entry));
    }
}
