//! Account operations, deposits and withdrawals.

use ledger_core::{
    ensure_positive, Account, AccountFilter, AccountId, Decimal, LedgerError, NewAccount, Result,
    Transaction,
};

use super::Ledger;

impl Ledger {
    /// Open an account for an owner that does not hold one yet.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Validation` for a blank owner or a negative balance.
    /// - `LedgerError::DuplicateOwner` if the owner already holds an account.
    pub async fn create_account(&self, request: NewAccount) -> Result<Account> {
        request.validate()?;

        let owner_id = request.owner_id.trim();
        if self.store.get_account_by_owner(owner_id).await?.is_some() {
            return Err(LedgerError::DuplicateOwner {
                owner_id: owner_id.to_string(),
            });
        }

        // The store's unique index still decides concurrent creations.
        let account = request.into_account();
        self.store.create_account(&account).await?;
        Ok(account)
    }

    /// Look up an account.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` if no live account has this id.
    pub async fn get_account(&self, id: AccountId) -> Result<Account> {
        self.store
            .get_account(&id)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(&id))
    }

    /// Current balance of an account.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` if no live account has this id.
    pub async fn get_account_balance(&self, id: AccountId) -> Result<Decimal> {
        self.store
            .get_balance(&id)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(&id))
    }

    /// Whether a live account has this id.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the lookup fails.
    pub async fn account_exists(&self, id: AccountId) -> Result<bool> {
        Ok(self.store.get_account(&id).await?.is_some())
    }

    /// Accounts in creation order, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the lookup fails.
    pub async fn list_accounts(&self, filter: AccountFilter) -> Result<Vec<Account>> {
        Ok(self.store.list_accounts(&filter).await?)
    }

    /// Whether taking `amount` would overdraw the account.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` for an unknown account. A failed
    /// lookup is reported, never read as "sufficient".
    pub async fn has_insufficient_funds(&self, id: AccountId, amount: Decimal) -> Result<bool> {
        Ok(amount > self.get_account_balance(id).await?)
    }

    /// Credit an account from outside the ledger.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Validation` if `amount <= 0`.
    /// - `LedgerError::AccountNotFound` for an unknown account.
    pub async fn deposit(&self, id: AccountId, amount: Decimal) -> Result<Transaction> {
        ensure_positive(amount)?;
        self.get_account(id).await?;

        let entry = Transaction::deposit(id, amount);
        self.store.settle(std::slice::from_ref(&entry)).await?;
        Ok(entry)
    }

    /// Debit an account to outside the ledger.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Validation` if `amount <= 0`.
    /// - `LedgerError::AccountNotFound` for an unknown account.
    /// - `LedgerError::InsufficientFunds` if the balance is below `amount`.
    pub async fn withdraw(&self, id: AccountId, amount: Decimal) -> Result<Transaction> {
        ensure_positive(amount)?;
        self.ensure_covers(id, amount).await?;

        let entry = Transaction::withdrawal(id, amount);
        self.store.settle(std::slice::from_ref(&entry)).await?;
        Ok(entry)
    }

    /// Fail with `InsufficientFunds` unless the account holds `required`.
    pub(crate) async fn ensure_covers(&self, id: AccountId, required: Decimal) -> Result<()> {
        let account = self.get_account(id).await?;
        if !account.covers(required) {
            return Err(LedgerError::InsufficientFunds {
                account_id: id,
                balance: account.balance,
                required,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ledger_core::{Operation, Page};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::engine::testing::{balance, ledger, open};

    #[tokio::test]
    async fn create_account_trims_owner() {
        let ledger = ledger();
        let account = open(&ledger, "  alice ", dec!(100)).await;

        assert_eq!(account.owner_id, "alice");
        assert_eq!(ledger.get_account(account.id).await.unwrap(), account);
        assert!(ledger.account_exists(account.id).await.unwrap());
    }

    #[tokio::test]
    async fn create_account_rejects_second_account_for_owner() {
        let ledger = ledger();
        open(&ledger, "alice", dec!(0)).await;

        let result = ledger
            .create_account(NewAccount {
                owner_id: "alice".into(),
                balance: dec!(5),
            })
            .await;

        assert!(matches!(result, Err(LedgerError::DuplicateOwner { .. })));
    }

    #[tokio::test]
    async fn create_account_validates_input() {
        let ledger = ledger();

        let negative = ledger
            .create_account(NewAccount {
                owner_id: "bob".into(),
                balance: dec!(-1),
            })
            .await;
        assert!(matches!(negative, Err(LedgerError::Validation(_))));

        let blank = ledger
            .create_account(NewAccount {
                owner_id: String::new(),
                balance: dec!(1),
            })
            .await;
        assert!(matches!(blank, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let ledger = ledger();
        let id = AccountId::generate();

        assert!(!ledger.account_exists(id).await.unwrap());
        assert!(matches!(
            ledger.get_account_balance(id).await,
            Err(LedgerError::AccountNotFound { .. })
        ));
        assert!(matches!(
            ledger.has_insufficient_funds(id, dec!(1)).await,
            Err(LedgerError::AccountNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn deposit_then_withdraw_restores_balance() {
        let ledger = ledger();
        let account = open(&ledger, "alice", dec!(100)).await;

        let deposit = ledger.deposit(account.id, dec!(50)).await.unwrap();
        assert_eq!(deposit.operation, Operation::Deposit);
        assert_eq!(deposit.to, Some(account.id));
        assert_eq!(deposit.from, None);
        assert_eq!(balance(&ledger, account.id).await, dec!(150));

        let withdrawal = ledger.withdraw(account.id, dec!(50)).await.unwrap();
        assert_eq!(withdrawal.operation, Operation::Withdraw);
        assert_eq!(withdrawal.from, Some(account.id));
        assert_eq!(balance(&ledger, account.id).await, dec!(100));

        let history = ledger
            .transaction_history(account.id, Page::default())
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let ledger = ledger();
        let account = open(&ledger, "alice", dec!(10)).await;

        for amount in [dec!(0), dec!(-5)] {
            assert!(matches!(
                ledger.deposit(account.id, amount).await,
                Err(LedgerError::Validation(_))
            ));
            assert!(matches!(
                ledger.withdraw(account.id, amount).await,
                Err(LedgerError::Validation(_))
            ));
        }
        assert_eq!(balance(&ledger, account.id).await, dec!(10));
    }

    #[tokio::test]
    async fn amounts_beyond_stored_precision_are_rejected() {
        let ledger = ledger();
        let account = open(&ledger, "alice", dec!(10)).await;

        for amount in [dec!(0.00001), dec!(10000000000000000)] {
            assert!(matches!(
                ledger.deposit(account.id, amount).await,
                Err(LedgerError::Validation(_))
            ));
            assert!(matches!(
                ledger.withdraw(account.id, amount).await,
                Err(LedgerError::Validation(_))
            ));
        }
        assert_eq!(balance(&ledger, account.id).await, dec!(10));
    }

    #[tokio::test]
    async fn deposit_past_the_ceiling_is_rejected_without_panicking() {
        let ledger = ledger();
        let ceiling = ledger_core::max_money() - dec!(0.0001);
        let account = open(&ledger, "alice", ceiling).await;

        let result = ledger.deposit(account.id, Decimal::ONE).await;

        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert_eq!(balance(&ledger, account.id).await, ceiling);
    }

    #[tokio::test]
    async fn overdraw_is_rejected_and_balance_unchanged() {
        let ledger = ledger();
        let account = open(&ledger, "alice", dec!(30)).await;

        assert!(ledger.has_insufficient_funds(account.id, dec!(30.01)).await.unwrap());
        assert!(!ledger.has_insufficient_funds(account.id, dec!(30)).await.unwrap());

        let result = ledger.withdraw(account.id, dec!(30.01)).await;
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { required, .. }) if required == dec!(30.01)
        ));
        assert_eq!(balance(&ledger, account.id).await, dec!(30));
    }

    #[tokio::test]
    async fn deposit_into_unknown_account_fails() {
        let ledger = ledger();
        let result = ledger.deposit(AccountId::generate(), dec!(5)).await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound { .. })));
    }

    #[tokio::test]
    async fn list_accounts_filters_by_owner() {
        let ledger = ledger();
        open(&ledger, "alice", dec!(1)).await;
        let bob = open(&ledger, "bob", dec!(2)).await;

        let all = ledger.list_accounts(AccountFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let only_bob = ledger
            .list_accounts(AccountFilter {
                owner_id: Some("bob".into()),
                page: Page::default(),
            })
            .await
            .unwrap();
        assert_eq!(only_bob, vec![bob]);
    }
}
