//! Transfers and account history.

use ledger_core::{
    AccountId, LedgerError, MultiBeneficiaryId, Page, Result, Transaction, TransferRequest,
};

use super::Ledger;

impl Ledger {
    /// Move money from `source` to every recipient of `request`.
    ///
    /// Every check runs before any balance moves: the split, the source,
    /// each recipient, then the source balance against the total. The legs
    /// are settled together, so either all recipients are paid or none are.
    /// A transfer to more than one recipient stamps a fresh group id on
    /// every leg.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Validation` for a bad split or a source that is also
    ///   a recipient.
    /// - `LedgerError::AccountNotFound` for an unknown source or recipient.
    /// - `LedgerError::InsufficientFunds` if the source can't cover the total.
    pub async fn transfer(
        &self,
        source: AccountId,
        request: &TransferRequest,
    ) -> Result<Vec<Transaction>> {
        request.validate()?;
        if request.recipients.iter().any(|r| r.account_id == source) {
            return Err(LedgerError::validation("an account cannot transfer to itself"));
        }

        let balance = self.get_account_balance(source).await?;
        for recipient in &request.recipients {
            if !self.account_exists(recipient.account_id).await? {
                return Err(LedgerError::account_not_found(&recipient.account_id));
            }
        }
        if balance < request.amount {
            return Err(LedgerError::InsufficientFunds {
                account_id: source,
                balance,
                required: request.amount,
            });
        }

        let group = request
            .is_multi_beneficiary()
            .then(MultiBeneficiaryId::generate);
        let legs: Vec<Transaction> = request
            .recipients
            .iter()
            .map(|r| {
                Transaction::transfer(source, r.account_id, r.amount, request.subject.clone(), group)
            })
            .collect();

        self.store.settle(&legs).await?;
        Ok(legs)
    }

    /// Entries where the account sent or received money, newest first.
    ///
    /// An account with no entries, or an unknown one, has an empty history.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the lookup fails.
    pub async fn transaction_history(&self, id: AccountId, page: Page) -> Result<Vec<Transaction>> {
        Ok(self
            .store
            .list_transactions_by_account(&id, page.limit, page.offset())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use ledger_core::{Decimal, Operation, Recipient};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::engine::testing::{balance, ledger, open};

    fn split(total: Decimal, shares: &[(AccountId, Decimal)]) -> TransferRequest {
        TransferRequest {
            from: None,
            amount: total,
            subject: "dinner".into(),
            recipients: shares
                .iter()
                .map(|(account_id, amount)| Recipient {
                    account_id: *account_id,
                    amount: *amount,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn sub_precision_split_moves_nothing() {
        let ledger = ledger();
        let a = open(&ledger, "a", dec!(1)).await;
        let b = open(&ledger, "b", dec!(0)).await;
        let c = open(&ledger, "c", dec!(0)).await;

        let request = split(dec!(0.0001), &[(b.id, dec!(0.00005)), (c.id, dec!(0.00005))]);
        let result = ledger.transfer(a.id, &request).await;

        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert_eq!(balance(&ledger, a.id).await, dec!(1));
        assert_eq!(balance(&ledger, b.id).await, dec!(0));
        assert_eq!(balance(&ledger, c.id).await, dec!(0));
    }

    #[tokio::test]
    async fn transfer_to_self_is_rejected() {
        let ledger = ledger();
        let a = open(&ledger, "a", dec!(10)).await;

        let result = ledger.transfer(a.id, &split(dec!(5), &[(a.id, dec!(5))])).await;

        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert_eq!(balance(&ledger, a.id).await, dec!(10));
    }

    #[tokio::test]
    async fn overflowing_split_is_a_validation_error() {
        let ledger = ledger();
        let a = open(&ledger, "a", dec!(1)).await;
        let b = open(&ledger, "b", dec!(0)).await;
        let c = open(&ledger, "c", dec!(0)).await;

        let request = split(dec!(1), &[(b.id, Decimal::MAX), (c.id, Decimal::MAX)]);
        let result = ledger.transfer(a.id, &request).await;

        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert_eq!(balance(&ledger, a.id).await, dec!(1));
    }

    #[tokio::test]
    async fn single_recipient_has_no_group() {
        let ledger = ledger();
        let a = open(&ledger, "a", dec!(100)).await;
        let b = open(&ledger, "b", dec!(0)).await;

        let legs = ledger
            .transfer(a.id, &split(dec!(40), &[(b.id, dec!(40))]))
            .await
            .unwrap();

        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].operation, Operation::Transfer);
        assert_eq!(legs[0].from, Some(a.id));
        assert_eq!(legs[0].to, Some(b.id));
        assert_eq!(legs[0].subject, "dinner");
        assert!(legs[0].multi_beneficiary_id.is_none());
        assert_eq!(balance(&ledger, a.id).await, dec!(60));
        assert_eq!(balance(&ledger, b.id).await, dec!(40));
    }

    #[tokio::test]
    async fn multi_recipient_legs_share_a_group() {
        let ledger = ledger();
        let a = open(&ledger, "a", dec!(150)).await;
        let b = open(&ledger, "b", dec!(0)).await;
        let c = open(&ledger, "c", dec!(0)).await;

        let legs = ledger
            .transfer(
                a.id,
                &split(dec!(50), &[(b.id, dec!(20)), (c.id, dec!(30))]),
            )
            .await
            .unwrap();

        assert_eq!(legs.len(), 2);
        let group = legs[0].multi_beneficiary_id;
        assert!(group.is_some());
        assert_eq!(legs[1].multi_beneficiary_id, group);
        assert_eq!(balance(&ledger, a.id).await, dec!(100));
        assert_eq!(balance(&ledger, b.id).await, dec!(20));
        assert_eq!(balance(&ledger, c.id).await, dec!(30));
    }

    #[tokio::test]
    async fn mismatched_split_moves_nothing() {
        let ledger = ledger();
        let a = open(&ledger, "a", dec!(100)).await;
        let b = open(&ledger, "b", dec!(0)).await;

        let result = ledger
            .transfer(a.id, &split(dec!(50), &[(b.id, dec!(49.99))]))
            .await;

        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert_eq!(balance(&ledger, a.id).await, dec!(100));
        assert_eq!(balance(&ledger, b.id).await, dec!(0));
    }

    #[tokio::test]
    async fn missing_recipient_moves_nothing() {
        let ledger = ledger();
        let a = open(&ledger, "a", dec!(100)).await;
        let b = open(&ledger, "b", dec!(0)).await;
        let ghost = AccountId::generate();

        let result = ledger
            .transfer(
                a.id,
                &split(dec!(30), &[(b.id, dec!(10)), (ghost, dec!(20))]),
            )
            .await;

        assert!(matches!(result, Err(LedgerError::AccountNotFound { .. })));
        assert_eq!(balance(&ledger, a.id).await, dec!(100));
        assert_eq!(balance(&ledger, b.id).await, dec!(0));
    }

    #[tokio::test]
    async fn insufficient_source_moves_nothing() {
        let ledger = ledger();
        let a = open(&ledger, "a", dec!(10)).await;
        let b = open(&ledger, "b", dec!(0)).await;

        let result = ledger
            .transfer(a.id, &split(dec!(10.01), &[(b.id, dec!(10.01))]))
            .await;

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(balance(&ledger, a.id).await, dec!(10));
    }

    #[tokio::test]
    async fn transfer_to_self_is_rejected_without_balance_check() {
        let ledger = ledger();
        let a = open(&ledger, "a", dec!(10)).await;

        let result = ledger
            .transfer(a.id, &split(dec!(5), &[(a.id, dec!(5))]))
            .await;

        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn history_pages_newest_first() {
        let ledger = ledger();
        let a = open(&ledger, "a", dec!(0)).await;
        let b = open(&ledger, "b", dec!(0)).await;

        ledger.deposit(a.id, dec!(1)).await.unwrap();
        ledger.deposit(a.id, dec!(2)).await.unwrap();
        ledger
            .transfer(a.id, &split(dec!(3), &[(b.id, dec!(3))]))
            .await
            .unwrap();

        let first = ledger
            .transaction_history(a.id, Page::new(Some(2), Some(1)))
            .await
            .unwrap();
        assert_eq!(
            first.iter().map(|t| t.amount).collect::<Vec<_>>(),
            vec![dec!(3), dec!(2)]
        );

        let second = ledger
            .transaction_history(a.id, Page::new(Some(2), Some(2)))
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].amount, dec!(1));

        let received = ledger
            .transaction_history(b.id, Page::default())
            .await
            .unwrap();
        assert_eq!(received.len(), 1);

        let unknown = ledger
            .transaction_history(AccountId::generate(), Page::default())
            .await
            .unwrap();
        assert!(unknown.is_empty());
    }
}
