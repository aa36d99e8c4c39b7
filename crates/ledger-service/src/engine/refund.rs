//! Refunds of single entries and of multi-beneficiary groups.
//!
//! Both paths apply the same rules. Only transfers can be refunded, and
//! only once. A refund entry cannot itself be refunded. The original
//! recipients must still hold what they received, summed per recipient
//! across a group. All reversal entries are settled together.

use std::collections::BTreeMap;

use ledger_core::{
    checked_sum, AccountId, Decimal, LedgerError, MultiBeneficiaryId, Operation, RefundRequest,
    RefundTarget, Result, Transaction, TransactionId,
};

use super::Ledger;

impl Ledger {
    /// Refund whatever the request selects.
    ///
    /// # Errors
    ///
    /// See [`Ledger::refund_transaction`] and [`Ledger::refund_group`].
    pub async fn refund(&self, request: &RefundRequest) -> Result<Vec<Transaction>> {
        match request.target()? {
            RefundTarget::Transaction(id) => Ok(vec![self.refund_transaction(id).await?]),
            RefundTarget::Group(group) => self.refund_group(group).await,
        }
    }

    /// Reverse a single transfer.
    ///
    /// # Errors
    ///
    /// - `LedgerError::TransactionNotFound` if the entry doesn't exist.
    /// - `LedgerError::CannotRefundARefund` if the entry is a refund or was
    ///   already refunded.
    /// - `LedgerError::Validation` if the entry is not a transfer.
    /// - `LedgerError::InsufficientFunds` if the recipient spent the money.
    pub async fn refund_transaction(&self, id: TransactionId) -> Result<Transaction> {
        let original = self
            .store
            .get_transaction(&id)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound {
                transaction_id: id.to_string(),
            })?;

        let originals = std::slice::from_ref(&original);
        self.ensure_refundable(originals).await?;

        let refund = Transaction::refund_of(&original);
        self.store.settle(std::slice::from_ref(&refund)).await?;
        Ok(refund)
    }

    /// Reverse every leg of a multi-recipient transfer.
    ///
    /// # Errors
    ///
    /// - `LedgerError::TransactionNotFound` if no entry carries the group id.
    /// - Any error of [`Ledger::refund_transaction`], raised by the first
    ///   offending leg. No leg is reversed when one fails.
    pub async fn refund_group(&self, group: MultiBeneficiaryId) -> Result<Vec<Transaction>> {
        let originals = self.store.list_transactions_by_group(&group).await?;
        if originals.is_empty() {
            return Err(LedgerError::TransactionNotFound {
                transaction_id: group.to_string(),
            });
        }

        self.ensure_refundable(&originals).await?;

        let refunds: Vec<Transaction> = originals.iter().map(Transaction::refund_of).collect();
        self.store.settle(&refunds).await?;
        Ok(refunds)
    }

    async fn ensure_refundable(&self, originals: &[Transaction]) -> Result<()> {
        let mut owed: BTreeMap<AccountId, Decimal> = BTreeMap::new();

        for original in originals {
            if original.is_refund {
                return Err(LedgerError::CannotRefundARefund {
                    transaction_id: original.id,
                });
            }
            if original.operation != Operation::Transfer {
                return Err(LedgerError::validation(format!(
                    "only transfers can be refunded, {} is a {}",
                    original.id, original.operation
                )));
            }
            if self.store.find_refund_of(&original.id).await?.is_some() {
                return Err(LedgerError::CannotRefundARefund {
                    transaction_id: original.id,
                });
            }
            if let Some((recipient, amount)) = original.credit() {
                let total = owed.entry(recipient).or_default();
                *total = checked_sum([*total, amount])?;
            }
        }

        for (recipient, required) in owed {
            self.ensure_covers(recipient, required).await?;
        }
        Ok(())
    }
}
