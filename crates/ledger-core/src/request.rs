//! Request types and their validation rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amount::{checked_sum, ensure_positive, ensure_representable};
use crate::error::{LedgerError, Result};
use crate::{AccountId, MultiBeneficiaryId, TransactionId};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Largest page size served.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One recipient of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    /// Account receiving the money.
    #[serde(alias = "account_id", alias = "AccountId")]
    pub account_id: AccountId,

    /// Share of the transfer this recipient gets.
    #[serde(alias = "Amount")]
    pub amount: Decimal,
}

/// A transfer from one account to one or more recipients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Source account. When present it must match the account in the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Total amount; must equal the sum of the recipient amounts.
    pub amount: Decimal,

    /// Memo copied onto every ledger entry.
    #[serde(default)]
    pub subject: String,

    /// Recipients, settled in order.
    pub recipients: Vec<Recipient>,
}

impl TransferRequest {
    /// Check the split: a positive total, positive shares within the stored
    /// precision, and shares that add up to the total exactly.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        ensure_positive(self.amount)?;

        if self.recipients.is_empty() {
            return Err(LedgerError::validation("at least one recipient is required"));
        }

        for recipient in &self.recipients {
            if recipient.amount <= Decimal::ZERO {
                return Err(LedgerError::validation(format!(
                    "recipient {} amount needs to be greater than 0",
                    recipient.account_id
                )));
            }
            ensure_representable(recipient.amount)?;
        }

        let sum = checked_sum(self.recipients.iter().map(|r| r.amount))?;
        if sum != self.amount {
            return Err(LedgerError::validation(format!(
                "recipient amounts add up to {sum}, expected {}",
                self.amount
            )));
        }

        Ok(())
    }

    /// Resolve the source account against the account named in the path.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` if `from` is malformed or names a
    /// different account.
    pub fn source(&self, path_account: AccountId) -> Result<AccountId> {
        match self.from.as_deref().map(str::trim) {
            None | Some("") => Ok(path_account),
            Some(raw) => {
                let from: AccountId = raw.parse()?;
                if from == path_account {
                    Ok(from)
                } else {
                    Err(LedgerError::validation("from does not match the account in the path"))
                }
            }
        }
    }

    /// Whether the transfer fans out to more than one recipient.
    #[must_use]
    pub fn is_multi_beneficiary(&self) -> bool {
        self.recipients.len() > 1
    }
}

/// A refund of a single entry or of a whole multi-beneficiary group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Refund the group named by `multi_beneficiary_id` instead of a single entry.
    #[serde(default, alias = "is_multi_beneficiary")]
    pub is_multi_benificiary: bool,

    /// Group to refund.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_beneficiary_id: Option<String>,

    /// Entry to refund.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

/// What a refund request resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundTarget {
    /// A single ledger entry.
    Transaction(TransactionId),
    /// Every entry of a multi-beneficiary transfer.
    Group(MultiBeneficiaryId),
}

impl RefundRequest {
    /// Refund of a single entry.
    #[must_use]
    pub fn transaction(id: TransactionId) -> Self {
        Self {
            transaction_id: Some(id.to_string()),
            ..Self::default()
        }
    }

    /// Refund of a multi-beneficiary group.
    #[must_use]
    pub fn group(id: MultiBeneficiaryId) -> Self {
        Self {
            is_multi_benificiary: true,
            multi_beneficiary_id: Some(id.to_string()),
            ..Self::default()
        }
    }

    /// Pick the identifier selected by the flag and parse it.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` if the selected identifier is
    /// missing, blank or malformed.
    pub fn target(&self) -> Result<RefundTarget> {
        fn present(value: Option<&String>) -> Option<&str> {
            value.map(|s| s.trim()).filter(|s| !s.is_empty())
        }

        if self.is_multi_benificiary {
            let raw = present(self.multi_beneficiary_id.as_ref())
                .ok_or_else(|| LedgerError::validation("multi_beneficiary_id is required"))?;
            Ok(RefundTarget::Group(raw.parse()?))
        } else {
            let raw = present(self.transaction_id.as_ref())
                .ok_or_else(|| LedgerError::validation("transaction_id is required"))?;
            Ok(RefundTarget::Transaction(raw.parse()?))
        }
    }
}

/// Pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Rows per page.
    pub limit: u32,
    /// One-based page number.
    pub page: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            page: 1,
        }
    }
}

impl Page {
    /// Normalise raw query values: missing or non-positive values fall back
    /// to the defaults and the limit is capped at [`MAX_PAGE_LIMIT`].
    #[must_use]
    pub fn new(limit: Option<i64>, page: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => u32::try_from(l).map_or(MAX_PAGE_LIMIT, |l| l.min(MAX_PAGE_LIMIT)),
            _ => DEFAULT_PAGE_LIMIT,
        };
        let page = match page {
            Some(p) if p > 0 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => 1,
        };
        Self { limit, page }
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.limit) * u64::from(self.page.saturating_sub(1))
    }
}

/// Filter for the account listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    /// Only return the account held by this owner.
    pub owner_id: Option<String>,
    /// Pagination window.
    pub page: Page,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn split(total: Decimal, shares: &[Decimal]) -> TransferRequest {
        TransferRequest {
            from: None,
            amount: total,
            subject: "dinner".into(),
            recipients: shares
                .iter()
                .map(|amount| Recipient {
                    account_id: AccountId::generate(),
                    amount: *amount,
                })
                .collect(),
        }
    }

    #[test]
    fn exact_split_is_valid() {
        let request = split(dec!(50), &[dec!(20), dec!(30)]);
        assert!(request.validate().is_ok());
        assert!(request.is_multi_beneficiary());
    }

    #[test]
    fn decimal_split_has_no_rounding_drift() {
        let request = split(dec!(0.3), &[dec!(0.1), dec!(0.2)]);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn mismatched_split_is_rejected() {
        let request = split(dec!(50), &[dec!(20), dec!(20)]);
        assert!(matches!(request.validate(), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(split(dec!(0), &[dec!(0)]).validate().is_err());
        assert!(split(dec!(10), &[dec!(15), dec!(-5)]).validate().is_err());
        assert!(split(dec!(10), &[]).validate().is_err());
    }

    #[test]
    fn sub_cent_fractions_beyond_four_places_are_rejected() {
        let request = split(dec!(0.0001), &[dec!(0.00005), dec!(0.00005)]);
        assert!(matches!(request.validate(), Err(LedgerError::Validation(_))));

        let request = split(dec!(0.0003), &[dec!(0.0001), dec!(0.0002)]);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn overflowing_shares_are_rejected_without_panicking() {
        let request = split(dec!(1), &[Decimal::MAX, Decimal::MAX]);
        assert!(matches!(request.validate(), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn source_defaults_to_path_account() {
        let path = AccountId::generate();
        let mut request = split(dec!(5), &[dec!(5)]);
        assert_eq!(request.source(path).unwrap(), path);

        request.from = Some(path.to_string());
        assert_eq!(request.source(path).unwrap(), path);

        request.from = Some(AccountId::generate().to_string());
        assert!(request.source(path).is_err());

        request.from = Some("garbage".into());
        assert!(request.source(path).is_err());
    }

    #[test]
    fn recipients_accept_camel_case_keys() {
        let id = AccountId::generate();
        let json = format!(
            r#"{{"amount": 10, "subject": "x", "recipients": [{{"accountId": "{id}", "amount": "10"}}]}}"#
        );
        let request: TransferRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request.recipients[0].account_id, id);
        assert_eq!(request.recipients[0].amount, dec!(10));
    }

    #[test]
    fn refund_target_follows_the_flag() {
        let tx = TransactionId::generate();
        let group = MultiBeneficiaryId::generate();

        assert_eq!(
            RefundRequest::transaction(tx).target().unwrap(),
            RefundTarget::Transaction(tx)
        );
        assert_eq!(
            RefundRequest::group(group).target().unwrap(),
            RefundTarget::Group(group)
        );

        let missing = RefundRequest {
            is_multi_benificiary: true,
            multi_beneficiary_id: Some("  ".into()),
            transaction_id: Some(tx.to_string()),
        };
        assert!(matches!(missing.target(), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn page_defaults_and_coercion() {
        assert_eq!(Page::new(None, None), Page::default());
        assert_eq!(Page::new(Some(25), Some(0)), Page { limit: 25, page: 1 });
        assert_eq!(Page::new(Some(-3), Some(-1)), Page::default());
        assert_eq!(Page::new(Some(5000), Some(2)).limit, MAX_PAGE_LIMIT);
        assert_eq!(Page::new(Some(10), Some(3)).offset(), 20);
        assert_eq!(Page::default().offset(), 0);
        assert_eq!(Page { limit: 10, page: 0 }.offset(), 0);
    }
}
