//! Money amounts and the rules every stored amount obeys.
//!
//! Balances and entry amounts are stored as `NUMERIC(20, 4)`: at most
//! [`MONEY_SCALE`] fractional digits and a magnitude below [`max_money`].
//! Anything finer or larger is rejected up front instead of being rounded
//! or overflowing in the database.

use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};

/// Fractional digits a stored amount may carry.
pub const MONEY_SCALE: u32 = 4;

/// Integer digits a stored amount may carry.
const MONEY_INTEGER_DIGITS: u32 = 16;

/// Exclusive upper bound for any balance or amount (`10^16`).
#[must_use]
pub fn max_money() -> Decimal {
    Decimal::from(10_i64.pow(MONEY_INTEGER_DIGITS))
}

/// Whether `amount` fits the stored precision and range. Trailing zeros
/// do not count against the scale.
#[must_use]
pub fn is_representable(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE && amount.abs() < max_money()
}

/// Reject amounts that are zero, negative, or not representable.
///
/// # Errors
///
/// Returns `LedgerError::Validation` when `amount <= 0`, when it has more
/// than [`MONEY_SCALE`] decimal places, or when it reaches [`max_money`].
pub fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation("amount needs to be greater than 0"));
    }
    ensure_representable(amount)
}

/// Reject amounts outside the stored precision and range.
///
/// # Errors
///
/// Returns `LedgerError::Validation` describing the violated limit.
pub fn ensure_representable(amount: Decimal) -> Result<()> {
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::validation(format!(
            "amount {amount} has more than {MONEY_SCALE} decimal places"
        )));
    }
    if amount.abs() >= max_money() {
        return Err(LedgerError::validation(format!(
            "amount {amount} exceeds the largest supported value"
        )));
    }
    Ok(())
}

/// Add amounts without overflowing.
///
/// # Errors
///
/// Returns `LedgerError::Validation` if the sum overflows `Decimal`.
pub fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .ok_or_else(|| LedgerError::validation("amounts add up beyond the supported range"))
}
