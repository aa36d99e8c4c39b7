//! Database schema names.
//!
//! The tables themselves are created by the migrations under `migrations/`.
//! Index names are listed here so that unique violations can be mapped back
//! to typed errors.

/// Unique index names.
pub mod constraint {
    /// At most one live account per owner.
    pub const ACCOUNTS_OWNER_UNIQUE: &str = "accounts_owner_unique";

    /// At most one refund entry per original entry.
    pub const TRANSACTIONS_REFUND_UNIQUE: &str = "transactions_refund_unique";
}
