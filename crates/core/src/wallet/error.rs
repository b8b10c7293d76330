//! Wallet error types.
//!
//! Non-positive amounts and same-kind exchanges are defined no-ops and never
//! show up here.

use rust_decimal::Decimal;
use thiserror::Error;

use super::kind::Kind;

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The lots of a kind cannot cover the requested debit.
    #[error("Insufficient {kind}: requested {requested}, short by {shortfall}")]
    InsufficientFunds {
        /// Kind being debited.
        kind: Kind,
        /// Amount requested for this kind.
        requested: Decimal,
        /// Portion of the request no lot could cover.
        shortfall: Decimal,
    },

    /// Unknown currency kind name.
    #[error("Unknown kind: {0}")]
    InvalidKind(String),

    /// Stored state violates a ledger invariant.
    #[error("Corrupt wallet state: {0}")]
    CorruptState(String),
}

impl WalletError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InvalidKind(_) => "INVALID_KIND",
            Self::CorruptState(_) => "CORRUPT_STATE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InsufficientFunds { .. } => 422,
            Self::InvalidKind(_) => 400,
            Self::CorruptState(_) => 500,
        }
    }
}
