//! Errors raised by the wallet persistence layer.

use purse_core::wallet::WalletError;
use purse_shared::AppError;
use sea_orm::{DbErr, RuntimeErr};

/// Error types for wallet database operations.
#[derive(Debug, thiserror::Error)]
pub enum WalletDbError {
    /// Ledger rule violation (insufficient funds, corrupt state, ...).
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// The transaction kept conflicting with concurrent writers.
    #[error("Transaction still conflicting after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Attempts made, the first one included.
        attempts: u32,
        /// Conflict reported by the last attempt.
        source: DbErr,
    },
}

impl WalletDbError {
    /// Whether the store reported a serialization conflict that a fresh
    /// attempt may resolve.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Database(err) => is_serialization_failure(err),
            Self::Wallet(_) | Self::RetriesExhausted { .. } => false,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Wallet(err) => err.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
            Self::RetriesExhausted { .. } => "CONCURRENT_MODIFICATION",
        }
    }
}

impl From<WalletDbError> for AppError {
    fn from(err: WalletDbError) -> Self {
        match err {
            WalletDbError::Wallet(WalletError::InsufficientFunds { .. }) => {
                Self::BusinessRule(err.to_string())
            }
            WalletDbError::Wallet(WalletError::InvalidKind(_)) => Self::Validation(err.to_string()),
            WalletDbError::Wallet(WalletError::CorruptState(_)) => Self::Internal(err.to_string()),
            WalletDbError::Database(_) => Self::Database(err.to_string()),
            WalletDbError::RetriesExhausted { .. } => Self::Conflict(err.to_string()),
        }
    }
}

/// PostgreSQL `serialization_failure` / `deadlock_detected`.
const CONFLICT_SQLSTATES: [&str; 2] = ["40001", "40P01"];

/// Classifies a driver error as a retryable write-write conflict.
#[must_use]
pub fn is_serialization_failure(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Conn(runtime) | DbErr::Exec(runtime) | DbErr::Query(runtime) => runtime,
        _ => return false,
    };
    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db_err)) => db_err
            .code()
            .is_some_and(|code| CONFLICT_SQLSTATES.iter().any(|state| code == *state)),
        _ => false,
    }
}
