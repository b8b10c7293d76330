//! Transaction runner with retry on serialization conflicts.
//!
//! Every wallet mutation runs as one closure over a fresh transaction. When
//! the store reports a conflict the whole closure is replayed, reads
//! included, on a new transaction. Callers never see a conflict unless the
//! retry budget runs out.

use purse_shared::LedgerConfig;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel, TransactionTrait};
use tracing::{debug, error, warn};

use crate::error::{WalletDbError, is_serialization_failure};

/// Runs closures inside transactions that commit or abort as a unit.
#[derive(Debug, Clone)]
pub struct TransactionRunner {
    db: DatabaseConnection,
    max_retries: u32,
    isolation: Option<IsolationLevel>,
}

impl TransactionRunner {
    /// Creates a runner over `db` using the retry and isolation settings of
    /// `config`.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &LedgerConfig) -> Self {
        Self {
            db,
            max_retries: config.max_transaction_retries,
            isolation: config.serializable.then_some(IsolationLevel::Serializable),
        }
    }

    /// Runs `op` in a transaction and commits its writes.
    ///
    /// `op` may be invoked several times and must derive everything it
    /// writes from what it reads through the transaction it is given. Any
    /// error returned by `op` rolls back all of its writes.
    ///
    /// # Errors
    ///
    /// Returns the error of `op`, a database error, or
    /// [`WalletDbError::RetriesExhausted`] when every attempt conflicted.
    pub async fn run_transaction<T, F>(&self, op: F) -> Result<T, WalletDbError>
    where
        F: AsyncFn(&DatabaseTransaction) -> Result<T, WalletDbError>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.attempt(&op).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Transaction committed after retry");
                    }
                    return Ok(value);
                }
                Err(WalletDbError::Database(source)) if is_serialization_failure(&source) => {
                    if attempt > self.max_retries {
                        error!(
                            attempts = attempt,
                            error = %source,
                            "Giving up on conflicting transaction"
                        );
                        return Err(WalletDbError::RetriesExhausted {
                            attempts: attempt,
                            source,
                        });
                    }
                    warn!(attempt, error = %source, "Transaction conflicted, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt<T, F>(&self, op: &F) -> Result<T, WalletDbError>
    where
        F: AsyncFn(&DatabaseTransaction) -> Result<T, WalletDbError>,
    {
        let txn = self.db.begin_with_config(self.isolation, None).await?;

        match op(&txn).await {
            Ok(value) => {
                txn.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = txn.rollback().await {
                    log_rollback_failure(&rollback);
                }
                Err(err)
            }
        }
    }
}

fn log_rollback_failure(err: &DbErr) {
    if is_serialization_failure(err) {
        debug!(error = %err, "Rollback of conflicting transaction failed");
    } else {
        error!(error = %err, "Rollback failed");
    }
}
