//! Shared setup for wallet integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use purse_core::wallet::{Kind, ManualClock, WalletService};
use purse_db::WalletClient;
use purse_db::migration::Migrator;
use purse_shared::LedgerConfig;
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

/// First timestamp handed out by the test clock.
pub const START_MILLIS: i64 = 1_700_000_000_000;

/// Opens a migrated in-memory database.
///
/// The pool is pinned to one connection so every query sees the same
/// in-memory database.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None).await.expect("Failed to migrate");
    db
}

/// SQLite has no SERIALIZABLE switch; run plain transactions.
pub fn ledger_config() -> LedgerConfig {
    LedgerConfig {
        max_transaction_retries: 3,
        serializable: false,
    }
}

/// Client over a fresh database with a clock ticking 1ms per reading.
pub async fn setup_client() -> (WalletClient, Arc<ManualClock>, DatabaseConnection) {
    let db = setup_db().await;
    let clock = Arc::new(ManualClock::new(START_MILLIS, 1));
    let client = WalletClient::new(db.clone(), &ledger_config())
        .with_service(WalletService::new(clock.clone()));
    (client, clock, db)
}

/// Builds an amounts map.
pub fn amounts(entries: &[(Kind, Decimal)]) -> BTreeMap<Kind, Decimal> {
    entries.iter().copied().collect()
}
