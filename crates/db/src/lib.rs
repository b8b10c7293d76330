//! Database layer of the wallet ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for items, lots and history
//! - The wallet repository translating rows to wallet documents
//! - A transaction runner retrying serialization conflicts
//! - [`WalletClient`], the entry point for balance, mutation and history calls
//! - Database migrations

pub mod client;
pub mod entities;
pub mod error;
pub mod migration;
pub mod repositories;
pub mod store;

pub use client::{HistoryPage, WalletClient};
pub use error::WalletDbError;
pub use repositories::WalletRepository;
pub use store::TransactionRunner;

use std::time::Duration;

use purse_shared::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a pooled connection sized by `config`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
