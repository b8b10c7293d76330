//! Wallet reconciler.
//!
//! Checks, for every user given on the command line and every kind, that the
//! stored balance equals the sum of the remaining lots.
//!
//! Usage:
//!   reconciler <user_id>...
//!
//! Exits with an error when any pair is out of sync.

use anyhow::{Context, bail};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use purse_core::wallet::Kind;
use purse_db::{WalletClient, connect_with};
use purse_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "purse=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let users: Vec<String> = std::env::args().skip(1).collect();
    if users.is_empty() {
        bail!("usage: reconciler <user_id>...");
    }

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    let client = WalletClient::new(db, &config.ledger);
    let mut mismatches = 0_usize;

    for user_id in &users {
        for kind in Kind::ALL {
            let check = client.reconcile(user_id, kind).await?;
            if check.consistent {
                info!(
                    user_id = %user_id,
                    %kind,
                    amount = %check.item_amount,
                    lots = check.lot_count,
                    "Balance matches lots"
                );
            } else {
                mismatches += 1;
                warn!(
                    user_id = %user_id,
                    %kind,
                    item_amount = %check.item_amount,
                    lot_total = %check.lot_total,
                    lots = check.lot_count,
                    "Balance does not match lots"
                );
            }
        }
    }

    if mismatches > 0 {
        bail!("{mismatches} wallet balance(s) out of sync");
    }
    info!(users = users.len(), "All balances consistent");
    Ok(())
}
