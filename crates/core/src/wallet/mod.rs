//! Multi-kind wallet ledger logic.
//!
//! This module implements the core wallet functionality:
//! - Currency kinds
//! - Balance aggregates, lots and history records
//! - FIFO lot consumption
//! - The wallet service that plans Give / Use / Exchange
//! - Time source abstraction
//! - Error types for wallet operations

pub mod clock;
pub mod consumption;
pub mod error;
pub mod item;
pub mod kind;
pub mod service;

#[cfg(test)]
mod service_props;

pub use clock::{Clock, ManualClock, SystemClock};
pub use consumption::consume_fifo;
pub use error::WalletError;
pub use item::{HistoryMeta, Item, ItemDetail, ItemHistory, Reconciliation};
pub use kind::Kind;
pub use service::{WalletPlan, WalletService};
