//! Shared types, errors, and configuration for Purse.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for wallet documents
//! - Cursor pagination types for history endpoints
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, LedgerConfig};
pub use error::AppError;
