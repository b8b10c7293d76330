//! Core business logic for Purse.
//!
//! This crate contains pure wallet logic with ZERO database dependencies.
//! Domain types, invariants and the FIFO consumption algorithm live here.
//!
//! # Modules
//!
//! - `wallet` - Multi-kind balances with lot-based (FIFO) accounting

pub mod wallet;
