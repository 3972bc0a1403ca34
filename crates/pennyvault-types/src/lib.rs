//! PennyVault Types - Canonical domain types for round-up micro-savings
//!
//! This crate contains the foundational types with zero dependencies on other
//! pennyvault crates:
//!
//! - Spending records and round-up results
//! - Unit conversion between minor units, decimal strings and wei
//! - EVM address parsing
//! - Deposit receipts and vault balance projections
//! - Process-wide configuration
//! - The error taxonomy shared by every crate
//!
//! # Flow
//!
//! ```text
//! Transactions → Round-ups → Deposit → Confirmation → Balance refresh
//! ```

pub mod address;
pub mod amount;
pub mod config;
pub mod error;
pub mod receipt;
pub mod transaction;

pub use address::*;
pub use amount::*;
pub use config::*;
pub use error::*;
pub use receipt::*;
pub use transaction::*;
