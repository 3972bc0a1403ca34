//! PennyVault Core - Round-ups and deposit orchestration
//!
//! This crate ties the wallet session and the vault gateway together:
//! - Round-up calculation over spending records
//! - The deposit state machine
//! - A per-user application context (balance, network label, busy flag)

pub mod context;
pub mod orchestrator;
pub mod roundup;

pub use context::*;
pub use orchestrator::*;
pub use roundup::*;
