//! PennyVault Vault - Savings vault contract gateway
//!
//! The vault is a payable contract credited per sender:
//! - `deposit()` accepts native value from the caller
//! - `getBalance(address)` returns the credited total in wei
//!
//! Calls go through a session signer, so a stale session can never reach
//! the contract.

pub mod abi;
pub mod gateway;

pub use abi::*;
pub use gateway::*;
