//! PennyVault Wallet - Wallet boundary and chain session lifecycle
//!
//! This crate owns the connection to the user's wallet:
//! - The `WalletProvider` trait mirroring a browser wallet extension
//! - A session manager that keeps the wallet pinned to the target chain
//! - Capability handles (reader/signer) that die with their session
//! - An in-memory wallet for tests and `--simulate` runs
//! - A JSON-RPC wallet for relays and dev nodes

pub mod clock;
pub mod host;
pub mod manager;
pub mod provider;
pub mod rpc;
pub mod session;
pub mod simulated;

pub use clock::*;
pub use host::*;
pub use manager::*;
pub use provider::*;
pub use rpc::*;
pub use session::*;
pub use simulated::*;
