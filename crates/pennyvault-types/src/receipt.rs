//! Deposit receipts and vault balance projections

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Proof of a confirmed deposit. Only created after on-chain confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// Transaction hash
    pub tx_hash: String,
    /// Round-up total that was deposited, in minor units
    pub amount_deposited: u64,
    /// The same amount in native units as submitted ("0.45")
    pub amount_native: String,
    /// Block that included the transaction
    pub block_number: u64,
    /// When the confirmation was observed
    pub confirmed_at: DateTime<Utc>,
}

/// Read-only projection of an address's vault balance.
///
/// Reflects chain state as of the last successful read; may be stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultBalance {
    pub address: Address,
    /// Decimal string in the vault's native unit
    pub amount: String,
}

impl VaultBalance {
    pub fn new(address: Address, amount: impl Into<String>) -> Self {
        Self {
            address,
            amount: amount.into(),
        }
    }
}
