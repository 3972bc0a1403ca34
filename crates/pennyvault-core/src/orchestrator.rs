//! Deposit orchestration
//!
//! One deposit attempt walks a fixed sequence of phases:
//!
//! ```text
//! Idle → ComputingRoundups → NothingToSave
//!                          → Submitting → AwaitingConfirmation → BalanceRefresh → Done
//! (any step) → Failed
//! ```
//!
//! The current phase is published on a watch channel so a UI can follow it.
//! Once submitted, a deposit cannot be aborted; the attempt only ends at
//! confirmation or failure.

use crate::roundup::compute_roundups;
use chrono::Utc;
use pennyvault_types::{
    minor_to_decimal, DepositReceipt, PennyVaultError, Result, TransactionRecord, VaultBalance,
};
use pennyvault_vault::VaultGateway;
use pennyvault_wallet::ChainSession;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

/// Phase of the current (or last) deposit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositPhase {
    Idle,
    ComputingRoundups,
    NothingToSave,
    Submitting,
    AwaitingConfirmation,
    BalanceRefresh,
    Done,
    Failed,
}

impl DepositPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NothingToSave | Self::Done | Self::Failed)
    }
}

/// Result of a deposit attempt that did not fail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositOutcome {
    /// Round-up total saved, in minor units; 0 when there was nothing to save
    pub saved: u64,
    /// Confirmation proof, absent when nothing was saved
    pub receipt: Option<DepositReceipt>,
    /// Vault balance after the deposit, if the refresh succeeded
    pub balance: Option<VaultBalance>,
    pub message: String,
}

impl DepositOutcome {
    fn nothing_to_save() -> Self {
        Self {
            saved: 0,
            receipt: None,
            balance: None,
            message: "No round-ups to save".to_string(),
        }
    }

    pub fn tx_hash(&self) -> Option<&str> {
        self.receipt.as_ref().map(|r| r.tx_hash.as_str())
    }

    pub fn block_number(&self) -> Option<u64> {
        self.receipt.as_ref().map(|r| r.block_number)
    }
}

/// Runs deposit attempts against the vault
pub struct DepositOrchestrator {
    gateway: VaultGateway,
    phase: watch::Sender<DepositPhase>,
}

impl DepositOrchestrator {
    pub fn new(gateway: VaultGateway) -> Self {
        let (phase, _) = watch::channel(DepositPhase::Idle);
        Self { gateway, phase }
    }

    pub fn gateway(&self) -> &VaultGateway {
        &self.gateway
    }

    /// Phase of the current or most recent attempt
    pub fn phase(&self) -> DepositPhase {
        *self.phase.borrow()
    }

    /// Follow phase transitions
    pub fn subscribe(&self) -> watch::Receiver<DepositPhase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: DepositPhase) {
        tracing::debug!(?phase, "Deposit phase");
        self.phase.send_replace(phase);
    }

    /// Compute round-ups over `records` and deposit the total.
    ///
    /// Fails with `NoActiveSession` before computing anything when there is
    /// no live session. Failures up to confirmation come back as
    /// `DepositFailed`; a failed balance refresh only leaves `balance` empty.
    pub async fn run(
        &self,
        session: Option<&ChainSession>,
        records: &[TransactionRecord],
    ) -> Result<DepositOutcome> {
        let attempt = Uuid::new_v4();
        let span = tracing::info_span!("deposit", attempt = %attempt);

        async move {
            let result = self.run_attempt(session, records).await;
            if let Err(e) = &result {
                self.enter(DepositPhase::Failed);
                tracing::error!(error = %e, code = e.error_code(), "Deposit attempt failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_attempt(
        &self,
        session: Option<&ChainSession>,
        records: &[TransactionRecord],
    ) -> Result<DepositOutcome> {
        let session = match session {
            Some(session) if session.signer.is_live() => session,
            _ => return Err(PennyVaultError::NoActiveSession),
        };

        self.enter(DepositPhase::ComputingRoundups);
        let roundups = compute_roundups(records);
        if roundups.is_empty() {
            self.enter(DepositPhase::NothingToSave);
            tracing::info!(records = records.len(), "No round-ups to save");
            return Ok(DepositOutcome::nothing_to_save());
        }

        let total = roundups.total;
        let amount = minor_to_decimal(total).to_string();
        tracing::info!(total, amount = %amount, records = records.len(), "Depositing round-ups");

        self.enter(DepositPhase::Submitting);
        let pending = self
            .gateway
            .deposit(&session.signer, &amount)
            .await
            .map_err(PennyVaultError::deposit_failed)?;

        self.enter(DepositPhase::AwaitingConfirmation);
        let confirmed = pending
            .wait()
            .await
            .map_err(PennyVaultError::deposit_failed)?;

        let receipt = DepositReceipt {
            tx_hash: confirmed.tx_hash.to_string(),
            amount_deposited: total,
            amount_native: amount,
            block_number: confirmed.block_number,
            confirmed_at: Utc::now(),
        };
        tracing::info!(
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            "Deposit confirmed"
        );

        self.enter(DepositPhase::BalanceRefresh);
        let balance = match self
            .gateway
            .get_balance(&session.signer, session.address)
            .await
        {
            Ok(amount) => Some(VaultBalance::new(session.address, amount)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to refresh vault balance after deposit");
                None
            }
        };

        self.enter(DepositPhase::Done);
        Ok(DepositOutcome {
            saved: total,
            message: format!("{total} saved to vault"),
            receipt: Some(receipt),
            balance,
        })
    }
}
