//! Application context
//!
//! Everything a dashboard shows about one user's wallet: session status,
//! network label, vault balance, the busy flag and the last savings result.
//! Each context is independent, so tests can run several side by side.

use crate::orchestrator::{DepositOrchestrator, DepositOutcome, DepositPhase};
use parking_lot::{Mutex, RwLock};
use pennyvault_types::{AppConfig, ChainConfig, PennyVaultError, Result, TransactionRecord, VaultBalance};
use pennyvault_vault::VaultGateway;
use pennyvault_wallet::{
    ChainSession, ChainSessionManager, Clock, SessionChange, SessionStatus, WalletEvent, WalletHost,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

pub const NOT_CONNECTED_LABEL: &str = "Not Connected";
pub const WRONG_NETWORK_LABEL: &str = "Wrong Network";

/// Per-user application state
pub struct AppContext {
    chain: ChainConfig,
    manager: ChainSessionManager,
    orchestrator: DepositOrchestrator,
    balance: RwLock<Option<VaultBalance>>,
    last_outcome: RwLock<Option<DepositOutcome>>,
    busy: AtomicBool,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl AppContext {
    /// Build a context from startup configuration.
    ///
    /// A missing or malformed vault address is fatal here.
    pub fn new(config: &AppConfig, host: WalletHost, clock: Arc<dyn Clock>) -> Result<Arc<Self>> {
        let vault = config.vault_address()?;
        let settle_delay = config.timing.settle_delay();
        let manager = ChainSessionManager::new(host, config.chain.clone(), clock.clone(), settle_delay);
        let gateway = VaultGateway::new(vault, clock, settle_delay);

        Ok(Arc::new(Self {
            chain: config.chain.clone(),
            manager,
            orchestrator: DepositOrchestrator::new(gateway),
            balance: RwLock::new(None),
            last_outcome: RwLock::new(None),
            busy: AtomicBool::new(false),
            event_loop: Mutex::new(None),
        }))
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub fn status(&self) -> SessionStatus {
        self.manager.status()
    }

    pub fn session(&self) -> Option<ChainSession> {
        self.manager.session()
    }

    /// Label for the network indicator
    pub fn network_label(&self) -> String {
        match self.manager.status() {
            SessionStatus::Connected => self.chain.chain_name.clone(),
            SessionStatus::WrongNetwork => WRONG_NETWORK_LABEL.to_string(),
            SessionStatus::Disconnected | SessionStatus::Connecting => {
                NOT_CONNECTED_LABEL.to_string()
            }
        }
    }

    /// Displayed vault balance; `"0"` until a read succeeds
    pub fn balance(&self) -> String {
        self.balance
            .read()
            .as_ref()
            .map(|b| b.amount.clone())
            .unwrap_or_else(|| "0".to_string())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn last_outcome(&self) -> Option<DepositOutcome> {
        self.last_outcome.read().clone()
    }

    /// Follow the phases of deposit attempts
    pub fn deposit_phases(&self) -> watch::Receiver<DepositPhase> {
        self.orchestrator.subscribe()
    }

    /// Block explorer link for a transaction
    pub fn explorer_url(&self, tx_hash: &str) -> String {
        self.chain.explorer_tx_url(tx_hash)
    }

    /// Connect the wallet, read the initial balance and start listening for
    /// wallet events.
    pub async fn connect_wallet(self: &Arc<Self>) -> Result<ChainSession> {
        self.stop_event_loop();
        self.balance.write().take();

        let session = self.manager.connect().await?;

        if let Err(e) = self.refresh_balance().await {
            tracing::warn!(error = %e, "Initial vault balance read failed");
        }

        if let Some(events) = self.manager.take_events() {
            let handle = tokio::spawn(event_loop(Arc::downgrade(self), events));
            *self.event_loop.lock() = Some(handle);
        }
        Ok(session)
    }

    /// Drop the local session
    pub fn disconnect_wallet(&self) {
        self.stop_event_loop();
        self.manager.disconnect();
        self.balance.write().take();
    }

    /// Re-read the vault balance of the connected account
    pub async fn refresh_balance(&self) -> Result<String> {
        let session = self.manager.active_session()?;
        let amount = self
            .orchestrator
            .gateway()
            .get_balance(&session.signer, session.address)
            .await?;
        *self.balance.write() = Some(VaultBalance::new(session.address, amount.clone()));
        Ok(amount)
    }

    /// Deposit the round-ups of `records`.
    ///
    /// Refuses to start while another deposit is in flight.
    pub async fn save_roundups(&self, records: &[TransactionRecord]) -> Result<DepositOutcome> {
        let _busy = BusyGuard::acquire(&self.busy)?;

        let session = self.manager.session();
        let outcome = self.orchestrator.run(session.as_ref(), records).await?;

        if let Some(balance) = &outcome.balance {
            *self.balance.write() = Some(balance.clone());
        }
        *self.last_outcome.write() = Some(outcome.clone());
        Ok(outcome)
    }

    /// Apply a wallet notification to the session and dependent state
    pub async fn on_wallet_event(&self, event: WalletEvent) -> SessionChange {
        let change = self.manager.handle_event(&event);
        match &change {
            SessionChange::AccountChanged { .. } => {
                // The previous account's figure must not outlive the switch
                self.balance.write().take();
                if let Err(e) = self.refresh_balance().await {
                    tracing::warn!(error = %e, "Balance refresh after account change failed");
                }
            }
            SessionChange::Disconnected | SessionChange::Invalidated { .. } => {
                self.balance.write().take();
            }
            SessionChange::Unchanged => {}
        }
        change
    }

    fn stop_event_loop(&self) {
        if let Some(handle) = self.event_loop.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.stop_event_loop();
    }
}

async fn event_loop(ctx: Weak<AppContext>, mut events: broadcast::Receiver<WalletEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Wallet event listener lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let Some(ctx) = ctx.upgrade() else { break };
        match ctx.on_wallet_event(event).await {
            // The session is gone; the next connect starts a new listener
            SessionChange::Disconnected | SessionChange::Invalidated { .. } => break,
            SessionChange::AccountChanged { .. } | SessionChange::Unchanged => {}
        }
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| PennyVaultError::DepositInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
