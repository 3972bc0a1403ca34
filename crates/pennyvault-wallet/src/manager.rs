//! Chain session manager
//!
//! Establishes the wallet connection and guarantees that a session handed
//! out as usable always targets the configured chain.
//!
//! ```text
//! connect:  subscribe → request accounts → read chain → [switch | register]
//!           → settle → verify → reconcile notifications fired meanwhile
//! events:   accountsChanged([]) → Disconnected
//!           accountsChanged([a]) → rebind address
//!           chainChanged(_)      → session discarded, reconnect required
//! ```

use crate::clock::Clock;
use crate::host::WalletHost;
use crate::provider::{AddChainParams, WalletEvent, WalletProvider};
use crate::session::{ChainSession, Liveness, SessionStatus};
use alloy::primitives::Address;
use parking_lot::RwLock;
use pennyvault_types::{ChainConfig, PennyVaultError, ProviderError, Result, UNAUTHORIZED_CODE};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// How a wallet notification affected the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// Nothing to do
    Unchanged,
    /// Same chain, different account; dependent state should refresh
    AccountChanged { address: Address },
    /// The user disconnected every account
    Disconnected,
    /// The chain changed; the session was discarded
    Invalidated { chain_id: u64 },
}

struct ActiveSession {
    session: ChainSession,
    wallet: Arc<dyn WalletProvider>,
    live: Liveness,
    events: Option<broadcast::Receiver<WalletEvent>>,
}

struct ManagerState {
    status: SessionStatus,
    active: Option<ActiveSession>,
}

/// Owns the wallet session
pub struct ChainSessionManager {
    host: WalletHost,
    chain: ChainConfig,
    clock: Arc<dyn Clock>,
    settle_delay: Duration,
    state: RwLock<ManagerState>,
}

impl ChainSessionManager {
    pub fn new(
        host: WalletHost,
        chain: ChainConfig,
        clock: Arc<dyn Clock>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            host,
            chain,
            clock,
            settle_delay,
            state: RwLock::new(ManagerState {
                status: SessionStatus::Disconnected,
                active: None,
            }),
        }
    }

    /// The target chain
    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub fn status(&self) -> SessionStatus {
        self.state.read().status
    }

    /// Snapshot of the active session, if connected
    pub fn session(&self) -> Option<ChainSession> {
        self.state.read().active.as_ref().map(|a| a.session.clone())
    }

    /// The active session or `NoActiveSession`
    pub fn active_session(&self) -> Result<ChainSession> {
        self.session().ok_or(PennyVaultError::NoActiveSession)
    }

    /// Take the event subscription of the current session.
    ///
    /// Notifications fired while connecting were already applied, including
    /// the ones caused by this session's own switch or registration; only
    /// later ones are delivered. Returns `None` if already taken.
    pub fn take_events(&self) -> Option<broadcast::Receiver<WalletEvent>> {
        self.state.write().active.as_mut().and_then(|a| a.events.take())
    }

    /// Connect the wallet and make sure it is on the target chain.
    ///
    /// Any previous session is discarded first. Errors surface verbatim;
    /// there is no retry.
    pub async fn connect(&self) -> Result<ChainSession> {
        let wallet = self.host.wallet()?;

        {
            let mut state = self.state.write();
            if let Some(previous) = state.active.take() {
                previous.live.revoke();
            }
            state.status = SessionStatus::Connecting;
        }

        tracing::info!(
            wallet = wallet.name(),
            target_chain = self.chain.chain_id,
            "Connecting wallet"
        );

        let mut events = wallet.subscribe();
        match self.establish(wallet.clone(), &mut events).await {
            Ok((session, live)) => {
                let mut state = self.state.write();
                state.status = SessionStatus::Connected;
                state.active = Some(ActiveSession {
                    session: session.clone(),
                    wallet,
                    live,
                    events: Some(events),
                });
                tracing::info!(
                    address = %session.address,
                    chain_id = session.chain_id,
                    "Wallet connected"
                );
                Ok(session)
            }
            Err(e) => {
                self.state.write().status = SessionStatus::Disconnected;
                tracing::warn!(error = %e, code = e.error_code(), "Wallet connection failed");
                Err(e)
            }
        }
    }

    async fn establish(
        &self,
        wallet: Arc<dyn WalletProvider>,
        events: &mut broadcast::Receiver<WalletEvent>,
    ) -> Result<(ChainSession, Liveness)> {
        let accounts = wallet.request_accounts().await.map_err(|e| {
            if e.is_user_rejection() {
                PennyVaultError::UserRejected { source: e }
            } else {
                PennyVaultError::Provider(e)
            }
        })?;

        let address = first_account(&accounts, "no accounts authorized")?;

        let target = self.chain.chain_id;
        let current = wallet.chain_id().await?;
        let chain_id = if current == target {
            current
        } else {
            tracing::info!(current, target, "Wallet on wrong chain, switching");
            self.switch_to_target(wallet.as_ref()).await?;
            let verified = wallet.chain_id().await?;
            if verified != target {
                return Err(PennyVaultError::NetworkSwitchFailed {
                    chain_id: target,
                    source: ProviderError::message(format!(
                        "wallet still on chain {verified} after switching"
                    )),
                });
            }
            verified
        };

        let address = self
            .reconcile_pending(wallet.as_ref(), events, address, chain_id)
            .await?;

        let live = Liveness::new();
        let session = ChainSession::new(wallet, address, chain_id, live.clone());
        Ok((session, live))
    }

    /// Apply the notifications the wallet fired while connecting.
    ///
    /// The switch and registration announce the target chain; those are
    /// dropped. The last account list wins: empty means the user withdrew
    /// access mid-connect, another account rebinds the session. A chain other
    /// than the verified one means the wallet moved on after verification.
    async fn reconcile_pending(
        &self,
        wallet: &dyn WalletProvider,
        events: &mut broadcast::Receiver<WalletEvent>,
        mut address: Address,
        chain_id: u64,
    ) -> Result<Address> {
        let mut accounts = None;
        let mut moved_to = None;
        let mut lagged = false;
        loop {
            match events.try_recv() {
                Ok(WalletEvent::AccountsChanged(list)) => accounts = Some(list),
                Ok(WalletEvent::ChainChanged(id)) => {
                    moved_to = (id != chain_id).then_some(id);
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Missed wallet events while connecting");
                    lagged = true;
                }
                Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
                    break
                }
            }
        }

        if lagged {
            accounts = Some(wallet.request_accounts().await?);
            let current = wallet.chain_id().await?;
            moved_to = (current != chain_id).then_some(current);
        }

        if let Some(current) = moved_to {
            return Err(PennyVaultError::NetworkSwitchFailed {
                chain_id: self.chain.chain_id,
                source: ProviderError::message(format!(
                    "wallet moved to chain {current} while connecting"
                )),
            });
        }

        if let Some(list) = accounts {
            let current = first_account(&list, "accounts withdrawn while connecting")?;
            if current != address {
                tracing::info!(from = %address, to = %current, "Wallet account changed while connecting");
                address = current;
            }
        }
        Ok(address)
    }

    async fn switch_to_target(&self, wallet: &dyn WalletProvider) -> Result<()> {
        let target = self.chain.chain_id;
        match wallet.switch_chain(target).await {
            Ok(()) => {}
            Err(e) if e.is_unrecognized_chain() => {
                tracing::info!(chain = %self.chain.chain_name, "Chain unknown to wallet, registering");
                let params = AddChainParams::from(&self.chain);
                wallet
                    .add_chain(&params)
                    .await
                    .map_err(|source| PennyVaultError::NetworkSwitchFailed {
                        chain_id: target,
                        source,
                    })?;
            }
            Err(source) => {
                return Err(PennyVaultError::NetworkSwitchFailed {
                    chain_id: target,
                    source,
                })
            }
        }

        self.clock.sleep(self.settle_delay).await;
        Ok(())
    }

    /// Forget the local session. Wallets offer no remote revocation.
    pub fn disconnect(&self) {
        let mut state = self.state.write();
        if let Some(previous) = state.active.take() {
            previous.live.revoke();
            tracing::info!(address = %previous.session.address, "Wallet disconnected");
        }
        state.status = SessionStatus::Disconnected;
    }

    /// React to a wallet notification
    pub fn handle_event(&self, event: &WalletEvent) -> SessionChange {
        let mut state = self.state.write();
        if state.status == SessionStatus::Connecting {
            // The in-flight connect verifies the chain itself
            tracing::debug!(?event, "Ignoring wallet event while connecting");
            return SessionChange::Unchanged;
        }

        match event {
            WalletEvent::AccountsChanged(accounts) => {
                let Some(first) = accounts.first() else {
                    if let Some(previous) = state.active.take() {
                        previous.live.revoke();
                    }
                    state.status = SessionStatus::Disconnected;
                    tracing::info!("Wallet exposed no accounts, disconnected");
                    return SessionChange::Disconnected;
                };

                let Some(active) = state.active.as_mut() else {
                    return SessionChange::Unchanged;
                };
                let address = *first;
                if address == active.session.address {
                    return SessionChange::Unchanged;
                }

                // Signers are bound to an account: hand out fresh handles
                active.live.revoke();
                let live = Liveness::new();
                active.session = ChainSession::new(
                    active.wallet.clone(),
                    address,
                    active.session.chain_id,
                    live.clone(),
                );
                active.live = live;
                tracing::info!(address = %address, "Wallet account changed");
                SessionChange::AccountChanged { address }
            }
            WalletEvent::ChainChanged(chain_id) => {
                if let Some(previous) = state.active.take() {
                    previous.live.revoke();
                }
                state.status = if *chain_id == self.chain.chain_id {
                    SessionStatus::Disconnected
                } else {
                    SessionStatus::WrongNetwork
                };
                tracing::warn!(
                    chain_id,
                    status = %state.status,
                    "Wallet chain changed, session discarded"
                );
                SessionChange::Invalidated {
                    chain_id: *chain_id,
                }
            }
        }
    }
}

/// The first exposed account; an empty list counts as a refusal
fn first_account(accounts: &[Address], reason: &str) -> Result<Address> {
    accounts
        .first()
        .copied()
        .ok_or_else(|| PennyVaultError::UserRejected {
            source: ProviderError::new(UNAUTHORIZED_CODE, reason),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::InstantClock;
    use crate::provider::{AddChainParams, CallRequest, TxReceipt, TxRequest};
    use crate::simulated::{SimulatedWallet, WalletMethod};
    use alloy::primitives::{address, Bytes, TxHash, U256};
    use async_trait::async_trait;

    const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
    const BOB: Address = address!("0000000000000000000000000000000000000b0b");
    const TARGET: u64 = 5003;

    /// What the user does in the wallet UI while the switch prompt is open
    enum DuringSwitch {
        WithdrawAccounts,
        SelectAccount(Address),
    }

    /// Simulated wallet whose user acts while the chain switch is pending
    struct BusyUserWallet {
        inner: Arc<SimulatedWallet>,
        action: DuringSwitch,
    }

    #[async_trait]
    impl WalletProvider for BusyUserWallet {
        fn name(&self) -> &'static str {
            "BusyUser"
        }

        async fn request_accounts(&self) -> std::result::Result<Vec<Address>, ProviderError> {
            self.inner.request_accounts().await
        }

        async fn chain_id(&self) -> std::result::Result<u64, ProviderError> {
            self.inner.chain_id().await
        }

        async fn switch_chain(&self, chain_id: u64) -> std::result::Result<(), ProviderError> {
            match self.action {
                DuringSwitch::WithdrawAccounts => self.inner.set_accounts(vec![]),
                DuringSwitch::SelectAccount(account) => self.inner.set_accounts(vec![account]),
            }
            self.inner.switch_chain(chain_id).await
        }

        async fn add_chain(&self, params: &AddChainParams) -> std::result::Result<(), ProviderError> {
            self.inner.add_chain(params).await
        }

        async fn call(&self, request: &CallRequest) -> std::result::Result<Bytes, ProviderError> {
            self.inner.call(request).await
        }

        async fn send_transaction(&self, tx: &TxRequest) -> std::result::Result<TxHash, ProviderError> {
            self.inner.send_transaction(tx).await
        }

        async fn wait_for_receipt(&self, tx_hash: TxHash) -> std::result::Result<TxReceipt, ProviderError> {
            self.inner.wait_for_receipt(tx_hash).await
        }

        fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
            self.inner.subscribe()
        }
    }

    fn busy_user_manager(action: DuringSwitch) -> (ChainSessionManager, Arc<SimulatedWallet>) {
        let inner = Arc::new(SimulatedWallet::new(ALICE, 1).with_known_chain(TARGET));
        let wallet = Arc::new(BusyUserWallet {
            inner: inner.clone(),
            action,
        });
        let manager = ChainSessionManager::new(
            WalletHost::interactive(wallet),
            ChainConfig::default(),
            Arc::new(InstantClock::new()),
            Duration::from_secs(1),
        );
        (manager, inner)
    }

    fn manager_for(wallet: Arc<SimulatedWallet>) -> (ChainSessionManager, Arc<InstantClock>) {
        let clock = Arc::new(InstantClock::new());
        let manager = ChainSessionManager::new(
            WalletHost::interactive(wallet),
            ChainConfig::default(),
            clock.clone(),
            Duration::from_secs(1),
        );
        (manager, clock)
    }

    #[tokio::test]
    async fn test_headless_environment_unsupported() {
        let manager = ChainSessionManager::new(
            WalletHost::Headless,
            ChainConfig::default(),
            Arc::new(InstantClock::new()),
            Duration::from_secs(1),
        );
        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, PennyVaultError::EnvironmentUnsupported));
        assert_eq!(manager.status(), SessionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_missing_wallet_extension() {
        let manager = ChainSessionManager::new(
            WalletHost::without_wallet(),
            ChainConfig::default(),
            Arc::new(InstantClock::new()),
            Duration::from_secs(1),
        );
        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, PennyVaultError::NoWalletExtension));
    }

    #[tokio::test]
    async fn test_connect_on_target_chain_skips_switch() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, TARGET));
        let (manager, clock) = manager_for(wallet.clone());

        let session = manager.connect().await.unwrap();
        assert_eq!(session.address, ALICE);
        assert_eq!(session.chain_id, TARGET);
        assert_eq!(manager.status(), SessionStatus::Connected);
        assert_eq!(wallet.calls(WalletMethod::SwitchChain), 0);
        assert_eq!(wallet.calls(WalletMethod::AddChain), 0);
        assert!(clock.pauses().is_empty());
    }

    #[tokio::test]
    async fn test_connect_switches_known_chain_and_settles() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, 1).with_known_chain(TARGET));
        let (manager, clock) = manager_for(wallet.clone());

        let session = manager.connect().await.unwrap();
        assert_eq!(session.chain_id, TARGET);
        assert_eq!(wallet.calls(WalletMethod::SwitchChain), 1);
        assert_eq!(wallet.calls(WalletMethod::AddChain), 0);
        assert_eq!(clock.pauses(), vec![Duration::from_secs(1)]);
    }

    #[tokio::test]
    async fn test_unrecognized_chain_registers_exactly_once() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, 1));
        let (manager, clock) = manager_for(wallet.clone());

        let session = manager.connect().await.unwrap();
        assert_eq!(session.chain_id, TARGET);
        assert_eq!(wallet.calls(WalletMethod::SwitchChain), 1);
        assert_eq!(wallet.calls(WalletMethod::AddChain), 1);
        assert_eq!(clock.pauses(), vec![Duration::from_secs(1)]);

        let added = wallet.added_chains();
        assert_eq!(added[0].chain_id, "0x138b");
        assert_eq!(added[0].chain_name, "Mantle Sepolia Testnet");
        assert_eq!(added[0].native_currency.symbol, "MNT");
        assert_eq!(added[0].rpc_urls, vec!["https://rpc.sepolia.mantle.xyz".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_registration_is_not_retried() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, 1));
        wallet.fail_next(WalletMethod::AddChain, ProviderError::user_rejected());
        let (manager, _) = manager_for(wallet.clone());

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, PennyVaultError::NetworkSwitchFailed { chain_id: TARGET, .. }));
        assert_eq!(wallet.calls(WalletMethod::AddChain), 1);
        assert_eq!(manager.status(), SessionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_other_switch_error_is_fatal() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, 1).with_known_chain(TARGET));
        wallet.fail_next(WalletMethod::SwitchChain, ProviderError::new(-32002, "request pending"));
        let (manager, clock) = manager_for(wallet.clone());

        let err = manager.connect().await.unwrap_err();
        match err {
            PennyVaultError::NetworkSwitchFailed { source, .. } => {
                assert_eq!(source.code, Some(-32002))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(wallet.calls(WalletMethod::AddChain), 0);
        assert!(clock.pauses().is_empty());
        assert!(manager.session().is_none());
    }

    #[tokio::test]
    async fn test_user_rejection_is_distinguished() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, TARGET));
        wallet.fail_next(WalletMethod::RequestAccounts, ProviderError::user_rejected());
        let (manager, _) = manager_for(wallet.clone());

        let err = manager.connect().await.unwrap_err();
        match err {
            PennyVaultError::UserRejected { source } => assert!(source.is_user_rejection()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_other_account_errors_propagate() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, TARGET));
        wallet.fail_next(WalletMethod::RequestAccounts, ProviderError::new(-32603, "internal"));
        let (manager, _) = manager_for(wallet);

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, PennyVaultError::Provider(_)));
    }

    #[tokio::test]
    async fn test_disconnect_revokes_handles() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, TARGET));
        let (manager, _) = manager_for(wallet);
        let session = manager.connect().await.unwrap();

        manager.disconnect();
        assert_eq!(manager.status(), SessionStatus::Disconnected);
        assert!(!session.signer.is_live());
        assert!(matches!(manager.active_session(), Err(PennyVaultError::NoActiveSession)));
    }

    #[tokio::test]
    async fn test_empty_accounts_forces_disconnect() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, TARGET));
        let (manager, _) = manager_for(wallet);
        manager.connect().await.unwrap();

        let change = manager.handle_event(&WalletEvent::AccountsChanged(vec![]));
        assert_eq!(change, SessionChange::Disconnected);
        assert_eq!(manager.status(), SessionStatus::Disconnected);
        assert!(manager.session().is_none());
    }

    #[tokio::test]
    async fn test_account_switch_rebinds_address() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, TARGET));
        let (manager, _) = manager_for(wallet);
        let old = manager.connect().await.unwrap();

        let change = manager.handle_event(&WalletEvent::AccountsChanged(vec![BOB]));
        assert_eq!(change, SessionChange::AccountChanged { address: BOB });
        let current = manager.active_session().unwrap();
        assert_eq!(current.address, BOB);
        assert_eq!(current.chain_id, TARGET);
        assert!(current.signer.is_live());
        assert!(!old.signer.is_live());

        let same = manager.handle_event(&WalletEvent::AccountsChanged(vec![BOB]));
        assert_eq!(same, SessionChange::Unchanged);
    }

    #[tokio::test]
    async fn test_chain_change_discards_session() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, TARGET));
        let (manager, _) = manager_for(wallet.clone());
        let session = manager.connect().await.unwrap();

        let change = manager.handle_event(&WalletEvent::ChainChanged(1));
        assert_eq!(change, SessionChange::Invalidated { chain_id: 1 });
        assert_eq!(manager.status(), SessionStatus::WrongNetwork);
        assert!(manager.session().is_none());

        let stale = session
            .signer
            .send_transaction(TxRequest::new(session.address, Bytes::new()).with_value(U256::from(1)))
            .await;
        assert!(matches!(stale, Err(PennyVaultError::NoActiveSession)));
        assert_eq!(wallet.calls(WalletMethod::SendTransaction), 0);
    }

    #[tokio::test]
    async fn test_chain_change_back_to_target_still_requires_reconnect() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, TARGET));
        let (manager, _) = manager_for(wallet);
        let session = manager.connect().await.unwrap();

        manager.handle_event(&WalletEvent::ChainChanged(TARGET));
        assert_eq!(manager.status(), SessionStatus::Disconnected);
        assert!(!session.reader.is_live());
    }

    #[tokio::test]
    async fn test_reconnect_builds_fresh_session() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, TARGET));
        let (manager, _) = manager_for(wallet);
        let first = manager.connect().await.unwrap();
        let second = manager.connect().await.unwrap();
        assert!(!first.signer.is_live());
        assert!(second.signer.is_live());
    }

    #[tokio::test]
    async fn test_event_subscription_excludes_own_switch() {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, 1).with_known_chain(TARGET));
        let (manager, _) = manager_for(wallet.clone());
        manager.connect().await.unwrap();

        let mut events = manager.take_events().unwrap();
        assert!(manager.take_events().is_none());
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        wallet.set_chain(1);
        assert_eq!(events.recv().await.unwrap(), WalletEvent::ChainChanged(1));
    }

    #[tokio::test]
    async fn test_accounts_withdrawn_during_switch_fail_connect() {
        let (manager, inner) = busy_user_manager(DuringSwitch::WithdrawAccounts);

        let err = manager.connect().await.unwrap_err();
        match err {
            PennyVaultError::UserRejected { source } => {
                assert_eq!(source.code, Some(UNAUTHORIZED_CODE))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(manager.status(), SessionStatus::Disconnected);
        assert!(manager.session().is_none());
        assert!(inner.request_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_account_selected_during_switch_binds_session() {
        let (manager, _) = busy_user_manager(DuringSwitch::SelectAccount(BOB));

        let session = manager.connect().await.unwrap();
        assert_eq!(session.address, BOB);
        assert_eq!(session.signer.address(), BOB);
        assert_eq!(session.chain_id, TARGET);
        assert_eq!(manager.status(), SessionStatus::Connected);

        let mut events = manager.take_events().unwrap();
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
