//! Chain sessions and the capability handles bound to them

use crate::provider::{CallRequest, TxReceipt, TxRequest, WalletProvider};
use alloy::primitives::{Address, Bytes, TxHash};
use pennyvault_types::{PennyVaultError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle status of the wallet session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// The wallet moved to a chain other than the target; reconnect required
    WrongNetwork,
}

impl SessionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::WrongNetwork => write!(f, "wrong_network"),
        }
    }
}

/// Shared liveness of every handle created for one session.
#[derive(Debug, Clone)]
pub(crate) struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub(crate) fn revoke(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Read capability bound to one chain
#[derive(Clone)]
pub struct SessionReader {
    wallet: Arc<dyn WalletProvider>,
    chain_id: u64,
    live: Liveness,
}

impl SessionReader {
    pub(crate) fn new(wallet: Arc<dyn WalletProvider>, chain_id: u64, live: Liveness) -> Self {
        Self {
            wallet,
            chain_id,
            live,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// False once the owning session was invalidated
    pub fn is_live(&self) -> bool {
        self.live.is_live()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(PennyVaultError::NoActiveSession)
        }
    }

    /// Read-only contract call
    pub async fn call(&self, request: &CallRequest) -> Result<Bytes> {
        self.ensure_live()?;
        Ok(self.wallet.call(request).await?)
    }
}

impl std::fmt::Debug for SessionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionReader")
            .field("wallet", &self.wallet.name())
            .field("chain_id", &self.chain_id)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Signing capability for one account on one chain
#[derive(Debug, Clone)]
pub struct SessionSigner {
    address: Address,
    reader: SessionReader,
}

impl SessionSigner {
    pub(crate) fn new(address: Address, reader: SessionReader) -> Self {
        Self { address, reader }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.reader.chain_id
    }

    pub fn is_live(&self) -> bool {
        self.reader.is_live()
    }

    /// Read access through the same session
    pub fn reader(&self) -> &SessionReader {
        &self.reader
    }

    /// Submit a transaction from this signer's account
    pub async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash> {
        self.reader.ensure_live()?;
        let tx = tx.with_from(self.address);
        Ok(self.reader.wallet.send_transaction(&tx).await?)
    }

    /// Wait for a submitted transaction to be mined.
    ///
    /// Not gated on liveness: a submitted transaction cannot be recalled,
    /// so its confirmation is always awaited.
    pub async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt> {
        Ok(self.reader.wallet.wait_for_receipt(tx_hash).await?)
    }
}

/// An established wallet session.
///
/// Owned by the [`ChainSessionManager`](crate::ChainSessionManager); callers
/// receive snapshots. Identity fields are never patched in place: a chain
/// change discards the session entirely.
#[derive(Debug, Clone)]
pub struct ChainSession {
    pub address: Address,
    pub signer: SessionSigner,
    pub reader: SessionReader,
    pub chain_id: u64,
    pub status: SessionStatus,
}

impl ChainSession {
    pub(crate) fn new(
        wallet: Arc<dyn WalletProvider>,
        address: Address,
        chain_id: u64,
        live: Liveness,
    ) -> Self {
        let reader = SessionReader::new(wallet, chain_id, live);
        let signer = SessionSigner::new(address, reader.clone());
        Self {
            address,
            signer,
            reader,
            chain_id,
            status: SessionStatus::Connected,
        }
    }
}
