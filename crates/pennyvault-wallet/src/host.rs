//! The environment hosting the wallet

use crate::provider::WalletProvider;
use pennyvault_types::{PennyVaultError, Result};
use std::sync::Arc;

/// Where the session manager runs, and which wallet it can see
#[derive(Clone)]
pub enum WalletHost {
    /// Non-interactive context (server, batch job); wallets cannot attach
    Headless,
    /// Interactive context; `None` when no wallet extension was discovered
    Interactive {
        wallet: Option<Arc<dyn WalletProvider>>,
    },
}

impl WalletHost {
    pub fn interactive(wallet: Arc<dyn WalletProvider>) -> Self {
        Self::Interactive {
            wallet: Some(wallet),
        }
    }

    pub fn without_wallet() -> Self {
        Self::Interactive { wallet: None }
    }

    /// Discover the wallet capability
    pub fn wallet(&self) -> Result<Arc<dyn WalletProvider>> {
        match self {
            Self::Headless => Err(PennyVaultError::EnvironmentUnsupported),
            Self::Interactive { wallet: None } => Err(PennyVaultError::NoWalletExtension),
            Self::Interactive { wallet: Some(wallet) } => Ok(wallet.clone()),
        }
    }
}

impl std::fmt::Debug for WalletHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Headless => write!(f, "Headless"),
            Self::Interactive { wallet } => f
                .debug_struct("Interactive")
                .field("wallet", &wallet.as_ref().map(|w| w.name()))
                .finish(),
        }
    }
}
