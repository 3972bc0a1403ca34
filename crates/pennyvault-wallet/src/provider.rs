//! The wallet provider boundary
//!
//! Mirrors what a browser wallet extension exposes: account access, chain
//! inspection and switching, read calls, value-bearing transactions and
//! change notifications.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use pennyvault_types::{ChainConfig, NativeCurrency, ProviderError};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Trait for wallet providers
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Ask the user for account access
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Current chain id
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// `wallet_switchEthereumChain`
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError>;

    /// `wallet_addEthereumChain`
    async fn add_chain(&self, params: &AddChainParams) -> Result<(), ProviderError>;

    /// Read-only contract call, returns raw return data
    async fn call(&self, request: &CallRequest) -> Result<Bytes, ProviderError>;

    /// Submit a transaction, returns its hash
    async fn send_transaction(&self, tx: &TxRequest) -> Result<TxHash, ProviderError>;

    /// Wait until the transaction is included in a block
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ProviderError>;

    /// Subscribe to `accountsChanged` / `chainChanged` notifications.
    ///
    /// Only notifications fired after the call are delivered.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

/// Externally fired wallet notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum WalletEvent {
    /// The exposed account list changed; empty means the user disconnected
    AccountsChanged(Vec<Address>),
    /// The wallet moved to another chain
    ChainChanged(u64),
}

/// Parameters of `wallet_addEthereumChain`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl AddChainParams {
    /// Numeric chain id, if the hex string is well formed
    pub fn chain_id_u64(&self) -> Option<u64> {
        let digits = self.chain_id.strip_prefix("0x")?;
        u64::from_str_radix(digits, 16).ok()
    }
}

impl From<&ChainConfig> for AddChainParams {
    fn from(chain: &ChainConfig) -> Self {
        Self {
            chain_id: chain.chain_id_hex(),
            chain_name: chain.chain_name.clone(),
            native_currency: chain.native_currency.clone(),
            rpc_urls: vec![chain.rpc_url.clone()],
            block_explorer_urls: vec![chain.explorer_url.clone()],
        }
    }
}

/// A read-only contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub to: Address,
    pub data: Bytes,
}

/// Transaction request parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Sending account; filled in by the session signer
    pub from: Option<Address>,
    /// Target contract address
    pub to: Address,
    /// Transaction value in wei
    pub value: U256,
    /// Encoded calldata
    pub data: Bytes,
}

impl TxRequest {
    /// Create a new transaction request
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from: None,
            to,
            value: U256::ZERO,
            data: data.into(),
        }
    }

    /// Set transaction value
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Set the sending account
    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }
}

/// Receipt of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// `false` when the transaction reverted
    pub status: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_chain_params_from_config() {
        let params = AddChainParams::from(&ChainConfig::default());
        assert_eq!(params.chain_id, "0x138b");
        assert_eq!(params.chain_id_u64(), Some(5003));
        assert_eq!(params.rpc_urls, vec!["https://rpc.sepolia.mantle.xyz".to_string()]);

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["chainName"], "Mantle Sepolia Testnet");
        assert_eq!(json["nativeCurrency"]["symbol"], "MNT");
        assert_eq!(json["blockExplorerUrls"][0], "https://sepolia.mantlescan.xyz/");
    }

    #[test]
    fn test_malformed_chain_id() {
        let mut params = AddChainParams::from(&ChainConfig::default());
        params.chain_id = "5003".to_string();
        assert_eq!(params.chain_id_u64(), None);
        params.chain_id = "0xzz".to_string();
        assert_eq!(params.chain_id_u64(), None);
    }
}
