//! JSON-RPC wallet
//!
//! Talks to a node or a signing relay exposing the standard wallet methods
//! over HTTP. Plain nodes have no push channel, so subscriptions never fire.

use crate::provider::{AddChainParams, CallRequest, TxReceipt, TxRequest, WalletEvent, WalletProvider};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::{Client, Http};
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use pennyvault_types::{PennyVaultError, ProviderError, NETWORK_ERROR_REASON};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::broadcast;

/// Configuration for the JSON-RPC wallet
#[derive(Debug, Clone)]
pub struct JsonRpcConfig {
    pub url: String,
    /// Interval between `eth_getTransactionReceipt` polls
    pub poll_interval: Duration,
    /// Polls before giving up on a receipt
    pub max_receipt_polls: u32,
}

impl JsonRpcConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            poll_interval: Duration::from_secs(1),
            max_receipt_polls: 120,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Wallet reached over HTTP JSON-RPC
pub struct JsonRpcWallet {
    config: JsonRpcConfig,
    provider: RootProvider<Http<Client>>,
    events: broadcast::Sender<WalletEvent>,
}

impl JsonRpcWallet {
    pub fn new(config: JsonRpcConfig) -> pennyvault_types::Result<Self> {
        let url = config
            .url
            .parse()
            .map_err(|e| PennyVaultError::configuration(format!("rpc url {:?}: {e}", config.url)))?;
        let provider = ProviderBuilder::new().on_http(url);
        let (events, _) = broadcast::channel(1);
        Ok(Self {
            config,
            provider,
            events,
        })
    }

    async fn wallet_request(&self, method: &'static str, params: Value) -> Result<Value, ProviderError> {
        tracing::trace!(method, "JSON-RPC request");
        self.provider
            .raw_request::<_, Value>(method.into(), params)
            .await
            .map_err(provider_error)
    }
}

/// Map a transport failure onto the EIP-1193 error shape
fn provider_error(err: TransportError) -> ProviderError {
    match err {
        RpcError::ErrorResp(payload) => ProviderError::new(payload.code, payload.message.to_string()),
        RpcError::Transport(kind) => {
            ProviderError::message(kind.to_string()).with_reason(NETWORK_ERROR_REASON)
        }
        other => ProviderError::message(other.to_string()),
    }
}

fn transaction_request(tx: &TxRequest) -> TransactionRequest {
    let request = TransactionRequest::default()
        .with_to(tx.to)
        .with_value(tx.value)
        .with_input(tx.data.clone());
    match tx.from {
        Some(from) => request.with_from(from),
        None => request,
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    fn name(&self) -> &'static str {
        "JSON-RPC"
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let requested = self
            .provider
            .raw_request::<_, Vec<Address>>("eth_requestAccounts".into(), Vec::<Value>::new())
            .await
            .map_err(provider_error);
        match requested {
            Err(e) if e.is_method_not_found() => {
                self.provider.get_accounts().await.map_err(provider_error)
            }
            other => other,
        }
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.provider.get_chain_id().await.map_err(provider_error)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        self.wallet_request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": format!("0x{chain_id:x}") }]),
        )
        .await?;
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), ProviderError> {
        self.wallet_request("wallet_addEthereumChain", json!([params]))
            .await?;
        Ok(())
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, ProviderError> {
        let tx = TransactionRequest::default()
            .with_to(request.to)
            .with_input(request.data.clone());
        self.provider.call(&tx).await.map_err(provider_error)
    }

    async fn send_transaction(&self, tx: &TxRequest) -> Result<TxHash, ProviderError> {
        let pending = self
            .provider
            .send_transaction(transaction_request(tx))
            .await
            .map_err(provider_error)?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ProviderError> {
        for _ in 0..self.config.max_receipt_polls {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(provider_error)?;
            if let Some(receipt) = receipt {
                if let Some(block_number) = receipt.block_number {
                    return Ok(TxReceipt {
                        tx_hash: receipt.transaction_hash,
                        block_number,
                        status: receipt.status(),
                    });
                }
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
        Err(ProviderError::message(format!(
            "transaction {tx_hash} not mined after {} polls",
            self.config.max_receipt_polls
        )))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, bytes, U256};
    use alloy::rpc::json_rpc::ErrorPayload;
    use alloy::transports::TransportErrorKind;

    #[test]
    fn test_rpc_error_maps_to_provider_error() {
        let err = provider_error(RpcError::ErrorResp(ErrorPayload {
            code: 4902,
            message: "Unrecognized chain ID".into(),
            data: None,
        }));
        assert!(err.is_unrecognized_chain());
        assert_eq!(err.reason, None);
    }

    #[test]
    fn test_transport_failure_is_network_error() {
        let err = provider_error(TransportErrorKind::custom_str("connection reset"));
        assert_eq!(err.reason.as_deref(), Some(NETWORK_ERROR_REASON));
        assert!(err.is_network_change());
    }

    #[test]
    fn test_transaction_request_fields() {
        let vault = address!("119cfa5bf364b5d4f9d66c8e65fc46bd5b42c8ba");
        let alice = address!("00000000000000000000000000000000000a11ce");
        let tx = TxRequest::new(vault, bytes!("d0e30db0"))
            .with_value(U256::from(450_000_000_000_000_000u128))
            .with_from(alice);

        let request = serde_json::to_value(transaction_request(&tx)).unwrap();
        assert_eq!(request["value"], "0x63eb89da4ed0000");
        assert_eq!(request["input"], "0xd0e30db0");
        assert_eq!(request["from"], json!(alice));
        assert_eq!(request["to"], json!(vault));
    }

    #[test]
    fn test_invalid_url_is_configuration_error() {
        assert!(matches!(
            JsonRpcWallet::new(JsonRpcConfig::new("not a url")),
            Err(PennyVaultError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_node_reports_network_error() {
        let wallet = JsonRpcWallet::new(JsonRpcConfig::new("http://127.0.0.1:9")).unwrap();
        let err = wallet.chain_id().await.unwrap_err();
        assert_eq!(err.reason.as_deref(), Some(NETWORK_ERROR_REASON));
    }
}
