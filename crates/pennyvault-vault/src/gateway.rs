//! Vault contract gateway
//!
//! Typed boundary to the savings vault: value-bearing deposits and balance
//! reads, always through a session signer.

use crate::abi;
use alloy::primitives::{Address, TxHash, U256};
use pennyvault_types::{format_ether, parse_ether, PennyVaultError, ProviderError, Result};
use pennyvault_wallet::{CallRequest, Clock, SessionSigner, TxReceipt, TxRequest};
use std::sync::Arc;
use std::time::Duration;

/// Balance reported when a read keeps failing after the retry
pub const DEGRADED_BALANCE: &str = "0";

/// A submitted deposit awaiting confirmation
#[derive(Debug, Clone)]
pub struct PendingDeposit {
    pub tx_hash: TxHash,
    /// Deposited amount in whole native units, as submitted
    pub amount: String,
    /// Deposited amount in wei
    pub value: U256,
    signer: SessionSigner,
}

impl PendingDeposit {
    /// Wait until the deposit is mined.
    ///
    /// A reverted transaction fails with `ContractCallFailed`.
    pub async fn wait(&self) -> Result<TxReceipt> {
        let receipt = self
            .signer
            .wait_for_receipt(self.tx_hash)
            .await
            .map_err(contract_failure)?;

        if !receipt.status {
            return Err(PennyVaultError::ContractCallFailed {
                source: ProviderError::message(format!(
                    "transaction {} reverted in block {}",
                    receipt.tx_hash, receipt.block_number
                )),
            });
        }
        Ok(receipt)
    }
}

/// Gateway to the vault contract at a fixed address
#[derive(Clone)]
pub struct VaultGateway {
    address: Address,
    clock: Arc<dyn Clock>,
    settle_delay: Duration,
}

impl VaultGateway {
    pub fn new(address: Address, clock: Arc<dyn Clock>, settle_delay: Duration) -> Self {
        Self {
            address,
            clock,
            settle_delay,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Deposit `amount` whole native units.
    ///
    /// Returns as soon as the wallet hands back a transaction hash; call
    /// [`PendingDeposit::wait`] for confirmation.
    pub async fn deposit(&self, signer: &SessionSigner, amount: &str) -> Result<PendingDeposit> {
        let value = parse_ether(amount)?;
        let tx = TxRequest::new(self.address, abi::encode_deposit()).with_value(value);

        let tx_hash = signer.send_transaction(tx).await.map_err(|e| match e {
            PennyVaultError::Provider(source) if source.is_user_rejection() => {
                PennyVaultError::UserRejected { source }
            }
            other => contract_failure(other),
        })?;

        tracing::info!(
            vault = %self.address,
            from = %signer.address(),
            amount,
            tx_hash = %tx_hash,
            "Vault deposit submitted"
        );

        Ok(PendingDeposit {
            tx_hash,
            amount: amount.to_string(),
            value,
            signer: signer.clone(),
        })
    }

    /// Vault balance of `owner`, formatted in whole native units.
    ///
    /// A network change mid-call is retried once after the settling delay;
    /// if the retry fails too the balance degrades to `"0"`. Every other
    /// error propagates.
    pub async fn get_balance(&self, signer: &SessionSigner, owner: Address) -> Result<String> {
        match self.read_balance(signer, owner).await {
            Ok(wei) => Ok(format_ether(wei)),
            Err(PennyVaultError::Provider(source)) if source.is_network_change() => {
                let transient = PennyVaultError::TransientReadFailure { source };
                tracing::warn!(
                    owner = %owner,
                    error = %transient,
                    "Network change detected, retrying vault balance read"
                );
                self.clock.sleep(self.settle_delay).await;

                match self.read_balance(signer, owner).await {
                    Ok(wei) => Ok(format_ether(wei)),
                    Err(e) => {
                        tracing::error!(
                            owner = %owner,
                            error = %e,
                            "Retry failed for vault balance, reporting zero"
                        );
                        Ok(DEGRADED_BALANCE.to_string())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn read_balance(&self, signer: &SessionSigner, owner: Address) -> Result<U256> {
        let request = CallRequest {
            to: self.address,
            data: abi::encode_get_balance(owner),
        };
        let data = signer.reader().call(&request).await?;
        abi::decode_balance(&data)
    }
}

impl std::fmt::Debug for VaultGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultGateway")
            .field("address", &self.address)
            .field("settle_delay", &self.settle_delay)
            .finish()
    }
}

fn contract_failure(error: PennyVaultError) -> PennyVaultError {
    match error {
        PennyVaultError::Provider(source) => PennyVaultError::ContractCallFailed { source },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use pennyvault_types::ChainConfig;
    use pennyvault_wallet::{
        ChainSessionManager, InstantClock, SimulatedWallet, WalletEvent, WalletHost, WalletMethod,
    };

    const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
    const VAULT: Address = address!("119cfa5bf364b5d4f9d66c8e65fc46bd5b42c8ba");

    fn wei(value: u128) -> U256 {
        U256::from(value)
    }

    struct Fixture {
        wallet: Arc<SimulatedWallet>,
        manager: ChainSessionManager,
        gateway: VaultGateway,
        clock: Arc<InstantClock>,
    }

    fn fixture() -> Fixture {
        let wallet = Arc::new(SimulatedWallet::new(ALICE, 5003));
        let clock = Arc::new(InstantClock::new());
        let manager = ChainSessionManager::new(
            WalletHost::interactive(wallet.clone()),
            ChainConfig::default(),
            clock.clone(),
            Duration::from_secs(1),
        );
        let gateway = VaultGateway::new(VAULT, clock.clone(), Duration::from_secs(1));
        Fixture {
            wallet,
            manager,
            gateway,
            clock,
        }
    }

    #[tokio::test]
    async fn test_deposit_converts_amount_and_confirms() {
        let f = fixture();
        let session = f.manager.connect().await.unwrap();

        let pending = f.gateway.deposit(&session.signer, "0.45").await.unwrap();
        assert_ne!(pending.tx_hash, TxHash::ZERO);
        assert_eq!(pending.value, wei(450_000_000_000_000_000));

        let receipt = pending.wait().await.unwrap();
        assert_eq!(receipt.tx_hash, pending.tx_hash);

        let sent = f.wallet.sent_transactions();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, VAULT);
        assert_eq!(sent[0].data, abi::encode_deposit());
        assert_eq!(sent[0].value, wei(450_000_000_000_000_000));
        assert_eq!(sent[0].from, Some(ALICE));
    }

    #[tokio::test]
    async fn test_deposit_rejection_is_distinguished() {
        let f = fixture();
        let session = f.manager.connect().await.unwrap();
        f.wallet
            .fail_next(WalletMethod::SendTransaction, ProviderError::user_rejected());

        let err = f.gateway.deposit(&session.signer, "0.45").await.unwrap_err();
        assert!(matches!(err, PennyVaultError::UserRejected { .. }));
    }

    #[tokio::test]
    async fn test_deposit_provider_error_is_contract_failure() {
        let f = fixture();
        let session = f.manager.connect().await.unwrap();
        f.wallet.fail_next(
            WalletMethod::SendTransaction,
            ProviderError::new(-32000, "insufficient funds for gas"),
        );

        let err = f.gateway.deposit(&session.signer, "0.45").await.unwrap_err();
        match err {
            PennyVaultError::ContractCallFailed { source } => {
                assert_eq!(source.message, "insufficient funds for gas")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reverted_deposit_fails_on_wait() {
        let f = fixture();
        let session = f.manager.connect().await.unwrap();
        f.wallet.revert_transactions(true);

        let pending = f.gateway.deposit(&session.signer, "1").await.unwrap();
        let err = pending.wait().await.unwrap_err();
        assert!(matches!(err, PennyVaultError::ContractCallFailed { .. }));
    }

    #[tokio::test]
    async fn test_invalid_amount_never_reaches_wallet() {
        let f = fixture();
        let session = f.manager.connect().await.unwrap();

        let err = f.gateway.deposit(&session.signer, "-1").await.unwrap_err();
        assert!(matches!(err, PennyVaultError::InvalidAmount { .. }));
        assert_eq!(f.wallet.calls(WalletMethod::SendTransaction), 0);
    }

    #[tokio::test]
    async fn test_stale_signer_cannot_deposit() {
        let f = fixture();
        let session = f.manager.connect().await.unwrap();
        f.manager.handle_event(&WalletEvent::ChainChanged(1));

        let err = f.gateway.deposit(&session.signer, "0.45").await.unwrap_err();
        assert!(matches!(err, PennyVaultError::NoActiveSession));
    }

    #[tokio::test]
    async fn test_balance_formats_ether_units() {
        let f = fixture();
        let session = f.manager.connect().await.unwrap();
        f.wallet.credit(ALICE, wei(1_000_000_000_000_000_000));

        let balance = f
            .gateway
            .get_balance(&session.signer, session.address)
            .await
            .unwrap();
        assert_eq!(balance, "1.0");
    }

    #[tokio::test]
    async fn test_balance_beyond_u128_is_read() {
        let f = fixture();
        let session = f.manager.connect().await.unwrap();
        // 2^128 wei
        f.wallet.credit(ALICE, U256::from(1u8) << 128usize);

        let balance = f
            .gateway
            .get_balance(&session.signer, session.address)
            .await
            .unwrap();
        assert_eq!(balance, "340282366920938463463.374607431768211456");
        assert_eq!(f.wallet.calls(WalletMethod::Call), 1);
    }

    #[tokio::test]
    async fn test_balance_retry_returns_second_value() {
        let f = fixture();
        let session = f.manager.connect().await.unwrap();
        f.wallet.credit(ALICE, wei(450_000_000_000_000_000));
        f.wallet
            .fail_next(WalletMethod::Call, ProviderError::network_changed(5003, 1));

        let balance = f
            .gateway
            .get_balance(&session.signer, session.address)
            .await
            .unwrap();
        assert_eq!(balance, "0.45");
        assert_eq!(f.wallet.calls(WalletMethod::Call), 2);
        assert_eq!(f.clock.pauses(), vec![Duration::from_secs(1)]);
    }

    #[tokio::test]
    async fn test_balance_degrades_to_zero_after_failed_retry() {
        let f = fixture();
        let session = f.manager.connect().await.unwrap();
        f.wallet.credit(ALICE, wei(450_000_000_000_000_000));
        f.wallet
            .fail_next(WalletMethod::Call, ProviderError::network_changed(5003, 1));
        f.wallet
            .fail_next(WalletMethod::Call, ProviderError::message("still unreachable"));

        let balance = f
            .gateway
            .get_balance(&session.signer, session.address)
            .await
            .unwrap();
        assert_eq!(balance, DEGRADED_BALANCE);
        assert_eq!(f.wallet.calls(WalletMethod::Call), 2);
    }

    #[tokio::test]
    async fn test_network_change_detected_by_message() {
        let f = fixture();
        let session = f.manager.connect().await.unwrap();
        f.wallet.fail_next(
            WalletMethod::Call,
            ProviderError::message("underlying network changed (event=\"changed\")"),
        );

        let balance = f
            .gateway
            .get_balance(&session.signer, session.address)
            .await
            .unwrap();
        assert_eq!(balance, "0.0");
        assert_eq!(f.wallet.calls(WalletMethod::Call), 2);
    }

    #[tokio::test]
    async fn test_other_balance_errors_propagate_without_retry() {
        let f = fixture();
        let session = f.manager.connect().await.unwrap();
        f.wallet
            .fail_next(WalletMethod::Call, ProviderError::new(-32000, "execution reverted"));

        let err = f
            .gateway
            .get_balance(&session.signer, session.address)
            .await
            .unwrap_err();
        assert!(matches!(err, PennyVaultError::Provider(_)));
        assert_eq!(f.wallet.calls(WalletMethod::Call), 1);
        assert!(f.clock.pauses().is_empty());
    }
}
