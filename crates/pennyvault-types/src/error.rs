//! Error types for PennyVault
//!
//! Connection failures and deposit failures are kept apart so a caller can
//! tell "connect your wallet" from "transaction failed".

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for PennyVault operations
pub type Result<T> = std::result::Result<T, PennyVaultError>;

/// EIP-1193 code returned when the user declines a wallet prompt
pub const USER_REJECTED_CODE: i64 = 4001;

/// EIP-1193 code returned when the requested account is not authorized
pub const UNAUTHORIZED_CODE: i64 = 4100;

/// Wallet code for `wallet_switchEthereumChain` on a chain the wallet does not know
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// JSON-RPC code for an unsupported method
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

/// Symbolic reason attached to transport failures and mid-call network switches
pub const NETWORK_ERROR_REASON: &str = "NETWORK_ERROR";

/// Symbolic reason ethers-style wallets attach to a declined signature
pub const ACTION_REJECTED_REASON: &str = "ACTION_REJECTED";

/// An error reported by the wallet provider or the node behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    /// Numeric JSON-RPC / EIP-1193 code
    pub code: Option<i64>,
    /// Symbolic reason (e.g. `NETWORK_ERROR`)
    pub reason: Option<String>,
    /// Human readable message
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            reason: None,
            message: message.into(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            reason: None,
            message: message.into(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// The user declined the prompt
    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED_CODE, "User rejected the request.")
            .with_reason(ACTION_REJECTED_REASON)
    }

    /// The wallet does not know the requested chain
    pub fn unrecognized_chain(chain_id: u64) -> Self {
        Self::new(
            UNRECOGNIZED_CHAIN_CODE,
            format!("Unrecognized chain ID 0x{chain_id:x}. Try adding the chain first."),
        )
    }

    /// The network changed underneath an in-flight call
    pub fn network_changed(from: u64, to: u64) -> Self {
        Self::message(format!("network changed: {from} => {to}")).with_reason(NETWORK_ERROR_REASON)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == Some(USER_REJECTED_CODE)
            || self.reason.as_deref() == Some(ACTION_REJECTED_REASON)
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == Some(UNRECOGNIZED_CHAIN_CODE)
    }

    pub fn is_method_not_found(&self) -> bool {
        self.code == Some(METHOD_NOT_FOUND_CODE)
    }

    /// Transient network-change condition: either tagged `NETWORK_ERROR` or
    /// carrying "network changed" in its message.
    pub fn is_network_change(&self) -> bool {
        self.reason.as_deref() == Some(NETWORK_ERROR_REASON)
            || self.message.contains("network changed")
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "provider error {}: {}", code, self.message),
            None => write!(f, "provider error: {}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

/// PennyVault error types
#[derive(Debug, Clone, Error)]
pub enum PennyVaultError {
    // ========================================================================
    // Session Errors
    // ========================================================================

    /// Invoked outside an environment that can host a wallet extension
    #[error("Wallet connection is only available in an interactive environment")]
    EnvironmentUnsupported,

    /// No wallet capability discoverable
    #[error("A wallet extension is required")]
    NoWalletExtension,

    /// The user declined account access or a signature
    #[error("User rejected the request: {source}")]
    UserRejected { source: ProviderError },

    /// Switching to (or registering) the target chain failed
    #[error("Failed to switch to chain {chain_id}: {source}")]
    NetworkSwitchFailed { chain_id: u64, source: ProviderError },

    /// No usable session, or the session handle was invalidated
    #[error("No active wallet session")]
    NoActiveSession,

    // ========================================================================
    // Vault Errors
    // ========================================================================

    /// The vault contract call failed
    #[error("Vault contract call failed: {source}")]
    ContractCallFailed { source: ProviderError },

    /// Deposit attempt failed before confirmation
    #[error("Deposit failed: {cause}")]
    DepositFailed { cause: Box<PennyVaultError> },

    /// A second deposit was requested while one is in flight
    #[error("A deposit is already in progress")]
    DepositInFlight,

    /// Balance read failed with a network-change condition; recovered internally
    #[error("Transient read failure: {source}")]
    TransientReadFailure { source: ProviderError },

    /// Any other provider failure
    #[error(transparent)]
    Provider(#[from] ProviderError),

    // ========================================================================
    // General Errors
    // ========================================================================

    /// Amount could not be parsed or converted
    #[error("Invalid amount {amount:?}: {reason}")]
    InvalidAmount { amount: String, reason: String },

    /// Contract returned data that could not be decoded
    #[error("Failed to decode contract response: {reason}")]
    Decode { reason: String },

    /// Fatal startup configuration problem
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl PennyVaultError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid amount error
    pub fn invalid_amount(amount: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            amount: amount.into(),
            reason: reason.into(),
        }
    }

    /// Create a decode error
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// Wrap a failure of the deposit path
    pub fn deposit_failed(cause: PennyVaultError) -> Self {
        Self::DepositFailed {
            cause: Box::new(cause),
        }
    }

    /// Errors whose remedy is (re)connecting the wallet
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::EnvironmentUnsupported
                | Self::NoWalletExtension
                | Self::UserRejected { .. }
                | Self::NetworkSwitchFailed { .. }
                | Self::NoActiveSession
        )
    }

    /// The underlying cause, looking through `DepositFailed`
    pub fn root_cause(&self) -> &PennyVaultError {
        match self {
            Self::DepositFailed { cause } => cause.root_cause(),
            other => other,
        }
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EnvironmentUnsupported => "ENVIRONMENT_UNSUPPORTED",
            Self::NoWalletExtension => "NO_WALLET_EXTENSION",
            Self::UserRejected { .. } => "USER_REJECTED",
            Self::NetworkSwitchFailed { .. } => "NETWORK_SWITCH_FAILED",
            Self::NoActiveSession => "NO_ACTIVE_SESSION",
            Self::ContractCallFailed { .. } => "CONTRACT_CALL_FAILED",
            Self::DepositFailed { .. } => "DEPOSIT_FAILED",
            Self::DepositInFlight => "DEPOSIT_IN_FLIGHT",
            Self::TransientReadFailure { .. } => "TRANSIENT_READ_FAILURE",
            Self::Provider(_) => "PROVIDER_ERROR",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = PennyVaultError::UserRejected {
            source: ProviderError::user_rejected(),
        };
        assert_eq!(err.error_code(), "USER_REJECTED");
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_deposit_failure_is_not_a_connection_error() {
        let err = PennyVaultError::deposit_failed(PennyVaultError::ContractCallFailed {
            source: ProviderError::message("execution reverted"),
        });
        assert!(!err.is_connection_error());
        assert_eq!(err.root_cause().error_code(), "CONTRACT_CALL_FAILED");
    }

    #[test]
    fn test_network_change_detection() {
        assert!(ProviderError::network_changed(1, 5003).is_network_change());
        assert!(ProviderError::message("underlying network changed").is_network_change());
        assert!(ProviderError::message("x").with_reason(NETWORK_ERROR_REASON).is_network_change());
        assert!(!ProviderError::message("execution reverted").is_network_change());
    }

    #[test]
    fn test_rejection_and_chain_codes() {
        assert!(ProviderError::user_rejected().is_user_rejection());
        assert!(ProviderError::unrecognized_chain(5003).is_unrecognized_chain());
        assert!(!ProviderError::new(-32603, "internal").is_user_rejection());
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new(4902, "unknown chain");
        assert_eq!(err.to_string(), "provider error 4902: unknown chain");
        assert_eq!(ProviderError::message("boom").to_string(), "provider error: boom");
    }
}
