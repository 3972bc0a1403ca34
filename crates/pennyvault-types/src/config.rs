//! Process-wide configuration
//!
//! All values are fixed at startup. The vault contract address is required;
//! its absence is a fatal configuration error, never a runtime one.

use crate::{parse_address, Address, PennyVaultError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Target chain
    #[serde(default)]
    pub chain: ChainConfig,

    /// Vault contract
    #[serde(default)]
    pub vault: VaultConfig,

    /// Settling and polling timings
    #[serde(default)]
    pub timing: TimingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Categorization LLM
    #[serde(default)]
    pub llm: LlmConfig,
}

impl AppConfig {
    /// The validated vault contract address
    pub fn vault_address(&self) -> Result<Address> {
        let raw = self
            .vault
            .address
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PennyVaultError::configuration("vault.address is required"))?;
        parse_address(raw)
    }
}

/// The single chain this deployment operates against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    #[serde(default = "default_chain_name")]
    pub chain_name: String,

    #[serde(default)]
    pub native_currency: NativeCurrency,

    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            chain_name: default_chain_name(),
            native_currency: NativeCurrency::default(),
            rpc_url: default_rpc_url(),
            explorer_url: default_explorer_url(),
        }
    }
}

impl ChainConfig {
    /// Chain id as the `0x`-prefixed hex string wallets expect
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    /// Block explorer link for a transaction
    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }
}

/// Native currency metadata supplied when registering the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for NativeCurrency {
    fn default() -> Self {
        Self {
            name: "MNT".to_string(),
            symbol: "MNT".to_string(),
            decimals: 18,
        }
    }
}

/// Vault contract configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Deployed vault contract address
    #[serde(default)]
    pub address: Option<String>,
}

/// Timing assumptions made visible
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pause after a chain switch/registration, and before a balance retry
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Poll interval while waiting for a transaction receipt
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
        }
    }
}

impl TimingConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Categorization LLM selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name (gemini, ollama, deterministic)
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model override
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
        }
    }
}

// =============================================================================
// Default Functions
// =============================================================================

fn default_chain_id() -> u64 {
    5003
}

fn default_chain_name() -> String {
    "Mantle Sepolia Testnet".to_string()
}

fn default_rpc_url() -> String {
    "https://rpc.sepolia.mantle.xyz".to_string()
}

fn default_explorer_url() -> String {
    "https://sepolia.mantlescan.xyz/".to_string()
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_receipt_poll_interval_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_llm_provider() -> String {
    "gemini".to_string()
}
