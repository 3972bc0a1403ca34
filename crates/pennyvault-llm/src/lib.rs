//! PennyVault LLM - Expense categorization through LLM providers
//!
//! ## Providers
//! - Gemini (default): `GEMINI_API_KEY`
//! - Ollama (local): `http://localhost:11434`
//! - Deterministic: keyword rules, no LLM
//!
//! The categorization result is advisory; nothing here touches the wallet
//! or the vault.

pub mod categorize;
pub mod providers;
pub mod router;
pub mod types;

pub use categorize::*;
pub use providers::*;
pub use router::*;
pub use types::*;
