//! Request and response types shared by the providers

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to an LLM
#[derive(Error, Debug)]
pub enum LLMError {
    #[error("Request failed: {message}")]
    RequestFailed { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },
}

pub type Result<T> = std::result::Result<T, LLMError>;

/// A single-turn prompt whose answer must be a JSON document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRequest {
    /// Role and task description
    pub system: String,
    /// The user turn, data included
    pub prompt: String,
    /// Overrides the provider's configured model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl PromptRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Raw answer of a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptResponse {
    /// Answer text, expected to hold JSON
    pub content: String,
    /// Model that produced the answer
    pub model: String,
    /// Tokens billed for the exchange, when the provider reports them
    #[serde(default)]
    pub total_tokens: u32,
}

/// Provider kind for routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Google Gemini API
    Gemini,
    /// Ollama local LLM
    Ollama,
    /// Keyword rules, no LLM
    Deterministic,
}

impl ProviderKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "ollama" => Some(Self::Ollama),
            "deterministic" | "none" | "fallback" | "keywords" => Some(Self::Deterministic),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Ollama => write!(f, "ollama"),
            Self::Deterministic => write!(f, "deterministic"),
        }
    }
}
