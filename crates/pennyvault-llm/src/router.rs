//! LLM Router - Selects the categorization provider

use std::sync::Arc;

use pennyvault_types::LlmConfig;

use crate::providers::*;
use crate::types::*;

/// Holds the configured provider, if any.
///
/// Without a provider every prompt is answered by the caller's rule-based
/// fallback.
pub struct LLMRouter {
    provider: Option<Arc<dyn LLMProvider>>,
    model: Option<String>,
}

impl LLMRouter {
    /// Route every prompt to `provider`
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider: Some(provider),
            model: None,
        }
    }

    /// No LLM at all
    pub fn deterministic() -> Self {
        Self {
            provider: None,
            model: None,
        }
    }

    /// Create a router from the `llm` configuration section
    pub fn from_config(config: &LlmConfig) -> Self {
        let kind = ProviderKind::from_str(&config.provider).unwrap_or_else(|| {
            tracing::warn!(provider = %config.provider, "Unknown LLM provider, using deterministic fallback");
            ProviderKind::Deterministic
        });
        Self::from_kind(kind, config.model.as_deref())
    }

    /// Create a router for a specific provider kind
    pub fn from_kind(kind: ProviderKind, model: Option<&str>) -> Self {
        let provider: Arc<dyn LLMProvider> = match kind {
            ProviderKind::Gemini => match GeminiConfig::from_env() {
                Some(config) => Arc::new(GeminiProvider::new(config)),
                None => {
                    tracing::warn!("GEMINI_API_KEY not set, using deterministic fallback");
                    return Self::deterministic();
                }
            },
            ProviderKind::Ollama => Arc::new(OllamaProvider::new(OllamaConfig::default())),
            ProviderKind::Deterministic => return Self::deterministic(),
        };

        Self {
            provider: Some(provider),
            model: model.map(str::to_string),
        }
    }

    /// Kind of the provider prompts go to
    pub fn kind(&self) -> ProviderKind {
        self.provider
            .as_ref()
            .map_or(ProviderKind::Deterministic, |p| p.kind())
    }

    /// Ask the configured provider.
    ///
    /// `None` means the caller should fall back: there is no provider, it is
    /// unreachable, or the request failed.
    pub async fn complete_with_fallback(&self, request: PromptRequest) -> Option<PromptResponse> {
        let provider = self.provider.as_ref()?;
        if !provider.is_available().await {
            tracing::warn!(provider = provider.name(), "Provider unavailable, using fallback");
            return None;
        }

        let request = match &self.model {
            Some(model) if request.model.is_none() => request.with_model(model.clone()),
            _ => request,
        };
        match provider.complete(&request).await {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!("Provider {} failed: {}, using fallback", provider.name(), e);
                None
            }
        }
    }
}
