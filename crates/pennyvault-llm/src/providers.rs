//! LLM Provider implementations

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Get the provider kind
    fn kind(&self) -> ProviderKind;

    /// Check if the provider is available
    async fn is_available(&self) -> bool;

    /// Answer a JSON-mode prompt
    async fn complete(&self, request: &PromptRequest) -> Result<PromptResponse>;
}

async fn read_error(response: reqwest::Response) -> LLMError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    LLMError::RequestFailed {
        message: format!("HTTP {}: {}", status, body),
    }
}

fn network_error(e: reqwest::Error) -> LLMError {
    LLMError::NetworkError {
        message: e.to_string(),
    }
}

// ============================================================================
// Gemini Provider (Default)
// ============================================================================

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

/// Configuration for Gemini provider
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    /// Reads `GEMINI_API_KEY`; `None` when it is unset
    pub fn from_env() -> Option<Self> {
        Some(Self {
            api_key: std::env::var("GEMINI_API_KEY").ok()?,
            model: std::env::var("PENNYVAULT_GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        })
    }
}

/// Google Gemini `generateContent` provider
pub struct GeminiProvider {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiContent,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![GeminiPart {
                text: text.to_string(),
            }],
        }
    }

    fn joined_text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    total_token_count: u32,
}

fn gemini_request(request: &PromptRequest) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent::text(Some("user"), &request.prompt)],
        system_instruction: GeminiContent::text(None, &request.system),
        generation_config: GeminiGenerationConfig {
            response_mime_type: "application/json",
        },
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    async fn complete(&self, request: &PromptRequest) -> Result<PromptResponse> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.config.model.clone());
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&gemini_request(request))
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(read_error(response).await);
        }

        let gemini_response: GeminiResponse =
            response.json().await.map_err(|e| LLMError::InvalidResponse {
                message: e.to_string(),
            })?;

        let content = gemini_response
            .candidates
            .first()
            .map(|c| c.content.joined_text())
            .ok_or_else(|| LLMError::InvalidResponse {
                message: "no candidates returned".to_string(),
            })?;

        Ok(PromptResponse {
            content,
            model,
            total_tokens: gemini_response
                .usage_metadata
                .unwrap_or_default()
                .total_token_count,
        })
    }
}

// ============================================================================
// Ollama Provider (Local)
// ============================================================================

/// Configuration for Ollama provider
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("PENNYVAULT_OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model: std::env::var("PENNYVAULT_OLLAMA_MODEL")
                .unwrap_or_else(|_| "llama3.1:8b".to_string()),
        }
    }
}

/// Ollama local LLM provider
pub struct OllamaProvider {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    format: &'static str,
}

#[derive(Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

fn ollama_request(request: &PromptRequest, model: String) -> OllamaChatRequest {
    OllamaChatRequest {
        model,
        messages: vec![
            OllamaMessage {
                role: "system".to_string(),
                content: request.system.clone(),
            },
            OllamaMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            },
        ],
        stream: false,
        format: "json",
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "Ollama"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        self.client.get(&url).send().await.is_ok()
    }

    async fn complete(&self, request: &PromptRequest) -> Result<PromptResponse> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.config.model.clone());

        let url = format!("{}/api/chat", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ollama_request(request, model.clone()))
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(read_error(response).await);
        }

        let chat_response: OllamaChatResponse =
            response.json().await.map_err(|e| LLMError::InvalidResponse {
                message: e.to_string(),
            })?;

        Ok(PromptResponse {
            content: chat_response.message.content.trim().to_string(),
            model,
            total_tokens: chat_response.prompt_eval_count + chat_response.eval_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PromptRequest {
        PromptRequest::new("You are an expense manager", "Categorize these")
    }

    #[test]
    fn test_gemini_request_shape() {
        let body = serde_json::to_value(gemini_request(&request())).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Categorize these");
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are an expense manager"
        );
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_gemini_response_parts_are_joined() {
        let raw = serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{"text": "{\"a\":"}, {"text": "1}"}] } }],
            "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 4, "totalTokenCount": 14 }
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.candidates[0].content.joined_text(), "{\"a\":1}");
        assert_eq!(response.usage_metadata.unwrap().total_token_count, 14);
    }

    #[test]
    fn test_ollama_request_shape() {
        let body = serde_json::to_value(ollama_request(&request(), "llama3.1:8b".to_string())).unwrap();
        assert_eq!(body["model"], "llama3.1:8b");
        assert_eq!(body["format"], "json");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Categorize these");
    }
}
