//! Language model provider
//!
//! The copilot talks to its model through `LanguageModel`. The production
//! implementation calls the Google Gemini `generateContent` REST endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::{ChatMessage, MessageRole};

/// Placeholder key shipped in sample environment files
const PLACEHOLDER_API_KEY: &str = "sk-...";

/// Speaker of a context message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextRole {
    System,
    User,
    Assistant,
}

/// One message of the context sent to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMessage {
    pub role: ContextRole,
    pub content: String,
}

impl ContextMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ContextRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ContextRole::User,
            content: content.into(),
        }
    }
}

impl From<&ChatMessage> for ContextMessage {
    fn from(message: &ChatMessage) -> Self {
        let role = match message.role {
            MessageRole::User => ContextRole::User,
            MessageRole::Assistant => ContextRole::Assistant,
        };
        Self {
            role,
            content: message.content.clone(),
        }
    }
}

/// Why the model produced no reply
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("No API key configured")]
    NotConfigured,

    #[error("Provider rate limit or quota exhausted")]
    RateLimited,

    #[error("Provider call timed out")]
    Timeout,

    #[error("Provider request failed: {0}")]
    Http(String),

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// Text generation capability
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, context: &[ContextMessage]) -> Result<String, ProviderError>;
}

/// Provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Upper bound for one generation call
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Create a new ProviderConfig from environment variables
    ///
    /// # Environment Variables
    /// - `GOOGLE_AI_API_KEY`: Gemini API key (optional; replies fall back without it)
    /// - `GOOGLE_AI_MODEL`: model name (default: gemini-2.5-flash)
    /// - `GOOGLE_AI_BASE_URL`: API root (default: https://generativelanguage.googleapis.com/v1beta)
    /// - `COPILOT_PROVIDER_TIMEOUT`: timeout in seconds (default: 30)
    pub fn from_env() -> Result<Self> {
        let settings = common::settings::load(&[
            ("google_ai_model", "gemini-2.5-flash"),
            (
                "google_ai_base_url",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            ("copilot_provider_timeout", "30"),
        ])?;

        Ok(Self {
            api_key: common::settings::optional_string(&settings, "google_ai_api_key"),
            model: settings.get("google_ai_model")?,
            base_url: settings.get("google_ai_base_url")?,
            timeout: Duration::from_secs(settings.get("copilot_provider_timeout")?),
        })
    }

    /// The API key, unless it is missing or still the placeholder
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .filter(|key| *key != PLACEHOLDER_API_KEY)
    }
}

/// Gemini REST client
pub struct GeminiClient {
    http_client: reqwest::Client,
    config: ProviderConfig,
}

impl GeminiClient {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Gemini request body: system messages become the system instruction, the
/// rest become alternating user/model turns
fn request_body(context: &[ContextMessage]) -> Value {
    let system = context
        .iter()
        .filter(|m| m.role == ContextRole::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let contents: Vec<Value> = context
        .iter()
        .filter(|m| m.role != ContextRole::System)
        .map(|m| {
            let role = match m.role {
                ContextRole::Assistant => "model",
                _ => "user",
            };
            json!({ "role": role, "parts": [{ "text": m.content }] })
        })
        .collect();

    let mut body = json!({ "contents": contents });
    if !system.is_empty() {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    body
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

fn is_quota_error(body: &str) -> bool {
    body.contains("RESOURCE_EXHAUSTED") || body.to_ascii_lowercase().contains("quota")
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Http(err.to_string())
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, context: &[ContextMessage]) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .usable_api_key()
            .ok_or(ProviderError::NotConfigured)?;

        debug!(model = %self.config.model, messages = context.len(), "Calling Gemini");

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request_body(context))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS || is_quota_error(&body) {
                return Err(ProviderError::RateLimited);
            }
            return Err(ProviderError::Http(format!("{} - {}", status, body)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "response carried no text".to_string(),
            ));
        }

        Ok(text)
    }
}
