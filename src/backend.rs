//! Translation backends.
//!
//! A backend turns a prompt into one reply string. There is one variant per
//! supported provider, picked from the configuration by [`create_backend`];
//! the rest of the shell only sees the [`TranslationBackend`] trait.

use crate::config::{Config, Provider};
use crate::http_client::{HttpClient, HttpResponse};
use crate::secrets::SecretStore;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

const MAX_OUTPUT_TOKENS: u32 = 200;
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("No API key configured for {0}. Run !api to set one")]
    MissingCredential(Provider),

    #[error("Rate limit hit (HTTP 429): {0}")]
    RateLimited(String),

    #[error("Authentication failed, check your API key: {0}")]
    Authentication(String),

    #[error("{provider} returned HTTP {status}: {message}")]
    Api {
        provider: Provider,
        status: u16,
        message: String,
    },

    #[error("Request to {provider} failed: {message}")]
    Transport { provider: Provider, message: String },

    #[error("The backend returned an empty response")]
    EmptyResponse,

    #[error("Could not parse backend response: {0}")]
    MalformedResponse(String),
}

/// Anything that can turn a prompt into a single reply.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    fn provider(&self) -> Provider;

    fn model(&self) -> &str;

    /// Sends `prompt` and returns the trimmed reply text.
    async fn translate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Backend talking to one of the hosted provider APIs.
pub struct ProviderBackend {
    provider: Provider,
    model: String,
    api_key: String,
    http: Arc<dyn HttpClient>,
}

impl ProviderBackend {
    pub fn new(provider: Provider, model: &str, api_key: &str, http: Arc<dyn HttpClient>) -> Self {
        Self {
            provider,
            model: model.to_string(),
            api_key: api_key.to_string(),
            http,
        }
    }

    fn endpoint(&self) -> String {
        match self.provider {
            Provider::Gemini => format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                self.model
            ),
            Provider::OpenAi => "https://api.openai.com/v1/chat/completions".to_string(),
            Provider::Claude => "https://api.anthropic.com/v1/messages".to_string(),
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("content-type", "application/json".to_string())];
        match self.provider {
            Provider::Gemini => headers.push(("x-goog-api-key", self.api_key.clone())),
            Provider::OpenAi => headers.push(("authorization", format!("Bearer {}", self.api_key))),
            Provider::Claude => {
                headers.push(("x-api-key", self.api_key.clone()));
                headers.push(("anthropic-version", ANTHROPIC_VERSION.to_string()));
            }
        }
        headers
    }

    fn request_body(&self, prompt: &str) -> Value {
        match self.provider {
            Provider::Gemini => json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
                "generationConfig": { "maxOutputTokens": MAX_OUTPUT_TOKENS }
            }),
            Provider::OpenAi | Provider::Claude => json!({
                "model": self.model,
                "max_tokens": MAX_OUTPUT_TOKENS,
                "messages": [{ "role": "user", "content": prompt }]
            }),
        }
    }

    fn extract_text<'v>(&self, response: &'v Value) -> Option<&'v str> {
        match self.provider {
            Provider::Gemini => response
                .get("candidates")?
                .get(0)?
                .get("content")?
                .get("parts")?
                .get(0)?
                .get("text")?
                .as_str(),
            Provider::OpenAi => response
                .get("choices")?
                .get(0)?
                .get("message")?
                .get("content")?
                .as_str(),
            Provider::Claude => response.get("content")?.get(0)?.get("text")?.as_str(),
        }
    }

    fn check_status(&self, response: &HttpResponse) -> Result<(), BackendError> {
        if response.is_success() {
            return Ok(());
        }
        let message = error_message(&response.body);
        warn!("{} returned HTTP {}: {}", self.provider, response.status, message);
        Err(match response.status {
            429 => BackendError::RateLimited(message),
            401 | 403 => BackendError::Authentication(message),
            status => BackendError::Api {
                provider: self.provider,
                status,
                message,
            },
        })
    }
}

#[async_trait]
impl TranslationBackend for ProviderBackend {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn translate(&self, prompt: &str) -> Result<String, BackendError> {
        info!("Calling {} ({})", self.provider, self.model);
        let headers = self.headers();
        let header_refs: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let response = self
            .http
            .post_json(&self.endpoint(), &header_refs, &self.request_body(prompt))
            .await
            .map_err(|e| BackendError::Transport {
                provider: self.provider,
                message: e.to_string(),
            })?;
        self.check_status(&response)?;

        let parsed: Value = serde_json::from_str(&response.body)
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
        let text = self
            .extract_text(&parsed)
            .ok_or_else(|| BackendError::MalformedResponse(truncate(&response.body, 200)))?
            .trim();
        debug!("{} replied: {}", self.provider, text);

        if text.is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

/// Builds the backend for the active provider.
pub fn create_backend(
    config: &Config,
    secrets: &SecretStore,
    http: Arc<dyn HttpClient>,
) -> Result<Box<dyn TranslationBackend>, BackendError> {
    let provider = config.provider;
    let api_key = secrets
        .api_key(provider)
        .ok_or(BackendError::MissingCredential(provider))?;
    Ok(Box::new(ProviderBackend::new(
        provider,
        config.model_for(provider),
        &api_key,
        http,
    )))
}

/// Reduces a translation reply to the bare command.
///
/// Models occasionally wrap the command in a Markdown fence or backticks
/// despite being told not to.
pub fn sanitize_command(reply: &str) -> String {
    reply
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("```"))
        .map(|line| line.trim_matches('`').trim().to_string())
        .unwrap_or_default()
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| truncate(body.trim(), 200))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
