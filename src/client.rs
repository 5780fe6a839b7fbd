use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Config;
use crate::errors::ChatError;

/// Local models can take minutes on a cold start; past this the request
/// counts as a transport failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Only `response` is required; the service sends more fields (model, done,
/// timings) that this client ignores.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

// ── Backend seam ─────────────────────────────────────────────────────────────

/// Completion calls against a generation service. The session controller is
/// written against this trait so tests can script resolutions.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// One completion request, no retries. Cancelling `cancel` aborts the
    /// in-flight call and resolves it with [`ChatError::Cancelled`].
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ChatError>;

    /// Best-effort short title for a conversation opening with `seed`.
    /// Failures map to [`ChatError::TitleGenerationFailed`] and are for the
    /// log only; callers must never surface them.
    async fn generate_title(&self, model: &str, seed: &str) -> Result<String, ChatError>;
}

// ── HTTP client ──────────────────────────────────────────────────────────────

/// Talks to the generation endpoint with `stream: false`; incremental token
/// delivery is not supported.
pub struct GenerationClient {
    http: reqwest::Client,
    base_url: String,
    generate_url: String,
}

impl GenerationClient {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http,
            base_url: config.base_url.clone(),
            generate_url: config.generate_url(),
        }
    }

    async fn post_generate(&self, model: &str, prompt: &str) -> Result<String, ChatError> {
        let request = GenerateRequest { model, prompt, stream: false };

        let response = self
            .http
            .post(&self.generate_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                debug!("generation request to {} failed: {e}", self.generate_url);
                self.unreachable()
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ChatError::ModelNotFound { model: model.to_string() }),
            status if !status.is_success() => {
                debug!("generation service returned {status}");
                Err(self.unreachable())
            }
            _ => {
                let body: GenerateResponse = response.json().await.map_err(|e| {
                    debug!("malformed generation response: {e}");
                    self.unreachable()
                })?;
                Ok(body.response)
            }
        }
    }

    fn unreachable(&self) -> ChatError {
        ChatError::ServiceUnreachable { base_url: self.base_url.clone() }
    }
}

#[async_trait]
impl GenerationBackend for GenerationClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ChatError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ChatError::Cancelled),
            result = self.post_generate(model, prompt) => result,
        }
    }

    async fn generate_title(&self, model: &str, seed: &str) -> Result<String, ChatError> {
        let raw = self
            .post_generate(model, &title_prompt(seed))
            .await
            .map_err(|e| ChatError::TitleGenerationFailed { reason: e.to_string() })?;
        Ok(normalize_title(&raw))
    }
}

fn title_prompt(seed: &str) -> String {
    format!(
        "Generate a very brief title (max 4 words) for a conversation that starts with this \
         message: \"{seed}\". Response should be just the title, nothing else."
    )
}

/// Models tend to quote their titles; trim and strip the quote marks.
fn normalize_title(raw: &str) -> String {
    raw.trim().replace(['"', '\''], "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prompt_embeds_the_seed_message() {
        let prompt = title_prompt("How do lifetimes work?");
        assert!(prompt.contains("\"How do lifetimes work?\""));
        assert!(prompt.contains("max 4 words"));
    }

    #[test]
    fn normalize_title_strips_quotes_and_whitespace() {
        assert_eq!(normalize_title("\n \"Rust Lifetimes\" "), "Rust Lifetimes");
        assert_eq!(normalize_title("'Quick Chat'"), "Quick Chat");
        assert_eq!(normalize_title("Plain Title"), "Plain Title");
    }
}
