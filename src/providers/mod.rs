/*!
 * Translation and speech synthesis collaborators.
 *
 * This module contains client implementations for the external services:
 * - DeepL: REST translation API
 * - OpenAI: chat-completion translation and `/audio/speech` synthesis
 * - Ollama: local LLM server used as a translator
 * - Google: the translate text-to-speech endpoint
 * - Mock: offline translators and a tone synthesizer for dry runs
 *
 * Retries live here, in the collaborators, and never in the pipeline.
 */

use async_trait::async_trait;
use log::warn;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;

use crate::audio::AudioBuffer;
use crate::errors::ProviderError;

/// Turns a line of text into another language
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target_language` (ISO 639 code)
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError>;

    /// Name used in log lines
    fn name(&self) -> &str;
}

/// Turns text into speech audio at the working sample rate
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Speak `text` in `language` (ISO 639 code)
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioBuffer, ProviderError>;

    /// Name used in log lines
    fn name(&self) -> &str;
}

/// Exponential backoff for the HTTP collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each following retry
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
        }
    }

    /// A single attempt, no retries
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(1u64 << shift))
    }

    /// Run `operation` until it succeeds, fails with a non-transient error
    /// or runs out of retries
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "{} request failed: {} - retry {}/{}",
                        label, e, attempt, self.max_retries
                    );
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 1000)
    }
}

/// HTTP client shared by the remote collaborators
pub(crate) fn http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_default()
}

/// Map a non-success HTTP status to a provider error
pub(crate) fn status_error(service: &str, status: StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(format!("{} rejected the credentials: {}", service, body)),
        429 | 456 => ProviderError::RateLimitExceeded(format!("{}: {}", service, body)),
        code => ProviderError::ApiError {
            status_code: code,
            message: body,
        },
    }
}

/// Map a reqwest transport failure to a provider error
pub(crate) fn send_error(service: &str, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        ProviderError::ConnectionError(format!("Failed to reach {}: {}", service, error))
    } else {
        ProviderError::RequestFailed(format!("{} request failed: {}", service, error))
    }
}

/// Fill `{source_language}`/`{target_language}` in an LLM system prompt
pub(crate) fn render_system_prompt(template: &str, source_language: &str, target_language: &str) -> String {
    let name = |code: &str| crate::language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string());
    template
        .replace("{source_language}", &name(source_language))
        .replace("{target_language}", &name(target_language))
}

pub mod deepl;
pub mod google_tts;
pub mod mock;
pub mod ollama;
pub mod openai;
