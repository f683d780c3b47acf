use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::{render_system_prompt, send_error, status_error, RetryPolicy, Translator};
use crate::errors::ProviderError;

const DEFAULT_PORT: u16 = 11434;

/// Ollama client for interacting with Ollama API
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Model name
    model: String,
    /// Temperature for generation
    temperature: f32,
    /// Template with `{source_language}`/`{target_language}` placeholders
    system_prompt: String,
    /// Language of the lines being translated
    source_language: String,
    /// Retry behaviour
    retry: RetryPolicy,
}

/// How long the server keeps the model loaded between lines
const KEEP_ALIVE: &str = "5m";

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant, or tool)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Chat request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model name to use for generation
    model: String,
    /// Messages of the conversation
    messages: Vec<ChatMessage>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    /// How long to keep the model loaded in memory
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

/// Chat response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model name
    pub model: String,
    /// Response message
    pub message: ChatMessage,
    /// Whether the generation is complete
    pub done: bool,
}

impl ChatRequest {
    /// Create a new non-streaming chat request
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: None,
            stream: Some(false),
            keep_alive: None,
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(temperature),
        });
        self
    }

    /// Set the keep-alive duration
    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }
}

impl Ollama {
    /// Create a new Ollama client from a configured endpoint
    pub fn new(endpoint: &str, model: impl Into<String>, timeout_secs: u64, retry: RetryPolicy) -> Self {
        Self {
            base_url: Self::normalize_base_url(endpoint),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs.max(1)))
                // Force HTTP/1.1 - Ollama uses HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            model: model.into(),
            temperature: 0.3,
            system_prompt: String::new(),
            source_language: "ja".to_string(),
            retry,
        }
    }

    pub fn with_prompt(mut self, system_prompt: impl Into<String>, source_language: impl Into<String>, temperature: f32) -> Self {
        self.system_prompt = system_prompt.into();
        self.source_language = source_language.into();
        self.temperature = temperature;
        self
    }

    /// Accept `host`, `host:port` or a full URL; the default port is added
    /// when none is given
    pub fn normalize_base_url(endpoint: &str) -> String {
        let endpoint = endpoint.trim().trim_end_matches('/');
        let with_scheme = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{}", endpoint)
        };

        match Url::parse(&with_scheme) {
            Ok(mut url) => {
                if url.port().is_none() && url.scheme() == "http" {
                    let _ = url.set_port(Some(DEFAULT_PORT));
                }
                url.as_str().trim_end_matches('/').to_string()
            }
            Err(e) => {
                error!("Invalid Ollama endpoint '{}': {}, using localhost", endpoint, e);
                format!("http://localhost:{}", DEFAULT_PORT)
            }
        }
    }

    /// Chat with the Ollama API
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| send_error("Ollama", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(status_error("Ollama", status, error_text));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Ollama chat response: {}", e)))
    }

    fn chat_request(&self, text: &str, target_language: &str) -> ChatRequest {
        let system = render_system_prompt(&self.system_prompt, &self.source_language, target_language);
        ChatRequest::new(
            &self.model,
            vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
        )
        .temperature(self.temperature)
        .keep_alive(KEEP_ALIVE)
    }
}

#[async_trait]
impl Translator for Ollama {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        let request = self.chat_request(text, target_language);
        let response = self.retry.run("Ollama", || self.chat(&request)).await?;
        let translated = response.message.content.trim().to_string();
        if translated.is_empty() {
            return Err(ProviderError::ParseError("Ollama returned an empty translation".to_string()));
        }
        debug!("Ollama ({}): '{}' -> '{}'", response.model, text, translated);
        Ok(translated)
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}
