use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{http_client, render_system_prompt, send_error, status_error, RetryPolicy, Synthesizer, Translator};
use crate::audio::{AudioBuffer, MediaBackend};
use crate::errors::ProviderError;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

fn api_base(endpoint: &str) -> String {
    if endpoint.trim().is_empty() {
        DEFAULT_ENDPOINT.to_string()
    } else {
        endpoint.trim_end_matches('/').to_string()
    }
}

/// OpenAI chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<OpenAIMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl OpenAIRequest {
    /// Create a new request with a system prompt and one user line
    pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system.into(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: user.into(),
                },
            ],
            temperature: None,
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// OpenAI chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
}

/// One completion choice
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
}

impl OpenAIResponse {
    /// Text of the first choice, trimmed
    pub fn extract_text(&self) -> Option<String> {
        self.choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
    }
}

/// Chat-completion translator
pub struct OpenAI {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    /// Template with `{source_language}`/`{target_language}` placeholders
    system_prompt: String,
    source_language: String,
    retry: RetryPolicy,
}

impl OpenAI {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.into(),
            endpoint: api_base(&endpoint.into()),
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

    /// Complete a chat request
    pub async fn complete(&self, request: &OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| send_error("OpenAI", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(status_error("OpenAI", status, error_text));
        }

        response
            .json::<OpenAIResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse OpenAI response: {}", e)))
    }
}

#[async_trait]
impl Translator for OpenAI {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        let system = render_system_prompt(&self.system_prompt, &self.source_language, target_language);
        let request = OpenAIRequest::new(&self.model, system, text).temperature(self.temperature);

        let response = self.retry.run("OpenAI", || self.complete(&request)).await?;
        let translated = response
            .extract_text()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::ParseError("OpenAI returned an empty translation".to_string()))?;
        debug!("OpenAI: '{}' -> '{}'", text, translated);
        Ok(translated)
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

/// `/audio/speech` request
#[derive(Debug, Serialize)]
pub struct SpeechRequest {
    model: String,
    voice: String,
    input: String,
    response_format: String,
}

/// OpenAI text-to-speech engine. The voices are multilingual, so the
/// language argument only feeds logging.
pub struct OpenAISpeech {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    voice: String,
    media: Arc<dyn MediaBackend>,
    retry: RetryPolicy,
}

impl OpenAISpeech {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
        media: Arc<dyn MediaBackend>,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.into(),
            endpoint: api_base(&endpoint.into()),
            model: model.into(),
            voice: voice.into(),
            media,
            retry,
        }
    }

    async fn fetch(&self, request: &SpeechRequest) -> Result<bytes::Bytes, ProviderError> {
        let url = format!("{}/audio/speech", self.endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| send_error("OpenAI speech", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(status_error("OpenAI speech", status, error_text));
        }
        response
            .bytes()
            .await
            .map_err(|e| send_error("OpenAI speech", e))
    }
}

#[async_trait]
impl Synthesizer for OpenAISpeech {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioBuffer, ProviderError> {
        if text.trim().is_empty() {
            return Ok(AudioBuffer::empty(self.media.sample_rate(), 1));
        }
        let request = SpeechRequest {
            model: self.model.clone(),
            voice: self.voice.clone(),
            input: text.to_string(),
            response_format: "mp3".to_string(),
        };
        let encoded = self.retry.run("OpenAI speech", || self.fetch(&request)).await?;
        debug!("OpenAI speech ({}): {} bytes for '{}'", language, encoded.len(), text);

        self.media
            .decode_bytes(&encoded, "mp3")
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to decode synthesized speech: {}", e)))
    }

    fn name(&self) -> &str {
        "OpenAI speech"
    }
}
