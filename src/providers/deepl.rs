use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{http_client, send_error, status_error, RetryPolicy, Translator};
use crate::errors::ProviderError;
use crate::language_utils;

const FREE_ENDPOINT: &str = "https://api-free.deepl.com";
const PRO_ENDPOINT: &str = "https://api.deepl.com";

/// DeepL client for the `/v2/translate` API
pub struct DeepL {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL without the `/v2` path
    endpoint: String,
    /// Source language hint; DeepL detects it when absent
    source_language: Option<String>,
    /// Retry behaviour
    retry: RetryPolicy,
}

/// DeepL translate request
#[derive(Debug, Serialize)]
pub struct TranslateRequest {
    /// Texts to translate
    text: Vec<String>,

    /// Target language, upper case with variant where required
    target_lang: String,

    /// Source language, upper case without variant
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<String>,
}

/// DeepL translate response
#[derive(Debug, Deserialize)]
pub struct TranslateResponse {
    pub translations: Vec<DeepLTranslation>,
}

/// One translated text
#[derive(Debug, Deserialize)]
pub struct DeepLTranslation {
    #[serde(default)]
    pub detected_source_language: Option<String>,
    pub text: String,
}

impl DeepL {
    /// Create a new DeepL client. An empty endpoint selects the free or pro
    /// API from the key suffix.
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64, retry: RetryPolicy) -> Self {
        let api_key = api_key.into();
        let endpoint = Self::resolve_endpoint(&api_key, &endpoint.into());
        Self {
            client: http_client(timeout_secs),
            api_key,
            endpoint,
            source_language: None,
            retry,
        }
    }

    /// Pass the media language to DeepL instead of relying on detection
    pub fn with_source_language(mut self, code: &str) -> Self {
        self.source_language = language_utils::normalize_to_part1_or_part2t(code)
            .ok()
            .map(|c| c.to_uppercase());
        self
    }

    /// Free-tier keys end in `:fx`
    pub fn resolve_endpoint(api_key: &str, endpoint: &str) -> String {
        if !endpoint.trim().is_empty() {
            return endpoint.trim_end_matches('/').to_string();
        }
        if api_key.ends_with(":fx") {
            FREE_ENDPOINT.to_string()
        } else {
            PRO_ENDPOINT.to_string()
        }
    }

    /// Send one translate request
    async fn request(&self, request: &TranslateRequest) -> Result<TranslateResponse, ProviderError> {
        let url = format!("{}/v2/translate", self.endpoint);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| send_error("DeepL", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(status_error("DeepL", status, error_text));
        }

        response
            .json::<TranslateResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse DeepL response: {}", e)))
    }
}

#[async_trait]
impl Translator for DeepL {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        let target_lang = language_utils::deepl_target_code(target_language)
            .map_err(|e| ProviderError::UnsupportedLanguage(e.to_string()))?;
        let request = TranslateRequest {
            text: vec![text.to_string()],
            target_lang,
            source_lang: self.source_language.clone(),
        };

        let response = self.retry.run("DeepL", || self.request(&request)).await?;
        let translation = response
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ParseError("DeepL returned no translations".to_string()))?;
        debug!(
            "DeepL ({}): '{}' -> '{}'",
            translation.detected_source_language.as_deref().unwrap_or("?"),
            text,
            translation.text
        );
        Ok(translation.text)
    }

    fn name(&self) -> &str {
        "DeepL"
    }
}
