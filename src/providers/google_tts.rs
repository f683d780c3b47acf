use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::sync::Arc;
use url::Url;

use super::{http_client, send_error, status_error, RetryPolicy, Synthesizer};
use crate::audio::{AudioBuffer, MediaBackend};
use crate::errors::ProviderError;
use crate::language_utils;

const DEFAULT_ENDPOINT: &str = "https://translate.google.com/translate_tts";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Characters a chunk may end on before falling back to whitespace
fn is_sentence_break(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | '!' | '?' | ';' | ':' | '。' | '、' | '！' | '？' | '；' | '：' | '，' | '．' | '…' | '」' | '』'
    )
}

/// Split `text` into chunks of at most `max_chars` characters, cutting at
/// punctuation, else at whitespace, else hard.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest: Vec<char> = text.trim().chars().collect();

    while rest.len() > max_chars {
        let window = &rest[..max_chars];
        let cut = window
            .iter()
            .rposition(|c| is_sentence_break(*c))
            .map(|i| i + 1)
            .or_else(|| window.iter().rposition(|c| c.is_whitespace()).filter(|&i| i > 0))
            .unwrap_or(max_chars);

        let chunk: String = rest[..cut].iter().collect::<String>().trim().to_string();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        let remaining: String = rest[cut..].iter().collect();
        rest = remaining.trim_start().chars().collect();
    }

    let tail: String = rest.iter().collect::<String>().trim().to_string();
    if !tail.is_empty() {
        chunks.push(tail);
    }
    chunks
}

/// Google Translate text-to-speech client
pub struct GoogleSpeech {
    client: Client,
    endpoint: String,
    /// Longest text sent per request
    max_chars: usize,
    media: Arc<dyn MediaBackend>,
    retry: RetryPolicy,
}

impl GoogleSpeech {
    pub fn new(
        endpoint: impl Into<String>,
        max_chars: usize,
        media: Arc<dyn MediaBackend>,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: http_client(timeout_secs),
            endpoint: if endpoint.trim().is_empty() {
                DEFAULT_ENDPOINT.to_string()
            } else {
                endpoint
            },
            max_chars,
            media,
            retry,
        }
    }

    /// Request URL for one chunk
    pub fn chunk_url(&self, chunk: &str, language: &str, index: usize, total: usize) -> Result<Url, ProviderError> {
        let text_len = chunk.chars().count().to_string();
        let total = total.to_string();
        let index = index.to_string();
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("q", chunk),
                ("tl", language),
                ("total", total.as_str()),
                ("idx", index.as_str()),
                ("textlen", text_len.as_str()),
            ],
        )
        .map_err(|e| ProviderError::RequestFailed(format!("Invalid TTS endpoint {}: {}", self.endpoint, e)))
    }

    async fn fetch(&self, url: &Url) -> Result<bytes::Bytes, ProviderError> {
        let response = self
            .client
            .get(url.clone())
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| send_error("Google TTS", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error("Google TTS", status, error_text));
        }
        response.bytes().await.map_err(|e| send_error("Google TTS", e))
    }
}

#[async_trait]
impl Synthesizer for GoogleSpeech {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioBuffer, ProviderError> {
        let language = language_utils::speech_language_code(language)
            .map_err(|e| ProviderError::UnsupportedLanguage(e.to_string()))?;
        let chunks = split_text(text, self.max_chars);
        let mut speech = AudioBuffer::empty(self.media.sample_rate(), 1);

        for (index, chunk) in chunks.iter().enumerate() {
            let url = self.chunk_url(chunk, &language, index, chunks.len())?;
            let encoded = self.retry.run("Google TTS", || self.fetch(&url)).await?;
            let decoded = self
                .media
                .decode_bytes(&encoded, "mp3")
                .await
                .map_err(|e| ProviderError::ParseError(format!("Failed to decode synthesized speech: {}", e)))?;
            speech
                .append(&decoded)
                .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        }

        debug!(
            "Google TTS ({}): {} chunk(s), {} ms for '{}'",
            language,
            chunks.len(),
            speech.duration_ms(),
            text
        );
        Ok(speech)
    }

    fn name(&self) -> &str {
        "Google TTS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_text_withShortText_shouldKeepOneChunk() {
        assert_eq!(split_text("  Hello world ", 100), vec!["Hello world"]);
        assert!(split_text("   ", 100).is_empty());
    }

    #[test]
    fn test_split_text_withPunctuation_shouldCutAfterIt() {
        let chunks = split_text("One two. Three four five", 12);
        assert_eq!(chunks, vec!["One two.", "Three four", "five"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
    }

    #[test]
    fn test_split_text_withJapanese_shouldCountCharacters() {
        let text = "今日はいい天気ですね。散歩に行きましょう。";
        let chunks = split_text(text, 11);
        assert_eq!(chunks, vec!["今日はいい天気ですね。", "散歩に行きましょう。"]);
    }

    #[test]
    fn test_split_text_withoutBreaks_shouldHardCut() {
        let chunks = split_text("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }
}
