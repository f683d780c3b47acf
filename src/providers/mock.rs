/*!
 * Offline and mock collaborators.
 *
 * - `FakeTranslator`: the `fake` strategy, returns `"[<lang>] Hello world"`
 * - `PassthroughTranslator`: returns its input, used when the text is
 *   already in the target language
 * - `ToneSynthesizer`: the `tone` engine, a beep whose length follows the text
 * - `MockTranslator` / `MockSynthesizer`: counting doubles with
 *   configurable failure behavior for tests and dry runs
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{Synthesizer, Translator};
use crate::audio::AudioBuffer;
use crate::errors::ProviderError;

/// Translator for the `fake` strategy
#[derive(Debug, Default, Clone)]
pub struct FakeTranslator;

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, _text: &str, target_language: &str) -> Result<String, ProviderError> {
        Ok(format!("[{}] Hello world", target_language))
    }

    fn name(&self) -> &str {
        "Fake"
    }
}

/// Translator that hands the text back unchanged
#[derive(Debug, Default, Clone)]
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str, _target_language: &str) -> Result<String, ProviderError> {
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        "Passthrough"
    }
}

/// Offline speech engine: a 440 Hz tone, 200 ms plus 60 ms per character
#[derive(Debug, Clone)]
pub struct ToneSynthesizer {
    sample_rate: u32,
}

impl ToneSynthesizer {
    pub const BASE_MS: u64 = 200;
    pub const MS_PER_CHAR: u64 = 60;

    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Length of the tone produced for `text`
    pub fn duration_for(text: &str) -> u64 {
        let chars = text.trim().chars().count() as u64;
        if chars == 0 {
            0
        } else {
            Self::BASE_MS + Self::MS_PER_CHAR * chars
        }
    }
}

#[async_trait]
impl Synthesizer for ToneSynthesizer {
    async fn synthesize(&self, text: &str, _language: &str) -> Result<AudioBuffer, ProviderError> {
        Ok(AudioBuffer::tone(440.0, Self::duration_for(text), self.sample_rate, 0.3))
    }

    fn name(&self) -> &str {
        "Tone"
    }
}

/// Behavior mode for the mock collaborators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with a server error
    Failing,
    /// Succeeds after a delay, for overlap and cancellation tests
    Slow { delay_ms: u64 },
}

impl MockBehavior {
    async fn apply(&self, count: usize) -> Result<(), ProviderError> {
        match *self {
            MockBehavior::Working => Ok(()),
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(())
                }
            }
            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(())
            }
        }
    }
}

/// Counting translator returning `"[TRANSLATED to <lang>] <text>"`
#[derive(Debug, Clone)]
pub struct MockTranslator {
    behavior: MockBehavior,
    /// Shared between clones
    request_count: Arc<AtomicUsize>,
}

impl MockTranslator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Number of translate calls received so far
    pub fn calls(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.behavior.apply(count).await?;
        Ok(format!("[TRANSLATED to {}] {}", target_language, text))
    }

    fn name(&self) -> &str {
        "Mock"
    }
}

/// Counting synthesizer producing fixed-length silence
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
    sample_rate: u32,
    duration_ms: u64,
}

impl MockSynthesizer {
    pub fn new(behavior: MockBehavior, sample_rate: u32, duration_ms: u64) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            sample_rate,
            duration_ms,
        }
    }

    pub fn working(sample_rate: u32, duration_ms: u64) -> Self {
        Self::new(MockBehavior::Working, sample_rate, duration_ms)
    }

    /// Number of synthesize calls received so far
    pub fn calls(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, _text: &str, _language: &str) -> Result<AudioBuffer, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.behavior.apply(count).await?;
        Ok(AudioBuffer::silent(self.duration_ms, self.sample_rate, 1))
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
