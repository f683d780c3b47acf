/*!
 * Translation-speech cache.
 *
 * Maps the exact text of a cue to its translated speech. Each distinct
 * `(text, language)` pair is translated and synthesized at most once per
 * cache, including when several tasks miss on the same key at the same
 * time: the first caller does the work and the others wait for it.
 *
 * The cache lives for one pipeline run and is never persisted.
 */

use futures::stream::{self, StreamExt};
use log::debug;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::audio::AudioBuffer;
use crate::errors::PipelineError;
use crate::providers::{Synthesizer, Translator};

/// Content-addressed key: SHA-256 of the exact text plus the target language
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    digest: [u8; 32],
    language: String,
}

impl CacheKey {
    pub fn new(text: &str, language: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self {
            digest: hasher.finalize().into(),
            language: language.to_string(),
        }
    }

    /// Hex form of the text digest
    pub fn hex(&self) -> String {
        self.digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

type Slot = Arc<OnceCell<Arc<AudioBuffer>>>;

/// Translation-speech cache for one run
pub struct SpeechCache {
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn Synthesizer>,
    entries: Mutex<HashMap<CacheKey, Slot>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl SpeechCache {
    pub fn new(translator: Arc<dyn Translator>, synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self {
            translator,
            synthesizer,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    fn slot(&self, key: CacheKey) -> Slot {
        let mut entries = self.entries.lock();
        Arc::clone(entries.entry(key).or_default())
    }

    /// Translated speech for `text`, translating and synthesizing on a miss.
    ///
    /// Collaborator failures are returned as is and leave the entry empty.
    pub async fn get_or_synthesize(&self, text: &str, language: &str) -> Result<Arc<AudioBuffer>, PipelineError> {
        let key = CacheKey::new(text, language);
        let slot = self.slot(key.clone());

        if let Some(audio) = slot.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Speech cache hit {} for '{}'", &key.hex()[..12], text);
            return Ok(Arc::clone(audio));
        }

        let mut computed = false;
        let audio = slot
            .get_or_try_init(|| async {
                computed = true;
                self.produce(text, language).await.map(Arc::new)
            })
            .await?;

        // A waiter that found the value filled by a concurrent caller is a hit
        if computed {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Speech cache miss {} for '{}'", &key.hex()[..12], text);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Arc::clone(audio))
    }

    async fn produce(&self, text: &str, language: &str) -> Result<AudioBuffer, PipelineError> {
        let translated = self
            .translator
            .translate(text, language)
            .await
            .map_err(|source| PipelineError::Translation {
                text: text.to_string(),
                source,
            })?;

        self.synthesizer
            .synthesize(&translated, language)
            .await
            .map_err(|source| PipelineError::Synthesis {
                text: translated.clone(),
                source,
            })
    }

    /// Fill the cache for `texts` with up to `concurrency` collaborator calls
    /// in flight. Duplicates coalesce onto one call. Stops at the first error.
    pub async fn prefetch<'a, I>(&self, texts: I, language: &str, concurrency: usize) -> Result<(), PipelineError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.prefetch_with(texts, language, concurrency, || {}).await
    }

    /// Like [`SpeechCache::prefetch`], calling `on_done` once per text after
    /// its speech is available.
    pub async fn prefetch_with<'a, I, F>(
        &self,
        texts: I,
        language: &str,
        concurrency: usize,
        mut on_done: F,
    ) -> Result<(), PipelineError>
    where
        I: IntoIterator<Item = &'a str>,
        F: FnMut(),
    {
        let mut pending = stream::iter(texts)
            .map(|text| self.get_or_synthesize(text, language))
            .buffer_unordered(concurrency.max(1));

        while let Some(result) = pending.next().await {
            result?;
            on_done();
        }
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Number of entries holding synthesized speech
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
