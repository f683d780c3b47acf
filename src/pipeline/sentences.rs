/*!
 * Drill built from a sentence list instead of media.
 *
 * Input is a JSON array of objects keyed by language, for example
 * `[{"ja": "こんにちは", "en": "Hello"}]`. Both sides are synthesized; the
 * target-language speech takes the place of the source slice, so blocks
 * follow the same repeat template as the media drill.
 */

use anyhow::{anyhow, Context, Result};
use log::debug;
use serde_json::Value;
use std::path::Path;

use super::assembler::{assemble, RepeatTemplate};
use super::concatenator::TrackConcatenator;
use super::orchestrator::{progress_bar, CancelFlag, PipelineOutput};
use super::speech_cache::SpeechCache;
use crate::audio::AudioBuffer;
use crate::errors::PipelineError;
use crate::subtitle_processor::Cue;

/// One sentence pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub index: usize,
    /// Text in the language being learned
    pub target: String,
    /// Text in the listener's language
    pub translation: String,
}

/// Parse a sentence list, reading `target_key` and `translation_key` from
/// every object. Pairs with a blank target are dropped.
pub fn parse_sentences(json: &str, target_key: &str, translation_key: &str) -> Result<Vec<Sentence>> {
    let value: Value = serde_json::from_str(json).context("Sentence file is not valid JSON")?;
    let items = value
        .as_array()
        .ok_or_else(|| anyhow!("Sentence file must contain a JSON array"))?;

    let field = |item: &Value, index: usize, key: &str| -> Result<String> {
        item.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Sentence {} has no string field '{}'", index, key))
    };

    let mut sentences = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let target = field(item, index, target_key)?;
        if target.trim().is_empty() {
            debug!("Skipping sentence {} with empty '{}' text", index, target_key);
            continue;
        }
        sentences.push(Sentence {
            index,
            target,
            translation: field(item, index, translation_key)?,
        });
    }
    Ok(sentences)
}

/// Read and parse a sentence file
pub fn load_sentences<P: AsRef<Path>>(path: P, target_key: &str, translation_key: &str) -> Result<Vec<Sentence>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read sentence file: {:?}", path))?;
    let sentences = parse_sentences(&content, target_key, translation_key)
        .with_context(|| format!("Invalid sentence file: {:?}", path))?;
    if sentences.is_empty() {
        return Err(anyhow!("Sentence file has no sentences: {:?}", path));
    }
    Ok(sentences)
}

/// Sentence-list drill runner
pub struct SentenceDrill {
    /// Speaks target-language text as given
    target_speech: SpeechCache,
    /// Speaks translation text as given
    translation_speech: SpeechCache,
    target_language: String,
    translation_language: String,
    template: RepeatTemplate,
    marker: AudioBuffer,
    show_progress: bool,
}

impl SentenceDrill {
    pub fn new(
        target_speech: SpeechCache,
        translation_speech: SpeechCache,
        target_language: impl Into<String>,
        translation_language: impl Into<String>,
        template: RepeatTemplate,
        marker: AudioBuffer,
    ) -> Self {
        Self {
            target_speech,
            translation_speech,
            target_language: target_language.into(),
            translation_language: translation_language.into(),
            template,
            marker,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, visible: bool) -> Self {
        self.show_progress = visible;
        self
    }

    pub async fn run(&self, sentences: &[Sentence], cancel: &CancelFlag) -> Result<PipelineOutput, PipelineError> {
        let pb = progress_bar(sentences.len() as u64, "sentences", "Synthesizing", self.show_progress);
        let mut concatenator = TrackConcatenator::new(self.marker.clone(), self.marker.sample_rate());

        for sentence in sentences {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            debug!("{:03} {}", sentence.index + 1, sentence.target);

            let target = self
                .target_speech
                .get_or_synthesize(&sentence.target, &self.target_language)
                .await?;
            let translation = self
                .translation_speech
                .get_or_synthesize(&sentence.translation, &self.translation_language)
                .await?;

            let cue = Cue::new(sentence.index, 0, target.duration_ms(), sentence.target.clone());
            let block = assemble(&cue, &target, &translation, &self.template)?;
            concatenator.push(&block.audio)?;
            pb.inc(1);
        }
        pb.finish_and_clear();

        let blocks = concatenator.blocks();
        let markers = concatenator.markers();
        let audio = concatenator.finish(None)?;
        let target_stats = self.target_speech.stats();
        let translation_stats = self.translation_speech.stats();

        Ok(PipelineOutput {
            audio,
            blocks,
            markers,
            skipped_sources: 0,
            cache_hits: target_stats.hits + translation_stats.hits,
            cache_misses: target_stats.misses + translation_stats.misses,
        })
    }
}
