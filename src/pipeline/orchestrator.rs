use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::assembler::{assemble, RepeatTemplate};
use super::concatenator::TrackConcatenator;
use super::speech_cache::SpeechCache;
use crate::audio::AudioBuffer;
use crate::errors::PipelineError;
use crate::subtitle_processor::Cue;

// @module: Linear stage runner for one drill

/// Shared interrupt flag, checked between cues
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Result of a pipeline run
#[derive(Debug)]
pub struct PipelineOutput {
    /// Final track, ready for export
    pub audio: AudioBuffer,
    /// Blocks assembled
    pub blocks: usize,
    /// Transition markers inserted
    pub markers: usize,
    /// Blocks whose cue had no source audio after clamping
    pub skipped_sources: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

pub(crate) fn progress_bar(len: u64, unit: &str, message: &'static str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let progress_bar = ProgressBar::new(len);
    let template = format!(
        "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
        unit
    );
    let style = ProgressStyle::default_bar()
        .template(&template)
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("█▓▒░"));
    progress_bar.set_message(message);
    progress_bar
}

/// Runs cue selection output through the cache, the assembler and the
/// concatenator. Blocks are assembled strictly in cue order.
pub struct BilingualPipeline {
    cache: SpeechCache,
    template: RepeatTemplate,
    marker: AudioBuffer,
    translation_language: String,
    append_full_track: bool,
    prefetch_concurrency: usize,
    show_progress: bool,
}

impl BilingualPipeline {
    pub fn new(
        cache: SpeechCache,
        template: RepeatTemplate,
        marker: AudioBuffer,
        translation_language: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            template,
            marker,
            translation_language: translation_language.into(),
            append_full_track: true,
            prefetch_concurrency: 1,
            show_progress: false,
        }
    }

    /// Append the unsliced source once after the last block
    pub fn with_full_track(mut self, append: bool) -> Self {
        self.append_full_track = append;
        self
    }

    /// Translate and synthesize up to `concurrency` distinct texts ahead
    /// of assembly; 1 disables prefetching
    pub fn with_prefetch(mut self, concurrency: usize) -> Self {
        self.prefetch_concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, visible: bool) -> Self {
        self.show_progress = visible;
        self
    }

    pub fn cache(&self) -> &SpeechCache {
        &self.cache
    }

    /// Build the drill for `cues` over `source`.
    ///
    /// Any collaborator failure aborts the run. Cancellation is honoured
    /// before each cue; nothing is written by this stage.
    pub async fn run(
        &self,
        source: &AudioBuffer,
        cues: &[&Cue],
        cancel: &CancelFlag,
    ) -> Result<PipelineOutput, PipelineError> {
        for (i, cue) in cues.iter().enumerate() {
            debug!("{:03} {}", i, cue.text);
        }

        if self.prefetch_concurrency > 1 && cues.len() > 1 {
            cancel.check()?;
            let pb = progress_bar(cues.len() as u64, "lines", "Synthesizing translations", self.show_progress);
            self.cache
                .prefetch_with(
                    cues.iter().map(|cue| cue.text.as_str()),
                    &self.translation_language,
                    self.prefetch_concurrency,
                    || pb.inc(1),
                )
                .await?;
            pb.finish_and_clear();
        }

        let pb = progress_bar(cues.len() as u64, "blocks", "Assembling", self.show_progress);
        let mut concatenator = TrackConcatenator::new(self.marker.clone(), source.sample_rate());
        let mut skipped_sources = 0;

        for cue in cues {
            cancel.check()?;

            let speech = self
                .cache
                .get_or_synthesize(&cue.text, &self.translation_language)
                .await?;
            let block = assemble(cue, source, &speech, &self.template)?;
            if !block.has_source() {
                skipped_sources += 1;
            }
            concatenator.push(&block.audio)?;
            pb.inc(1);
        }
        pb.finish_and_clear();
        cancel.check()?;

        let blocks = concatenator.blocks();
        let markers = concatenator.markers();
        let full_track = self.append_full_track.then_some(source);
        let audio = concatenator.finish(full_track)?;

        let stats = self.cache.stats();
        info!(
            "Assembled {} blocks ({} ms), {} distinct translations, {} cache hits",
            blocks,
            audio.duration_ms(),
            stats.misses,
            stats.hits
        );
        if skipped_sources > 0 {
            info!("{} cue(s) had no source audio and kept only their translation", skipped_sources);
        }

        Ok(PipelineOutput {
            audio,
            blocks,
            markers,
            skipped_sources,
            cache_hits: stats.hits,
            cache_misses: stats.misses,
        })
    }
}
