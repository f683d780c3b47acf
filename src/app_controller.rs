use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::{Config, SynthesisEngine, TranslationStrategy};
use crate::audio::{AudioBuffer, ExportFormat, ExportSettings, FfmpegToolkit, MediaBackend};
use crate::file_utils::{FileManager, MediaKind};
use crate::pipeline::concatenator::default_marker;
use crate::pipeline::sentences::{load_sentences, SentenceDrill};
use crate::pipeline::{
    cue_selector, track_resolver, BilingualPipeline, CancelFlag, InteractiveSelector, PipelineOutput,
    PresetSelector, RepeatTemplate, SpeechCache, TrackSelector,
};
use crate::providers::deepl::DeepL;
use crate::providers::google_tts::GoogleSpeech;
use crate::providers::mock::{FakeTranslator, PassthroughTranslator, ToneSynthesizer};
use crate::providers::ollama::Ollama;
use crate::providers::openai::{OpenAI, OpenAISpeech};
use crate::providers::{Synthesizer, Translator};
use crate::subtitle_processor;

// @module: Application controller for drill generation

/// Inputs of a drill built from media and subtitles
#[derive(Debug, Clone, Default)]
pub struct FromAudioRequest {
    // @field: Audio file or video container
    pub media: PathBuf,
    // @field: Subtitle file; derived from the media path when absent
    pub subtitle: Option<PathBuf>,
    // @field: Output file or directory; next to the media when absent
    pub output: Option<PathBuf>,
    pub offset: usize,
    pub limit: Option<usize>,
    // @field: Preset track (1-based number or language); prompts when absent
    pub track: Option<String>,
}

/// Inputs of a drill built from a sentence list
#[derive(Debug, Clone, Default)]
pub struct FromTextRequest {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    // @field: JSON key of the target-language text, defaults to the source language code
    pub target_key: Option<String>,
    // @field: JSON key of the translation text, defaults to the translation language code
    pub translation_key: Option<String>,
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillReport {
    pub output: PathBuf,
    pub duration_ms: u64,
    pub blocks: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

impl fmt::Display for DrillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} blocks, {:.1} s ({} translations, {} cache hits)",
            self.output,
            self.blocks,
            self.duration_ms as f64 / 1000.0,
            self.cache_misses,
            self.cache_hits
        )
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Decoding, playback and export
    media: Arc<dyn MediaBackend>,
    show_progress: bool,
}

impl Controller {
    // @method: Create a controller backed by the ffmpeg toolkit
    pub fn with_config(config: Config) -> Result<Self> {
        let media: Arc<dyn MediaBackend> = Arc::new(FfmpegToolkit::new(config.audio.sample_rate));
        Self::with_backend(config, media)
    }

    /// Create a controller on an explicit media backend
    pub fn with_backend(config: Config, media: Arc<dyn MediaBackend>) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self {
            config,
            media,
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, visible: bool) -> Self {
        self.show_progress = visible;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translation collaborator for the configured strategy
    pub fn build_translator(&self) -> Arc<dyn Translator> {
        let translation = &self.config.translation;
        let common = &translation.common;
        let retry = translation.retry_policy();
        let timeout = translation.get_timeout_secs();

        match translation.strategy {
            TranslationStrategy::DeepL => Arc::new(
                DeepL::new(translation.get_api_key(), translation.get_endpoint(), timeout, retry)
                    .with_source_language(&self.config.source_language),
            ),
            TranslationStrategy::OpenAI => Arc::new(
                OpenAI::new(
                    translation.get_api_key(),
                    translation.get_endpoint(),
                    translation.get_model(),
                    timeout,
                    retry,
                )
                .with_prompt(common.system_prompt.clone(), self.config.source_language.clone(), common.temperature),
            ),
            TranslationStrategy::Ollama => Arc::new(
                Ollama::new(&translation.get_endpoint(), translation.get_model(), timeout, retry)
                    .with_prompt(common.system_prompt.clone(), self.config.source_language.clone(), common.temperature),
            ),
            TranslationStrategy::Fake => Arc::new(FakeTranslator),
        }
    }

    /// Synthesis collaborator for the configured engine
    pub fn build_synthesizer(&self) -> Arc<dyn Synthesizer> {
        let synthesis = &self.config.synthesis;
        let retry = self.config.translation.retry_policy();

        match synthesis.engine {
            SynthesisEngine::Google => Arc::new(GoogleSpeech::new(
                synthesis.endpoint.clone(),
                synthesis.max_chars_per_request,
                Arc::clone(&self.media),
                synthesis.timeout_secs,
                retry,
            )),
            SynthesisEngine::OpenAI => Arc::new(OpenAISpeech::new(
                synthesis.get_api_key(),
                synthesis.endpoint.clone(),
                synthesis.model.clone(),
                synthesis.voice.clone(),
                Arc::clone(&self.media),
                synthesis.timeout_secs,
                retry,
            )),
            SynthesisEngine::Tone => Arc::new(ToneSynthesizer::new(self.media.sample_rate())),
        }
    }

    /// Transition marker: the configured sound, or the built-in chime
    pub async fn load_marker(&self) -> Result<AudioBuffer> {
        match &self.config.drill.transition_sound {
            Some(path) => {
                let path = FileManager::expand_home(path);
                if !FileManager::file_exists(&path) {
                    return Err(anyhow!("Transition sound does not exist: {:?}", path));
                }
                let marker = self
                    .media
                    .decode_file(&path)
                    .await
                    .with_context(|| format!("Failed to decode transition sound: {:?}", path))?;
                debug!("Using transition sound {:?} ({} ms)", path, marker.duration_ms());
                Ok(marker)
            }
            None => Ok(default_marker(self.media.sample_rate())),
        }
    }

    fn template(&self) -> RepeatTemplate {
        RepeatTemplate::from_config(&self.config.drill)
    }

    /// Export format and destination; an explicit output file with a known
    /// extension decides the format
    fn export_target(&self, input: &Path, output: Option<&Path>, default_format: ExportFormat) -> (ExportSettings, PathBuf) {
        let explicit = output
            .filter(|path| !FileManager::dir_exists(path))
            .and_then(ExportFormat::from_path);
        let format = explicit.unwrap_or(default_format);
        let destination = FileManager::output_path(input, output, format.extension());
        let settings = ExportSettings {
            format,
            bitrate: self.config.audio.bitrate.clone(),
        };
        (settings, destination)
    }

    async fn export(&self, output: &PipelineOutput, settings: &ExportSettings, destination: &Path, cancel: &CancelFlag) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(crate::errors::PipelineError::Cancelled.into());
        }
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            FileManager::ensure_dir(parent)?;
        }
        info!("Exporting {} ms of audio to {:?} as {}", output.audio.duration_ms(), destination, settings.format);
        self.media
            .export(&output.audio, settings, destination)
            .await
            .with_context(|| format!("Failed to export drill to {:?}", destination))
    }

    /// Build a drill from media and its subtitles, then export it
    pub async fn run_from_audio(&self, request: &FromAudioRequest, cancel: &CancelFlag) -> Result<DrillReport> {
        let start_time = Instant::now();

        if !FileManager::file_exists(&request.media) {
            return Err(anyhow!("Input file does not exist: {:?}", request.media));
        }
        let subtitle_path = FileManager::find_subtitle_file(&request.media, request.subtitle.as_deref())?;
        let marker = self.load_marker().await?;

        let cues = subtitle_processor::load_subtitles(&subtitle_path)
            .with_context(|| format!("Failed to load subtitles: {:?}", subtitle_path))?;
        let selected = cue_selector::select(&cues, request.offset, request.limit);
        if selected.is_empty() {
            return Err(anyhow!(
                "No subtitles left to drill in {:?} (offset {}, limit {:?})",
                subtitle_path,
                request.offset,
                request.limit
            ));
        }
        info!("Loaded {} subtitles, {} selected", cues.len(), selected.len());

        let kind = MediaKind::from_path(&request.media);
        let selector: Box<dyn TrackSelector> = match &request.track {
            Some(choice) => Box::new(PresetSelector::parse(choice)),
            None => Box::new(InteractiveSelector),
        };
        let preview_ms = self.config.audio.preview_secs * 1000;
        let source = track_resolver::resolve(&request.media, kind, self.media.as_ref(), selector.as_ref(), preview_ms)
            .await
            .with_context(|| format!("Failed to load audio from {:?}", request.media))?;

        let cache = SpeechCache::new(self.build_translator(), self.build_synthesizer());
        let pipeline = BilingualPipeline::new(cache, self.template(), marker, self.config.translation_language.clone())
            .with_full_track(self.config.drill.append_full_track)
            .with_prefetch(self.config.translation.common.concurrent_requests)
            .with_progress(self.show_progress);
        let output = pipeline.run(&source, &selected, cancel).await?;

        let (settings, destination) = self.export_target(&request.media, request.output.as_deref(), self.config.audio.format);
        self.export(&output, &settings, &destination, cancel).await?;

        let report = DrillReport {
            output: destination,
            duration_ms: output.audio.duration_ms(),
            blocks: output.blocks,
            cache_hits: output.cache_hits,
            cache_misses: output.cache_misses,
        };
        info!("Success: {} (processing time: {:.1?})", report, start_time.elapsed());
        Ok(report)
    }

    /// Build a drill from a JSON sentence list, then export it
    pub async fn run_from_text(&self, request: &FromTextRequest, cancel: &CancelFlag) -> Result<DrillReport> {
        let start_time = Instant::now();

        if !FileManager::file_exists(&request.input) {
            return Err(anyhow!("Input file does not exist: {:?}", request.input));
        }
        let target_language = self.config.source_language.clone();
        let translation_language = self.config.translation_language.clone();
        let target_key = request.target_key.clone().unwrap_or_else(|| target_language.clone());
        let translation_key = request.translation_key.clone().unwrap_or_else(|| translation_language.clone());

        let sentences = load_sentences(&request.input, &target_key, &translation_key)?;
        info!("Loaded {} sentences from {:?}", sentences.len(), request.input);
        let marker = self.load_marker().await?;

        let synthesizer = self.build_synthesizer();
        let target_speech = SpeechCache::new(Arc::new(PassthroughTranslator), Arc::clone(&synthesizer));
        let translation_speech = SpeechCache::new(Arc::new(PassthroughTranslator), synthesizer);
        let drill = SentenceDrill::new(
            target_speech,
            translation_speech,
            target_language,
            translation_language,
            self.template(),
            marker,
        )
        .with_progress(self.show_progress);
        let output = drill.run(&sentences, cancel).await?;

        let (settings, destination) = self.export_target(&request.input, request.output.as_deref(), ExportFormat::Mp3);
        if settings.format != ExportFormat::Mp3 {
            warn!("Writing sentence drill as {} instead of mp3", settings.format);
        }
        self.export(&output, &settings, &destination, cancel).await?;

        let report = DrillReport {
            output: destination,
            duration_ms: output.audio.duration_ms(),
            blocks: output.blocks,
            cache_hits: output.cache_hits,
            cache_misses: output.cache_misses,
        };
        info!("Success: {} (processing time: {:.1?})", report, start_time.elapsed());
        Ok(report)
    }
}
