/*!
 * # dualang - bilingual listening drills
 *
 * A Rust library that turns a subtitled media file into a language-learning
 * audio track: every subtitle line is played in the original language, then
 * as spoken translation, followed by a short transition sound.
 *
 * ## Features
 *
 * - Audio track resolution for plain audio files and multi-track containers,
 *   with an interactive audition prompt or a preset choice
 * - SRT, ASS and WebVTT subtitles
 * - Translation through DeepL, OpenAI or a local Ollama server
 * - Speech synthesis through Google Translate TTS or OpenAI speech
 * - One translation and synthesis per distinct line, even under concurrency
 * - Configurable repeat counts, silent intervals and transition sound
 * - Sentence-list drills without any media
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Subtitle loading
 * - `audio`: PCM buffers and the ffmpeg media backend
 * - `pipeline`: The drill stages:
 *   - `pipeline::track_resolver`: Working audio track selection
 *   - `pipeline::cue_selector`: Offset/limit windowing and blank filtering
 *   - `pipeline::speech_cache`: Translation-speech cache
 *   - `pipeline::assembler`: Bilingual block assembly
 *   - `pipeline::concatenator`: Blocks joined with transition markers
 *   - `pipeline::orchestrator`: Stage runner with cancellation
 *   - `pipeline::sentences`: Drills from sentence lists
 * - `providers`: Translation and speech collaborators:
 *   - `providers::deepl`: DeepL API client
 *   - `providers::openai`: OpenAI chat and speech clients
 *   - `providers::ollama`: Ollama API client
 *   - `providers::google_tts`: Google Translate TTS client
 *   - `providers::mock`: Offline and test collaborators
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod audio;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod pipeline;
pub mod providers;
pub mod subtitle_processor;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, DrillReport, FromAudioRequest, FromTextRequest};
pub use audio::AudioBuffer;
pub use errors::{AppError, AudioError, PipelineError, ProviderError, ResolveError, SubtitleError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use subtitle_processor::Cue;
