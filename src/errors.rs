/*!
 * Error types for the dualang application.
 *
 * This module contains custom error types for the different stages of the
 * drill pipeline, using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when working with translation or synthesis APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting or quota
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider does not handle the requested language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
}

impl ProviderError {
    /// Whether a retry has any chance of succeeding
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Errors raised by the in-memory audio model and the decode/encode tools
#[derive(Error, Debug)]
pub enum AudioError {
    /// Two buffers with different sample rates cannot be joined
    #[error("Sample rate mismatch: {expected} Hz vs {found} Hz")]
    SampleRateMismatch { expected: u32, found: u32 },

    /// Decoded data could not be interpreted
    #[error("Decode error: {0}")]
    Decode(String),

    /// ffmpeg/ffprobe/ffplay failed or could not be started
    #[error("ffmpeg error: {0}")]
    Ffmpeg(String),

    /// WAV reading or writing failed
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while loading subtitles
#[derive(Error, Debug)]
pub enum SubtitleError {
    #[error("Subtitle file does not exist: {0:?}")]
    NotFound(PathBuf),

    #[error("Unsupported subtitle file format '{0}'. Only .srt, .ass and .vtt are supported")]
    UnsupportedFormat(String),

    #[error("Subtitle file is empty: {0:?}")]
    Empty(PathBuf),

    #[error("Malformed subtitle at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Failed to read subtitle file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from audio track resolution
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The container has no audio stream at all
    #[error("No audio tracks found in {0:?}")]
    NoAudioTracks(PathBuf),

    /// A preset track choice does not exist in the probed list
    #[error("Track {choice} is out of range (1-{count})")]
    SelectionOutOfRange { choice: usize, count: usize },

    /// No probed track carries the requested language tag
    #[error("No audio track tagged with language '{0}'")]
    NoTrackForLanguage(String),

    /// The terminal prompt failed
    #[error("Track selection prompt failed: {0}")]
    Prompt(String),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Pipeline-fatal errors raised while building the drill
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The translation collaborator failed for a cue
    #[error("Translation failed for '{text}': {source}")]
    Translation {
        text: String,
        #[source]
        source: ProviderError,
    },

    /// The synthesis collaborator failed for a cue
    #[error("Speech synthesis failed for '{text}': {source}")]
    Synthesis {
        text: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Audio(#[from] AudioError),

    /// The run was interrupted between cues
    #[error("Pipeline cancelled")]
    Cancelled,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Track resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
