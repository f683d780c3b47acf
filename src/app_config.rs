use anyhow::{anyhow, Context, Result};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::audio::ExportFormat;
use crate::providers::RetryPolicy;

/// Application configuration module
/// This module handles loading, validating and saving the drill settings,
/// the translation strategy and the speech engine configuration.

static BITRATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2,3}k$").unwrap());

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language spoken in the source media (ISO)
    pub source_language: String,

    /// Language the cues are translated into and spoken in (ISO)
    pub translation_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Speech synthesis config
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Repetition template and transition marker
    #[serde(default)]
    pub drill: DrillConfig,

    /// Working sample rate and output encoding
    #[serde(default)]
    pub audio: AudioConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation strategy selector
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStrategy {
    // @provider: DeepL REST API
    #[default]
    #[serde(rename = "deepl")]
    DeepL,
    // @provider: OpenAI chat completions
    #[serde(rename = "openai")]
    OpenAI,
    // @provider: Local Ollama server
    Ollama,
    // @provider: Offline placeholder translation
    Fake,
}

impl TranslationStrategy {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::DeepL => "DeepL",
            Self::OpenAI => "OpenAI",
            Self::Ollama => "Ollama",
            Self::Fake => "Fake",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::DeepL => "deepl".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Ollama => "ollama".to_string(),
            Self::Fake => "fake".to_string(),
        }
    }

    /// Environment variable consulted when the config has no key
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::DeepL => Some("DEEPL_API_KEY"),
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Ollama | Self::Fake => None,
        }
    }
}

impl std::fmt::Display for TranslationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "deepl" => Ok(Self::DeepL),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "fake" => Ok(Self::Fake),
            _ => Err(anyhow!("Unsupported translation strategy {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name (LLM strategies only)
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param strategy: Strategy enum
    // @returns: Provider config with defaults
    pub fn new(strategy: TranslationStrategy) -> Self {
        let (model, endpoint) = match strategy {
            TranslationStrategy::DeepL => (String::new(), String::new()),
            TranslationStrategy::OpenAI => (default_openai_model(), default_openai_endpoint()),
            TranslationStrategy::Ollama => (default_ollama_model(), default_ollama_endpoint()),
            TranslationStrategy::Fake => (String::new(), String::new()),
        };
        Self {
            provider_type: strategy.to_lowercase_string(),
            model,
            api_key: String::new(),
            endpoint,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation strategy to use
    #[serde(default)]
    pub strategy: TranslationStrategy,

    /// Per-strategy settings
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Settings shared by every translation strategy
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for LLM strategies
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Distinct cues translated and synthesized ahead of assembly at once.
    /// 1 disables prefetching.
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Temperature parameter for LLM strategies (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            concurrent_requests: default_concurrent_requests(),
            temperature: default_temperature(),
        }
    }
}

/// Speech synthesis engine
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisEngine {
    /// Google Translate text-to-speech endpoint
    #[default]
    Google,
    /// OpenAI `/v1/audio/speech`
    #[serde(rename = "openai")]
    OpenAI,
    /// Offline tone, one beep per utterance
    Tone,
}

/// Speech synthesis configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SynthesisConfig {
    #[serde(default)]
    pub engine: SynthesisEngine,

    /// Service URL; empty selects the engine's default
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Model name (OpenAI)
    #[serde(default = "default_tts_model")]
    pub model: String,

    /// Voice name (OpenAI)
    #[serde(default = "default_tts_voice")]
    pub voice: String,

    /// API key (OpenAI); falls back to OPENAI_API_KEY
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Longest text sent in one Google TTS request
    #[serde(default = "default_tts_max_chars")]
    pub max_chars_per_request: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            engine: SynthesisEngine::default(),
            endpoint: String::new(),
            model: default_tts_model(),
            voice: default_tts_voice(),
            api_key: String::new(),
            max_chars_per_request: default_tts_max_chars(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SynthesisConfig {
    /// API key for the engine, consulting the environment when unset
    pub fn get_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        match self.engine {
            SynthesisEngine::OpenAI => std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            _ => String::new(),
        }
    }
}

/// Repetition template applied to every cue
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DrillConfig {
    /// How many times the original line plays before the translation
    #[serde(default = "default_target_repeat")]
    pub target_repeat: usize,

    /// How many times the translated speech plays
    #[serde(default = "default_translation_repeat")]
    pub translation_repeat: usize,

    /// Silence after each repetition, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Append the whole unsliced source track after the last block
    #[serde(default = "default_true")]
    pub append_full_track: bool,

    /// Sound played after every block; a built-in chime when unset
    #[serde(default)]
    pub transition_sound: Option<PathBuf>,
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            target_repeat: default_target_repeat(),
            translation_repeat: default_translation_repeat(),
            interval_ms: default_interval_ms(),
            append_full_track: default_true(),
            transition_sound: None,
        }
    }
}

/// Working audio format and output encoding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AudioConfig {
    /// Rate every decoded input is resampled to
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Output container
    #[serde(default)]
    pub format: ExportFormat,

    /// Output bitrate for lossy formats
    #[serde(default = "default_bitrate")]
    pub bitrate: String,

    /// Length of an audition preview in seconds
    #[serde(default = "default_preview_secs")]
    pub preview_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            format: ExportFormat::default(),
            bitrate: default_bitrate(),
            preview_secs: default_preview_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_target_repeat() -> usize {
    3
}

fn default_translation_repeat() -> usize {
    1
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_bitrate() -> String {
    "192k".to_string()
}

fn default_preview_secs() -> u64 {
    30
}

fn default_tts_model() -> String {
    "tts-1".to_string()
}

fn default_tts_voice() -> String {
    "alloy".to_string()
}

fn default_tts_max_chars() -> usize {
    100
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_system_prompt() -> String {
    "You are a professional subtitle translator. Translate the user's line from {source_language} to {target_language}. Reply with the translation only.".to_string()
}

impl Config {
    /// Load the configuration at `path`, writing the defaults there first
    /// when the file does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .context(format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .context(format!("Failed to parse config file: {:?}", path))?;
            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .context(format!("Failed to write default config to file: {:?}", path))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.source_language)
            .context("Invalid source_language")?;
        crate::language_utils::validate_language_code(&self.translation_language)
            .context("Invalid translation_language")?;

        if self.drill.target_repeat == 0 && self.drill.translation_repeat == 0 {
            return Err(anyhow!("target_repeat and translation_repeat cannot both be 0"));
        }

        if !(8_000..=192_000).contains(&self.audio.sample_rate) {
            return Err(anyhow!("Unsupported sample rate: {} Hz", self.audio.sample_rate));
        }

        if !BITRATE_REGEX.is_match(&self.audio.bitrate) {
            return Err(anyhow!("Invalid bitrate '{}', expected something like 192k", self.audio.bitrate));
        }

        match self.translation.strategy {
            TranslationStrategy::DeepL | TranslationStrategy::OpenAI => {
                if self.translation.get_api_key().is_empty() {
                    let env = self.translation.strategy.api_key_env().unwrap_or_default();
                    return Err(anyhow!(
                        "{} translation requires an API key: set it in the config or the {} environment variable",
                        self.translation.strategy.display_name(),
                        env
                    ));
                }
            }
            TranslationStrategy::Ollama => {
                if self.translation.get_endpoint().is_empty() {
                    return Err(anyhow!("Ollama translation requires an endpoint"));
                }
            }
            TranslationStrategy::Fake => {}
        }

        if self.synthesis.engine == SynthesisEngine::OpenAI && self.synthesis.get_api_key().is_empty() {
            return Err(anyhow!("OpenAI speech synthesis requires an API key"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "ja".to_string(),
            translation_language: "en".to_string(),
            translation: TranslationConfig::default(),
            synthesis: SynthesisConfig::default(),
            drill: DrillConfig::default(),
            audio: AudioConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.strategy.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get the model for the active strategy
    pub fn get_model(&self) -> String {
        match self.get_active_provider_config() {
            Some(provider_config) if !provider_config.model.is_empty() => provider_config.model.clone(),
            _ => ProviderConfig::new(self.strategy).model,
        }
    }

    /// Get the API key for the active strategy, consulting the environment when unset
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }
        self.strategy
            .api_key_env()
            .and_then(|env| std::env::var(env).ok())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active strategy
    pub fn get_endpoint(&self) -> String {
        match self.get_active_provider_config() {
            Some(provider_config) if !provider_config.endpoint.is_empty() => provider_config.endpoint.clone(),
            _ => ProviderConfig::new(self.strategy).endpoint,
        }
    }

    /// Get the request timeout for the active strategy
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Retry behaviour shared by the HTTP collaborators
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.common.retry_count, self.common.retry_backoff_ms)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            strategy: TranslationStrategy::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationStrategy::DeepL),
                ProviderConfig::new(TranslationStrategy::OpenAI),
                ProviderConfig::new(TranslationStrategy::Ollama),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_config() -> Config {
        let mut config = Config::default();
        config.translation.strategy = TranslationStrategy::Fake;
        config
    }

    #[test]
    fn test_default_config_withFakeStrategy_shouldValidate() {
        assert!(fake_config().validate().is_ok());
    }

    #[test]
    fn test_validate_withBothRepeatsZero_shouldFail() {
        let mut config = fake_config();
        config.drill.target_repeat = 0;
        config.drill.translation_repeat = 0;
        assert!(config.validate().is_err());

        config.drill.translation_repeat = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_withBadBitrateOrLanguage_shouldFail() {
        let mut config = fake_config();
        config.audio.bitrate = "fast".to_string();
        assert!(config.validate().is_err());

        let mut config = fake_config();
        config.translation_language = "klingon".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_withDeeplAndExplicitKey_shouldPass() {
        let mut config = Config::default();
        config.translation.available_providers[0].api_key = "abc:fx".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.translation.get_api_key(), "abc:fx");
    }

    #[test]
    fn test_strategy_fromStr_withUnknownName_shouldFail() {
        assert_eq!("DeepL".parse::<TranslationStrategy>().unwrap(), TranslationStrategy::DeepL);
        assert_eq!("fake".parse::<TranslationStrategy>().unwrap(), TranslationStrategy::Fake);
        assert!("babelfish".parse::<TranslationStrategy>().is_err());
    }

    #[test]
    fn test_config_json_withPartialSections_shouldFillDefaults() {
        let json = r#"{
            "source_language": "ja",
            "translation_language": "en",
            "translation": { "strategy": "fake" },
            "drill": { "target_repeat": 2, "interval_ms": 100, "append_full_track": false }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.translation.strategy, TranslationStrategy::Fake);
        assert_eq!(config.drill.target_repeat, 2);
        assert_eq!(config.drill.translation_repeat, 1);
        assert!(!config.drill.append_full_track);
        assert_eq!(config.audio.sample_rate, 44_100);
        assert_eq!(config.synthesis.engine, SynthesisEngine::Google);
    }

    #[test]
    fn test_endpoint_withEmptyProviderEntry_shouldFallBackToDefault() {
        let mut config = Config::default();
        config.translation.strategy = TranslationStrategy::Ollama;
        config.translation.available_providers.clear();
        assert_eq!(config.translation.get_endpoint(), "http://localhost:11434");
        assert_eq!(config.translation.get_model(), "llama3.2:3b");
    }
}
