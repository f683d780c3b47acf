/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use std::path::PathBuf;

use dualang::app_config::{Config, LogLevel, SynthesisEngine, TranslationStrategy};
use dualang::audio::ExportFormat;
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "ja");
    assert_eq!(config.translation_language, "en");
    assert_eq!(config.translation.strategy, TranslationStrategy::DeepL);
    assert_eq!(config.synthesis.engine, SynthesisEngine::Google);
    assert_eq!(config.synthesis.max_chars_per_request, 100);
    assert_eq!(config.drill.target_repeat, 3);
    assert_eq!(config.drill.translation_repeat, 1);
    assert_eq!(config.drill.interval_ms, 1000);
    assert!(config.drill.append_full_track);
    assert!(config.drill.transition_sound.is_none());
    assert_eq!(config.audio.format, ExportFormat::Mp3);
    assert_eq!(config.audio.preview_secs, 30);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// A missing config file is created with the defaults
#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let created = Config::load_or_create(&path)?;
    assert!(path.exists());

    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.translation.strategy, created.translation.strategy);
    assert_eq!(reloaded.drill.target_repeat, created.drill.target_repeat);
    Ok(())
}

/// A hand-written file only needs the sections it changes
#[test]
fn test_load_or_create_withHandWrittenFile_shouldReadValues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "source_language": "fr",
            "translation_language": "de",
            "translation": { "strategy": "ollama" },
            "synthesis": { "engine": "tone" },
            "drill": { "target_repeat": 2, "transition_sound": "/sounds/ding.wav" },
            "audio": { "format": "ogg", "sample_rate": 22050 },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::load_or_create(&path)?;
    assert_eq!(config.source_language, "fr");
    assert_eq!(config.translation.strategy, TranslationStrategy::Ollama);
    assert_eq!(config.synthesis.engine, SynthesisEngine::Tone);
    assert_eq!(config.drill.target_repeat, 2);
    assert_eq!(config.drill.translation_repeat, 1);
    assert_eq!(config.drill.transition_sound, Some(PathBuf::from("/sounds/ding.wav")));
    assert_eq!(config.audio.format, ExportFormat::Ogg);
    assert_eq!(config.audio.sample_rate, 22050);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.validate().is_ok());
    Ok(())
}

/// Broken JSON is reported, not replaced by defaults
#[test]
fn test_load_or_create_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;
    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = common::offline_config();
    assert!(config.validate().is_ok());

    config.source_language = "xyz".to_string();
    assert!(config.validate().is_err());
    config.source_language = "ja".to_string();

    config.drill.target_repeat = 0;
    assert!(config.validate().is_ok());
    config.drill.translation_repeat = 0;
    assert!(config.validate().is_err());
    config.drill.translation_repeat = 1;

    config.audio.sample_rate = 0;
    assert!(config.validate().is_err());
    config.audio.sample_rate = common::TEST_RATE;

    config.translation.strategy = TranslationStrategy::OpenAI;
    if let Some(provider) = config
        .translation
        .available_providers
        .iter_mut()
        .find(|p| p.provider_type == "openai")
    {
        provider.api_key = "sk-1234567890".to_string();
    }
    assert!(config.validate().is_ok());
    assert_eq!(config.translation.get_model(), "gpt-4o-mini");
}
