/*!
 * Common test utilities for the dualang test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use dualang::app_config::{Config, SynthesisEngine, TranslationStrategy};
use dualang::audio::AudioBuffer;

// Re-export the mock collaborators module
pub mod mock_providers;

/// Working sample rate of the test suite; every millisecond is exactly 8 frames
pub const TEST_RATE: u32 = 8_000;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file with three 1-second cues and one blank cue
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = r#"1
00:00:01,000 --> 00:00:02,000
おはよう

2
00:00:03,000 --> 00:00:04,000
ありがとう

3
00:00:05,000 --> 00:00:05,000
 

4
00:00:06,000 --> 00:00:07,000
おはよう
"#;
    create_test_file(dir, filename, content)
}

/// Writes `audio` as a WAV file
pub fn create_test_wav(dir: &Path, filename: &str, audio: &AudioBuffer) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    audio.write_wav(fs::File::create(&file_path)?)?;
    Ok(file_path)
}

/// Reads a WAV file written by the mock backend
pub fn read_test_wav(path: &Path) -> Result<AudioBuffer> {
    Ok(AudioBuffer::from_wav(fs::File::open(path)?)?)
}

/// Configuration that never touches the network
pub fn offline_config() -> Config {
    let mut config = Config::default();
    config.translation.strategy = TranslationStrategy::Fake;
    config.synthesis.engine = SynthesisEngine::Tone;
    config.audio.sample_rate = TEST_RATE;
    config.drill.target_repeat = 1;
    config.drill.translation_repeat = 1;
    config.drill.interval_ms = 100;
    config
}
