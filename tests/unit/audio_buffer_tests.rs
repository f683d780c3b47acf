/*!
 * Tests for the PCM buffer model through the public API
 */

use anyhow::Result;

use dualang::audio::AudioBuffer;
use dualang::errors::AudioError;
use crate::common::{self, TEST_RATE};

#[test]
fn test_wav_file_withToneBuffer_shouldReadBackIdentical() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let tone = AudioBuffer::tone(880.0, 150, TEST_RATE, 0.4);
    let path = common::create_test_wav(temp_dir.path(), "chime.wav", &tone)?;

    let decoded = common::read_test_wav(&path)?;
    assert_eq!(decoded, tone);
    assert_eq!(decoded.duration_ms(), 150);
    Ok(())
}

#[test]
fn test_repeated_withCount_shouldMultiplyDuration() {
    let segment = AudioBuffer::silent(250, TEST_RATE, 2);
    assert_eq!(segment.repeated(3).duration_ms(), 750);
    assert!(segment.repeated(0).is_empty());
    assert_eq!(segment.repeated(0).channels(), 2);
}

#[test]
fn test_append_chain_withMixedLayouts_shouldEndAtSmallestChannelCount() -> Result<()> {
    let mut output = AudioBuffer::empty(TEST_RATE, 2);
    output.append(&AudioBuffer::silent(100, TEST_RATE, 2))?;
    assert_eq!(output.channels(), 2);

    output.append(&AudioBuffer::silent(100, TEST_RATE, 1))?;
    assert_eq!(output.channels(), 1);

    output.append(&AudioBuffer::silent(100, TEST_RATE, 6))?;
    assert_eq!(output.channels(), 1);
    assert_eq!(output.duration_ms(), 300);
    Ok(())
}

#[test]
fn test_append_withForeignRate_shouldReportMismatch() {
    let mut output = AudioBuffer::silent(100, TEST_RATE, 1);
    let foreign = AudioBuffer::silent(100, 44_100, 1);
    assert!(matches!(
        output.append(&foreign),
        Err(AudioError::SampleRateMismatch { expected: 8_000, found: 44_100 })
    ));
}

#[test]
fn test_slice_withCueOutsideTrack_shouldClamp() {
    let track = AudioBuffer::silent(1_000, TEST_RATE, 1);
    assert_eq!(track.slice(800, 5_000).duration_ms(), 200);
    assert!(track.slice(2_000, 3_000).is_empty());
}
