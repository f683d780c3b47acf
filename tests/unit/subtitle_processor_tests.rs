/*!
 * Tests for subtitle loading
 */

use anyhow::Result;

use dualang::errors::SubtitleError;
use dualang::subtitle_processor::load_subtitles;
use crate::common;

#[test]
fn test_load_subtitles_withSrtFile_shouldKeepOrderAndTiming() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;

    let cues = load_subtitles(&path)?;
    assert_eq!(cues.len(), 4);
    assert_eq!(cues[0].start_ms, 1_000);
    assert_eq!(cues[0].end_ms, 2_000);
    assert_eq!(cues[1].text, "ありがとう");
    assert!(cues[2].is_blank());
    assert_eq!(cues[2].duration_ms(), 0);
    assert_eq!(cues[3].index, 3);
    Ok(())
}

#[test]
fn test_load_subtitles_withAssFile_shouldStripOverrides() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "movie.ass",
        "[Script Info]\nTitle: test\n\n[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue: 0,0:00:01.50,0:00:03.00,Default,,0,0,0,,{\\i1}Bonjour{\\i0}\\Nà tous\n",
    )?;

    let cues = load_subtitles(&path)?;
    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].start_ms, 1_500);
    assert_eq!(cues[0].end_ms, 3_000);
    assert_eq!(cues[0].text, "Bonjour\nà tous");
    Ok(())
}

#[test]
fn test_load_subtitles_withVttFile_shouldReadCues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "movie.vtt",
        "WEBVTT\n\nNOTE a comment\n\n00:01.000 --> 00:02.500\n<v Anna>Hallo\n",
    )?;

    let cues = load_subtitles(&path)?;
    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].duration_ms(), 1_500);
    assert_eq!(cues[0].text, "Hallo");
    Ok(())
}

#[test]
fn test_load_subtitles_withUnsupportedExtension_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "movie.sub", "{1}{2}Hi")?;
    assert!(matches!(load_subtitles(&path), Err(SubtitleError::UnsupportedFormat(_))));
    Ok(())
}

#[test]
fn test_load_subtitles_withEmptyFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "movie.srt", "")?;
    assert!(matches!(load_subtitles(&path), Err(SubtitleError::Empty(_))));
    Ok(())
}

#[test]
fn test_load_subtitles_withMissingFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("missing.srt");
    assert!(matches!(load_subtitles(&path), Err(SubtitleError::NotFound(_))));
    Ok(())
}
