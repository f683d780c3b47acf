/*!
 * End-to-end drill generation through the controller
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;

use dualang::app_config::Config;
use dualang::app_controller::{Controller, FromAudioRequest, FromTextRequest};
use dualang::audio::mock::MockMediaBackend;
use dualang::audio::AudioBuffer;
use dualang::pipeline::CancelFlag;
use dualang::providers::mock::ToneSynthesizer;
use crate::common::{self, TEST_RATE};

/// Speech for the `fake` strategy's placeholder translation
fn fake_speech_ms() -> u64 {
    ToneSynthesizer::duration_for("[en] Hello world")
}

fn controller(config: Config, backend: &MockMediaBackend) -> Controller {
    Controller::with_backend(config, Arc::new(backend.clone())).unwrap()
}

#[tokio::test]
async fn test_run_from_audio_withDerivedPaths_shouldExportFullDrill() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let media = common::create_test_file(temp_dir.path(), "movie.mkv", "")?;
    common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let backend = MockMediaBackend::new(TEST_RATE).with_track(Some("jpn"), "aac", AudioBuffer::silent(8_000, TEST_RATE, 1));

    let request = FromAudioRequest {
        media: media.clone(),
        ..Default::default()
    };
    let report = controller(common::offline_config(), &backend)
        .run_from_audio(&request, &CancelFlag::new())
        .await?;

    assert_eq!(report.output, temp_dir.path().join("movie.mp3"));
    assert_eq!(report.blocks, 3);
    assert_eq!(report.cache_misses, 2);
    assert!(report.cache_hits >= 1);

    // Three 1 s cues: (1000 + 100) + (speech + 100) + 1000, each followed by a chime
    let block = 1_100 + fake_speech_ms() + 100 + 1_000;
    let exported = common::read_test_wav(&report.output)?;
    assert_eq!(exported.duration_ms(), 3 * (block + 150) + 8_000);
    assert_eq!(report.duration_ms, exported.duration_ms());
    assert_eq!(backend.calls().exports, 1);
    Ok(())
}

#[tokio::test]
async fn test_run_from_audio_withWavInputAndTransitionSound_shouldUseThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let song = common::create_test_wav(temp_dir.path(), "song.wav", &AudioBuffer::silent(9_000, TEST_RATE, 2))?;
    let chime = common::create_test_wav(temp_dir.path(), "chime.wav", &AudioBuffer::tone(660.0, 200, TEST_RATE, 0.5))?;
    let subtitle = common::create_test_subtitle(temp_dir.path(), "lyrics.srt")?;
    let out_dir = temp_dir.path().join("drills");
    fs::create_dir(&out_dir)?;

    let mut config = common::offline_config();
    config.drill.transition_sound = Some(chime);
    config.drill.append_full_track = false;
    config.audio.format = dualang::audio::ExportFormat::Wav;

    let request = FromAudioRequest {
        media: song,
        subtitle: Some(subtitle),
        output: Some(out_dir.clone()),
        offset: 1,
        limit: Some(1),
        track: None,
    };
    let backend = MockMediaBackend::new(TEST_RATE);
    let report = controller(config, &backend)
        .run_from_audio(&request, &CancelFlag::new())
        .await?;

    assert_eq!(report.output, out_dir.join("song.wav"));
    assert_eq!(report.blocks, 1);
    let exported = common::read_test_wav(&report.output)?;
    assert_eq!(exported.channels(), 1);
    assert_eq!(exported.duration_ms(), 1_100 + fake_speech_ms() + 100 + 1_000 + 200);
    // The input file is never overwritten
    assert_eq!(common::read_test_wav(&temp_dir.path().join("song.wav"))?.duration_ms(), 9_000);
    Ok(())
}

#[tokio::test]
async fn test_run_from_audio_withOffsetPastAllCues_shouldFailWithoutOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let media = common::create_test_file(temp_dir.path(), "movie.mkv", "")?;
    common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let backend = MockMediaBackend::new(TEST_RATE).with_track(None, "aac", AudioBuffer::silent(8_000, TEST_RATE, 1));

    let request = FromAudioRequest {
        media,
        offset: 10,
        ..Default::default()
    };
    let result = controller(common::offline_config(), &backend)
        .run_from_audio(&request, &CancelFlag::new())
        .await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("movie.mp3").exists());
    assert!(backend.calls().decodes.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_run_from_audio_withMissingInputs_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let backend = MockMediaBackend::new(TEST_RATE);
    let controller = controller(common::offline_config(), &backend);

    let missing_media = FromAudioRequest {
        media: temp_dir.path().join("nothing.mkv"),
        ..Default::default()
    };
    assert!(controller.run_from_audio(&missing_media, &CancelFlag::new()).await.is_err());

    let no_subtitle = FromAudioRequest {
        media: common::create_test_file(temp_dir.path(), "bare.mkv", "")?,
        ..Default::default()
    };
    assert!(controller.run_from_audio(&no_subtitle, &CancelFlag::new()).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_run_from_audio_withCancelledFlag_shouldLeaveNoOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let media = common::create_test_file(temp_dir.path(), "movie.mkv", "")?;
    common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let backend = MockMediaBackend::new(TEST_RATE).with_track(None, "aac", AudioBuffer::silent(8_000, TEST_RATE, 1));

    let cancel = CancelFlag::new();
    cancel.cancel();
    let request = FromAudioRequest {
        media,
        ..Default::default()
    };
    let result = controller(common::offline_config(), &backend)
        .run_from_audio(&request, &cancel)
        .await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("movie.mp3").exists());
    assert_eq!(backend.calls().exports, 0);
    Ok(())
}

#[tokio::test]
async fn test_run_from_text_withSentenceFile_shouldSpeakBothSides() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(
        temp_dir.path(),
        "sentences.json",
        r#"[{"ja": "ねこ", "en": "cat"}, {"ja": "", "en": "skipped"}, {"ja": "いぬ", "en": "dog"}]"#,
    )?;
    let backend = MockMediaBackend::new(TEST_RATE);

    let request = FromTextRequest {
        input,
        ..Default::default()
    };
    let report = controller(common::offline_config(), &backend)
        .run_from_text(&request, &CancelFlag::new())
        .await?;

    assert_eq!(report.output, temp_dir.path().join("sentences.mp3"));
    assert_eq!(report.blocks, 2);
    let target = ToneSynthesizer::duration_for("ねこ");
    let cat = ToneSynthesizer::duration_for("cat");
    let dog = ToneSynthesizer::duration_for("dog");
    let first = (target + 100) + (cat + 100) + target;
    let second = (target + 100) + (dog + 100) + target;
    assert_eq!(common::read_test_wav(&report.output)?.duration_ms(), first + second + 2 * 150);
    Ok(())
}

#[tokio::test]
async fn test_run_from_text_withCustomKeys_shouldReadThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "deck.json", r#"[{"jp": "はい", "english": "yes"}]"#)?;
    let backend = MockMediaBackend::new(TEST_RATE);
    let controller = controller(common::offline_config(), &backend);

    let default_keys = FromTextRequest {
        input: input.clone(),
        ..Default::default()
    };
    assert!(controller.run_from_text(&default_keys, &CancelFlag::new()).await.is_err());

    let custom_keys = FromTextRequest {
        input,
        output: Some(temp_dir.path().join("out.wav")),
        target_key: Some("jp".to_string()),
        translation_key: Some("english".to_string()),
    };
    let report = controller.run_from_text(&custom_keys, &CancelFlag::new()).await?;
    assert_eq!(report.output, temp_dir.path().join("out.wav"));
    assert_eq!(report.blocks, 1);
    Ok(())
}
