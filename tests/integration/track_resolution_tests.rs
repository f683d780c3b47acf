/*!
 * Integration tests for audio track resolution
 */

use std::path::Path;

use dualang::audio::mock::MockMediaBackend;
use dualang::audio::AudioBuffer;
use dualang::errors::ResolveError;
use dualang::file_utils::MediaKind;
use dualang::pipeline::track_resolver::resolve;
use crate::common::mock_providers::ScriptedSelector;
use crate::common::TEST_RATE;

fn dual_audio_backend() -> MockMediaBackend {
    MockMediaBackend::new(TEST_RATE)
        .with_track(Some("jpn"), "aac", AudioBuffer::silent(50_000, TEST_RATE, 2))
        .with_track(Some("eng"), "ac3", AudioBuffer::silent(20_000, TEST_RATE, 6))
}

#[tokio::test]
async fn test_resolve_withAudition_shouldPreviewEveryTrackThenDecodeChoice() {
    let backend = dual_audio_backend();
    let selector = ScriptedSelector::new(1).auditioning();

    let audio = resolve(Path::new("show.mkv"), MediaKind::Container, &backend, &selector, 30_000)
        .await
        .unwrap();

    assert_eq!(audio.channels(), 6);
    assert_eq!(selector.offered(), vec![2]);
    let calls = backend.calls();
    assert_eq!(calls.decodes, vec![(0, Some(30_000)), (1, Some(30_000)), (1, None)]);
    // The second track is shorter than the preview window
    assert_eq!(calls.plays, vec![30_000, 20_000]);
}

#[tokio::test]
async fn test_resolve_withSelectorOutOfRange_shouldReject() {
    let backend = dual_audio_backend();
    let selector = ScriptedSelector::new(5);

    let result = resolve(Path::new("show.mkv"), MediaKind::Container, &backend, &selector, 30_000).await;
    assert!(matches!(result, Err(ResolveError::SelectionOutOfRange { choice: 6, count: 2 })));
    assert!(backend.calls().decodes.is_empty());
}

#[tokio::test]
async fn test_resolve_withSingleTrack_shouldNotConsultSelector() {
    let backend = MockMediaBackend::new(TEST_RATE).with_track(None, "opus", AudioBuffer::silent(1_000, TEST_RATE, 1));
    let selector = ScriptedSelector::new(0);

    resolve(Path::new("clip.webm"), MediaKind::Container, &backend, &selector, 30_000)
        .await
        .unwrap();
    assert!(selector.offered().is_empty());
    assert!(backend.calls().plays.is_empty());
}
