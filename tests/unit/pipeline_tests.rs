/*!
 * Tests for the drill stages working together
 */

use std::sync::Arc;

use dualang::audio::AudioBuffer;
use dualang::errors::PipelineError;
use dualang::pipeline::assembler::assemble;
use dualang::pipeline::concatenator::default_marker;
use dualang::pipeline::{cue_selector, BilingualPipeline, CancelFlag, RepeatTemplate, SpeechCache};
use dualang::providers::mock::{MockBehavior, MockSynthesizer, MockTranslator};
use dualang::subtitle_processor::Cue;
use crate::common::mock_providers::RecordingTranslator;
use crate::common::TEST_RATE;

fn ten_cues() -> Vec<Cue> {
    (0..10)
        .map(|i| Cue::new(i, i as u64 * 1_000, i as u64 * 1_000 + 500, format!("line {}", i)))
        .collect()
}

#[test]
fn test_select_withOffsetAndLimit_shouldReturnWindowInOrder() {
    let cues = ten_cues();
    let selected = cue_selector::select(&cues, 2, Some(3));
    let indices: Vec<usize> = selected.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![2, 3, 4]);
}

#[test]
fn test_select_withOffsetPastEnd_shouldBeEmpty() {
    let cues = ten_cues();
    assert!(cue_selector::select(&cues, 10, None).is_empty());
    assert_eq!(cue_selector::select(&cues, 0, Some(0)).len(), 0);
}

#[test]
fn test_assemble_withDefaultTemplate_shouldRepeatThreeTimesPlusFinal() {
    let source = AudioBuffer::silent(4_000, TEST_RATE, 1);
    let translated = AudioBuffer::silent(700, TEST_RATE, 1);
    let cue = Cue::new(0, 1_000, 1_500, "x");
    let template = RepeatTemplate::default();

    let block = assemble(&cue, &source, &translated, &template).unwrap();
    // (500 + 1000) x 3 + (700 + 1000) x 1 + 500
    assert_eq!(block.audio.duration_ms(), 4_500 + 1_700 + 500);
    assert_eq!(block.audio.duration_ms(), template.block_duration_ms(500, 700));
}

#[test]
fn test_assemble_withZeroTranslationRepeat_shouldOnlyRepeatSource() {
    let source = AudioBuffer::silent(4_000, TEST_RATE, 1);
    let translated = AudioBuffer::silent(700, TEST_RATE, 1);
    let cue = Cue::new(0, 0, 1_000, "x");
    let template = RepeatTemplate::new(2, 0, 50);

    let block = assemble(&cue, &source, &translated, &template).unwrap();
    assert_eq!(block.audio.duration_ms(), 2 * 1_050 + 1_000);
}

#[test]
fn test_speech_cache_withRepeatedLine_shouldCountOneMissOneHit() {
    let synth = MockSynthesizer::working(TEST_RATE, 100);
    let cache = SpeechCache::new(Arc::new(MockTranslator::working()), Arc::new(synth.clone()));

    tokio_test::block_on(async {
        cache.get_or_synthesize("もう一度", "en").await.unwrap();
        cache.get_or_synthesize("もう一度", "en").await.unwrap();
    });

    let stats = cache.stats();
    assert_eq!((stats.misses, stats.hits), (1, 1));
    assert_eq!(synth.calls(), 1);
}

#[tokio::test]
async fn test_pipeline_withRecordingTranslator_shouldAskForTranslationLanguage() {
    let translator = RecordingTranslator::new();
    let cache = SpeechCache::new(Arc::new(translator.clone()), Arc::new(MockSynthesizer::working(TEST_RATE, 100)));
    let pipeline = BilingualPipeline::new(cache, RepeatTemplate::new(1, 1, 0), default_marker(TEST_RATE), "fr");

    let source = AudioBuffer::silent(3_000, TEST_RATE, 1);
    let cues = vec![Cue::new(0, 0, 500, "猫"), Cue::new(1, 500, 1_000, "犬"), Cue::new(2, 1_000, 1_500, "猫")];
    let selected = cue_selector::select(&cues, 0, None);
    pipeline.run(&source, &selected, &CancelFlag::new()).await.unwrap();

    assert_eq!(
        translator.requests(),
        vec![("猫".to_string(), "fr".to_string()), ("犬".to_string(), "fr".to_string())]
    );
}

#[tokio::test]
async fn test_pipeline_withMarkerCount_shouldMatchNonEmptyCues() {
    let cues = vec![
        Cue::new(0, 0, 400, "one"),
        Cue::new(1, 400, 800, "   "),
        Cue::new(2, 800, 1_200, "two"),
        Cue::new(3, 1_200, 1_600, ""),
        Cue::new(4, 1_600, 2_000, "three"),
    ];
    let selected = cue_selector::select(&cues, 0, None);
    let cache = SpeechCache::new(Arc::new(MockTranslator::working()), Arc::new(MockSynthesizer::working(TEST_RATE, 100)));
    let pipeline = BilingualPipeline::new(cache, RepeatTemplate::new(1, 1, 0), default_marker(TEST_RATE), "en");

    let source = AudioBuffer::silent(2_000, TEST_RATE, 1);
    let output = pipeline.run(&source, &selected, &CancelFlag::new()).await.unwrap();
    assert_eq!(output.markers, 3);
    assert_eq!(output.blocks, 3);
    // Three blocks of (400 + 100 + 400), three markers, the full track
    assert_eq!(output.audio.duration_ms(), 3 * 900 + 3 * 150 + 2_000);
}

#[tokio::test]
async fn test_pipeline_withIntermittentTranslator_shouldAbortOnFirstFailure() {
    let translator = MockTranslator::new(MockBehavior::Intermittent { fail_every: 2 });
    let cache = SpeechCache::new(Arc::new(translator.clone()), Arc::new(MockSynthesizer::working(TEST_RATE, 100)));
    let pipeline = BilingualPipeline::new(cache, RepeatTemplate::default(), default_marker(TEST_RATE), "en");

    let source = AudioBuffer::silent(5_000, TEST_RATE, 1);
    let cues = vec![Cue::new(0, 0, 500, "a"), Cue::new(1, 500, 1_000, "b"), Cue::new(2, 1_000, 1_500, "c")];
    let selected = cue_selector::select(&cues, 0, None);
    let result = pipeline.run(&source, &selected, &CancelFlag::new()).await;

    match result {
        Err(PipelineError::Translation { text, .. }) => assert_eq!(text, "b"),
        other => panic!("expected a translation failure, got {:?}", other.map(|o| o.blocks)),
    }
    assert_eq!(translator.calls(), 2);
}
