/*!
 * Tests for collaborator retries and the offline collaborators
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dualang::errors::ProviderError;
use dualang::providers::google_tts::split_text;
use dualang::providers::mock::{FakeTranslator, PassthroughTranslator, ToneSynthesizer};
use dualang::providers::{RetryPolicy, Synthesizer, Translator};
use crate::common::TEST_RATE;

#[tokio::test]
async fn test_retry_withRateLimitThenSuccess_shouldRetry() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    let result = RetryPolicy::new(2, 1)
        .run("test", || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ProviderError::RateLimitExceeded("slow down".to_string()))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_retry_withAuthenticationError_shouldFailImmediately() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    let result: Result<(), ProviderError> = RetryPolicy::new(5, 1)
        .run("test", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::AuthenticationError("bad key".to_string()))
            }
        })
        .await;

    assert!(matches!(result, Err(ProviderError::AuthenticationError(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_offline_collaborators_shouldNeverFail() {
    assert_eq!(FakeTranslator.translate("何でも", "de").await.unwrap(), "[de] Hello world");
    assert_eq!(PassthroughTranslator.translate("como", "es").await.unwrap(), "como");

    let speech = ToneSynthesizer::new(TEST_RATE).synthesize("hello", "en").await.unwrap();
    assert_eq!(speech.duration_ms(), ToneSynthesizer::duration_for("hello"));
    assert_eq!(speech.sample_rate(), TEST_RATE);
}

#[test]
fn test_split_text_withLongSentence_shouldStayWithinLimit() {
    let text = "This is the first sentence. And here comes a second one, which is rather long and keeps going for a while.";
    let chunks = split_text(text, 40);
    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 40));
    assert_eq!(chunks.concat().replace(' ', ""), text.replace(' ', ""));
}
