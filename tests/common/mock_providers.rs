/*!
 * Recording collaborators for integration tests
 *
 * The library ships counting mocks in `dualang::providers::mock`; the
 * doubles here additionally record what they were asked, so tests can
 * check texts, languages and audition calls.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use dualang::audio::TrackMetadata;
use dualang::errors::{ProviderError, ResolveError};
use dualang::pipeline::track_resolver::Audition;
use dualang::pipeline::TrackSelector;
use dualang::providers::Translator;

/// Translator recording every `(text, target_language)` request
#[derive(Debug, Default, Clone)]
pub struct RecordingTranslator {
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Translator for RecordingTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        self.requests
            .lock()
            .push((text.to_string(), target_language.to_string()));
        Ok(text.chars().rev().collect())
    }

    fn name(&self) -> &str {
        "Recording"
    }
}

/// Track selector answering with a fixed position, optionally auditioning
/// every track first
#[derive(Debug, Clone)]
pub struct ScriptedSelector {
    position: usize,
    audition_all: bool,
    offered: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedSelector {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            audition_all: false,
            offered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn auditioning(mut self) -> Self {
        self.audition_all = true;
        self
    }

    /// Number of tracks offered on each call
    pub fn offered(&self) -> Vec<usize> {
        self.offered.lock().clone()
    }
}

#[async_trait]
impl TrackSelector for ScriptedSelector {
    async fn select(&self, tracks: &[TrackMetadata], audition: &dyn Audition) -> Result<usize, ResolveError> {
        self.offered.lock().push(tracks.len());
        if self.audition_all {
            for track in tracks {
                audition.preview(track).await?;
            }
        }
        Ok(self.position)
    }
}
