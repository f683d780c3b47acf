/*!
 * In-memory `MediaBackend` for tests and dry runs.
 *
 * Tracks are registered up front; probing returns their metadata and
 * decoding returns the registered buffers. Existing `.wav` files passed to
 * `decode_file` are read from disk. Export writes plain WAV regardless of
 * the requested format, with the same staged rename as the real toolkit.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use super::buffer::AudioBuffer;
use super::export::ExportSettings;
use super::media::{MediaBackend, TrackMetadata};
use crate::errors::AudioError;

/// Calls observed by a `MockMediaBackend`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MediaCalls {
    /// `(audio_index, limit_ms)` per decode
    pub decodes: Vec<(usize, Option<u64>)>,
    /// Durations of the buffers played
    pub plays: Vec<u64>,
    pub exports: usize,
}

/// Media backend serving registered buffers
#[derive(Clone)]
pub struct MockMediaBackend {
    sample_rate: u32,
    tracks: Vec<(TrackMetadata, AudioBuffer)>,
    calls: Arc<Mutex<MediaCalls>>,
}

impl MockMediaBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            tracks: Vec::new(),
            calls: Arc::new(Mutex::new(MediaCalls::default())),
        }
    }

    /// Register the next audio track
    pub fn with_track(mut self, language: Option<&str>, codec: &str, audio: AudioBuffer) -> Self {
        let index = self.tracks.len();
        let metadata = TrackMetadata {
            index,
            stream_index: index + 1,
            codec: codec.to_string(),
            language: language.map(str::to_string),
            title: None,
        };
        self.tracks.push((metadata, audio));
        self
    }

    pub fn calls(&self) -> MediaCalls {
        self.calls.lock().clone()
    }

    fn track(&self, audio_index: usize) -> Result<&AudioBuffer, AudioError> {
        self.tracks
            .get(audio_index)
            .map(|(_, audio)| audio)
            .ok_or_else(|| AudioError::Decode(format!("No audio track {}", audio_index)))
    }
}

#[async_trait]
impl MediaBackend for MockMediaBackend {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn probe_audio_tracks(&self, _path: &Path) -> Result<Vec<TrackMetadata>, AudioError> {
        Ok(self.tracks.iter().map(|(metadata, _)| metadata.clone()).collect())
    }

    async fn decode_track(
        &self,
        _path: &Path,
        audio_index: usize,
        limit_ms: Option<u64>,
    ) -> Result<AudioBuffer, AudioError> {
        self.calls.lock().decodes.push((audio_index, limit_ms));
        let audio = self.track(audio_index)?;
        Ok(match limit_ms {
            Some(limit) => audio.head(limit),
            None => audio.clone(),
        })
    }

    async fn decode_file(&self, path: &Path) -> Result<AudioBuffer, AudioError> {
        let is_wav = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        if is_wav && path.is_file() {
            return AudioBuffer::from_wav(std::fs::File::open(path)?);
        }
        self.decode_track(path, 0, None).await
    }

    async fn decode_bytes(&self, data: &[u8], _extension: &str) -> Result<AudioBuffer, AudioError> {
        if data.is_empty() {
            return Ok(AudioBuffer::empty(self.sample_rate, 1));
        }
        AudioBuffer::from_wav(std::io::Cursor::new(data.to_vec()))
    }

    async fn play(&self, audio: &AudioBuffer) -> Result<(), AudioError> {
        self.calls.lock().plays.push(audio.duration_ms());
        Ok(())
    }

    async fn export(
        &self,
        audio: &AudioBuffer,
        _settings: &ExportSettings,
        destination: &Path,
    ) -> Result<(), AudioError> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        let staged = tempfile::Builder::new().prefix(".dualang-").tempfile_in(&dir)?;
        audio.write_wav(std::fs::File::create(staged.path())?)?;
        staged
            .persist(destination)
            .map_err(|e| AudioError::Io(e.error))?;
        self.calls.lock().exports += 1;
        Ok(())
    }
}
