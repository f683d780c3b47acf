/*!
 * Container probing, decoding, playback and export.
 *
 * `MediaBackend` is the seam between the pipeline and the outside audio
 * tooling. `FfmpegToolkit` implements it by shelling out to ffprobe, ffmpeg
 * and ffplay; every decode is normalised to the toolkit's working sample
 * rate so buffers from different sources can be joined directly.
 */

use async_trait::async_trait;
use log::{debug, error};
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use super::buffer::AudioBuffer;
use super::export::ExportSettings;
use crate::errors::AudioError;

/// One audio stream found in a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Position among the audio streams, 0-based
    pub index: usize,
    /// Absolute stream index inside the container
    pub stream_index: usize,
    /// Codec name as reported by ffprobe
    pub codec: String,
    /// Language tag, if the container carries one
    pub language: Option<String>,
    /// Stream title, if any
    pub title: Option<String>,
}

impl TrackMetadata {
    /// `"jpn (codec: aac)"`, with `unknown` for a missing language tag
    pub fn display_label(&self) -> String {
        format!(
            "{} (codec: {})",
            self.language.as_deref().unwrap_or("unknown"),
            self.codec
        )
    }
}

/// Audio I/O used by the pipeline
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Rate every decoded buffer is delivered at
    fn sample_rate(&self) -> u32;

    /// List the audio streams of a media file in container order
    async fn probe_audio_tracks(&self, path: &Path) -> Result<Vec<TrackMetadata>, AudioError>;

    /// Decode the `audio_index`-th audio stream, optionally only the first `limit_ms`
    async fn decode_track(
        &self,
        path: &Path,
        audio_index: usize,
        limit_ms: Option<u64>,
    ) -> Result<AudioBuffer, AudioError>;

    /// Decode the first audio stream of a plain audio file
    async fn decode_file(&self, path: &Path) -> Result<AudioBuffer, AudioError> {
        self.decode_track(path, 0, None).await
    }

    /// Decode an encoded blob such as an MP3 returned by a speech API
    async fn decode_bytes(&self, data: &[u8], extension: &str) -> Result<AudioBuffer, AudioError>;

    /// Play a buffer to the default output device, returning when done
    async fn play(&self, audio: &AudioBuffer) -> Result<(), AudioError>;

    /// Encode `audio` to `destination`. Nothing is visible at the destination
    /// until the encoded file is complete.
    async fn export(
        &self,
        audio: &AudioBuffer,
        settings: &ExportSettings,
        destination: &Path,
    ) -> Result<(), AudioError>;
}

/// `MediaBackend` backed by the ffmpeg command-line tools
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    /// Rate every decode is resampled to
    sample_rate: u32,
    /// Upper bound for a single probe/decode/encode invocation
    timeout: Duration,
}

impl FfmpegToolkit {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            timeout: Duration::from_secs(600),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run_tool(&self, program: &str, args: &[String], timeout: Duration) -> Result<Output, AudioError> {
        debug!("{} {}", program, args.join(" "));

        let child = Command::new(program).args(args).output();
        let output = tokio::select! {
            result = child => {
                result.map_err(|e| AudioError::Ffmpeg(format!("Failed to execute {}: {}", program, e)))?
            },
            _ = tokio::time::sleep(timeout) => {
                return Err(AudioError::Ffmpeg(format!("{} timed out after {} seconds", program, timeout.as_secs())));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let filtered = filter_ffmpeg_stderr(&stderr);
            error!("{} failed: {}", program, filtered);
            return Err(AudioError::Ffmpeg(filtered));
        }
        Ok(output)
    }
}

#[async_trait]
impl MediaBackend for FfmpegToolkit {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn probe_audio_tracks(&self, path: &Path) -> Result<Vec<TrackMetadata>, AudioError> {
        if !path.exists() {
            return Err(AudioError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Media file not found: {:?}", path),
            )));
        }

        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_streams".to_string(),
            "-select_streams".to_string(),
            "a".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        let output = self.run_tool("ffprobe", &args, Duration::from_secs(60)).await?;
        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    async fn decode_track(
        &self,
        path: &Path,
        audio_index: usize,
        limit_ms: Option<u64>,
    ) -> Result<AudioBuffer, AudioError> {
        // Scratch file is removed when `scratch` drops
        let scratch = tempfile::Builder::new()
            .prefix("dualang-decode-")
            .suffix(".wav")
            .tempfile()?;

        let mut args = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            path.to_string_lossy().into_owned(),
            "-map".to_string(),
            format!("0:a:{}", audio_index),
        ];
        if let Some(limit) = limit_ms {
            args.push("-t".to_string());
            args.push(format!("{:.3}", limit as f64 / 1000.0));
        }
        args.extend(
            [
                "-vn",
                "-ar",
                &self.sample_rate.to_string(),
                "-c:a",
                "pcm_s16le",
                "-f",
                "wav",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push(scratch.path().to_string_lossy().into_owned());

        self.run_tool("ffmpeg", &args, self.timeout).await?;

        let bytes = tokio::fs::read(scratch.path()).await?;
        let buffer = AudioBuffer::from_wav(Cursor::new(bytes))?;
        debug!(
            "Decoded {:?} audio track {}: {} ms, {} channel(s)",
            path,
            audio_index,
            buffer.duration_ms(),
            buffer.channels()
        );
        Ok(buffer)
    }

    async fn decode_bytes(&self, data: &[u8], extension: &str) -> Result<AudioBuffer, AudioError> {
        if data.is_empty() {
            return Ok(AudioBuffer::empty(self.sample_rate, 1));
        }
        let encoded = tempfile::Builder::new()
            .prefix("dualang-speech-")
            .suffix(&format!(".{}", extension.trim_start_matches('.')))
            .tempfile()?;
        tokio::fs::write(encoded.path(), data).await?;
        self.decode_track(encoded.path(), 0, None).await
    }

    async fn play(&self, audio: &AudioBuffer) -> Result<(), AudioError> {
        let wav = tempfile::Builder::new()
            .prefix("dualang-preview-")
            .suffix(".wav")
            .tempfile()?;
        audio.write_wav(std::fs::File::create(wav.path())?)?;

        let args = vec![
            "-nodisp".to_string(),
            "-autoexit".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            wav.path().to_string_lossy().into_owned(),
        ];
        let budget = Duration::from_millis(audio.duration_ms()) + Duration::from_secs(10);
        self.run_tool("ffplay", &args, budget).await?;
        Ok(())
    }

    async fn export(
        &self,
        audio: &AudioBuffer,
        settings: &ExportSettings,
        destination: &Path,
    ) -> Result<(), AudioError> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir).await?;

        // Staged next to the destination so the final rename stays on one filesystem
        let staged = tempfile::Builder::new()
            .prefix(".dualang-")
            .suffix(&format!(".{}", settings.format.extension()))
            .tempfile_in(&dir)?;

        match settings.format.ffmpeg_codec_args(&settings.bitrate) {
            None => {
                audio.write_wav(std::fs::File::create(staged.path())?)?;
            }
            Some(codec_args) => {
                let pcm = tempfile::Builder::new()
                    .prefix("dualang-export-")
                    .suffix(".wav")
                    .tempfile()?;
                audio.write_wav(std::fs::File::create(pcm.path())?)?;

                let mut args = vec![
                    "-y".to_string(),
                    "-v".to_string(),
                    "error".to_string(),
                    "-i".to_string(),
                    pcm.path().to_string_lossy().into_owned(),
                ];
                args.extend(codec_args);
                args.push(staged.path().to_string_lossy().into_owned());
                self.run_tool("ffmpeg", &args, self.timeout).await?;
            }
        }

        staged
            .persist(destination)
            .map_err(|e| AudioError::Io(e.error))?;
        Ok(())
    }
}

/// Parse `ffprobe -print_format json -show_streams -select_streams a` output
pub fn parse_probe_output(stdout: &str) -> Result<Vec<TrackMetadata>, AudioError> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let json: Value = serde_json::from_str(stdout)
        .map_err(|e| AudioError::Decode(format!("Failed to parse ffprobe JSON output: {}", e)))?;

    let Some(streams) = json.get("streams").and_then(|s| s.as_array()) else {
        return Ok(Vec::new());
    };

    let tracks = streams
        .iter()
        .filter(|stream| {
            stream
                .get("codec_type")
                .and_then(|v| v.as_str())
                .is_none_or(|kind| kind == "audio")
        })
        .enumerate()
        .map(|(index, stream)| {
            let tag = |name: &str| {
                stream
                    .get("tags")
                    .and_then(|t| t.get(name))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            };
            TrackMetadata {
                index,
                stream_index: stream
                    .get("index")
                    .and_then(|v| v.as_u64())
                    .map(|v| v as usize)
                    .unwrap_or(index),
                codec: stream
                    .get("codec_name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string(),
                language: tag("language"),
                title: tag("title"),
            }
        })
        .collect();

    Ok(tracks)
}

/// Keep only meaningful ffmpeg stderr lines, dropping the banner and stream dump
fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "ffplay version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Stream #",
        "Output #",
        "Stream mapping:",
        "Press [q]",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .filter(|line| !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE: &str = r#"{
        "streams": [
            {"index": 1, "codec_name": "aac", "codec_type": "audio", "tags": {"language": "jpn", "title": "Main"}},
            {"index": 2, "codec_name": "ac3", "codec_type": "audio"},
            {"index": 3, "codec_name": "opus", "codec_type": "audio", "tags": {"language": "eng"}}
        ]
    }"#;

    #[test]
    fn test_parse_probe_output_withThreeTracks_shouldKeepProbeOrder() {
        let tracks = parse_probe_output(PROBE).unwrap();
        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks[0].index, 0);
        assert_eq!(tracks[0].stream_index, 1);
        assert_eq!(tracks[0].language.as_deref(), Some("jpn"));
        assert_eq!(tracks[0].title.as_deref(), Some("Main"));
        assert_eq!(tracks[1].codec, "ac3");
        assert_eq!(tracks[2].index, 2);
    }

    #[test]
    fn test_track_label_withMissingLanguage_shouldSayUnknown() {
        let tracks = parse_probe_output(PROBE).unwrap();
        assert_eq!(tracks[1].display_label(), "unknown (codec: ac3)");
        assert_eq!(tracks[2].display_label(), "eng (codec: opus)");
    }

    #[test]
    fn test_parse_probe_output_withEmptyOrInvalid_shouldHandleBoth() {
        assert!(parse_probe_output("").unwrap().is_empty());
        assert!(parse_probe_output("{}").unwrap().is_empty());
        assert!(parse_probe_output("not json").is_err());
    }

    #[test]
    fn test_filter_ffmpeg_stderr_withBanner_shouldKeepErrorLines() {
        let stderr = "ffmpeg version 6.0\n  built with gcc\n  libavutil 58\nInput #0, matroska\n[in] Invalid data found\n";
        assert_eq!(filter_ffmpeg_stderr(stderr), "[in] Invalid data found");
        assert!(filter_ffmpeg_stderr("").starts_with("unknown"));
    }
}
