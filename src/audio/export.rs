/*!
 * Output container selection.
 */

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Container/codec the final drill is written as
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Mp3,
    Wav,
    Ogg,
    Flac,
}

impl ExportFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
        }
    }

    /// Resolve from a path's extension, if it names a known format
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_string_lossy().to_lowercase();
        ext.parse().ok()
    }

    /// Encoder arguments for ffmpeg; `None` for formats written natively
    pub fn ffmpeg_codec_args(&self, bitrate: &str) -> Option<Vec<String>> {
        let args: Vec<&str> = match self {
            Self::Wav => return None,
            Self::Mp3 => vec!["-c:a", "libmp3lame", "-b:a", bitrate, "-f", "mp3"],
            Self::Ogg => vec!["-c:a", "libvorbis", "-b:a", bitrate, "-f", "ogg"],
            Self::Flac => vec!["-c:a", "flac", "-f", "flac"],
        };
        Some(args.into_iter().map(String::from).collect())
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            "ogg" => Ok(Self::Ogg),
            "flac" => Ok(Self::Flac),
            _ => Err(anyhow::anyhow!("Unsupported output format: {}", s)),
        }
    }
}

/// Everything the export collaborator needs besides the audio itself
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub format: ExportFormat,
    /// ffmpeg bitrate string such as `192k`
    pub bitrate: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Mp3,
            bitrate: "192k".to_string(),
        }
    }
}
