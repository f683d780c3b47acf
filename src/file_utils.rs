use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::subtitle_processor::SubtitleFormat;

// @module: File and path utilities

/// Language infixes tried when looking for `<base>.<lang>.<ext>` subtitles
const SUBTITLE_LANGUAGE_INFIXES: [&str; 11] = [
    "ja", "en", "fr", "de", "es", "it", "nl", "pl", "pt", "ru", "zh",
];

/// Extensions decoded directly, without probing for embedded streams
const PLAIN_AUDIO_EXTENSIONS: [&str; 9] = [
    "mp3", "wav", "flac", "ogg", "oga", "opus", "m4a", "aac", "wma",
];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @expands: Leading `~` to the home directory
    pub fn expand_home<P: AsRef<Path>>(path: P) -> PathBuf {
        let path = path.as_ref();
        match (path.strip_prefix("~"), dirs::home_dir()) {
            (Ok(rest), Some(home)) => home.join(rest),
            _ => path.to_path_buf(),
        }
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @finds: Subtitle file next to the media
    // @params: media path, explicit subtitle path if the user gave one
    //
    // Tries `<base>.srt|.ass|.vtt` first, then `<base>.<lang>.<ext>` for the
    // common language infixes.
    pub fn find_subtitle_file<P: AsRef<Path>>(media: P, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        let media = media.as_ref();
        let base = media.with_extension("");
        let base = base.to_string_lossy();
        let base: &str = &base;

        let plain = SubtitleFormat::EXTENSIONS
            .iter()
            .map(|ext| PathBuf::from(format!("{}.{}", base, ext)));
        let with_language = SUBTITLE_LANGUAGE_INFIXES.iter().flat_map(|lang| {
            SubtitleFormat::EXTENSIONS
                .iter()
                .map(move |ext| PathBuf::from(format!("{}.{}.{}", base, lang, ext)))
        });

        plain
            .chain(with_language)
            .find(|candidate| Self::file_exists(candidate))
            .ok_or_else(|| anyhow!("Failed to find a subtitle file for {:?}", media))
    }

    // @generates: Output path for the drill
    // @params: input media, optional output argument, output extension
    //
    // No argument: `<input dir>/<stem>.<ext>`. A directory argument receives
    // `<stem>.<ext>`. A derived path equal to the input gets an `_out` suffix.
    pub fn output_path<P: AsRef<Path>>(input: P, output: Option<&Path>, extension: &str) -> PathBuf {
        let input = input.as_ref();
        let stem = input.file_stem().unwrap_or_default().to_string_lossy().to_string();
        let file_name = format!("{}.{}", stem, extension);

        let derived = match output {
            None => input.with_file_name(&file_name),
            Some(dir) if Self::dir_exists(dir) => dir.join(&file_name),
            Some(explicit) => return explicit.to_path_buf(),
        };

        if derived == input {
            derived.with_file_name(format!("{}_out.{}", stem, extension))
        } else {
            derived
        }
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        use anyhow::Context;
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Detect whether a media file is plain audio or a container to probe
    pub fn detect_media_kind<P: AsRef<Path>>(path: P) -> Result<MediaKind> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow!("File does not exist: {:?}", path));
        }

        Ok(MediaKind::from_path(path))
    }
}

/// How a source media file is turned into a working buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Single-stream audio file, decoded directly
    Audio,
    /// Video or multi-stream container, probed for audio tracks
    Container,
}

impl MediaKind {
    /// Classify by extension. Anything not known to be plain audio is
    /// treated as a container, since probing a single-stream file is harmless.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if PLAIN_AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Audio
        } else {
            MediaKind::Container
        }
    }
}
