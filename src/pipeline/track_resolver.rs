/*!
 * Audio track resolution.
 *
 * Plain audio files are decoded directly. Containers are probed; a single
 * audio stream is decoded without interaction, several streams go through
 * a `TrackSelector`. The interactive selector lists the tracks, offers an
 * audition of each and re-prompts until the answer is in range. Preset
 * selectors never prompt and fail on a choice that does not exist.
 */

use async_trait::async_trait;
use dialoguer::{Confirm, Input};
use log::{debug, info};
use std::path::Path;

use crate::audio::{AudioBuffer, MediaBackend, TrackMetadata};
use crate::errors::ResolveError;
use crate::file_utils::MediaKind;
use crate::language_utils;

/// Plays a bounded preview of one track
#[async_trait]
pub trait Audition: Send + Sync {
    async fn preview(&self, track: &TrackMetadata) -> Result<(), ResolveError>;
}

/// Chooses one of several probed tracks
#[async_trait]
pub trait TrackSelector: Send + Sync {
    /// Position of the chosen track within `tracks` (0-based)
    async fn select(&self, tracks: &[TrackMetadata], audition: &dyn Audition) -> Result<usize, ResolveError>;
}

/// Audition through the media backend: decode the first seconds, play them
pub struct MediaAudition<'a> {
    backend: &'a dyn MediaBackend,
    media: &'a Path,
    preview_ms: u64,
}

impl<'a> MediaAudition<'a> {
    pub fn new(backend: &'a dyn MediaBackend, media: &'a Path, preview_ms: u64) -> Self {
        Self {
            backend,
            media,
            preview_ms,
        }
    }
}

#[async_trait]
impl Audition for MediaAudition<'_> {
    async fn preview(&self, track: &TrackMetadata) -> Result<(), ResolveError> {
        let sample = self
            .backend
            .decode_track(self.media, track.index, Some(self.preview_ms))
            .await?;
        self.backend.play(&sample).await?;
        Ok(())
    }
}

/// Numbered track list, 1-based, in probe order
pub fn track_listing(tracks: &[TrackMetadata]) -> Vec<String> {
    tracks
        .iter()
        .enumerate()
        .map(|(i, track)| format!("{}: {}", i + 1, track.display_label()))
        .collect()
}

/// Parse a 1-based answer into a 0-based position
pub fn parse_track_choice(input: &str, count: usize) -> Result<usize, ResolveError> {
    let choice: usize = input
        .trim()
        .parse()
        .map_err(|_| ResolveError::Prompt(format!("'{}' is not a track number", input.trim())))?;
    if choice == 0 || choice > count {
        return Err(ResolveError::SelectionOutOfRange { choice, count });
    }
    Ok(choice - 1)
}

/// Terminal prompt selector
#[derive(Debug, Default, Clone)]
pub struct InteractiveSelector;

impl InteractiveSelector {
    fn ask_audition() -> Result<bool, ResolveError> {
        Confirm::new()
            .with_prompt("Do you want to listen to a sample of the audio tracks?")
            .default(false)
            .interact()
            .map_err(|e| ResolveError::Prompt(e.to_string()))
    }

    fn ask_choice(count: usize) -> Result<usize, ResolveError> {
        let answer: String = Input::new()
            .with_prompt("Please select an audio track")
            .validate_with(move |input: &String| -> Result<(), String> {
                parse_track_choice(input, count).map(|_| ()).map_err(|e| e.to_string())
            })
            .interact_text()
            .map_err(|e| ResolveError::Prompt(e.to_string()))?;
        parse_track_choice(&answer, count)
    }
}

async fn blocking_prompt<T, F>(prompt: F) -> Result<T, ResolveError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ResolveError> + Send + 'static,
{
    tokio::task::spawn_blocking(prompt)
        .await
        .map_err(|e| ResolveError::Prompt(e.to_string()))?
}

#[async_trait]
impl TrackSelector for InteractiveSelector {
    async fn select(&self, tracks: &[TrackMetadata], audition: &dyn Audition) -> Result<usize, ResolveError> {
        println!("The file has {} audio tracks.", tracks.len());
        for line in track_listing(tracks) {
            println!("{}", line);
        }

        if blocking_prompt(Self::ask_audition).await? {
            for (i, track) in tracks.iter().enumerate() {
                println!("Playing sample for track {}:", i + 1);
                audition.preview(track).await?;
            }
        }

        let count = tracks.len();
        blocking_prompt(move || Self::ask_choice(count)).await
    }
}

/// Non-interactive selection for automated runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetSelector {
    /// 1-based position in the probed list
    Index(usize),
    /// First track tagged with this language
    Language(String),
}

impl PresetSelector {
    /// A number selects by position, anything else by language
    pub fn parse(value: &str) -> Self {
        match value.trim().parse::<usize>() {
            Ok(index) => PresetSelector::Index(index),
            Err(_) => PresetSelector::Language(value.trim().to_string()),
        }
    }
}

#[async_trait]
impl TrackSelector for PresetSelector {
    async fn select(&self, tracks: &[TrackMetadata], _audition: &dyn Audition) -> Result<usize, ResolveError> {
        match self {
            PresetSelector::Index(choice) => parse_track_choice(&choice.to_string(), tracks.len()),
            PresetSelector::Language(code) => tracks
                .iter()
                .position(|track| {
                    track
                        .language
                        .as_deref()
                        .is_some_and(|tag| language_codes_match_tag(tag, code))
                })
                .ok_or_else(|| ResolveError::NoTrackForLanguage(code.clone())),
        }
    }
}

fn language_codes_match_tag(tag: &str, requested: &str) -> bool {
    tag.eq_ignore_ascii_case(requested) || language_utils::language_codes_match(tag, requested)
}

/// Decode the working audio track of `media`
pub async fn resolve(
    media: &Path,
    kind: MediaKind,
    backend: &dyn MediaBackend,
    selector: &dyn TrackSelector,
    preview_ms: u64,
) -> Result<AudioBuffer, ResolveError> {
    if kind == MediaKind::Audio {
        let audio = backend.decode_file(media).await?;
        info!("Loaded input audio ({} ms)", audio.duration_ms());
        return Ok(audio);
    }

    let tracks = backend.probe_audio_tracks(media).await?;
    let position = match tracks.len() {
        0 => return Err(ResolveError::NoAudioTracks(media.to_path_buf())),
        1 => 0,
        count => {
            let audition = MediaAudition::new(backend, media, preview_ms);
            let position = selector.select(&tracks, &audition).await?;
            if position >= count {
                return Err(ResolveError::SelectionOutOfRange {
                    choice: position + 1,
                    count,
                });
            }
            position
        }
    };

    let track = &tracks[position];
    debug!("Using audio track {}: {}", position + 1, track.display_label());
    let audio = backend.decode_track(media, track.index, None).await?;
    info!(
        "Loaded audio track {} from {:?} ({} ms)",
        position + 1,
        media,
        audio.duration_ms()
    );
    Ok(audio)
}
