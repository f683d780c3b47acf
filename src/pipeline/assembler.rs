/*!
 * Bilingual block assembly.
 *
 * A block for one cue is laid out as
 *
 * ```text
 * (segment + gap) x target_repeat
 * (translated + gap) x translation_repeat
 * segment
 * ```
 *
 * where `segment` is the cue's slice of the source track and `gap` is
 * `interval_ms` of silence.
 */

use log::debug;

use crate::app_config::DrillConfig;
use crate::audio::AudioBuffer;
use crate::errors::AudioError;
use crate::subtitle_processor::Cue;

/// Repetition counts and gap length shared by every block of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatTemplate {
    pub target_repeat: usize,
    pub translation_repeat: usize,
    pub interval_ms: u64,
}

impl RepeatTemplate {
    pub fn new(target_repeat: usize, translation_repeat: usize, interval_ms: u64) -> Self {
        Self {
            target_repeat,
            translation_repeat,
            interval_ms,
        }
    }

    pub fn from_config(drill: &DrillConfig) -> Self {
        Self::new(drill.target_repeat, drill.translation_repeat, drill.interval_ms)
    }

    /// Block length for a source slice and translated speech of the given
    /// lengths. A zero-length slice contributes nothing, gaps included.
    pub fn block_duration_ms(&self, source_ms: u64, translated_ms: u64) -> u64 {
        let source_part = if source_ms == 0 {
            0
        } else {
            self.target_repeat as u64 * (source_ms + self.interval_ms) + source_ms
        };
        source_part + self.translation_repeat as u64 * (translated_ms + self.interval_ms)
    }
}

impl Default for RepeatTemplate {
    fn default() -> Self {
        Self::from_config(&DrillConfig::default())
    }
}

/// One cue's finished block
#[derive(Debug, Clone)]
pub struct AssembledBlock {
    pub audio: AudioBuffer,
    /// Length of the source slice that went into the block, after clamping
    pub source_ms: u64,
}

impl AssembledBlock {
    /// Whether any original audio made it into the block
    pub fn has_source(&self) -> bool {
        self.source_ms > 0
    }
}

/// Assemble the block for `cue`.
///
/// The slice is clamped to `source`. When clamping leaves nothing, the
/// whole source contribution is skipped and only the translated part is
/// emitted. `translated` is used as given, even when empty.
pub fn assemble(
    cue: &Cue,
    source: &AudioBuffer,
    translated: &AudioBuffer,
    template: &RepeatTemplate,
) -> Result<AssembledBlock, AudioError> {
    let segment = source.slice(cue.start_ms, cue.end_ms);
    let source_ms = segment.duration_ms();

    if segment.is_empty() {
        debug!(
            "Cue {} {} has no source audio within the {} ms track, keeping translated speech only",
            cue.index,
            cue,
            source.duration_ms()
        );
    } else if cue.end_ms > source.duration_ms() {
        debug!(
            "Cue {} ends at {} ms, clamped to track end {} ms",
            cue.index,
            cue.end_ms,
            source.duration_ms()
        );
    }

    let mut block = AudioBuffer::empty(source.sample_rate(), source.channels());

    if !segment.is_empty() {
        for _ in 0..template.target_repeat {
            block.append(&segment)?;
            block.append_silence(template.interval_ms);
        }
    }

    for _ in 0..template.translation_repeat {
        block.append(translated)?;
        block.append_silence(template.interval_ms);
    }

    if !segment.is_empty() {
        block.append(&segment)?;
    }

    Ok(AssembledBlock {
        audio: block,
        source_ms,
    })
}
