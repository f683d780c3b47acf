use log::debug;

use crate::audio::AudioBuffer;
use crate::errors::AudioError;

/// Built-in transition chime used when no sound file is configured
pub fn default_marker(sample_rate: u32) -> AudioBuffer {
    AudioBuffer::tone(880.0, 150, sample_rate, 0.4)
}

/// Joins blocks in order with a marker after each one.
///
/// The running output starts mono, and every block is down-mixed to the
/// output's channel count before it is appended.
pub struct TrackConcatenator {
    output: AudioBuffer,
    marker: AudioBuffer,
    blocks: usize,
    markers: usize,
}

impl TrackConcatenator {
    pub fn new(marker: AudioBuffer, sample_rate: u32) -> Self {
        Self {
            output: AudioBuffer::empty(sample_rate, 1),
            marker,
            blocks: 0,
            markers: 0,
        }
    }

    /// Append one block and the marker that follows it
    pub fn push(&mut self, block: &AudioBuffer) -> Result<(), AudioError> {
        if block.channels() > self.output.channels() {
            debug!(
                "Down-mixing block {} from {} to {} channel(s)",
                self.blocks,
                block.channels(),
                self.output.channels()
            );
        }
        self.output.append(block)?;
        self.output.append(&self.marker)?;
        self.blocks += 1;
        self.markers += 1;
        Ok(())
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Markers inserted so far
    pub fn markers(&self) -> usize {
        self.markers
    }

    /// Current output length
    pub fn duration_ms(&self) -> u64 {
        self.output.duration_ms()
    }

    /// Finish the track, appending `full_track` once at the end when given
    pub fn finish(mut self, full_track: Option<&AudioBuffer>) -> Result<AudioBuffer, AudioError> {
        if let Some(track) = full_track {
            debug!("Appending full source track ({} ms)", track.duration_ms());
            self.output.append(track)?;
        }
        Ok(self.output)
    }
}

/// Join `blocks` with `marker` after each block, then the optional full track
pub fn concatenate(
    blocks: &[AudioBuffer],
    marker: &AudioBuffer,
    full_track: Option<&AudioBuffer>,
) -> Result<AudioBuffer, AudioError> {
    let mut concatenator = TrackConcatenator::new(marker.clone(), marker.sample_rate());
    for block in blocks {
        concatenator.push(block)?;
    }
    concatenator.finish(full_track)
}
