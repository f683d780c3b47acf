/*!
 * In-memory PCM audio.
 *
 * `AudioBuffer` holds interleaved signed 16-bit samples together with the
 * channel count and sample rate. Every operation that changes the content
 * produces or extends an owned buffer; nothing is shared between stages.
 */

use std::fmt;
use std::io::{Read, Seek, Write};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::errors::AudioError;

/// Decoded PCM audio with a known layout
#[derive(Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    /// Interleaved samples, `frames * channels` long
    samples: Vec<i16>,
    /// Number of interleaved channels (never 0)
    channels: u16,
    /// Frames per second
    sample_rate: u32,
}

impl AudioBuffer {
    /// Wrap raw interleaved samples. A trailing partial frame is dropped.
    pub fn new(mut samples: Vec<i16>, channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// A zero-length buffer with the given layout
    pub fn empty(sample_rate: u32, channels: u16) -> Self {
        Self::new(Vec::new(), channels, sample_rate)
    }

    /// Digital silence of the requested duration
    pub fn silent(duration_ms: u64, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let frames = frames_for_ms(duration_ms, sample_rate);
        Self::new(vec![0; frames * channels as usize], channels, sample_rate)
    }

    /// A mono sine tone with 5 ms linear fades at both ends
    pub fn tone(frequency_hz: f32, duration_ms: u64, sample_rate: u32, amplitude: f32) -> Self {
        let frames = frames_for_ms(duration_ms, sample_rate);
        let fade = frames_for_ms(5, sample_rate).min(frames / 2).max(1);
        let peak = amplitude.clamp(0.0, 1.0) * i16::MAX as f32;
        let step = 2.0 * std::f32::consts::PI * frequency_hz / sample_rate.max(1) as f32;

        let samples = (0..frames)
            .map(|n| {
                let envelope = if n < fade {
                    n as f32 / fade as f32
                } else if frames - n <= fade {
                    (frames - n) as f32 / fade as f32
                } else {
                    1.0
                };
                ((n as f32 * step).sin() * peak * envelope) as i16
            })
            .collect();

        Self::new(samples, 1, sample_rate)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Number of sample frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in milliseconds, rounded to nearest
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        let rate = self.sample_rate as u128;
        ((self.frames() as u128 * 1000 + rate / 2) / rate) as u64
    }

    /// Copy out `[start_ms, end_ms)`.
    ///
    /// Both bounds are clamped to the buffer length. A range that is empty
    /// after clamping yields an empty buffer with the same layout.
    pub fn slice(&self, start_ms: u64, end_ms: u64) -> AudioBuffer {
        let start = frames_for_ms(start_ms, self.sample_rate).min(self.frames());
        let end = frames_for_ms(end_ms, self.sample_rate).min(self.frames());
        if start >= end {
            return Self::empty(self.sample_rate, self.channels);
        }
        let ch = self.channels as usize;
        Self {
            samples: self.samples[start * ch..end * ch].to_vec(),
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    /// The first `duration_ms` of the buffer
    pub fn head(&self, duration_ms: u64) -> AudioBuffer {
        self.slice(0, duration_ms)
    }

    /// Reduce to `target` channels by averaging; never adds channels.
    ///
    /// For a mono target every input channel is averaged. Otherwise input
    /// channel `i` folds into output channel `i % target`.
    pub fn downmix(&self, target: u16) -> AudioBuffer {
        let target = target.max(1);
        if target >= self.channels {
            return self.clone();
        }

        let in_ch = self.channels as usize;
        let out_ch = target as usize;
        let mut samples = Vec::with_capacity(self.frames() * out_ch);

        for frame in self.samples.chunks_exact(in_ch) {
            for out in 0..out_ch {
                let (sum, count) = frame
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| i % out_ch == out)
                    .fold((0i32, 0i32), |(s, c), (_, &v)| (s + v as i32, c + 1));
                samples.push((sum / count.max(1)) as i16);
            }
        }

        Self {
            samples,
            channels: target,
            sample_rate: self.sample_rate,
        }
    }

    pub fn to_mono(&self) -> AudioBuffer {
        self.downmix(1)
    }

    /// Append `other` to the end of this buffer.
    ///
    /// Layouts are reconciled by down-mixing whichever side has more
    /// channels, so the result always has the smaller channel count of the
    /// two. Sample rates must match unless `other` is empty.
    pub fn append(&mut self, other: &AudioBuffer) -> Result<(), AudioError> {
        if other.is_empty() {
            return Ok(());
        }
        if other.sample_rate != self.sample_rate {
            return Err(AudioError::SampleRateMismatch {
                expected: self.sample_rate,
                found: other.sample_rate,
            });
        }

        if self.channels > other.channels {
            *self = self.downmix(other.channels);
        }

        if other.channels > self.channels {
            let mixed = other.downmix(self.channels);
            self.samples.extend_from_slice(&mixed.samples);
        } else {
            self.samples.extend_from_slice(&other.samples);
        }
        Ok(())
    }

    /// This buffer played `count` times back to back
    pub fn repeated(&self, count: usize) -> AudioBuffer {
        Self {
            samples: self.samples.repeat(count),
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Append digital silence in this buffer's layout
    pub fn append_silence(&mut self, duration_ms: u64) {
        let frames = frames_for_ms(duration_ms, self.sample_rate);
        self.samples
            .resize(self.samples.len() + frames * self.channels as usize, 0);
    }

    /// Decode a WAV stream. Integer samples wider than 16 bits are scaled
    /// down, float samples are converted from the [-1, 1] range.
    pub fn from_wav<R: Read>(reader: R) -> Result<Self, AudioError> {
        let reader = WavReader::new(reader)?;
        let spec = reader.spec();

        let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 8) => reader
                .into_samples::<i8>()
                .map(|s| s.map(|v| (v as i16) << 8))
                .collect::<Result<_, _>>()?,
            (SampleFormat::Int, 16) => reader.into_samples::<i16>().collect::<Result<_, _>>()?,
            (SampleFormat::Int, bits @ 17..=32) => reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| (v >> (bits - 16)) as i16))
                .collect::<Result<_, _>>()?,
            (SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<Result<_, _>>()?,
            (format, bits) => {
                return Err(AudioError::Decode(format!(
                    "unsupported WAV sample format {:?} with {} bits",
                    format, bits
                )));
            }
        };

        Ok(Self::new(samples, spec.channels, spec.sample_rate))
    }

    /// Encode as 16-bit PCM WAV
    pub fn write_wav<W: Write + Seek>(&self, writer: W) -> Result<(), AudioError> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::new(writer, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("duration_ms", &self.duration_ms())
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Frame count covering `ms` at `sample_rate`, rounded to nearest
pub fn frames_for_ms(ms: u64, sample_rate: u32) -> usize {
    ((ms as u128 * sample_rate as u128 + 500) / 1000) as usize
}
