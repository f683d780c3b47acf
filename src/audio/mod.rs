/*!
 * Audio model and audio tooling.
 *
 * - `buffer`: `AudioBuffer`, the in-memory PCM representation
 * - `media`: probing/decoding/playback/export through ffmpeg
 * - `export`: output format selection
 * - `mock`: in-memory backend for tests and dry runs
 */

pub mod buffer;
pub mod export;
pub mod media;
pub mod mock;

pub use self::buffer::AudioBuffer;
pub use self::export::{ExportFormat, ExportSettings};
pub use self::media::{FfmpegToolkit, MediaBackend, TrackMetadata};
