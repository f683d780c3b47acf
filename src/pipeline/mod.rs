/*!
 * The bilingual drill pipeline.
 *
 * Stages run strictly forward:
 * - `track_resolver`: pick and decode the source audio track
 * - `cue_selector`: window and filter the subtitle cues
 * - `speech_cache`: translate and synthesize each distinct text once
 * - `assembler`: build one repeat block per cue
 * - `concatenator`: join the blocks with transition markers
 * - `orchestrator`: run the stages for one invocation
 * - `sentences`: the same drill built from a sentence list instead of media
 */

pub mod assembler;
pub mod concatenator;
pub mod cue_selector;
pub mod orchestrator;
pub mod sentences;
pub mod speech_cache;
pub mod track_resolver;

pub use self::assembler::{AssembledBlock, RepeatTemplate};
pub use self::concatenator::TrackConcatenator;
pub use self::orchestrator::{BilingualPipeline, CancelFlag, PipelineOutput};
pub use self::speech_cache::{CacheStats, SpeechCache};
pub use self::track_resolver::{InteractiveSelector, PresetSelector, TrackSelector};
