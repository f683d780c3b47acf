use log::debug;

use crate::subtitle_processor::Cue;

/// Working cue list: skip `offset` cues, cap to `limit`, then drop cues
/// with blank text. Order is preserved and the input is never modified.
pub fn select(cues: &[Cue], offset: usize, limit: Option<usize>) -> Vec<&Cue> {
    let windowed = cues.iter().skip(offset).take(limit.unwrap_or(usize::MAX));

    let selected: Vec<&Cue> = windowed.filter(|cue| !cue.is_blank()).collect();
    debug!(
        "Selected {} of {} cues (offset {}, limit {:?})",
        selected.len(),
        cues.len(),
        offset,
        limit
    );
    selected
}
