use std::fmt;
use std::fs;
use std::path::Path;
use regex::Regex;
use once_cell::sync::Lazy;
use log::{debug, info, warn};
use crate::errors::SubtitleError;

// @module: Timed subtitle loading

// @const: SRT/VTT timing line, hours optional for VTT
static CUE_TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*((?:\d+:)?\d{1,2}:\d{2}[,.]\d{1,3})\s*-->\s*((?:\d+:)?\d{1,2}:\d{2}[,.]\d{1,3})").unwrap()
});

// @const: ASS override blocks like {\i1} or {\pos(10,10)}
static ASS_OVERRIDE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").unwrap());

// @const: VTT/SRT inline markup like <i>, <c.yellow>, <00:01.000>
static MARKUP_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

// @struct: One timed subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    // @field: Position in the source file, 0-based
    pub index: usize,

    // @field: Start offset in ms
    pub start_ms: u64,

    // @field: End offset in ms
    pub end_ms: u64,

    // @field: Subtitle text
    pub text: String,
}

impl Cue {
    pub fn new(index: usize, start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Cue {
            index,
            start_ms,
            end_ms,
            text: text.into(),
        }
    }

    /// Length of the cue; zero when the timing is inverted
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Whether the timing violates `start < end`
    pub fn has_inverted_timing(&self) -> bool {
        self.start_ms >= self.end_ms
    }

    /// True when the text is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Format a timestamp in milliseconds as HH:MM:SS,mmm
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{} --> {}] {}",
            Self::format_timestamp(self.start_ms),
            Self::format_timestamp(self.end_ms),
            self.text.replace('\n', " / ")
        )
    }
}

/// Supported timed-caption formats, chosen once from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Ass,
    Vtt,
}

impl SubtitleFormat {
    /// Every extension the loader understands, in lookup preference order
    pub const EXTENSIONS: [&'static str; 3] = ["srt", "ass", "vtt"];

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SubtitleError> {
        let ext = path
            .as_ref()
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "srt" => Ok(Self::Srt),
            "ass" | "ssa" => Ok(Self::Ass),
            "vtt" => Ok(Self::Vtt),
            _ => Err(SubtitleError::UnsupportedFormat(ext)),
        }
    }

    /// Parse file content in this format
    pub fn parse(&self, content: &str) -> Result<Vec<Cue>, SubtitleError> {
        let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
        match self {
            Self::Srt => parse_srt(&content),
            Self::Ass => parse_ass(&content),
            Self::Vtt => parse_vtt(&content),
        }
    }
}

/// Load the ordered cue sequence from a subtitle file
pub fn load_subtitles<P: AsRef<Path>>(path: P) -> Result<Vec<Cue>, SubtitleError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(SubtitleError::NotFound(path.to_path_buf()));
    }

    let format = SubtitleFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    let cues = format.parse(&content)?;

    info!("Loaded subtitle file: {} lines", cues.len());
    if cues.is_empty() {
        return Err(SubtitleError::Empty(path.to_path_buf()));
    }

    let inverted = cues.iter().filter(|c| c.has_inverted_timing()).count();
    if inverted > 0 {
        warn!("{} cue(s) have an end time not after their start time", inverted);
    }

    Ok(cues)
}

/// Parse SRT content. Entries without a timing line are skipped.
pub fn parse_srt(content: &str) -> Result<Vec<Cue>, SubtitleError> {
    let mut cues = Vec::new();

    for (block_start, block) in blocks(content) {
        let timing_pos = block.iter().position(|line| CUE_TIMING_REGEX.is_match(line));
        let Some(timing_pos) = timing_pos else {
            warn!("Skipping SRT block at line {} without a timing line", block_start);
            continue;
        };

        let (start_ms, end_ms) = parse_timing_line(block[timing_pos], block_start + timing_pos)?;
        let text = block[timing_pos + 1..].join("\n");
        let text = MARKUP_TAG_REGEX.replace_all(&text, "").into_owned();

        cues.push(Cue::new(cues.len(), start_ms, end_ms, text));
    }

    Ok(cues)
}

/// Parse the `[Events]` section of an ASS/SSA script
pub fn parse_ass(content: &str) -> Result<Vec<Cue>, SubtitleError> {
    let mut cues = Vec::new();
    let mut in_events = false;
    let mut fields: Vec<String> = Vec::new();

    for (line_no, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.starts_with('[') {
            in_events = line.eq_ignore_ascii_case("[events]");
            continue;
        }
        if !in_events {
            continue;
        }

        if let Some(format) = line.strip_prefix("Format:") {
            fields = format.split(',').map(|f| f.trim().to_lowercase()).collect();
            continue;
        }

        let Some(dialogue) = line.strip_prefix("Dialogue:") else {
            continue;
        };
        if fields.is_empty() {
            return Err(SubtitleError::Parse {
                line: line_no + 1,
                message: "Dialogue line before Format line".to_string(),
            });
        }

        let column = |name: &str| fields.iter().position(|f| f == name);
        let (Some(start_col), Some(end_col), Some(text_col)) =
            (column("start"), column("end"), column("text"))
        else {
            return Err(SubtitleError::Parse {
                line: line_no + 1,
                message: "Format line lacks Start, End or Text".to_string(),
            });
        };

        // Text is the last column and may itself contain commas
        let values: Vec<&str> = dialogue.trim_start().splitn(fields.len(), ',').collect();
        if values.len() < fields.len() {
            warn!("Skipping short Dialogue line {}", line_no + 1);
            continue;
        }

        let start_ms = parse_ass_time(values[start_col].trim(), line_no + 1)?;
        let end_ms = parse_ass_time(values[end_col].trim(), line_no + 1)?;
        let text = ASS_OVERRIDE_REGEX.replace_all(values[text_col], "");
        let text = text.replace("\\N", "\n").replace("\\n", "\n").replace("\\h", " ");

        cues.push(Cue::new(cues.len(), start_ms, end_ms, text.trim().to_string()));
    }

    Ok(cues)
}

/// Parse WebVTT content, skipping NOTE, STYLE and REGION blocks
pub fn parse_vtt(content: &str) -> Result<Vec<Cue>, SubtitleError> {
    let first = content.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    if !first.trim_start().starts_with("WEBVTT") {
        return Err(SubtitleError::Parse {
            line: 1,
            message: "missing WEBVTT header".to_string(),
        });
    }

    let mut cues = Vec::new();
    for (block_start, block) in blocks(content) {
        let head = block[0].trim_start();
        if head.starts_with("WEBVTT") || head.starts_with("NOTE") || head.starts_with("STYLE") || head.starts_with("REGION") {
            continue;
        }

        let Some(timing_pos) = block.iter().position(|line| CUE_TIMING_REGEX.is_match(line)) else {
            debug!("Ignoring VTT block at line {}", block_start);
            continue;
        };

        let (start_ms, end_ms) = parse_timing_line(block[timing_pos], block_start + timing_pos)?;
        let text = block[timing_pos + 1..].join("\n");
        let text = MARKUP_TAG_REGEX.replace_all(&text, "");
        let text = text
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&nbsp;", " ");

        cues.push(Cue::new(cues.len(), start_ms, end_ms, text));
    }

    Ok(cues)
}

/// Split into blank-line separated blocks, paired with their 1-based start line
fn blocks(content: &str) -> Vec<(usize, Vec<&str>)> {
    let mut result = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start = 1;

    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                result.push((start, std::mem::take(&mut current)));
            }
            continue;
        }
        if current.is_empty() {
            start = i + 1;
        }
        current.push(line.trim_end());
    }
    if !current.is_empty() {
        result.push((start, current));
    }
    result
}

fn parse_timing_line(line: &str, line_no: usize) -> Result<(u64, u64), SubtitleError> {
    let caps = CUE_TIMING_REGEX.captures(line).ok_or_else(|| SubtitleError::Parse {
        line: line_no,
        message: format!("invalid timing line: {}", line),
    })?;
    let start = parse_timestamp(&caps[1]).ok_or_else(|| SubtitleError::Parse {
        line: line_no,
        message: format!("invalid start time: {}", &caps[1]),
    })?;
    let end = parse_timestamp(&caps[2]).ok_or_else(|| SubtitleError::Parse {
        line: line_no,
        message: format!("invalid end time: {}", &caps[2]),
    })?;
    Ok((start, end))
}

/// Parse `HH:MM:SS,mmm`, `HH:MM:SS.mmm` or `MM:SS.mmm` to milliseconds
pub fn parse_timestamp(timestamp: &str) -> Option<u64> {
    let (clock, fraction) = timestamp.trim().rsplit_once([',', '.'])?;
    let parts: Vec<u64> = clock
        .split(':')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return None,
    };
    if minutes >= 60 || seconds >= 60 || fraction.is_empty() || fraction.len() > 3 {
        return None;
    }

    // "5" after the separator means 500 ms
    let millis: u64 = format!("{:0<3}", fraction).parse().ok()?;
    Some(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
}

/// ASS times are `H:MM:SS.cc` (centiseconds)
fn parse_ass_time(value: &str, line_no: usize) -> Result<u64, SubtitleError> {
    parse_timestamp(value).ok_or_else(|| SubtitleError::Parse {
        line: line_no,
        message: format!("invalid ASS time: {}", value),
    })
}
