// Domain models - Core types and data structures

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Longest accepted time text, e.g. `01:02:03.456`
pub const MAX_TIME_TEXT_LEN: usize = 20;

/// Point in a timeline held as whole milliseconds so interval arithmetic is exact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSpec {
    millis: u64,
}

impl TimeSpec {
    /// Create a new TimeSpec from milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    /// Create a new TimeSpec from whole seconds
    pub fn from_seconds(seconds: u64) -> Self {
        Self {
            millis: seconds * 1000,
        }
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    /// Whole elapsed seconds; any fractional part is dropped
    pub fn to_seconds(&self) -> u64 {
        self.millis / 1000
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.millis as f64 / 1000.0
    }

    /// Parse `H:MM:SS[.frac]` / `HH:MM:SS[.frac]` or `M:SS[.frac]` / `MM:SS[.frac]`
    pub fn parse(text: &str) -> Result<Self, DomainError> {
        if text.is_empty() || text.len() > MAX_TIME_TEXT_LEN {
            return Err(DomainError::InvalidFormat(format!(
                "'{}' must be 1 to {} characters",
                text, MAX_TIME_TEXT_LEN
            )));
        }

        let parts: Vec<&str> = text.split(':').collect();
        let (hours, minutes, seconds_part) = match parts.as_slice() {
            [hours, minutes, seconds] => {
                let hours = parse_field(text, hours, 1, 2)?;
                let minutes = parse_field(text, minutes, 2, 2)?;
                if minutes >= 60 {
                    return Err(DomainError::InvalidFormat(format!(
                        "'{}': minutes must be less than 60",
                        text
                    )));
                }
                (hours, minutes, *seconds)
            }
            [minutes, seconds] => (0, parse_field(text, minutes, 1, 2)?, *seconds),
            _ => {
                return Err(DomainError::InvalidFormat(format!(
                    "'{}'. Supported formats: HH:MM:SS[.ms], MM:SS[.ms]",
                    text
                )))
            }
        };

        let (whole, fraction) = match seconds_part.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (seconds_part, None),
        };

        let seconds = parse_field(text, whole, 2, 2)?;
        if seconds >= 60 {
            return Err(DomainError::InvalidFormat(format!(
                "'{}': seconds must be less than 60",
                text
            )));
        }

        let millis = match fraction {
            Some(fraction) => parse_fraction_millis(text, fraction)?,
            None => 0,
        };

        Ok(Self {
            millis: ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis,
        })
    }

    /// Format as `HH:MM:SS.mmm`, the form handed to the transcoder
    pub fn format_hms(&self) -> String {
        let total_seconds = self.millis / 1000;
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            total_seconds / 3600,
            (total_seconds % 3600) / 60,
            total_seconds % 60,
            self.millis % 1000
        )
    }

    /// Format as seconds with millisecond precision, e.g. `90.000`
    pub fn format_seconds(&self) -> String {
        format!("{}.{:03}", self.millis / 1000, self.millis % 1000)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

fn parse_field(text: &str, field: &str, min_len: usize, max_len: usize) -> Result<u64, DomainError> {
    if field.len() < min_len || field.len() > max_len || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::InvalidFormat(format!(
            "'{}': expected {} digit field, got '{}'",
            text,
            if min_len == max_len {
                min_len.to_string()
            } else {
                format!("{}-{}", min_len, max_len)
            },
            field
        )));
    }

    field
        .parse::<u64>()
        .map_err(|_| DomainError::InvalidFormat(format!("'{}': invalid number '{}'", text, field)))
}

fn parse_fraction_millis(text: &str, fraction: &str) -> Result<u64, DomainError> {
    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::InvalidFormat(format!(
            "'{}': invalid fractional seconds '{}'",
            text, fraction
        )));
    }

    // Only millisecond precision is kept
    let mut millis = 0;
    for (position, digit) in fraction.bytes().take(3).enumerate() {
        millis += u64::from(digit - b'0') * 10u64.pow(2 - position as u32);
    }
    Ok(millis)
}

/// Policy inputs for interval validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPolicy {
    pub max_duration_secs: u64,
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self {
            max_duration_secs: 600,
        }
    }
}

/// Validated `[start, end)` window within the source media
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    start: TimeSpec,
    end: TimeSpec,
    start_text: String,
    end_text: String,
}

impl Interval {
    /// Create an interval from already parsed times
    pub fn new(start: TimeSpec, end: TimeSpec, policy: &IntervalPolicy) -> Result<Self, DomainError> {
        Self::build(start, end, start.format_hms(), end.format_hms(), policy)
    }

    /// Parse both bounds and validate the window against the policy
    pub fn parse(start: &str, end: &str, policy: &IntervalPolicy) -> Result<Self, DomainError> {
        let start_time = TimeSpec::parse(start)?;
        let end_time = TimeSpec::parse(end)?;
        Self::build(start_time, end_time, start.to_string(), end.to_string(), policy)
    }

    fn build(
        start: TimeSpec,
        end: TimeSpec,
        start_text: String,
        end_text: String,
        policy: &IntervalPolicy,
    ) -> Result<Self, DomainError> {
        if end <= start {
            return Err(DomainError::InvalidTimeRange(format!(
                "end ({}) must be after start ({})",
                end_text, start_text
            )));
        }

        let duration = end.as_millis() - start.as_millis();
        if duration > policy.max_duration_secs * 1000 {
            return Err(DomainError::DurationExceeded {
                seconds: duration.div_ceil(1000),
                max_seconds: policy.max_duration_secs,
            });
        }

        Ok(Self {
            start,
            end,
            start_text,
            end_text,
        })
    }

    pub fn start(&self) -> TimeSpec {
        self.start
    }

    pub fn end(&self) -> TimeSpec {
        self.end
    }

    /// Length of the window; exactly `end - start`
    pub fn duration(&self) -> TimeSpec {
        TimeSpec::from_millis(self.end.as_millis() - self.start.as_millis())
    }

    /// Original display form, e.g. `00:01:00 → 00:02:30`
    pub fn label(&self) -> String {
        format!("{} → {}", self.start_text, self.end_text)
    }
}

/// Output container of a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Mp4,
    Mp3,
}

impl OutputFormat {
    /// Parse output format from string
    pub fn parse(format_str: &str) -> Result<Self, DomainError> {
        match format_str.to_lowercase().as_str() {
            "mp4" => Ok(OutputFormat::Mp4),
            "mp3" => Ok(OutputFormat::Mp3),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid output format: {}. Valid formats: mp4, mp3",
                format_str
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Mp3 => "mp3",
        }
    }

    pub fn is_audio_only(&self) -> bool {
        matches!(self, OutputFormat::Mp3)
    }
}

/// Video height ceiling used when selecting the source track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    P360,
    P720,
    P1080,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::P360, Quality::P720, Quality::P1080];

    /// Parse quality from a height string such as `720` or `720p`
    pub fn parse(quality_str: &str) -> Result<Self, DomainError> {
        match quality_str.trim_end_matches(['p', 'P']) {
            "360" => Ok(Quality::P360),
            "720" => Ok(Quality::P720),
            "1080" => Ok(Quality::P1080),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid quality: {}. Valid qualities: 360, 720, 1080",
                quality_str
            ))),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Quality::P360 => 360,
            Quality::P720 => 720,
            Quality::P1080 => 1080,
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality::P720
    }
}

/// Quality ceiling plus audio/video mode for stream selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatConstraint {
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Single or multi interval execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipMode {
    Single,
    Multi,
}

/// Validated, policy-approved clip request
#[derive(Debug, Clone)]
pub struct ClipRequest {
    pub source_ref: String,
    pub mode: ClipMode,
    pub intervals: Vec<Interval>,
    pub output_format: OutputFormat,
    pub quality: Quality,
    pub base_filename: String,
    pub concatenate: bool,
}

impl ClipRequest {
    /// Request for one interval
    pub fn single(
        source_ref: impl Into<String>,
        interval: Interval,
        output_format: OutputFormat,
        quality: Quality,
        base_filename: impl Into<String>,
    ) -> Self {
        Self {
            source_ref: source_ref.into(),
            mode: ClipMode::Single,
            intervals: vec![interval],
            output_format,
            quality,
            base_filename: base_filename.into(),
            concatenate: false,
        }
    }

    /// Request for several intervals, optionally merged into one file
    pub fn multi(
        source_ref: impl Into<String>,
        intervals: Vec<Interval>,
        output_format: OutputFormat,
        quality: Quality,
        base_filename: impl Into<String>,
        concatenate: bool,
    ) -> Self {
        Self {
            source_ref: source_ref.into(),
            mode: ClipMode::Multi,
            intervals,
            output_format,
            quality,
            base_filename: base_filename.into(),
            concatenate,
        }
    }

    pub fn format_constraint(&self) -> FormatConstraint {
        FormatConstraint {
            format: self.output_format,
            quality: self.quality,
        }
    }
}

/// Opaque task identifier; the only handle an observer has
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Random tail of the identifier, used to disambiguate file names
    pub fn suffix(&self) -> &str {
        self.0.rsplit('_').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Starting,
    Downloading,
    Trimming,
    Cleaning,
    Complete,
    Error,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Complete | TaskState::Error)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Starting => "starting",
            TaskState::Downloading => "downloading",
            TaskState::Trimming => "trimming",
            TaskState::Cleaning => "cleaning",
            TaskState::Complete => "complete",
            TaskState::Error => "error",
        };
        f.write_str(name)
    }
}

/// One state/percentage/message update correlated to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub task_id: TaskId,
    pub state: TaskState,
    pub percent: u8,
    pub message: String,
    /// Representative file, only on `complete`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Every produced file in submission order, only on `complete`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl ProgressEvent {
    pub fn new(task_id: TaskId, state: TaskState, percent: u8, message: impl Into<String>) -> Self {
        Self {
            task_id,
            state,
            percent: percent.min(100),
            message: message.into(),
            filename: None,
            files: Vec::new(),
        }
    }

    /// Terminal success event naming the files ready for retrieval
    pub fn complete(task_id: TaskId, outcome: &TaskOutcome, message: impl Into<String>) -> Self {
        Self {
            task_id,
            state: TaskState::Complete,
            percent: 100,
            message: message.into(),
            filename: Some(outcome.primary.clone()),
            files: outcome.files.clone(),
        }
    }

    /// Terminal failure event; the registry raises the percentage to the last one emitted
    pub fn error(task_id: TaskId, message: impl Into<String>) -> Self {
        Self::new(task_id, TaskState::Error, 0, message)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Result set of a successful task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Merged file, the single clip, or the first part
    pub primary: String,
    /// Every retrievable file in submission order
    pub files: Vec<String>,
}

#[cfg(test)]
mod tests;
