// Business rules - Progress policy, output naming and identifiers

use crate::domain::model::{ClipMode, ClipRequest, TaskId};

/// Fixed progress checkpoints of the pipeline
pub mod milestones {
    pub const ACCEPTED: u8 = 0;
    pub const RESOLVE_START: u8 = 5;
    pub const RESOLVE_VIDEO: u8 = 10;
    pub const RESOLVE_AUDIO: u8 = 20;
    pub const CLIP_START: u8 = 30;
    pub const CLIP_END: u8 = 90;
    pub const MULTI_CLIP_START: u8 = 10;
    pub const MERGE: u8 = 90;
    pub const VERIFY: u8 = 95;
    pub const COMPLETE: u8 = 100;
}

/// Sub-range of overall task progress that one clip invocation occupies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressBand {
    pub start: f64,
    pub end: f64,
}

impl ProgressBand {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Band of the only clip in a single-interval task
    pub fn single() -> Self {
        Self::new(
            f64::from(milestones::CLIP_START),
            f64::from(milestones::CLIP_END),
        )
    }

    /// Even share of the multi-interval band for interval `index` of `count`
    pub fn multi_slot(index: usize, count: usize) -> Self {
        let start = f64::from(milestones::MULTI_CLIP_START);
        let span = f64::from(milestones::CLIP_END - milestones::MULTI_CLIP_START);
        let count = count.max(1) as f64;
        let width = span / count;

        Self::new(start + width * index as f64, start + width * (index as f64 + 1.0))
    }

    /// Map a completion fraction onto the band, clamped to its bounds
    pub fn map(&self, fraction: f64) -> f64 {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.start + (self.end - self.start) * fraction
    }
}

/// Output of a single-interval task, or the merged output of a multi task
pub fn single_output_name(base: &str, extension: &str) -> String {
    format!("{}.{}", base, extension)
}

/// Retained part of an un-merged multi task; `part` counts from 1
pub fn part_output_name(base: &str, part: usize, extension: &str) -> String {
    format!("{}_part{}.{}", base, part, extension)
}

/// Intermediate part that is merged and discarded
pub fn intermediate_name(task_id: &TaskId, part: usize, extension: &str) -> String {
    format!("temp_{}_part{}.{}", task_id, part, extension)
}

/// Concat manifest of a task
pub fn manifest_name(task_id: &TaskId) -> String {
    format!("concat_{}.txt", task_id)
}

/// Every file a finished task hands to the caller, derived from its base name
pub fn delivered_output_names(request: &ClipRequest, base: &str) -> Vec<String> {
    let extension = request.output_format.extension();
    match request.mode {
        ClipMode::Multi if !request.concatenate => (1..=request.intervals.len())
            .map(|part| part_output_name(base, part, extension))
            .collect(),
        _ => vec![single_output_name(base, extension)],
    }
}

/// Whether a file name looks like an intermediate left behind by a task
pub fn is_intermediate_name(name: &str) -> bool {
    name.starts_with("temp_") && (name.ends_with(".mp4") || name.ends_with(".mp3"))
}

pub const DEFAULT_BASE_FILENAME: &str = "video-part";
const MAX_BASE_FILENAME_CHARS: usize = 50;

/// Reduce a caller-chosen base name to `[A-Za-z0-9_-]`, at most 50 characters
pub fn sanitize_filename(raw: &str) -> String {
    let sanitized: String = raw
        .chars()
        .take(100)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_BASE_FILENAME_CHARS)
        .collect();

    if sanitized.is_empty() {
        DEFAULT_BASE_FILENAME.to_string()
    } else {
        sanitized
    }
}

/// Unique task identifier: `task_<unixMillis>_<random>` or `multi_<unixMillis>_<random>`
pub fn generate_task_id(mode: ClipMode) -> TaskId {
    let prefix = match mode {
        ClipMode::Single => "task",
        ClipMode::Multi => "multi",
    };
    let random = uuid::Uuid::new_v4().simple().to_string();

    TaskId::new(format!(
        "{}_{}_{}",
        prefix,
        chrono::Utc::now().timestamp_millis(),
        &random[..9]
    ))
}

#[cfg(test)]
mod tests;
