//! Error handling module for the clip pipeline

use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::utils::truncate_chars;

/// Longest diagnostic prefix that may reach a user-visible message
pub const USER_DIAGNOSTIC_CHARS: usize = 200;
/// Longest user-visible error message
pub const USER_MESSAGE_CHARS: usize = 300;
/// Longest diagnostic prefix kept on an engine failure
pub const LOG_DIAGNOSTIC_CHARS: usize = 500;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum ClipperError {
    /// Resolution engine produced no usable URL for a required track
    #[error("Failed to get {track} stream URL: {detail}")]
    Resolution { track: String, detail: String },

    /// Transcoding or concat engine exited unsuccessfully
    #[error("{stage} failed (exit code {})", exit_label(.code))]
    EngineFailure {
        stage: String,
        code: Option<i32>,
        diagnostics: String,
    },

    /// Output missing or implausibly small
    #[error("Verification failed: {message}")]
    Verification { message: String },

    /// External process did not finish in time
    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    /// External process could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Registry contract violation
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Invalid configuration value or file
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Request or interval validation error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected failure inside a task, such as a panic
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ClipperError {
    /// Re-label an engine failure with the pipeline stage it happened in
    pub fn with_stage(self, stage: impl Into<String>) -> Self {
        match self {
            ClipperError::EngineFailure {
                code, diagnostics, ..
            } => ClipperError::EngineFailure {
                stage: stage.into(),
                code,
                diagnostics,
            },
            other => other,
        }
    }

    /// Bounded, human-readable text for the terminal error event.
    ///
    /// Engine diagnostics may contain absolute paths or signed stream URLs,
    /// so only a short prefix of resolver output is ever included and
    /// transcoder diagnostics are left out entirely.
    pub fn user_message(&self) -> String {
        let message = match self {
            ClipperError::Resolution { track, detail } => {
                let detail = truncate_chars(detail.trim(), USER_DIAGNOSTIC_CHARS);
                if detail.is_empty() {
                    format!("Failed to get {} stream URL", track)
                } else {
                    format!("Failed to get {} stream URL: {}", track, detail)
                }
            }
            ClipperError::Spawn { program, .. } => format!("Failed to start {}", program),
            ClipperError::Io(_) => "File system error while processing the clip".to_string(),
            other => other.to_string(),
        };

        format!("Error: {}", truncate_chars(&message, USER_MESSAGE_CHARS))
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

/// Task registry contract violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("task already registered: {0}")]
    DuplicateTask(String),

    #[error("task {0} already reached a terminal state")]
    PublishAfterTerminal(String),
}

/// Result type alias for pipeline operations
pub type ClipperResult<T> = std::result::Result<T, ClipperError>;
