// Domain errors - Error types for the domain layer

use std::fmt;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// Time text does not match a supported format
    InvalidFormat(String),
    /// End is not after start
    InvalidTimeRange(String),
    /// Interval longer than the configured maximum
    DurationExceeded { seconds: u64, max_seconds: u64 },
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::InvalidFormat(msg) => write!(f, "Invalid time format: {}", msg),
            DomainError::InvalidTimeRange(msg) => write!(f, "Invalid time range: {}", msg),
            DomainError::DurationExceeded {
                seconds,
                max_seconds,
            } => write!(
                f,
                "Duration of {}s exceeds the maximum of {}s",
                seconds, max_seconds
            ),
        }
    }
}

impl std::error::Error for DomainError {}
