//! Clipstream
//!
//! Clips `[start, end)` windows out of remote videos without downloading the
//! whole source. A request is accepted synchronously, then runs as a
//! supervised background task: stream URLs are resolved, each window is cut
//! by the transcoder, clips are optionally merged, and progress is streamed
//! to one observer per task through the [`registry::TaskRegistry`].

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod ports;
pub mod registry;
pub mod utils;

// Re-export commonly used types
pub use adapters::ClipperConfig;
pub use app::{AppContainer, DefaultAppContainer, SubmitInteractor};
pub use domain::errors::DomainError;
pub use domain::model::{
    ClipMode, ClipRequest, Interval, IntervalPolicy, OutputFormat, ProgressEvent, Quality, TaskId,
    TaskOutcome, TaskState, TimeSpec,
};
pub use error::{ClipperError, ClipperResult, RegistryError};
