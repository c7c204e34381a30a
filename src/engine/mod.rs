//! External engine drivers: stream resolution, clipping and concatenation

use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::toml_config::ClipperConfig;

pub mod clipper;
pub mod concat;
pub mod progress;
pub mod resolver;

pub use clipper::ClipExecutor;
pub use concat::Concatenator;
pub use progress::{ProgressCoalescer, ProgressSampler, TimeMarkerSampler};
pub use resolver::{StreamResolver, StreamSource, VideoInfo};

/// Engine binaries and invocation policy
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Media resolution engine
    pub ytdlp_path: String,
    /// Transcoding engine
    pub ffmpeg_path: String,
    /// Cookie jar handed to the resolver
    pub cookies_file: Option<PathBuf>,
    /// Hard limit for one resolver call
    pub resolve_timeout: Duration,
    /// Minimum advance, in percentage points, before clip progress is re-emitted
    pub progress_threshold: f64,
}

impl EngineConfig {
    pub fn from_config(config: &ClipperConfig) -> Self {
        Self {
            ytdlp_path: config.ytdlp_path.clone(),
            ffmpeg_path: config.ffmpeg_path.clone(),
            cookies_file: config.cookies_file.clone(),
            resolve_timeout: Duration::from_secs(config.resolve_timeout_secs),
            progress_threshold: config.progress_threshold,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_config(&ClipperConfig::default())
    }
}
