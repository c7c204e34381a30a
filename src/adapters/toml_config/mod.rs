// TOML config adapter - Typed configuration from TOML/YAML files and the environment

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::model::IntervalPolicy;
use crate::error::{ClipperError, ClipperResult};
use crate::utils::logging::{LogFormat, LogLevel};

/// Files probed, in order, when no explicit config path is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["clipper.toml", "config/clipper.toml", "clipper.yaml"];

/// Runtime configuration of the clip pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipperConfig {
    pub output_dir: PathBuf,
    pub ytdlp_path: String,
    pub ffmpeg_path: String,
    pub cookies_file: Option<PathBuf>,
    pub max_duration_secs: u64,
    pub max_intervals: usize,
    pub min_output_bytes: u64,
    pub progress_threshold: f64,
    pub resolve_timeout_secs: u64,
    pub task_retention_secs: u64,
    pub stale_temp_secs: u64,
    pub max_concurrent_tasks: usize,
    pub log_level: String,
    pub log_format: String,
}

impl Default for ClipperConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            cookies_file: None,
            max_duration_secs: 600,
            max_intervals: 10,
            min_output_bytes: 1000,
            progress_threshold: 5.0,
            resolve_timeout_secs: 60,
            task_retention_secs: 300,
            stale_temp_secs: 3600,
            max_concurrent_tasks: num_cpus::get().max(1),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Accepts both a bare document and one nested under `[clipper]`
#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigDocument {
    Sectioned { clipper: ClipperConfig },
    Flat(ClipperConfig),
}

impl ClipperConfig {
    /// Load a file; YAML when the extension is `.yaml`/`.yml`, TOML otherwise
    pub fn from_file(path: &Path) -> ClipperResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ClipperError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );

        let document: ConfigDocument = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| ClipperError::Config {
                message: format!("Failed to parse YAML config {}: {}", path.display(), e),
            })?
        } else {
            toml::from_str(&content).map_err(|e| ClipperError::Config {
                message: format!("Failed to parse TOML config {}: {}", path.display(), e),
            })?
        };

        info!("Loaded configuration from: {}", path.display());
        Ok(match document {
            ConfigDocument::Sectioned { clipper } => clipper,
            ConfigDocument::Flat(config) => config,
        })
    }

    /// Explicit path, else the first existing default path, else defaults
    pub fn discover(explicit: Option<&Path>) -> ClipperResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        for candidate in DEFAULT_CONFIG_PATHS {
            let path = Path::new(candidate);
            if path.is_file() {
                return Self::from_file(path);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Apply `CLIPPER_*` overrides from the process environment
    pub fn apply_env(&mut self) -> ClipperResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `CLIPPER_*` overrides from an arbitrary lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> ClipperResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut overrides = 0;

        if let Some(value) = lookup("CLIPPER_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(value);
            overrides += 1;
        }
        if let Some(value) = lookup("CLIPPER_YTDLP_PATH") {
            self.ytdlp_path = value;
            overrides += 1;
        }
        if let Some(value) = lookup("CLIPPER_FFMPEG_PATH") {
            self.ffmpeg_path = value;
            overrides += 1;
        }
        if let Some(value) = lookup("CLIPPER_COOKIES_FILE") {
            self.cookies_file = (!value.is_empty()).then(|| PathBuf::from(value));
            overrides += 1;
        }
        if let Some(value) = lookup("CLIPPER_MAX_DURATION_SECS") {
            self.max_duration_secs = parse_number("CLIPPER_MAX_DURATION_SECS", &value)?;
            overrides += 1;
        }
        if let Some(value) = lookup("CLIPPER_MAX_INTERVALS") {
            self.max_intervals = parse_number("CLIPPER_MAX_INTERVALS", &value)?;
            overrides += 1;
        }
        if let Some(value) = lookup("CLIPPER_MIN_OUTPUT_BYTES") {
            self.min_output_bytes = parse_number("CLIPPER_MIN_OUTPUT_BYTES", &value)?;
            overrides += 1;
        }
        if let Some(value) = lookup("CLIPPER_LOG_LEVEL") {
            self.log_level = value;
            overrides += 1;
        }
        if let Some(value) = lookup("CLIPPER_LOG_FORMAT") {
            self.log_format = value;
            overrides += 1;
        }

        if overrides > 0 {
            info!("Applied {} environment variable overrides", overrides);
        }
        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> ClipperResult<()> {
        LogLevel::parse(&self.log_level)?;
        LogFormat::parse(&self.log_format)?;

        let invalid = |message: &str| {
            Err(ClipperError::Config {
                message: message.to_string(),
            })
        };

        if self.max_duration_secs == 0 {
            return invalid("max_duration_secs must be greater than 0");
        }
        if self.max_intervals == 0 {
            return invalid("max_intervals must be greater than 0");
        }
        if self.max_concurrent_tasks == 0 {
            return invalid("max_concurrent_tasks must be greater than 0");
        }
        if !self.progress_threshold.is_finite() || self.progress_threshold < 0.0 {
            return invalid("progress_threshold must be a non-negative number");
        }
        if self.ytdlp_path.trim().is_empty() || self.ffmpeg_path.trim().is_empty() {
            return invalid("engine paths must not be empty");
        }
        Ok(())
    }

    pub fn interval_policy(&self) -> IntervalPolicy {
        IntervalPolicy {
            max_duration_secs: self.max_duration_secs,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ClipperResult<T> {
    value.trim().parse().map_err(|_| ClipperError::Config {
        message: format!("{} must be a non-negative integer, got '{}'", key, value),
    })
}
