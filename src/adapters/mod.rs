// Adapters - External system implementations

pub mod tokio_process;
pub mod toml_config;

// Re-export adapters
pub use tokio_process::TokioProcessAdapter;
pub use toml_config::ClipperConfig;
