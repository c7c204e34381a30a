//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};
use tracing::info;

use clipstream::adapters::ClipperConfig;
use clipstream::cli::Cli;

/// Build configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<ClipperConfig> {
    // Steps 1 and 2: defaults, then the first config file found
    let mut config = ClipperConfig::discover(cli.config.as_deref())
        .context("Failed to load configuration file")?;

    // Step 3: environment variables
    config
        .apply_env()
        .context("Invalid environment configuration")?;

    // Step 4: command-line flags
    let mut cli_overrides = 0;
    if let Some(output_dir) = &cli.output_dir {
        config.output_dir = output_dir.clone();
        cli_overrides += 1;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
        cli_overrides += 1;
    }
    if cli.json_log {
        config.log_format = "json".to_string();
        cli_overrides += 1;
    }

    config.validate().context("Invalid configuration")?;

    if cli_overrides > 0 {
        info!("Applied {} CLI configuration overrides", cli_overrides);
    }
    Ok(config)
}
