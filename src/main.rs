//! Clipper CLI
//!
//! Clips time windows out of remote videos. Stream URLs are resolved with
//! yt-dlp and only the requested windows are fetched and cut by ffmpeg.
//!
//! # Usage
//!
//! ```bash
//! clipper trim --url "https://youtu.be/..." --start 00:01:00 --end 00:02:30
//! clipper multi --url "https://youtu.be/..." --interval 00:00:10-00:00:20 --interval 01:00-01:30 --concat
//! clipper info --url "https://youtu.be/..."
//! clipper doctor
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use clipstream::app::{AppContainer, DefaultAppContainer};
use clipstream::cli::{commands, Cli, Commands};
use clipstream::utils::logging::{init_logging, LogFormat, LogLevel};

mod config_initialization;

/// Main entry point for the clipper CLI application
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let config = config_initialization::initialize_configuration_hierarchy(&cli)?;
    init_logging(
        LogLevel::parse(&config.log_level)?,
        LogFormat::parse(&config.log_format)?,
    );

    // Reject malformed requests before touching the filesystem
    let policy = config.interval_policy();
    let request = match &cli.command {
        Commands::Trim(args) => Some(commands::build_trim_request(args, &policy)?),
        Commands::Multi(args) => Some(commands::build_multi_request(args, &policy)?),
        Commands::Info(_) | Commands::Doctor => None,
    };

    let container = DefaultAppContainer::new(&config)?;
    let submit = container.submit_interactor();

    let succeeded = match request {
        Some(request) => {
            info!("Executing {:?} command", request.mode);
            submit.spawn_maintenance(std::time::Duration::from_secs(60));
            commands::run_request(&submit, request).await?
        }
        None => match &cli.command {
            Commands::Info(args) => commands::info(&submit, &args.url).await?,
            _ => commands::doctor(&submit).await?,
        },
    };

    submit.shutdown().await;
    Ok(succeeded)
}
