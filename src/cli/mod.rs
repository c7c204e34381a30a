//! CLI module for the `clipper` binary
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// Clip time windows out of remote videos
///
/// Progress events are printed to stdout as JSON lines; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "clipper")]
#[command(about = "Clip time windows out of remote videos without downloading the full source")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (TOML or YAML)
    #[arg(long, global = true, env = "CLIPPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for produced files
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_log: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clip one time window
    Trim(args::TrimArgs),
    /// Clip several time windows, optionally merged into one file
    Multi(args::MultiArgs),
    /// Show title, duration and available formats of a source
    Info(args::InfoArgs),
    /// Check that the external engines are installed
    Doctor,
}
