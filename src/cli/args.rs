//! Command-line argument definitions

use clap::Args;

/// Arguments for the trim command
#[derive(Args, Debug)]
pub struct TrimArgs {
    /// Source video URL
    #[arg(short, long)]
    pub url: String,

    /// Start time (HH:MM:SS[.ms] or MM:SS[.ms])
    #[arg(short, long)]
    pub start: String,

    /// End time (HH:MM:SS[.ms] or MM:SS[.ms])
    #[arg(short, long)]
    pub end: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for the multi command
#[derive(Args, Debug)]
pub struct MultiArgs {
    /// Source video URL
    #[arg(short, long)]
    pub url: String,

    /// Time window as START-END, e.g. 00:01:00-00:02:30; repeat in order
    #[arg(short, long = "interval", required = true)]
    pub intervals: Vec<String>,

    /// Merge all clips into one file
    #[arg(long)]
    pub concat: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Source video URL
    #[arg(short, long)]
    pub url: String,
}

/// Output options shared by trim and multi
#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Output format (mp4 or mp3)
    #[arg(short, long, default_value = "mp4")]
    pub format: String,

    /// Maximum video height (360, 720 or 1080)
    #[arg(short, long, default_value = "720")]
    pub quality: String,

    /// Base name of the produced files
    #[arg(short, long, default_value = "video-part")]
    pub name: String,
}
