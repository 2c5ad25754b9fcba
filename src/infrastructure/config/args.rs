use super::app_config::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "pixcache",
    version,
    about = "Fetch, cache and downsample images",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Disk cache directory.
    #[arg(long, value_name = "DIR", env = "PIXCACHE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory `content://` references resolve against.
    #[arg(long, value_name = "DIR")]
    pub content_root: Option<PathBuf>,

    /// Target size of the larger image side.
    #[arg(short, long)]
    pub size: Option<u32>,

    /// Maximum concurrent loads.
    #[arg(long)]
    pub pool_size: Option<usize>,

    /// Action to run.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI actions.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load images through the cache and report what each target shows.
    Fetch {
        /// Image identifiers: URLs, `content://` or `file://` references.
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete every file in the disk cache.
    Clear,
}
