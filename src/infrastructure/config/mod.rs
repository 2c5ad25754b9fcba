//! Engine configuration.

/// Engine settings and their defaults.
pub mod app_config;
/// Command line arguments.
pub mod args;
/// Config file location and persistence.
pub mod storage;

pub use app_config::{EngineConfig, LogLevel};
pub use args::{CliArgs, Command};
pub use storage::{ConfigError, ConfigStore};
