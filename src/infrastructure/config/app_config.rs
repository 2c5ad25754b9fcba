//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::args::CliArgs;
use crate::infrastructure::fetch::{DEFAULT_TIMEOUT_SECS, FetchTimeouts};
use crate::infrastructure::image::LoadEngineConfig;
use crate::infrastructure::image::decoder::DEFAULT_DECODE_ALLOC_LIMIT;
use crate::infrastructure::image::loader::{DEFAULT_MAX_DIMENSION, DEFAULT_POOL_SIZE};
use crate::infrastructure::image::memory_cache::DEFAULT_MEMORY_LIMIT;

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Engine configuration, read from `config.toml` and overridden by CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Maximum concurrent loads.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Connect timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Read timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Decode size for targets without a measured size.
    #[serde(default = "default_max_dimension")]
    pub default_max_dimension: u32,

    /// Byte budget of the in-memory tier.
    #[serde(default = "default_memory_limit")]
    pub memory_limit_bytes: usize,

    /// Allocation cap for decoding a single image.
    #[serde(default = "default_decode_alloc_limit")]
    pub decode_alloc_limit_bytes: u64,

    /// Disk cache directory. Defaults to the platform cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Directory `content://` references resolve against.
    #[serde(default)]
    pub content_root: Option<PathBuf>,
}

const fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

const fn default_memory_limit() -> usize {
    DEFAULT_MEMORY_LIMIT
}

const fn default_decode_alloc_limit() -> u64 {
    DEFAULT_DECODE_ALLOC_LIMIT
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: LogLevel::default(),
            pool_size: default_pool_size(),
            connect_timeout_secs: default_timeout_secs(),
            read_timeout_secs: default_timeout_secs(),
            default_max_dimension: default_max_dimension(),
            memory_limit_bytes: default_memory_limit(),
            decode_alloc_limit_bytes: default_decode_alloc_limit(),
            cache_dir: None,
            content_root: None,
        }
    }
}

impl EngineConfig {
    /// Applies CLI overrides on top of the file configuration.
    pub fn merge_args(&mut self, args: &CliArgs) {
        if let Some(path) = &args.log_path {
            self.log_path = Some(path.clone());
        }
        if let Some(level) = args.log_level {
            self.log_level = level;
        }
        if let Some(dir) = &args.cache_dir {
            self.cache_dir = Some(dir.clone());
        }
        if let Some(root) = &args.content_root {
            self.content_root = Some(root.clone());
        }
        if let Some(size) = args.size {
            self.default_max_dimension = size;
        }
        if let Some(pool_size) = args.pool_size {
            self.pool_size = pool_size;
        }
    }

    /// Timeouts for raw fetches.
    #[must_use]
    pub const fn fetch_timeouts(&self) -> FetchTimeouts {
        FetchTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            read: Duration::from_secs(self.read_timeout_secs),
        }
    }

    /// Settings for [`crate::infrastructure::LoadEngine`].
    #[must_use]
    pub const fn engine_config(&self) -> LoadEngineConfig {
        LoadEngineConfig {
            pool_size: self.pool_size,
            default_max_dimension: self.default_max_dimension,
            memory_limit_bytes: self.memory_limit_bytes,
            decode_alloc_limit_bytes: self.decode_alloc_limit_bytes,
            timeouts: self.fetch_timeouts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let config = EngineConfig::default();
        let engine = config.engine_config();
        assert_eq!(engine.pool_size, 5);
        assert_eq!(engine.default_max_dimension, 70);
        assert_eq!(engine.timeouts, FetchTimeouts::default());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str("pool_size = 2\nlog_level = \"debug\"\n").unwrap();
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.read_timeout_secs, 30);
        assert_eq!(config.cache_dir, None);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EngineConfig {
            cache_dir: Some(PathBuf::from("/tmp/pixcache")),
            ..EngineConfig::default()
        };
        let text = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_args_override_file() {
        let mut config = EngineConfig::default();
        let args = CliArgs::parse_from([
            "pixcache",
            "--size",
            "128",
            "--pool-size",
            "3",
            "--log-level",
            "warn",
            "fetch",
            "https://x/a.png",
        ]);

        config.merge_args(&args);

        assert_eq!(config.default_max_dimension, 128);
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.log_level, LogLevel::Warn);
    }
}
