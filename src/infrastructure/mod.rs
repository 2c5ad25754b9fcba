//! Infrastructure layer with caches, sources and the load engine.

/// Engine configuration.
pub mod config;
/// Main-context dispatch.
pub mod dispatch;
/// Raw byte sources.
pub mod fetch;
/// Image caching, decoding and loading.
pub mod image;

pub use config::{CliArgs, ConfigStore, EngineConfig, LogLevel};
pub use dispatch::{MainContextQueue, MainContextRunner, main_context};
pub use fetch::{FetchTimeouts, HttpSource, LocalSource, SourceRouter};
pub use self::image::{
    AssignmentTracker, CacheStats, FileCache, Fetcher, LoadEngine, LoadEngineBuilder,
    LoadEngineConfig, LoadEvent, LoadOutcome, MemoryImageCache, SampledDecoder,
};
