//! Image handling infrastructure.
//!
//! This module provides:
//! - Memory caching with byte-budgeted LRU eviction
//! - Content-addressed disk caching
//! - Fetching raw bytes into the disk cache
//! - Two-pass sampled decoding
//! - Target assignment tracking and the async load engine

pub mod assignment;
pub mod decoder;
pub mod fetcher;
pub mod file_cache;
pub mod loader;
pub mod memory_cache;

pub use assignment::{AssignmentTracker, TargetHandle};
pub use decoder::{SampledDecoder, sample_factor};
pub use fetcher::Fetcher;
pub use file_cache::{FileCache, default_cache_dir};
pub use loader::{LoadEngine, LoadEngineBuilder, LoadEngineConfig, LoadEvent, LoadOutcome};
pub use memory_cache::{CacheStats, MemoryImageCache};
