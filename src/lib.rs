//! pixcache - asynchronous image fetch-and-cache engine.
//!
//! Turns identifiers (URLs, numeric provider keys, local content references)
//! into decoded, downsampled images through a memory tier and a disk tier,
//! doing all fetch and decode work on a bounded worker pool and rendering
//! only onto targets that still want the result.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing caches, sources and the load engine.
pub mod infrastructure;
/// Presentation layer containing display targets.
pub mod presentation;

/// Current version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = "pixcache";
