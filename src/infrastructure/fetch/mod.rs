//! Raw byte sources behind identifiers.
//!
//! This module provides:
//! - HTTP downloads with connect/read timeouts
//! - Local content streams (`content://`, `file://`)
//! - Routing by identifier shape, including host blob providers

pub mod http;
pub mod local;
pub mod router;

use std::time::Duration;

pub use http::HttpSource;
pub use local::LocalSource;
pub use router::SourceRouter;

/// Default connect and read timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Timeouts applied to every raw fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTimeouts {
    /// Time allowed to establish a connection.
    pub connect: Duration,
    /// Time allowed between two reads.
    pub read: Duration,
}

impl FetchTimeouts {
    /// Upper bound for opening a stream: connecting plus waiting for the first response.
    #[must_use]
    pub fn open(&self) -> Duration {
        self.connect + self.read
    }
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            read: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}
