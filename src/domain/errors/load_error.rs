//! Image load error types.

use std::time::Duration;

use thiserror::Error;

/// Failure to obtain raw bytes for an identifier.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum FetchError {
    #[error("timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("connection failed: {message}")]
    Connection { message: String },

    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("no content found for {id}")]
    NotFound { id: String },

    #[error("content provider query failed: {message}")]
    Provider { message: String },

    #[error("invalid identifier {id}: {reason}")]
    InvalidIdentifier { id: String, reason: String },

    #[error("empty response body")]
    EmptyBody,

    #[error("cache file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Creates timeout error.
    #[must_use]
    pub const fn timeout(after: Duration) -> Self {
        Self::Timeout { after }
    }

    /// Creates connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates not-found error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates provider error.
    #[must_use]
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Creates invalid identifier error.
    #[must_use]
    pub fn invalid_identifier(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Returns whether the fetch ran out of time.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns whether the resource simply does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Status { status: 404 })
    }
}

impl FetchError {
    /// Classifies an HTTP client error. `connect` and `read` are the limits
    /// the client was built with and are reported when it timed out.
    #[must_use]
    pub fn from_http(e: &reqwest::Error, connect: Duration, read: Duration) -> Self {
        if e.is_timeout() {
            return Self::timeout(if e.is_connect() { connect } else { read });
        }
        match e.status() {
            Some(status) => Self::Status {
                status: status.as_u16(),
            },
            None => Self::connection(e.to_string()),
        }
    }
}

/// Failure to turn cached bytes into pixels.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum DecodeError {
    #[error("corrupt or unreadable image: {message}")]
    Corrupt { message: String },

    #[error("unsupported image format: {message}")]
    Unsupported { message: String },

    #[error("decode limits exceeded: {message}")]
    LimitsExceeded { message: String },

    #[error("failed to read cached file: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Creates corrupt image error.
    #[must_use]
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    /// Returns whether the cached bytes themselves are unusable.
    #[must_use]
    pub const fn is_bad_content(&self) -> bool {
        matches!(self, Self::Corrupt { .. } | Self::Unsupported { .. })
    }
}

impl From<image::ImageError> for DecodeError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::Unsupported(u) => Self::Unsupported {
                message: u.to_string(),
            },
            image::ImageError::Limits(l) => Self::LimitsExceeded {
                message: l.to_string(),
            },
            image::ImageError::IoError(io) => Self::Io(io),
            other => Self::corrupt(other.to_string()),
        }
    }
}

/// Any failure inside a load task.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum LoadError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("decode failed: {0}")]
    Decode(DecodeError),

    #[error("resource exhausted: {message}")]
    ResourceExhausted { message: String },
}

impl LoadError {
    /// Creates resource exhaustion error.
    #[must_use]
    pub fn exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            message: message.into(),
        }
    }

    /// Returns whether the failure calls for dropping cached memory.
    #[must_use]
    pub const fn is_resource_exhaustion(&self) -> bool {
        matches!(self, Self::ResourceExhausted { .. })
    }
}

impl From<DecodeError> for LoadError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::LimitsExceeded { message } => Self::ResourceExhausted { message },
            other => Self::Decode(other),
        }
    }
}

/// Failure to place a caller-supplied image in the file cache.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum StoreError {
    #[error("encode failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("encode task failed: {message}")]
    Task { message: String },

    #[error("cache file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// The main context stopped accepting tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("main context closed")]
pub struct MainContextClosed;

/// Errors raised while building the engine.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum EngineError {
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    #[error("failed to create HTTP client: {message}")]
    HttpClient { message: String },

    #[error("failed to prepare cache directory {}: {source}", .path.display())]
    CacheDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to determine cache directory")]
    CacheDirNotFound,
}
