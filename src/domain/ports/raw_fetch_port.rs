//! Port definitions for raw byte sources.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::domain::entities::ImageId;
use crate::domain::errors::FetchError;

/// Stream of raw image bytes.
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// Port for opening the raw bytes behind an identifier.
#[async_trait]
pub trait RawFetchPort: Send + Sync {
    /// Opens a byte stream for the identifier.
    async fn fetch(&self, id: &ImageId) -> Result<ByteStream, FetchError>;
}

/// Port for the host's content-provider lookup of numeric keys.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobProviderPort: Send + Sync {
    /// Returns the stored blob for `key`, or `None` if no row matches.
    async fn blob(&self, key: &str) -> Result<Option<Bytes>, FetchError>;
}
