//! Dispatches identifiers to the matching raw source.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{StreamExt, future, stream};
use tracing::trace;

use crate::domain::entities::{ImageId, ResourceKind};
use crate::domain::errors::{EngineError, FetchError};
use crate::domain::ports::{BlobProviderPort, ByteStream, RawFetchPort};

use super::{FetchTimeouts, HttpSource, LocalSource};

/// Default [`RawFetchPort`]: one handler per [`ResourceKind`].
pub struct SourceRouter {
    http: HttpSource,
    local: LocalSource,
    blobs: Option<Arc<dyn BlobProviderPort>>,
}

impl SourceRouter {
    /// Creates a router with an HTTP client bound to `timeouts`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(
        timeouts: FetchTimeouts,
        content_root: Option<PathBuf>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            http: HttpSource::new(timeouts)?,
            local: LocalSource::new(content_root),
            blobs: None,
        })
    }

    /// Registers the host's lookup for numeric identifiers.
    #[must_use]
    pub fn with_blob_provider(mut self, provider: Arc<dyn BlobProviderPort>) -> Self {
        self.blobs = Some(provider);
        self
    }

    async fn fetch_blob(&self, id: &ImageId) -> Result<ByteStream, FetchError> {
        let Some(provider) = &self.blobs else {
            return Err(FetchError::provider("no blob provider registered"));
        };

        match provider.blob(id.as_str()).await? {
            Some(bytes) if !bytes.is_empty() => Ok(stream::once(future::ready(Ok(bytes))).boxed()),
            _ => Err(FetchError::not_found(id.as_str())),
        }
    }
}

impl std::fmt::Debug for SourceRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRouter")
            .field("local", &self.local)
            .field("has_blob_provider", &self.blobs.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RawFetchPort for SourceRouter {
    async fn fetch(&self, id: &ImageId) -> Result<ByteStream, FetchError> {
        let kind = id.kind();
        trace!(id = %id, kind = %kind, "Resolving raw source");
        match kind {
            ResourceKind::ProviderBlob => self.fetch_blob(id).await,
            ResourceKind::LocalStream => self.local.open(id.as_str()).await,
            ResourceKind::RemoteHttp => self.http.open(id.as_str()).await,
        }
    }
}
