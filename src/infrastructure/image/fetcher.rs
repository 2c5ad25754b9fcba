//! Ensures an identifier's raw bytes are present in the file cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::domain::entities::ImageId;
use crate::domain::errors::FetchError;
use crate::domain::ports::RawFetchPort;
use crate::infrastructure::fetch::FetchTimeouts;

use super::file_cache::FileCache;

/// Fills the [`FileCache`] from a [`RawFetchPort`].
#[derive(Clone)]
pub struct Fetcher {
    file_cache: FileCache,
    source: Arc<dyn RawFetchPort>,
    timeouts: FetchTimeouts,
}

impl Fetcher {
    /// Creates a fetcher writing into `file_cache`.
    #[must_use]
    pub fn new(
        file_cache: FileCache,
        source: Arc<dyn RawFetchPort>,
        timeouts: FetchTimeouts,
    ) -> Self {
        Self {
            file_cache,
            source,
            timeouts,
        }
    }

    /// Returns the file cache this fetcher fills.
    #[must_use]
    pub const fn file_cache(&self) -> &FileCache {
        &self.file_cache
    }

    /// Returns the path of the cached file for `id`, fetching it first if absent.
    ///
    /// An existing file is returned as is, without revalidation. A download is
    /// written to a staging file and renamed into place only once complete, so
    /// the cache path never holds a partial file.
    ///
    /// # Errors
    /// Returns error if the raw fetch fails, times out, yields no bytes, or
    /// the file cannot be written.
    pub async fn ensure_cached(&self, id: &ImageId) -> Result<PathBuf, FetchError> {
        let path = self.file_cache.path_for(id);
        if fs::metadata(&path).await.is_ok_and(|meta| meta.is_file()) {
            trace!(id = %id, path = %path.display(), "Disk cache hit");
            return Ok(path);
        }
        trace!(id = %id, "Disk cache miss");

        let staging = self.file_cache.staging_path_for(id);
        let result = match self.download(id, &staging).await {
            Ok(size) => fs::rename(&staging, &path)
                .await
                .map(|()| size)
                .map_err(FetchError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(size) => {
                debug!(id = %id, path = %path.display(), size, "Stored image in disk cache");
                Ok(path)
            }
            Err(e) => {
                discard_staging(&staging).await;
                Err(e)
            }
        }
    }

    async fn download(&self, id: &ImageId, staging: &Path) -> Result<u64, FetchError> {
        let mut stream = timeout(self.timeouts.open(), self.source.fetch(id))
            .await
            .map_err(|_| FetchError::timeout(self.timeouts.open()))??;

        let mut file = fs::File::create(staging).await?;
        let mut written = 0u64;

        loop {
            let next = timeout(self.timeouts.read, stream.next())
                .await
                .map_err(|_| FetchError::timeout(self.timeouts.read))?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        if written == 0 {
            return Err(FetchError::EmptyBody);
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("file_cache", &self.file_cache)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

async fn discard_staging(staging: &Path) {
    match fs::remove_file(staging).await {
        Ok(()) => trace!(path = %staging.display(), "Removed staging file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %staging.display(), error = %e, "Failed to remove staging file"),
    }
}
