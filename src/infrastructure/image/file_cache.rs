//! Content-addressed on-disk cache of raw image bytes.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::domain::entities::ImageId;
use crate::domain::errors::EngineError;

const CACHE_EXTENSION: &str = "img";
const STAGING_EXTENSION: &str = "part";

/// Maps identifiers to files under a single directory.
///
/// The filename is a digest of the identifier, so no index is kept: the
/// existence of the file is the index. Unbounded; use [`FileCache::clear`].
#[derive(Debug, Clone)]
pub struct FileCache {
    cache_dir: PathBuf,
}

impl FileCache {
    /// Creates a file cache rooted at `cache_dir`, creating it if needed.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub async fn new(cache_dir: PathBuf) -> Result<Self, EngineError> {
        fs::create_dir_all(&cache_dir)
            .await
            .map_err(|source| EngineError::CacheDir {
                path: cache_dir.clone(),
                source,
            })?;
        Ok(Self { cache_dir })
    }

    /// Creates a cache in the platform cache location (e.g. `~/.cache/pixcache/images/`).
    ///
    /// # Errors
    /// Returns error if the directory cannot be determined or created.
    pub async fn default_location() -> Result<Self, EngineError> {
        let dir = default_cache_dir().ok_or(EngineError::CacheDirNotFound)?;
        Self::new(dir).await
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path for a cached identifier. Pure; touches no files.
    #[must_use]
    pub fn path_for(&self, id: &ImageId) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{CACHE_EXTENSION}", id.digest()))
    }

    /// Returns a fresh, unique path to stage a download of `id` before it is
    /// renamed onto [`FileCache::path_for`].
    #[must_use]
    pub fn staging_path_for(&self, id: &ImageId) -> PathBuf {
        self.cache_dir.join(format!(
            "{}.{}.{STAGING_EXTENSION}",
            id.digest(),
            uuid::Uuid::new_v4().simple()
        ))
    }

    /// Writes `bytes` as the cached file for `id`.
    ///
    /// The bytes go to a staging file first and are renamed into place, so
    /// [`FileCache::path_for`] never holds a partial file.
    ///
    /// # Errors
    /// Returns error if the file cannot be written or renamed.
    pub async fn insert(&self, id: &ImageId, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path_for(id);
        let staging = self.staging_path_for(id);

        let written = async {
            let mut file = fs::File::create(&staging).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            fs::rename(&staging, &path).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&staging).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %staging.display(), error = %cleanup, "Failed to remove staging file");
            }
            return Err(e);
        }

        debug!(id = %id, size = bytes.len(), "Inserted image into disk cache");
        Ok(path)
    }

    /// Checks if an identifier has a cached file.
    pub async fn contains(&self, id: &ImageId) -> bool {
        fs::metadata(self.path_for(id))
            .await
            .is_ok_and(|meta| meta.is_file())
    }

    /// Removes one cached file. Missing files are ignored.
    pub async fn evict(&self, id: &ImageId) {
        let path = self.path_for(id);
        match fs::remove_file(&path).await {
            Ok(()) => debug!(id = %id, "Evicted from disk cache"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(id = %id, error = %e, "Failed to evict from disk cache"),
        }
    }

    /// Returns the number of cached files.
    pub async fn len(&self) -> usize {
        let Ok(mut entries) = fs::read_dir(&self.cache_dir).await else {
            return 0;
        };
        let mut count = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry
                .path()
                .extension()
                .is_some_and(|ext| ext == CACHE_EXTENSION)
            {
                count += 1;
            }
        }
        count
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Deletes every file this cache manages, including abandoned staging files.
    ///
    /// Best-effort: files that vanish or cannot be removed are skipped.
    pub async fn clear(&self) {
        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.cache_dir.display(), error = %e, "Failed to read cache dir");
                return;
            }
        };

        let mut removed = 0usize;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let managed = path
                .extension()
                .is_some_and(|ext| ext == CACHE_EXTENSION || ext == STAGING_EXTENSION);
            if !managed {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove cache file"),
            }
        }
        info!(removed, "Cleared disk cache");
    }
}

/// Returns the default cache directory path.
#[must_use]
pub fn default_cache_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "linuxmobile", "pixcache")
        .map(|dirs| dirs.cache_dir().join("images"))
}
