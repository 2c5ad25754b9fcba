//! In-memory LRU image cache implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{DecodedImage, ImageId};
use crate::domain::ports::ImageCachePort;

/// Default byte budget for decoded pixels held in memory (64 MiB).
pub const DEFAULT_MEMORY_LIMIT: usize = 64 * 1024 * 1024;

struct Entries {
    lru: LruCache<ImageId, Arc<DecodedImage>>,
    size_bytes: usize,
}

/// In-memory LRU cache for decoded images, bounded by pixel bytes.
/// Thread-safe; every operation is a short critical section.
pub struct MemoryImageCache {
    entries: Mutex<Entries>,
    limit_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a new cache holding at most `limit_bytes` of pixel data.
    #[must_use]
    pub fn new(limit_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(Entries {
                lru: LruCache::unbounded(),
                size_bytes: 0,
            }),
            limit_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default budget.
    #[must_use]
    pub fn with_default_limit() -> Self {
        Self::new(DEFAULT_MEMORY_LIMIT)
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let entries = self.entries.lock();
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: entries.lru.len(),
            bytes: entries.size_bytes,
        }
    }

    /// Peeks at an image without promoting it in the LRU.
    #[must_use]
    pub fn peek(&self, id: &ImageId) -> Option<Arc<DecodedImage>> {
        self.entries.lock().lru.peek(id).cloned()
    }

    /// Returns the pixel bytes currently held.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.entries.lock().size_bytes
    }

    /// Returns the configured byte budget.
    #[must_use]
    pub const fn limit_bytes(&self) -> usize {
        self.limit_bytes
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::with_default_limit()
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("limit_bytes", &self.limit_bytes)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
    /// Pixel bytes currently held.
    pub bytes: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images ({} KiB), {:.1}% hit rate ({} hits, {} misses)",
            self.size,
            self.bytes / 1024,
            self.hit_rate,
            self.hits,
            self.misses
        )
    }
}

impl ImageCachePort for MemoryImageCache {
    fn get(&self, id: &ImageId) -> Option<Arc<DecodedImage>> {
        let mut entries = self.entries.lock();
        if let Some(img) = entries.lru.get(id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(id = %id, "Memory cache hit");
            Some(img.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(id = %id, "Memory cache miss");
            None
        }
    }

    fn put(&self, id: ImageId, image: Arc<DecodedImage>) {
        let size = image.byte_size();
        let mut entries = self.entries.lock();

        if let Some(old) = entries.lru.pop(&id) {
            entries.size_bytes -= old.byte_size();
        }

        if size > self.limit_bytes {
            debug!(id = %id, size, limit = self.limit_bytes, "Image exceeds memory budget, not cached");
            return;
        }

        entries.size_bytes += size;
        debug!(id = %id, size, "Storing image in memory cache");
        entries.lru.put(id, image);

        while entries.size_bytes > self.limit_bytes {
            let Some((evicted, img)) = entries.lru.pop_lru() else {
                break;
            };
            entries.size_bytes -= img.byte_size();
            debug!(id = %evicted, "Evicted image from memory cache");
        }
    }

    fn remove(&self, id: &ImageId) {
        let mut entries = self.entries.lock();
        if let Some(img) = entries.lru.pop(id) {
            entries.size_bytes -= img.byte_size();
            debug!(id = %id, "Removed image from memory cache");
        }
    }

    fn len(&self) -> usize {
        self.entries.lock().lru.len()
    }

    fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.lru.clear();
        entries.size_bytes = 0;
        debug!("Cleared memory image cache");
    }
}
