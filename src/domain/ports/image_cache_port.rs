//! Port definition for the in-memory image tier.

use std::sync::Arc;

use crate::domain::entities::{DecodedImage, ImageId};

/// Port for decoded-image caching operations.
/// Implementations must be thread-safe and must not block on I/O.
pub trait ImageCachePort: Send + Sync {
    /// Attempts to get an image from the cache.
    /// Returns None if not cached.
    fn get(&self, id: &ImageId) -> Option<Arc<DecodedImage>>;

    /// Stores an image in the cache, replacing any previous entry.
    fn put(&self, id: ImageId, image: Arc<DecodedImage>);

    /// Removes an image from the cache.
    fn remove(&self, id: &ImageId);

    /// Returns the current number of cached images.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all images from the cache.
    fn clear(&self);
}
