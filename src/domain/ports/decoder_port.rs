//! Port definition for image decoding.

use std::path::Path;

use crate::domain::entities::DecodedImage;
use crate::domain::errors::DecodeError;

/// Port for decoding a cached file into a downsampled image.
///
/// Called from the blocking pool, so implementations may do synchronous I/O.
pub trait ImageDecoderPort: Send + Sync {
    /// Decodes `path` so that its larger side ends up close to `max_dimension`.
    /// Returns `Ok(None)` when the file does not exist.
    fn decode(&self, path: &Path, max_dimension: u32) -> Result<Option<DecodedImage>, DecodeError>;
}
