//! Domain types for image loading.

use std::sync::Arc;

use super::resource::ResourceKind;

/// Identifier naming an image resource: a URL, a numeric provider key or a
/// local content reference. Used verbatim as the cache key in every tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(Arc<str>);

impl ImageId {
    /// Creates a new `ImageId` from any string-like input.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Returns a filename-safe digest of the identifier.
    ///
    /// The first 128 bits of the SHA-256 of the identifier, hex encoded.
    #[must_use]
    pub fn digest(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }

    /// Classifies how the identifier must be resolved.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        ResourceKind::classify(&self.0)
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ImageId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Stage of a queued load.
///
/// `Requested -> Queued -> Fetching -> Decoding -> Delivering -> Done`, with
/// an early exit to `Discarded` whenever the target has been reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStage {
    /// `request` was called and missed the memory cache.
    Requested,
    /// Waiting for a worker permit.
    Queued,
    /// Resolving the file cache or fetching raw bytes.
    Fetching,
    /// Decoding the cached file.
    Decoding,
    /// Result handed to the main context.
    Delivering,
    /// Rendered on the target.
    Done,
    /// Abandoned because the target now shows something else.
    Discarded,
}

impl std::fmt::Display for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Requested => "requested",
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Decoding => "decoding",
            Self::Delivering => "delivering",
            Self::Done => "done",
            Self::Discarded => "discarded",
        };
        f.write_str(name)
    }
}

/// A decoded, downsampled image ready for display.
#[derive(Clone)]
pub struct DecodedImage {
    image: image::DynamicImage,
    source_width: u32,
    source_height: u32,
    sample_factor: u32,
}

impl DecodedImage {
    /// Wraps an already downsampled image together with its provenance.
    #[must_use]
    pub const fn new(
        image: image::DynamicImage,
        source_width: u32,
        source_height: u32,
        sample_factor: u32,
    ) -> Self {
        Self {
            image,
            source_width,
            source_height,
            sample_factor,
        }
    }

    /// Decoded width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Decoded height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Dimensions of the encoded source, before sampling.
    #[must_use]
    pub const fn source_dimensions(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }

    /// Power-of-two divisor applied while decoding.
    #[must_use]
    pub const fn sample_factor(&self) -> u32 {
        self.sample_factor
    }

    /// Size of the pixel buffer in bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.image.as_bytes().len()
    }

    /// Borrows the pixel data.
    #[must_use]
    pub const fn image(&self) -> &image::DynamicImage {
        &self.image
    }

    /// Consumes the wrapper, returning the pixel data.
    #[must_use]
    pub fn into_image(self) -> image::DynamicImage {
        self.image
    }
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("source_width", &self.source_width)
            .field("source_height", &self.source_height)
            .field("sample_factor", &self.sample_factor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_filename_safe() {
        let id = ImageId::new("https://example.com/a b/c?d=e&f=/g");
        let digest = id.digest();
        assert_eq!(digest.len(), 32);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_digest_consistency() {
        let id1 = ImageId::new("https://example.com/image.png");
        let id2 = ImageId::from("https://example.com/image.png".to_string());
        assert_eq!(id1, id2);
        assert_eq!(id1.digest(), id2.digest());
        assert_ne!(id1.digest(), ImageId::new("https://example.com/other.png").digest());
    }

    #[test]
    fn test_decoded_image_accessors() {
        let decoded = DecodedImage::new(image::DynamicImage::new_rgb8(16, 8), 128, 64, 8);
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 8);
        assert_eq!(decoded.source_dimensions(), (128, 64));
        assert_eq!(decoded.sample_factor(), 8);
        assert_eq!(decoded.byte_size(), 16 * 8 * 3);
    }
}
