//! Two-pass sampled image decoder.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::{ImageReader, Limits};
use tracing::trace;

use crate::domain::entities::DecodedImage;
use crate::domain::errors::DecodeError;
use crate::domain::ports::ImageDecoderPort;

/// Default cap on allocations made while decoding one image (256 MiB).
pub const DEFAULT_DECODE_ALLOC_LIMIT: u64 = 256 * 1024 * 1024;

/// Returns the largest power-of-two divisor `f` that keeps
/// `max(width, height) / f` above `max_dimension`. Never below 1.
///
/// `1024x512` at `70` gives `8` (larger side 128; `16` would give 64).
#[must_use]
pub fn sample_factor(width: u32, height: u32, max_dimension: u32) -> u32 {
    let larger = u64::from(width.max(height));
    let target = u64::from(max_dimension);
    let mut factor = 1u64;
    while larger / (factor * 2) > target {
        factor *= 2;
    }
    u32::try_from(factor).unwrap_or(u32::MAX)
}

/// Decoder built on the `image` crate.
///
/// Reads the header first to pick a [`sample_factor`], then decodes under an
/// allocation limit and shrinks by that factor.
#[derive(Debug, Clone, Copy)]
pub struct SampledDecoder {
    alloc_limit: u64,
}

impl SampledDecoder {
    /// Creates a decoder that refuses images needing more than `alloc_limit` bytes.
    #[must_use]
    pub const fn new(alloc_limit: u64) -> Self {
        Self { alloc_limit }
    }

    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_alloc = Some(self.alloc_limit);
        limits
    }

    fn open(path: &Path) -> Result<Option<ImageReader<BufReader<File>>>, DecodeError> {
        match ImageReader::open(path) {
            Ok(reader) => Ok(Some(reader.with_guessed_format()?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for SampledDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_DECODE_ALLOC_LIMIT)
    }
}

impl ImageDecoderPort for SampledDecoder {
    fn decode(&self, path: &Path, max_dimension: u32) -> Result<Option<DecodedImage>, DecodeError> {
        let Some(header) = Self::open(path)? else {
            return Ok(None);
        };
        let (width, height) = header.into_dimensions()?;
        let factor = sample_factor(width, height, max_dimension);

        let Some(mut reader) = Self::open(path)? else {
            return Ok(None);
        };
        reader.limits(self.limits());
        let full = reader.decode()?;

        let image = if factor > 1 {
            full.thumbnail_exact((width / factor).max(1), (height / factor).max(1))
        } else {
            full
        };

        trace!(
            path = %path.display(),
            width,
            height,
            factor,
            "Decoded image"
        );
        Ok(Some(DecodedImage::new(image, width, height, factor)))
    }
}
