//! Image slot state for headless rendering.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::entities::{DecodedImage, ImageId};
use crate::domain::ports::DisplayTarget;

/// What a slot is currently showing.
#[derive(Debug, Clone, Default)]
pub enum SlotContent {
    /// Nothing rendered yet.
    #[default]
    Blank,
    /// The placeholder image.
    Placeholder,
    /// A decoded image.
    Image(Arc<DecodedImage>),
}

impl SlotContent {
    /// Returns true if an image is shown.
    #[must_use]
    pub const fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }
}

/// A display target that records what it was asked to show.
pub struct ImageSlot {
    id: ImageId,
    size: Option<u32>,
    content: Mutex<SlotContent>,
    renders: Mutex<usize>,
}

impl ImageSlot {
    /// Creates a slot labelled with the identifier it is meant to show.
    #[must_use]
    pub fn new(id: ImageId, size: Option<u32>) -> Self {
        Self {
            id,
            size,
            content: Mutex::new(SlotContent::Blank),
            renders: Mutex::new(0),
        }
    }

    /// Identifier this slot was created for.
    #[must_use]
    pub const fn id(&self) -> &ImageId {
        &self.id
    }

    /// Current content.
    #[must_use]
    pub fn content(&self) -> SlotContent {
        self.content.lock().clone()
    }

    /// Number of render calls received.
    #[must_use]
    pub fn render_count(&self) -> usize {
        *self.renders.lock()
    }

    /// One-line description of the current content.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.content() {
            SlotContent::Blank => "blank".to_string(),
            SlotContent::Placeholder => "placeholder".to_string(),
            SlotContent::Image(image) => {
                let (w, h) = image.source_dimensions();
                format!(
                    "{}x{} (from {w}x{h}, sample 1/{})",
                    image.width(),
                    image.height(),
                    image.sample_factor()
                )
            }
        }
    }

    fn show(&self, content: SlotContent) {
        *self.content.lock() = content;
        *self.renders.lock() += 1;
    }
}

impl DisplayTarget for ImageSlot {
    fn render_image(&self, image: Arc<DecodedImage>) {
        self.show(SlotContent::Image(image));
    }

    fn render_placeholder(&self) {
        self.show(SlotContent::Placeholder);
    }

    fn measured_size(&self) -> Option<u32> {
        self.size
    }
}

impl std::fmt::Debug for ImageSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSlot")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("content", &self.describe())
            .finish_non_exhaustive()
    }
}
