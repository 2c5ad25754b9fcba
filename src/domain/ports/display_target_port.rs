//! Port definition for the widgets that show images.

use std::sync::Arc;

use crate::domain::entities::DecodedImage;

/// A UI element that ultimately shows an image or a placeholder.
///
/// Render calls always arrive on the main context.
pub trait DisplayTarget: Send + Sync {
    /// Shows a decoded image.
    fn render_image(&self, image: Arc<DecodedImage>);

    /// Shows the placeholder.
    fn render_placeholder(&self);

    /// Measured size of the target along its larger side, if laid out.
    fn measured_size(&self) -> Option<u32> {
        None
    }
}
