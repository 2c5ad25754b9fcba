//! Domain entity definitions.

mod image;
mod resource;

pub use self::image::{DecodedImage, ImageId, LoadStage};
pub use resource::{LOCAL_CONTENT_PREFIXES, ResourceKind};
