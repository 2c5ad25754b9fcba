mod decoder_port;
mod display_target_port;
mod image_cache_port;
mod main_context_port;
mod raw_fetch_port;

pub use decoder_port::ImageDecoderPort;
pub use display_target_port::DisplayTarget;
pub use image_cache_port::ImageCachePort;
pub use main_context_port::{MainContextPort, MainTask};
pub use raw_fetch_port::{BlobProviderPort, ByteStream, RawFetchPort};
