//! Domain layer with core entities, errors and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{DecodedImage, ImageId, LoadStage, ResourceKind};
pub use errors::{
    DecodeError, EngineError, FetchError, LoadError, MainContextClosed, StoreError,
};
pub use ports::{
    BlobProviderPort, ByteStream, DisplayTarget, ImageCachePort, ImageDecoderPort,
    MainContextPort, MainTask, RawFetchPort,
};
