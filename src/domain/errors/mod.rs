//! Domain error types.

mod load_error;

pub use load_error::{
    DecodeError, EngineError, FetchError, LoadError, MainContextClosed, StoreError,
};
