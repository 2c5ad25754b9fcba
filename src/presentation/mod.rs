//! Presentation layer with the display targets the engine renders onto.

/// Widget implementations.
pub mod widgets;

pub use widgets::{ImageSlot, SlotContent};
