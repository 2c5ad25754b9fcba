//! Display targets.

mod image_slot;

pub use image_slot::{ImageSlot, SlotContent};
