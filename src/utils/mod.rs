//! Image preparation and mask utilities shared by the backends

pub mod mask;
pub mod preprocessing;

pub use mask::SegmentationMask;
pub use preprocessing::{CanvasPlacement, ImagePreprocessor};
