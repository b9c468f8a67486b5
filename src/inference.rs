//! Background removal capability
//!
//! The pipeline only needs "opaque RGB in, RGBA cutout out". Anything that can
//! do that (a local model, a remote service, a test double) implements
//! `BackgroundRemover` and is shared across requests behind an `Arc`.

use crate::error::Result;
use image::{RgbImage, RgbaImage};

/// Trait for background removal implementations
pub trait BackgroundRemover: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Remove the background from an opaque RGB image
    ///
    /// The returned image carries an alpha channel separating subject from
    /// background. It may differ in size from the input.
    ///
    /// # Errors
    /// - Model inference failures
    /// - Tensor conversion or mask generation errors
    fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage>;
}

impl<T: BackgroundRemover + ?Sized> BackgroundRemover for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage> {
        (**self).remove_background(image)
    }
}
