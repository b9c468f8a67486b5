//! Segmentation mask extraction and application

use crate::{
    error::{CutoutError, Result},
    utils::preprocessing::CanvasPlacement,
};
use image::{GrayImage, Luma, Rgba, RgbImage, RgbaImage};
use ndarray::Array4;

/// Per-pixel foreground probability mapped back to source image coordinates
#[derive(Debug, Clone)]
pub struct SegmentationMask {
    pub data: GrayImage,
}

impl SegmentationMask {
    /// Map a `(1, 1, H, W)` model output back onto the source image
    ///
    /// The output is min-max normalized to 0-1 first; a flat output is only
    /// clamped. Pixels outside the placed region read as background.
    ///
    /// # Errors
    /// Returns `CutoutError::Inference` if the tensor is not a single-channel mask
    pub fn from_tensor(
        tensor: &Array4<f32>,
        placement: &CanvasPlacement,
        dimensions: (u32, u32),
    ) -> Result<Self> {
        let shape = tensor.shape();
        if shape.first().copied() != Some(1) || shape.get(1).copied() != Some(1) {
            return Err(CutoutError::inference(format!(
                "Invalid output tensor shape {:?}, expected (1, 1, H, W)",
                shape
            )));
        }

        let (min, max) = tensor
            .iter()
            .filter(|value| value.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), value| {
                (min.min(*value), max.max(*value))
            });
        let range = max - min;
        let normalize = |value: f32| -> f32 {
            if range > f32::EPSILON {
                (value - min) / range
            } else {
                value
            }
        };

        let (width, height) = dimensions;
        let data = GrayImage::from_fn(width, height, |x, y| {
            let value = placement
                .to_canvas(x, y)
                .and_then(|(cx, cy)| tensor.get([0, 0, cy as usize, cx as usize]).copied())
                .map_or(0.0, normalize);
            Luma([(value.clamp(0.0, 1.0) * 255.0) as u8])
        });

        Ok(Self { data })
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.data.dimensions()
    }

    /// Use the mask as the alpha channel of `image`
    ///
    /// Fully transparent pixels are zeroed so the trim step and PNG encoder
    /// see clean background.
    ///
    /// # Errors
    /// Returns `CutoutError::Processing` if the mask and image sizes differ
    pub fn apply(&self, image: &RgbImage) -> Result<RgbaImage> {
        if image.dimensions() != self.dimensions() {
            return Err(CutoutError::processing(format!(
                "Mask dimensions {:?} do not match image dimensions {:?}",
                self.dimensions(),
                image.dimensions()
            )));
        }

        let (width, height) = image.dimensions();
        let mut result = RgbaImage::new(width, height);
        for ((pixel, alpha), target) in image
            .pixels()
            .zip(self.data.pixels())
            .zip(result.pixels_mut())
        {
            *target = if alpha[0] > 0 {
                Rgba([pixel[0], pixel[1], pixel[2], alpha[0]])
            } else {
                Rgba([0, 0, 0, 0])
            };
        }

        Ok(result)
    }
}
