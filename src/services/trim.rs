//! Transparent margin trimming
//!
//! After background removal the subject usually sits in a sea of transparent
//! pixels. The trimmer crops to the subject's bounding box plus a padding of
//! `max(floor, round(ratio * bbox_width))`, clamped to the image edges.
//! Trimming is best effort: a fully transparent image is returned as is, and
//! any failure is logged and absorbed.

use crate::{
    config::ProcessingConfig,
    error::{CutoutError, Result},
    types::BoundingBox,
};
use image::RgbaImage;

/// Padding policy applied around the detected subject
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimOptions {
    /// Minimum padding in pixels
    pub padding_floor: u32,
    /// Padding relative to the bounding box width
    pub padding_ratio: f32,
}

impl Default for TrimOptions {
    fn default() -> Self {
        Self::from(&ProcessingConfig::default())
    }
}

impl From<&ProcessingConfig> for TrimOptions {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            padding_floor: config.padding_floor,
            padding_ratio: config.padding_ratio,
        }
    }
}

/// Service for cropping transparent margins
pub struct TransparentTrimmer;

impl TransparentTrimmer {
    /// Smallest box containing every pixel with non-zero alpha
    ///
    /// Returns `None` for a fully transparent (or empty) image.
    #[must_use]
    pub fn bounding_box(image: &RgbaImage) -> Option<BoundingBox> {
        let mut bbox: Option<BoundingBox> = None;

        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel[3] == 0 {
                continue;
            }
            bbox = Some(match bbox {
                None => BoundingBox {
                    left: x,
                    top: y,
                    right: x + 1,
                    bottom: y + 1,
                },
                Some(current) => BoundingBox {
                    left: current.left.min(x),
                    top: current.top.min(y),
                    right: current.right.max(x + 1),
                    bottom: current.bottom.max(y + 1),
                },
            });
        }

        bbox
    }

    /// Padding in pixels for a subject bounding box
    ///
    /// # Errors
    /// Returns `CutoutError::InvalidConfig` for a non-finite or negative ratio
    pub fn padding_for(bbox: &BoundingBox, options: &TrimOptions) -> Result<u32> {
        if !options.padding_ratio.is_finite() || options.padding_ratio < 0.0 {
            return Err(CutoutError::config_value_error(
                "padding ratio",
                options.padding_ratio,
                "0.0-1.0",
            ));
        }

        let relative = (f64::from(bbox.width()) * f64::from(options.padding_ratio)).round() as u32;
        Ok(relative.max(options.padding_floor))
    }

    /// Padded crop region for `image`, or `None` when nothing is visible
    ///
    /// # Errors
    /// - Invalid padding options
    /// - A computed region that does not fit the image
    pub fn crop_region(image: &RgbaImage, options: &TrimOptions) -> Result<Option<BoundingBox>> {
        let Some(bbox) = Self::bounding_box(image) else {
            return Ok(None);
        };

        let (width, height) = image.dimensions();
        let padding = Self::padding_for(&bbox, options)?;
        let region = bbox.expand(padding, width, height);

        if !region.fits_within(width, height) {
            return Err(CutoutError::processing(format!(
                "Crop region {} does not fit a {}x{} image",
                region, width, height
            )));
        }

        tracing::debug!(bbox = %bbox, padding, region = %region, "Computed trim region");
        Ok(Some(region))
    }

    /// Crop to the padded subject region
    ///
    /// Returns `Ok(None)` when the image is fully transparent.
    ///
    /// # Errors
    /// Same as [`TransparentTrimmer::crop_region`]
    pub fn try_trim(image: &RgbaImage, options: &TrimOptions) -> Result<Option<RgbaImage>> {
        let Some(region) = Self::crop_region(image, options)? else {
            return Ok(None);
        };

        let cropped = image::imageops::crop_imm(
            image,
            region.left,
            region.top,
            region.width(),
            region.height(),
        )
        .to_image();

        Ok(Some(cropped))
    }

    /// Trim transparent margins, never failing
    ///
    /// Fully transparent images and trim failures both yield the input image.
    #[must_use]
    pub fn trim(image: RgbaImage, options: &TrimOptions) -> RgbaImage {
        match Self::try_trim(&image, options) {
            Ok(Some(cropped)) => {
                tracing::info!(
                    before = %format!("{}x{}", image.width(), image.height()),
                    after = %format!("{}x{}", cropped.width(), cropped.height()),
                    "Trimmed transparent margins"
                );
                cropped
            },
            Ok(None) => {
                tracing::debug!("Image is fully transparent, skipping trim");
                image
            },
            Err(e) => {
                tracing::warn!(error = %e, "Trim failed, returning untrimmed image");
                image
            },
        }
    }
}
