//! Shared image preprocessing utilities
//!
//! Covers the two kinds of preparation an upload goes through: the
//! normalization every request gets (downscale, flatten onto white) and the
//! canvas placement and tensor conversion the segmentation model needs.

use crate::{
    error::{CutoutError, Result},
    models::{PreprocessingConfig, ResizeMode},
};
use image::{imageops::FilterType, DynamicImage, ImageBuffer, Rgb, RgbImage};
use ndarray::Array4;

/// Placement of the resized image inside the model's input canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasPlacement {
    /// Horizontal scale factor applied to the source image
    pub scale_x: f32,
    /// Vertical scale factor applied to the source image
    pub scale_y: f32,
    /// Horizontal offset of the resized image in the canvas
    pub offset_x: u32,
    /// Vertical offset of the resized image in the canvas
    pub offset_y: u32,
    /// Canvas width (model input width)
    pub canvas_width: u32,
    /// Canvas height (model input height)
    pub canvas_height: u32,
}

impl CanvasPlacement {
    /// Placement of a `width` x `height` image for the given resize mode
    #[must_use]
    pub fn for_mode(
        mode: ResizeMode,
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
    ) -> Self {
        match mode {
            ResizeMode::Stretch => Self::stretch(width, height, canvas_width, canvas_height),
            ResizeMode::Letterbox => Self::letterbox(width, height, canvas_width, canvas_height),
        }
    }

    /// Fill the whole canvas, ignoring aspect ratio
    #[must_use]
    pub fn stretch(width: u32, height: u32, canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            scale_x: canvas_width as f32 / width.max(1) as f32,
            scale_y: canvas_height as f32 / height.max(1) as f32,
            offset_x: 0,
            offset_y: 0,
            canvas_width,
            canvas_height,
        }
    }

    /// Aspect-preserving placement, centered in the canvas
    #[must_use]
    pub fn letterbox(width: u32, height: u32, canvas_width: u32, canvas_height: u32) -> Self {
        let scale = (canvas_width as f32 / width.max(1) as f32)
            .min(canvas_height as f32 / height.max(1) as f32);

        let mut placement = Self {
            scale_x: scale,
            scale_y: scale,
            offset_x: 0,
            offset_y: 0,
            canvas_width,
            canvas_height,
        };
        let (scaled_width, scaled_height) = placement.scaled_size(width, height);
        placement.offset_x = canvas_width.saturating_sub(scaled_width) / 2;
        placement.offset_y = canvas_height.saturating_sub(scaled_height) / 2;
        placement
    }

    /// Size of the resized image, clamped to the canvas
    #[must_use]
    pub fn scaled_size(&self, width: u32, height: u32) -> (u32, u32) {
        let scaled_width =
            ((width as f32 * self.scale_x).round() as u32).clamp(1, self.canvas_width.max(1));
        let scaled_height =
            ((height as f32 * self.scale_y).round() as u32).clamp(1, self.canvas_height.max(1));
        (scaled_width, scaled_height)
    }

    /// Map a source pixel to the canvas pixel covering its center, if any
    #[must_use]
    pub fn to_canvas(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        let canvas_x = ((x as f32 + 0.5) * self.scale_x).floor() as u32 + self.offset_x;
        let canvas_y = ((y as f32 + 0.5) * self.scale_y).floor() as u32 + self.offset_y;
        (canvas_x < self.canvas_width && canvas_y < self.canvas_height)
            .then_some((canvas_x, canvas_y))
    }
}

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Target size for an image whose longest side exceeds `max_dimension`
    ///
    /// Returns `None` when no downscale is needed. The longest side becomes
    /// exactly `max_dimension`; the other side is truncated and never drops
    /// below one pixel.
    #[must_use]
    pub fn downscale_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
        let longest = width.max(height);
        if longest <= max_dimension || max_dimension == 0 {
            return None;
        }

        let scale_side = |side: u32| -> u32 {
            let scaled = u64::from(side) * u64::from(max_dimension) / u64::from(longest);
            (scaled as u32).max(1)
        };

        Some((scale_side(width), scale_side(height)))
    }

    /// Downscale with Lanczos3 so the longest side is at most `max_dimension`
    #[must_use]
    pub fn downscale(image: DynamicImage, max_dimension: u32) -> DynamicImage {
        match Self::downscale_dimensions(image.width(), image.height(), max_dimension) {
            Some((width, height)) => image.resize_exact(width, height, FilterType::Lanczos3),
            None => image,
        }
    }

    /// Produce an opaque RGB image
    ///
    /// Images carrying alpha are composited over white using alpha as the
    /// blend weight; everything else is converted to RGB8 directly.
    #[must_use]
    pub fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
        if !image.color().has_alpha() {
            return image.to_rgb8();
        }

        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut flattened = RgbImage::new(width, height);

        for (source, target) in rgba.pixels().zip(flattened.pixels_mut()) {
            let alpha = u32::from(source[3]);
            let blend = |channel: u8| -> u8 {
                let value = u32::from(channel) * alpha + 255 * (255 - alpha);
                ((value + 127) / 255) as u8
            };
            *target = Rgb([blend(source[0]), blend(source[1]), blend(source[2])]);
        }

        flattened
    }

    /// Place an RGB image into the model canvas and normalize it to NCHW
    ///
    /// Stretched inputs are resized with Lanczos3 to the full canvas;
    /// letterboxed inputs keep their aspect ratio on a white canvas.
    ///
    /// # Errors
    /// - Empty source image
    /// - Model input size too large for tensor allocation
    pub fn preprocess_for_inference(
        image: &RgbImage,
        preprocessing_config: &PreprocessingConfig,
    ) -> Result<(Array4<f32>, CanvasPlacement)> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(CutoutError::processing("Cannot preprocess an empty image"));
        }

        let [canvas_height, canvas_width] = preprocessing_config.target_size;
        let placement = CanvasPlacement::for_mode(
            preprocessing_config.resize_mode,
            width,
            height,
            canvas_width,
            canvas_height,
        );

        let canvas = match preprocessing_config.resize_mode {
            ResizeMode::Stretch => {
                image::imageops::resize(image, canvas_width, canvas_height, FilterType::Lanczos3)
            },
            ResizeMode::Letterbox => {
                let (scaled_width, scaled_height) = placement.scaled_size(width, height);
                let resized =
                    image::imageops::resize(image, scaled_width, scaled_height, FilterType::Triangle);

                let mut canvas =
                    ImageBuffer::from_pixel(canvas_width, canvas_height, Rgb([255, 255, 255]));
                image::imageops::replace(
                    &mut canvas,
                    &resized,
                    i64::from(placement.offset_x),
                    i64::from(placement.offset_y),
                );
                canvas
            },
        };

        let tensor = Self::canvas_to_tensor(&canvas, preprocessing_config)?;
        Ok((tensor, placement))
    }

    /// Convert canvas to normalized tensor
    fn canvas_to_tensor(
        canvas: &RgbImage,
        preprocessing_config: &PreprocessingConfig,
    ) -> Result<Array4<f32>> {
        let (width, height) = canvas.dimensions();
        let width = usize::try_from(width).map_err(|_| {
            CutoutError::processing("Canvas width too large for tensor allocation")
        })?;
        let height = usize::try_from(height).map_err(|_| {
            CutoutError::processing("Canvas height too large for tensor allocation")
        })?;

        let rescale = preprocessing_config.rescale_factor;
        let mean = preprocessing_config.normalization_mean;
        let std = preprocessing_config.normalization_std;
        let mut tensor = Array4::<f32>::zeros((1, 3, height, width));

        #[allow(clippy::indexing_slicing)]
        // Safe: tensor dimensions pre-allocated to match canvas size
        for (y, row) in canvas.rows().enumerate() {
            for (x, pixel) in row.enumerate() {
                for channel in 0..3 {
                    tensor[[0, channel, y, x]] =
                        (f32::from(pixel[channel]) * rescale - mean[channel]) / std[channel];
                }
            }
        }

        Ok(tensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_small_images_are_not_resized() {
        assert_eq!(ImagePreprocessor::downscale_dimensions(640, 480, 800), None);
        assert_eq!(ImagePreprocessor::downscale_dimensions(800, 800, 800), None);

        let image = DynamicImage::new_rgb8(799, 20);
        let resized = ImagePreprocessor::downscale(image, 800);
        assert_eq!((resized.width(), resized.height()), (799, 20));
    }

    #[test]
    fn test_large_images_hit_max_dimension() {
        assert_eq!(
            ImagePreprocessor::downscale_dimensions(1600, 1200, 800),
            Some((800, 600))
        );
        assert_eq!(
            ImagePreprocessor::downscale_dimensions(1000, 3000, 800),
            Some((266, 800))
        );
        // Extreme aspect ratio keeps at least one pixel
        assert_eq!(
            ImagePreprocessor::downscale_dimensions(4000, 2, 800),
            Some((800, 1))
        );
    }

    #[test]
    fn test_downscale_preserves_aspect_ratio() {
        for (width, height) in [(1234_u32, 987_u32), (801, 3), (2049, 2048), (999, 1001)] {
            let image = DynamicImage::new_rgb8(width, height);
            let resized = ImagePreprocessor::downscale(image, 800);
            assert_eq!(resized.width().max(resized.height()), 800);

            let expected_other = if width >= height {
                height as f64 * 800.0 / width as f64
            } else {
                width as f64 * 800.0 / height as f64
            };
            let actual_other = resized.width().min(resized.height()) as f64;
            assert!(
                (actual_other - expected_other).abs() <= 1.0,
                "{width}x{height} -> {}x{}",
                resized.width(),
                resized.height()
            );
        }
    }

    #[test]
    fn test_flatten_composites_alpha_over_white() {
        let mut rgba = RgbaImage::new(3, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        rgba.put_pixel(2, 0, Rgba([0, 0, 0, 128]));

        let flattened = ImagePreprocessor::flatten_onto_white(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(flattened.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flattened.get_pixel(1, 0), &Rgb([0, 0, 0]));
        assert_eq!(flattened.get_pixel(2, 0), &Rgb([127, 127, 127]));
    }

    #[test]
    fn test_flatten_converts_non_rgb_modes() {
        let gray = image::GrayImage::from_pixel(2, 2, image::Luma([42]));
        let flattened = ImagePreprocessor::flatten_onto_white(&DynamicImage::ImageLuma8(gray));
        assert_eq!(flattened.dimensions(), (2, 2));
        assert_eq!(flattened.get_pixel(1, 1), &Rgb([42, 42, 42]));
    }

    #[test]
    fn test_letterbox_centers_wide_image() {
        let placement = CanvasPlacement::letterbox(200, 100, 100, 100);
        assert!((placement.scale_x - 0.5).abs() < f32::EPSILON);
        assert!((placement.scale_y - 0.5).abs() < f32::EPSILON);
        assert_eq!(placement.offset_x, 0);
        assert_eq!(placement.offset_y, 25);
        assert_eq!(placement.to_canvas(0, 0), Some((0, 25)));
        assert_eq!(placement.to_canvas(198, 98), Some((99, 74)));
        // Edge pixels still land inside the canvas
        assert_eq!(placement.to_canvas(199, 99), Some((99, 74)));
        assert_eq!(placement.to_canvas(200, 100), None);
    }

    #[test]
    fn test_stretch_fills_canvas_on_both_axes() {
        let placement = CanvasPlacement::stretch(800, 200, 1024, 1024);
        assert!((placement.scale_x - 1.28).abs() < 1e-6);
        assert!((placement.scale_y - 5.12).abs() < 1e-6);
        assert_eq!((placement.offset_x, placement.offset_y), (0, 0));
        assert_eq!(placement.scaled_size(800, 200), (1024, 1024));
        assert_eq!(placement.to_canvas(0, 0), Some((0, 2)));
        assert_eq!(placement.to_canvas(799, 199), Some((1023, 1021)));

        let shrink = CanvasPlacement::stretch(800, 800, 320, 320);
        assert_eq!(shrink.to_canvas(799, 799), Some((319, 319)));
    }

    #[test]
    fn test_preprocess_letterbox_tensor_shape_and_normalization() {
        let image = RgbImage::from_pixel(40, 20, Rgb([255, 0, 255]));
        let config = PreprocessingConfig {
            target_size: [32, 32],
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [0.5, 0.5, 0.5],
            resize_mode: ResizeMode::Letterbox,
            ..PreprocessingConfig::default()
        };

        let (tensor, placement) =
            ImagePreprocessor::preprocess_for_inference(&image, &config).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
        assert_eq!(placement.offset_y, 8);

        // Padding is white, which normalizes to 1.0 on every channel
        assert!((tensor[[0, 1, 0, 0]] - 1.0).abs() < 1e-6);
        // Image content: green channel of magenta is 0 -> -1.0
        assert!((tensor[[0, 1, 16, 16]] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_stretch_covers_whole_canvas() {
        let image = RgbImage::from_pixel(40, 20, Rgb([0, 0, 0]));
        let (tensor, placement) =
            ImagePreprocessor::preprocess_for_inference(&image, &PreprocessingConfig {
                target_size: [16, 16],
                ..PreprocessingConfig::default()
            })
            .unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 16, 16]);
        assert_eq!((placement.offset_x, placement.offset_y), (0, 0));
        // Black everywhere, no white padding: (0 - 0.5) / 1.0
        assert!((tensor[[0, 0, 0, 0]] + 0.5).abs() < 1e-6);
        assert!((tensor[[0, 2, 15, 15]] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_without_rescale_uses_raw_pixels() {
        let image = RgbImage::from_pixel(4, 4, Rgb([255, 128, 0]));
        let config = PreprocessingConfig {
            target_size: [4, 4],
            rescale_factor: 1.0,
            normalization_mean: [128.0, 128.0, 128.0],
            normalization_std: [256.0, 256.0, 256.0],
            resize_mode: ResizeMode::Stretch,
        };

        let (tensor, _) = ImagePreprocessor::preprocess_for_inference(&image, &config).unwrap();
        assert!((tensor[[0, 0, 1, 1]] - 127.0 / 256.0).abs() < 1e-6);
        assert!(tensor[[0, 1, 1, 1]].abs() < 1e-6);
        assert!((tensor[[0, 2, 1, 1]] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_rejects_empty_image() {
        let image = RgbImage::new(0, 0);
        let result =
            ImagePreprocessor::preprocess_for_inference(&image, &PreprocessingConfig::default());
        assert!(result.is_err());
    }
}
