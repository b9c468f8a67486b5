//! Cutout processor
//!
//! `CutoutProcessor` owns the whole request pipeline: decode, downscale,
//! flatten onto white, background removal, trim and PNG encode. The HTTP
//! layer hands it raw upload bytes and gets PNG bytes back. The processor
//! holds no mutable state, so one instance is shared by every request.

use crate::{
    config::ProcessingConfig,
    error::{CutoutError, Result},
    inference::BackgroundRemover,
    services::{ImageIOService, TransparentTrimmer, TrimOptions},
    types::{ProcessedImage, ProcessingTimings},
    utils::ImagePreprocessor,
};
use image::DynamicImage;
use instant::Instant;
use std::sync::Arc;
use tracing::{instrument, span, Level};

/// Background removal pipeline around a shared `BackgroundRemover`
#[derive(Clone)]
pub struct CutoutProcessor {
    config: ProcessingConfig,
    remover: Arc<dyn BackgroundRemover>,
}

impl std::fmt::Debug for CutoutProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CutoutProcessor")
            .field("config", &self.config)
            .field("remover", &self.remover.name())
            .finish()
    }
}

impl CutoutProcessor {
    /// Create a processor after validating `config`
    ///
    /// # Errors
    /// Returns `CutoutError::InvalidConfig` if the configuration is invalid
    pub fn new(config: ProcessingConfig, remover: Arc<dyn BackgroundRemover>) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            remover = %remover.name(),
            max_dimension = config.max_dimension,
            compression = %config.png_compression,
            "Cutout processor ready"
        );
        Ok(Self { config, remover })
    }

    #[must_use]
    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    #[must_use]
    pub fn remover_name(&self) -> &str {
        self.remover.name()
    }

    /// Run the full pipeline on uploaded bytes
    ///
    /// # Errors
    /// - `CutoutError::Decode` when the bytes are not a supported image
    /// - `CutoutError::Inference`/`Processing` when background removal fails
    /// - `CutoutError::Encode` when the PNG cannot be written
    #[instrument(skip(self, bytes), fields(remover = %self.remover.name(), input_bytes = bytes.len()))]
    pub fn process_bytes(&self, bytes: &[u8]) -> Result<ProcessedImage> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::default();

        tracing::info!(input_bytes = bytes.len(), "Starting cutout");

        let decode_start = Instant::now();
        let image = ImageIOService::decode_bytes(bytes)?;
        timings.decode_ms = decode_start.elapsed().as_millis() as u64;

        self.run_pipeline(image, timings, total_start)
    }

    /// Run the pipeline on an already decoded image
    ///
    /// # Errors
    /// Same as [`CutoutProcessor::process_bytes`], minus decoding
    pub fn process_image(&self, image: DynamicImage) -> Result<ProcessedImage> {
        self.run_pipeline(image, ProcessingTimings::default(), Instant::now())
    }

    fn run_pipeline(
        &self,
        image: DynamicImage,
        mut timings: ProcessingTimings,
        total_start: Instant,
    ) -> Result<ProcessedImage> {
        let original_dimensions = (image.width(), image.height());

        let resized = {
            let _span = span!(
                Level::DEBUG,
                "downscale",
                width = original_dimensions.0,
                height = original_dimensions.1
            )
            .entered();
            let resize_start = Instant::now();
            let resized = ImagePreprocessor::downscale(image, self.config.max_dimension);
            timings.resize_ms = resize_start.elapsed().as_millis() as u64;
            resized
        };
        let resized_dimensions = (resized.width(), resized.height());

        if resized_dimensions == original_dimensions {
            tracing::debug!(
                width = resized_dimensions.0,
                height = resized_dimensions.1,
                "Image within size limit, not resized"
            );
        } else {
            tracing::info!(
                from = %format!("{}x{}", original_dimensions.0, original_dimensions.1),
                to = %format!("{}x{}", resized_dimensions.0, resized_dimensions.1),
                "Resized image"
            );
        }

        let normalize_start = Instant::now();
        let rgb = ImagePreprocessor::flatten_onto_white(&resized);
        drop(resized);
        timings.normalize_ms = normalize_start.elapsed().as_millis() as u64;

        let cutout = {
            let _span = span!(Level::INFO, "background_removal", remover = %self.remover.name())
                .entered();
            let removal_start = Instant::now();
            let cutout = self
                .remover
                .remove_background(&rgb)
                .map_err(Self::removal_error)?;
            timings.removal_ms = removal_start.elapsed().as_millis() as u64;
            tracing::info!(removal_ms = timings.removal_ms, "Background removed");
            cutout
        };

        let trim_start = Instant::now();
        let trimmed = TransparentTrimmer::trim(cutout, &TrimOptions::from(&self.config));
        timings.trim_ms = trim_start.elapsed().as_millis() as u64;
        let output_dimensions = trimmed.dimensions();

        let encode_start = Instant::now();
        let png = ImageIOService::encode_png(
            &DynamicImage::ImageRgba8(trimmed),
            self.config.png_compression,
        )?;
        timings.encode_ms = encode_start.elapsed().as_millis() as u64;
        timings.total_ms = total_start.elapsed().as_millis() as u64;

        let processed = ProcessedImage {
            png,
            original_dimensions,
            resized_dimensions,
            output_dimensions,
            timings,
        };

        tracing::info!(
            size_kb = %format!("{:.1}", processed.size_kb()),
            output = %format!("{}x{}", output_dimensions.0, output_dimensions.1),
            total_ms = processed.timings.total_ms,
            overhead_ms = processed.timings.overhead_ms(),
            "Cutout complete"
        );

        Ok(processed)
    }

    fn removal_error(error: CutoutError) -> CutoutError {
        match error {
            CutoutError::Inference(_) | CutoutError::Processing(_) => error,
            other => CutoutError::processing(format!("Background removal failed: {other}")),
        }
    }
}
