//! Image decoding and PNG encoding
//!
//! Keeps byte-level concerns out of the processor: uploads come in as raw
//! bytes and leave as an optimized PNG.

use crate::{
    config::PngCompression,
    error::{CutoutError, Result},
};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;

/// Service for image decode/encode operations
pub struct ImageIOService;

impl ImageIOService {
    /// Decode uploaded bytes, guessing the format from content
    ///
    /// # Errors
    /// Returns `CutoutError::Decode` for empty input or bytes that are not a
    /// supported image
    pub fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(CutoutError::decode("image data is empty"));
        }

        image::load_from_memory(bytes).map_err(|e| CutoutError::decode(e.to_string()))
    }

    /// Encode as PNG with the requested compression and adaptive filtering
    ///
    /// # Errors
    /// Returns `CutoutError::Encode` if the encoder rejects the image
    pub fn encode_png(image: &DynamicImage, compression: PngCompression) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = PngEncoder::new_with_quality(
            &mut buffer,
            Self::compression_type(compression),
            FilterType::Adaptive,
        );

        image
            .write_with_encoder(encoder)
            .map_err(|e| CutoutError::encode(format!("Failed to encode PNG: {e}")))?;

        Ok(buffer)
    }

    fn compression_type(compression: PngCompression) -> CompressionType {
        match compression {
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Default => CompressionType::Default,
            PngCompression::Best => CompressionType::Best,
        }
    }
}
