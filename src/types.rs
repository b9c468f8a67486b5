//! Core types for cutout operations

use serde::{Deserialize, Serialize};

/// Smallest rectangle enclosing every non-transparent pixel
///
/// `right` and `bottom` are exclusive, so `right - left` is the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Grow by `padding` on every side, clamped to a `width` x `height` image
    #[must_use]
    pub fn expand(&self, padding: u32, width: u32, height: u32) -> Self {
        Self {
            left: self.left.saturating_sub(padding),
            top: self.top.saturating_sub(padding),
            right: self.right.saturating_add(padding).min(width),
            bottom: self.bottom.saturating_add(padding).min(height),
        }
    }

    /// Whether the box lies inside a `width` x `height` image and is non-empty
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.left < self.right && self.top < self.bottom && self.right <= width && self.bottom <= height
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}, {})", self.left, self.top, self.right, self.bottom)
    }
}

/// Detailed timing breakdown for a single cutout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    pub decode_ms: u64,
    pub resize_ms: u64,
    pub normalize_ms: u64,
    pub removal_ms: u64,
    pub trim_ms: u64,
    pub encode_ms: u64,
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Time spent outside the background removal call
    #[must_use]
    pub fn overhead_ms(&self) -> u64 {
        self.total_ms.saturating_sub(self.removal_ms)
    }
}

/// Output of the cutout pipeline
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// Encoded PNG bytes
    pub png: Vec<u8>,
    /// Dimensions of the decoded upload
    pub original_dimensions: (u32, u32),
    /// Dimensions after the downscale step
    pub resized_dimensions: (u32, u32),
    /// Dimensions of the encoded output
    pub output_dimensions: (u32, u32),
    pub timings: ProcessingTimings,
}

impl ProcessedImage {
    /// Encoded size in kilobytes
    #[must_use]
    pub fn size_kb(&self) -> f64 {
        self.png.len() as f64 / 1024.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_dimensions() {
        let bbox = BoundingBox {
            left: 10,
            top: 20,
            right: 50,
            bottom: 35,
        };
        assert_eq!(bbox.width(), 40);
        assert_eq!(bbox.height(), 15);
        assert_eq!(bbox.to_string(), "(10, 20, 50, 35)");
    }

    #[test]
    fn test_expand_clamps_to_image() {
        let bbox = BoundingBox {
            left: 2,
            top: 3,
            right: 95,
            bottom: 60,
        };
        let expanded = bbox.expand(5, 98, 100);
        assert_eq!(
            expanded,
            BoundingBox {
                left: 0,
                top: 0,
                right: 98,
                bottom: 65,
            }
        );
        assert!(expanded.fits_within(98, 100));
    }

    #[test]
    fn test_fits_within_rejects_empty_and_oversized() {
        let empty = BoundingBox {
            left: 4,
            top: 4,
            right: 4,
            bottom: 9,
        };
        assert!(!empty.fits_within(10, 10));

        let oversized = BoundingBox {
            left: 0,
            top: 0,
            right: 11,
            bottom: 5,
        };
        assert!(!oversized.fits_within(10, 10));
    }

    #[test]
    fn test_timings_overhead() {
        let timings = ProcessingTimings {
            removal_ms: 700,
            total_ms: 900,
            ..Default::default()
        };
        assert_eq!(timings.overhead_ms(), 200);
    }
}
