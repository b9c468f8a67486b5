#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Word Card Cutout
//!
//! Background removal for word card pictures, served over HTTP, plus the
//! placeholder backfill tool for the word library data files.
//!
//! An upload goes through a fixed pipeline:
//!
//! 1. decode (PNG, JPEG, GIF, BMP, TIFF, WebP)
//! 2. downscale so the longest side is at most 800 px (Lanczos3)
//! 3. flatten any alpha onto white, producing opaque RGB
//! 4. background removal through a [`BackgroundRemover`]
//! 5. trim transparent margins, keeping `max(5, 5% of subject width)` padding
//! 6. encode as PNG with maximum compression
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wordcard_cutout::{CutoutProcessor, ProcessingConfig, TractBackend};
//!
//! # fn example(upload: &[u8]) -> anyhow::Result<()> {
//! let backend = TractBackend::from_path("models/isnet-general-onnx")?;
//! let processor = CutoutProcessor::new(ProcessingConfig::default(), Arc::new(backend))?;
//!
//! let result = processor.process_bytes(upload)?;
//! std::fs::write("cutout.png", &result.png)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `tract` (default): pure Rust ONNX backend
//! - `cli` (default): the `wordcard-cutout` and `update-placeholders` binaries
//! - `webp-support` (default): WebP decoding
//! - `tracing-json`: JSON log output

pub mod backends;
pub mod backfill;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod processor;
pub mod server;
pub mod services;
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::*;
pub use backfill::{
    backfill_document, backfill_entry, backfill_file, run_backfill, run_backfill_with,
    BackfillConfig, BackfillCounts, BackfillSummary, CardImageUrl, CardStyle, FileOutcome,
    FileReport, Placeholder,
};
pub use config::{PngCompression, ProcessingConfig, ServerConfig, ServerMessages};
pub use error::{CutoutError, ErrorStage, Result};
pub use inference::BackgroundRemover;
pub use models::{ModelSpec, PreprocessingConfig, ResizeMode};
pub use processor::CutoutProcessor;
pub use server::{routes, serve, AppState};
pub use services::{ImageIOService, TransparentTrimmer, TrimOptions};
pub use types::{BoundingBox, ProcessedImage, ProcessingTimings};
pub use utils::{CanvasPlacement, ImagePreprocessor, SegmentationMask};

pub use tracing_config::{spans, TracingConfig, TracingFormat};
