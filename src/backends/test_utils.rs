//! Test doubles implementing `BackgroundRemover`
//!
//! These let the pipeline and server be exercised without model files.

use crate::{
    error::{CutoutError, Result},
    inference::BackgroundRemover,
};
use image::{Rgba, RgbImage, RgbaImage};
use std::sync::{Arc, Mutex};

/// Keeps every pixel, fully opaque
#[derive(Debug, Clone, Default)]
pub struct OpaqueRemover;

impl BackgroundRemover for OpaqueRemover {
    fn name(&self) -> &str {
        "opaque"
    }

    fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        Ok(RgbaImage::from_fn(width, height, |x, y| {
            let pixel = image.get_pixel(x, y);
            Rgba([pixel[0], pixel[1], pixel[2], 255])
        }))
    }
}

/// Treats pure white as background and everything else as subject
#[derive(Debug, Clone, Default)]
pub struct WhiteKeyRemover;

impl BackgroundRemover for WhiteKeyRemover {
    fn name(&self) -> &str {
        "white-key"
    }

    fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        Ok(RgbaImage::from_fn(width, height, |x, y| {
            let pixel = image.get_pixel(x, y);
            if pixel.0 == [255, 255, 255] {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([pixel[0], pixel[1], pixel[2], 255])
            }
        }))
    }
}

/// Always fails, like a model that crashed mid-inference
#[derive(Debug, Clone)]
pub struct FailingRemover {
    message: String,
}

impl FailingRemover {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl BackgroundRemover for FailingRemover {
    fn name(&self) -> &str {
        "failing"
    }

    fn remove_background(&self, _image: &RgbImage) -> Result<RgbaImage> {
        Err(CutoutError::inference(self.message.clone()))
    }
}

/// Records the dimensions of every image it receives, then delegates
#[derive(Debug, Clone)]
pub struct RecordingRemover<R> {
    inner: R,
    calls: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl<R: BackgroundRemover> RecordingRemover<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Dimensions seen so far, in call order
    pub fn calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl<R: BackgroundRemover> BackgroundRemover for RecordingRemover<R> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(image.dimensions());
        }
        self.inner.remove_background(image)
    }
}
