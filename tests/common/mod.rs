//! Shared test doubles and image helpers

#![allow(dead_code)]

use image::{DynamicImage, Rgba, RgbImage, RgbaImage};
use std::sync::Arc;
use wordcard_cutout::{
    BackgroundRemover, CutoutError, CutoutProcessor, ImageIOService, PngCompression,
    ProcessingConfig, Result,
};

/// Keeps a centered disc of radius `min(w, h) / 4`; everything else becomes transparent
#[derive(Debug, Default)]
pub struct CircleRemover;

impl BackgroundRemover for CircleRemover {
    fn name(&self) -> &str {
        "circle"
    }

    fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        let (cx, cy) = (i64::from(width / 2), i64::from(height / 2));
        let radius = i64::from(width.min(height) / 4);

        Ok(RgbaImage::from_fn(width, height, |x, y| {
            let (dx, dy) = (i64::from(x) - cx, i64::from(y) - cy);
            if dx * dx + dy * dy <= radius * radius {
                let pixel = image.get_pixel(x, y);
                Rgba([pixel[0], pixel[1], pixel[2], 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        }))
    }
}

/// Returns a fully transparent image of the input size
#[derive(Debug, Default)]
pub struct VanishingRemover;

impl BackgroundRemover for VanishingRemover {
    fn name(&self) -> &str {
        "vanishing"
    }

    fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage> {
        Ok(RgbaImage::new(image.width(), image.height()))
    }
}

/// Message carried by every `FailingRemover` error
pub const REMOVER_FAILURE: &str = "segmentation model crashed";

/// Fails every call, like a model that cannot run
#[derive(Debug, Default)]
pub struct FailingRemover;

impl BackgroundRemover for FailingRemover {
    fn name(&self) -> &str {
        "failing"
    }

    fn remove_background(&self, _image: &RgbImage) -> Result<RgbaImage> {
        Err(CutoutError::inference(REMOVER_FAILURE))
    }
}

pub fn processor<R: BackgroundRemover + 'static>(remover: R) -> CutoutProcessor {
    CutoutProcessor::new(ProcessingConfig::default(), Arc::new(remover)).unwrap()
}

/// Gradient test picture so resampling has something to work on
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    ImageIOService::encode_png(image, PngCompression::Fast).unwrap()
}

pub fn jpeg_bytes(image: &DynamicImage) -> Vec<u8> {
    encoded_bytes(image, image::ImageFormat::Jpeg)
}

pub fn encoded_bytes(image: &DynamicImage, format: image::ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}
