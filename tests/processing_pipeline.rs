//! End-to-end pipeline behavior with test removers

mod common;

use common::{
    encoded_bytes, gradient, jpeg_bytes, png_bytes, processor, CircleRemover, VanishingRemover,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use wordcard_cutout::{ErrorStage, ImageIOService, TransparentTrimmer, TrimOptions};

#[test]
fn small_upload_keeps_its_size() {
    let processor = processor(VanishingRemover);
    let result = processor
        .process_bytes(&png_bytes(&gradient(640, 480)))
        .unwrap();

    assert_eq!(result.original_dimensions, (640, 480));
    assert_eq!(result.resized_dimensions, (640, 480));
    // Nothing visible, so nothing is trimmed
    assert_eq!(result.output_dimensions, (640, 480));
}

#[test]
fn large_upload_is_downscaled_to_800() {
    let processor = processor(VanishingRemover);

    let landscape = processor
        .process_bytes(&jpeg_bytes(&gradient(1600, 1200)))
        .unwrap();
    assert_eq!(landscape.resized_dimensions, (800, 600));

    let portrait = processor.process_image(gradient(500, 2000)).unwrap();
    assert_eq!(portrait.resized_dimensions, (200, 800));
}

#[test]
fn gif_and_bmp_uploads_are_decoded() {
    let processor = processor(CircleRemover);

    for format in [ImageFormat::Gif, ImageFormat::Bmp] {
        let bytes = encoded_bytes(&gradient(120, 90), format);
        let result = processor
            .process_bytes(&bytes)
            .unwrap_or_else(|e| panic!("{format:?} upload failed: {e}"));

        assert_eq!(result.original_dimensions, (120, 90), "{format:?}");
        assert_eq!(result.png.get(0..4), Some(&b"\x89PNG"[..]), "{format:?}");
    }
}

#[test]
fn aspect_ratio_survives_downscale() {
    let processor = processor(VanishingRemover);
    let result = processor.process_image(gradient(1234, 999)).unwrap();

    let (width, height) = result.resized_dimensions;
    assert_eq!(width, 800);
    let expected_height = 999.0 * 800.0 / 1234.0;
    assert!((f64::from(height) - expected_height).abs() <= 1.0);
}

#[test]
fn output_is_png_with_alpha_matching_reported_size() {
    let processor = processor(CircleRemover);
    let result = processor
        .process_bytes(&png_bytes(&gradient(300, 200)))
        .unwrap();

    assert_eq!(result.png.get(0..4), Some(&b"\x89PNG"[..]));
    let decoded = ImageIOService::decode_bytes(&result.png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), result.output_dimensions);
    assert!(decoded.color().has_alpha());
}

#[test]
fn cutout_is_trimmed_with_relative_padding() {
    let processor = processor(CircleRemover);
    let result = processor.process_image(gradient(400, 400)).unwrap();

    // Disc spans 201 px, so padding is round(0.05 * 201) = 10 on each side
    assert_eq!(result.output_dimensions, (221, 221));

    let decoded = ImageIOService::decode_bytes(&result.png).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(0, 0)[3], 0);
    assert_eq!(decoded.get_pixel(110, 110)[3], 255);
}

#[test]
fn trimming_the_output_again_changes_nothing() {
    let processor = processor(CircleRemover);
    let result = processor.process_image(gradient(400, 400)).unwrap();

    let decoded = ImageIOService::decode_bytes(&result.png).unwrap().to_rgba8();
    let again = TransparentTrimmer::trim(decoded.clone(), &TrimOptions::default());
    assert_eq!(again.dimensions(), decoded.dimensions());
}

#[test]
fn transparent_upload_is_composited_on_white() {
    // Half-transparent red reaches the remover as pink on white
    let upload = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 40, Rgba([255, 0, 0, 128])));
    let processor = processor(CircleRemover);
    let result = processor.process_image(upload).unwrap();

    let decoded = ImageIOService::decode_bytes(&result.png).unwrap().to_rgba8();
    let (width, height) = decoded.dimensions();
    assert_eq!(decoded.get_pixel(width / 2, height / 2), &Rgba([255, 127, 127, 255]));
}

#[test]
fn garbage_upload_is_a_decode_error() {
    let processor = processor(CircleRemover);
    let error = processor.process_bytes(b"GIF89a nope").unwrap_err();
    assert_eq!(error.stage(), ErrorStage::Decode);
}
