//! Tract backend implementation for background removal models
//!
//! Runs ONNX segmentation models (`ISNet` and friends) with Tract, a pure Rust
//! inference engine, so the service has no native runtime dependency. The
//! model is loaded and optimized once; `run` takes `&self`, so one backend is
//! shared by every request.

use crate::error::{CutoutError, Result};
use crate::inference::BackgroundRemover;
use crate::models::ModelSpec;
use crate::utils::{CanvasPlacement, ImagePreprocessor, SegmentationMask};
use image::{RgbImage, RgbaImage};
use instant::{Duration, Instant};
use ndarray::Array4;
use std::path::Path;
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tract backend for running segmentation models using pure Rust inference
pub struct TractBackend {
    model: TractModel,
    spec: ModelSpec,
    load_time: Duration,
}

impl std::fmt::Debug for TractBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TractBackend")
            .field("spec", &self.spec)
            .field("load_time", &self.load_time)
            .finish_non_exhaustive()
    }
}

impl TractBackend {
    /// Resolve a model directory or file and load it
    ///
    /// # Errors
    /// - Model path cannot be resolved
    /// - ONNX parsing, optimization or plan creation failures
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(ModelSpec::load(path)?)
    }

    /// Load and optimize the model described by `spec`
    ///
    /// # Errors
    /// - ONNX parsing, optimization or plan creation failures
    pub fn load(spec: ModelSpec) -> Result<Self> {
        let model_load_start = Instant::now();
        let [height, width] = spec.preprocessing.target_size;

        tracing::info!(
            model = %spec.name,
            path = %spec.model_path.display(),
            input_width = width,
            input_height = height,
            "Loading segmentation model with Tract"
        );

        let model = onnx()
            .model_for_path(&spec.model_path)
            .map_err(|e| CutoutError::model(format!("Failed to load ONNX model: {e}")))?
            .with_input_fact(0, f32::fact([1, 3, height as usize, width as usize]).into())
            .map_err(|e| CutoutError::model(format!("Failed to set model input shape: {e}")))?
            .into_optimized()
            .map_err(|e| CutoutError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| CutoutError::model(format!("Failed to create runnable model: {e}")))?;

        let load_time = model_load_start.elapsed();
        tracing::info!(
            model = %spec.name,
            load_ms = load_time.as_millis() as u64,
            "Tract backend ready"
        );

        Ok(Self {
            model,
            spec,
            load_time,
        })
    }

    /// Run the model on a preprocessed NCHW tensor
    ///
    /// # Errors
    /// - Tensor conversion failures
    /// - Tract inference failures
    /// - Output that is not a 3D or 4D float tensor
    pub fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let inference_start = Instant::now();

        let data = input
            .as_slice()
            .ok_or_else(|| CutoutError::inference("Input tensor is not contiguous"))?;
        let input_tensor = Tensor::from_shape(input.shape(), data)
            .map_err(|e| CutoutError::inference(format!("Failed to build input tensor: {e}")))?;

        let outputs = self
            .model
            .run(tvec![input_tensor.into()])
            .map_err(|e| CutoutError::inference(format!("Tract inference failed: {e}")))?;

        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| CutoutError::inference("No output tensor found"))?;
        let view = output.to_array_view::<f32>().map_err(|e| {
            CutoutError::inference(format!("Failed to convert output tensor: {e}"))
        })?;

        let shape = match *view.shape() {
            [n, c, h, w] => (n, c, h, w),
            [n, h, w] => (n, 1, h, w),
            ref other => {
                return Err(CutoutError::inference(format!(
                    "Expected 3D or 4D output tensor, got shape {:?}",
                    other
                )))
            },
        };

        let output_array = Array4::from_shape_vec(shape, view.iter().copied().collect())
            .map_err(|e| CutoutError::inference(format!("Failed to reshape output tensor: {e}")))?;

        tracing::debug!(
            input_shape = ?input.shape(),
            output_shape = ?output_array.shape(),
            inference_ms = inference_start.elapsed().as_millis() as u64,
            "Tract inference completed"
        );

        Ok(output_array)
    }
}

impl BackgroundRemover for TractBackend {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();

        let (input, placement) =
            ImagePreprocessor::preprocess_for_inference(image, &self.spec.preprocessing)?;
        tracing::trace!(
            mode = ?self.spec.preprocessing.resize_mode,
            scale_x = placement.scale_x,
            scale_y = placement.scale_y,
            offset_x = placement.offset_x,
            offset_y = placement.offset_y,
            "Placed input on model canvas"
        );

        let output = self.infer(&input)?;

        // The mask may come back at a different resolution than the input canvas
        let (_, _, mask_height, mask_width) = output.dim();
        let mask_placement = CanvasPlacement::for_mode(
            self.spec.preprocessing.resize_mode,
            width,
            height,
            mask_width as u32,
            mask_height as u32,
        );
        let mask = SegmentationMask::from_tensor(&output, &mask_placement, (width, height))?;

        mask.apply(image)
    }
}

#[cfg(all(test, feature = "tract"))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_model_path_fails() {
        let dir = TempDir::new().unwrap();
        let result = TractBackend::from_path(dir.path().join("nope"));
        assert!(matches!(result, Err(CutoutError::Model(_))));
    }

    #[test]
    fn test_invalid_onnx_bytes_fail_gracefully() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("model.onnx"), b"definitely not protobuf").unwrap();

        let result = TractBackend::from_path(dir.path());
        let error = result.unwrap_err();
        assert!(error.to_string().contains("Model error"));
    }
}
