//! Model discovery and preprocessing metadata
//!
//! A model is either a bare `.onnx` file or a directory in the `HuggingFace`
//! layout (`onnx/model.onnx` next to `preprocessor_config.json`). When no
//! preprocessor config is present the `ISNet` defaults are used.

use crate::error::{CutoutError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File names probed inside a model directory, in order
const MODEL_FILE_CANDIDATES: [&str; 4] = [
    "model.onnx",
    "onnx/model.onnx",
    "model_fp32.onnx",
    "onnx/model_fp32.onnx",
];

const PREPROCESSOR_CONFIG_FILE: &str = "preprocessor_config.json";

/// Pixel rescale applied before normalization when `do_rescale` is on
pub const DEFAULT_RESCALE_FACTOR: f32 = 1.0 / 255.0;

/// How an image is fitted into the model input canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    /// Resize to the canvas size, ignoring aspect ratio
    #[default]
    Stretch,
    /// Keep aspect ratio and pad the rest of the canvas with white
    Letterbox,
}

/// Input preprocessing parameters expected by a segmentation model
///
/// Each input channel becomes `(pixel * rescale_factor - mean) / std`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Model input size as `[height, width]`
    pub target_size: [u32; 2],
    /// Multiplier applied to raw 0-255 pixel values (1.0 disables rescaling)
    pub rescale_factor: f32,
    /// Per-channel mean on the rescaled pixel scale
    pub normalization_mean: [f32; 3],
    /// Per-channel standard deviation on the rescaled pixel scale
    pub normalization_std: [f32; 3],
    pub resize_mode: ResizeMode,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            target_size: [1024, 1024],
            rescale_factor: DEFAULT_RESCALE_FACTOR,
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
            resize_mode: ResizeMode::Stretch,
        }
    }
}

impl PreprocessingConfig {
    /// Parse a `HuggingFace` `preprocessor_config.json` document
    ///
    /// `do_rescale: false` feeds raw 0-255 pixels to the normalization, so
    /// mean and std are taken on that scale. When the key is absent, configs
    /// whose mean or std exceed 1.0 are read as 0-255 and the rest as 0-1.
    /// `rescale_factor` overrides the default 1/255. `do_pad: true` selects
    /// letterboxing, otherwise inputs are stretched.
    ///
    /// # Errors
    /// - Missing or malformed `size`, `image_mean` or `image_std`
    /// - Non-positive standard deviation
    pub fn from_huggingface(preprocessor: &serde_json::Value) -> Result<Self> {
        let size = preprocessor
            .get("size")
            .ok_or_else(|| CutoutError::invalid_config("Missing size in preprocessor config"))?;

        let height = Self::parse_dimension(size, "height")?;
        let width = Self::parse_dimension(size, "width")?;

        let normalization_mean = Self::parse_channels(preprocessor, "image_mean")?;
        let normalization_std = Self::parse_channels(preprocessor, "image_std")?;

        if normalization_std.iter().any(|std| *std <= 0.0) {
            return Err(CutoutError::invalid_config(
                "image_std values must be positive",
            ));
        }

        let do_rescale = match preprocessor.get("do_rescale") {
            None | Some(serde_json::Value::Null) => normalization_mean
                .iter()
                .chain(normalization_std.iter())
                .all(|value| *value <= 1.0),
            Some(value) => value.as_bool().ok_or_else(|| {
                CutoutError::invalid_config("do_rescale must be a boolean")
            })?,
        };

        let rescale_factor = if do_rescale {
            match preprocessor.get("rescale_factor").and_then(serde_json::Value::as_f64) {
                Some(factor) if factor > 0.0 => factor as f32,
                Some(factor) => {
                    return Err(CutoutError::config_value_error(
                        "rescale_factor",
                        factor,
                        "> 0",
                    ))
                },
                None => DEFAULT_RESCALE_FACTOR,
            }
        } else {
            1.0
        };

        let resize_mode = if preprocessor
            .get("do_pad")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
        {
            ResizeMode::Letterbox
        } else {
            ResizeMode::Stretch
        };

        Ok(Self {
            target_size: [height, width],
            rescale_factor,
            normalization_mean,
            normalization_std,
            resize_mode,
        })
    }

    fn parse_dimension(size: &serde_json::Value, key: &str) -> Result<u32> {
        let value = size
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| {
                CutoutError::invalid_config(format!("Missing size.{key} in preprocessor config"))
            })?;

        match u32::try_from(value) {
            Ok(dimension) if dimension > 0 => Ok(dimension),
            _ => Err(CutoutError::config_value_error(
                &format!("size.{key}"),
                value,
                "1-4294967295",
            )),
        }
    }

    fn parse_channels(preprocessor: &serde_json::Value, key: &str) -> Result<[f32; 3]> {
        let values = preprocessor
            .get(key)
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| {
                CutoutError::invalid_config(format!("Missing {key} in preprocessor config"))
            })?;

        let mut channels = [0.0_f32; 3];
        for (index, channel) in channels.iter_mut().enumerate() {
            let raw = values
                .get(index)
                .and_then(serde_json::Value::as_f64)
                .ok_or_else(|| {
                    CutoutError::invalid_config(format!("{key} must have at least 3 numbers"))
                })?;
            *channel = raw as f32;
        }
        Ok(channels)
    }
}

/// A resolved model file together with its preprocessing parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    /// Display name used in logs
    pub name: String,
    /// Path to the ONNX file
    pub model_path: PathBuf,
    pub preprocessing: PreprocessingConfig,
}

impl ModelSpec {
    /// Resolve a model from a directory or a single `.onnx` file
    ///
    /// # Errors
    /// - Path does not exist
    /// - No model file found in the directory
    /// - Unreadable or invalid `preprocessor_config.json`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::from_dir(path)
        } else if path.is_file() {
            Ok(Self::from_file(path))
        } else {
            Err(CutoutError::model(format!(
                "Model path '{}' does not exist",
                path.display()
            )))
        }
    }

    /// Use a bare ONNX file with default preprocessing
    #[must_use]
    pub fn from_file(path: &Path) -> Self {
        Self {
            name: Self::display_name(path),
            model_path: path.to_path_buf(),
            preprocessing: PreprocessingConfig::default(),
        }
    }

    /// Resolve a model directory
    ///
    /// # Errors
    /// - No model file among the known candidates
    /// - Unreadable or invalid `preprocessor_config.json`
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let model_path = MODEL_FILE_CANDIDATES
            .iter()
            .map(|candidate| dir.join(candidate))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                CutoutError::model(format!(
                    "No model file found in '{}'. Expected one of: {}",
                    dir.display(),
                    MODEL_FILE_CANDIDATES.join(", ")
                ))
            })?;

        let preprocessor_path = dir.join(PREPROCESSOR_CONFIG_FILE);
        let preprocessing = if preprocessor_path.is_file() {
            let content = fs::read_to_string(&preprocessor_path).map_err(|e| {
                CutoutError::file_io_error("read preprocessor config", &preprocessor_path, &e)
            })?;
            let preprocessor: serde_json::Value = serde_json::from_str(&content)?;
            PreprocessingConfig::from_huggingface(&preprocessor)?
        } else {
            tracing::debug!(
                dir = %dir.display(),
                "No preprocessor config found, using ISNet defaults"
            );
            PreprocessingConfig::default()
        };

        Ok(Self {
            name: Self::display_name(dir),
            model_path,
            preprocessing,
        })
    }

    fn display_name(path: &Path) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }
}
