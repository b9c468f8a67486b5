//! Error types for cutout and backfill operations

use thiserror::Error;

/// Result type alias for cutout operations
pub type Result<T> = std::result::Result<T, CutoutError>;

/// Error types for the processing pipeline, the HTTP layer and the backfill tool
#[derive(Error, Debug)]
pub enum CutoutError {
    /// Uploaded bytes could not be decoded as an image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Request validation failures (missing or empty upload field, oversized upload)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failure inside the background removal call or another processing step
    #[error("Processing error: {0}")]
    Processing(String),

    /// Backend inference errors
    #[error("Inference error: {0}")]
    Inference(String),

    /// Model loading or initialization errors
    #[error("Model error: {0}")]
    Model(String),

    /// PNG encoding errors
    #[error("Encoding error: {0}")]
    Encode(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data file does not have the expected shape
    #[error("Backfill error: {0}")]
    Backfill(String),
}

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    Decode,
    Validation,
    Removal,
    Encode,
    Setup,
    Storage,
}

impl CutoutError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new encoding error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new backfill error
    pub fn backfill<S: Into<String>>(msg: S) -> Self {
        Self::Backfill(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Stage of the pipeline this error belongs to
    #[must_use]
    pub fn stage(&self) -> ErrorStage {
        match self {
            Self::Decode(_) => ErrorStage::Decode,
            Self::Validation(_) => ErrorStage::Validation,
            Self::Processing(_) | Self::Inference(_) => ErrorStage::Removal,
            Self::Encode(_) => ErrorStage::Encode,
            Self::Model(_) | Self::InvalidConfig(_) => ErrorStage::Setup,
            Self::Io(_) | Self::Json(_) | Self::Backfill(_) => ErrorStage::Storage,
        }
    }

    /// Whether the error was caused by the client's request rather than the server
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
