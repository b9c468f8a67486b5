//! Configuration types for the cutout pipeline and the HTTP service

use crate::error::{CutoutError, Result};
use serde::{Deserialize, Serialize};

/// Longest side allowed before an upload is downscaled
pub const DEFAULT_MAX_DIMENSION: u32 = 800;

/// Minimum padding (in pixels) kept around the trimmed subject
pub const DEFAULT_PADDING_FLOOR: u32 = 5;

/// Padding as a fraction of the subject's bounding box width
pub const DEFAULT_PADDING_RATIO: f32 = 0.05;

/// PNG compression level used for the final encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PngCompression {
    /// Fast compression, larger output
    Fast,
    /// Encoder default balance
    Default,
    /// Slowest, smallest output
    #[default]
    Best,
}

impl std::fmt::Display for PngCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Default => write!(f, "default"),
            Self::Best => write!(f, "best"),
        }
    }
}

/// Configuration for the image pre/post-processing pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Images whose longest side exceeds this are downscaled to it
    pub max_dimension: u32,

    /// Minimum padding around the trimmed subject, in pixels
    pub padding_floor: u32,

    /// Padding relative to the subject's bounding box width
    pub padding_ratio: f32,

    /// Compression level for the PNG output
    pub png_compression: PngCompression,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            padding_floor: DEFAULT_PADDING_FLOOR,
            padding_ratio: DEFAULT_PADDING_RATIO,
            png_compression: PngCompression::Best,
        }
    }
}

impl ProcessingConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> ProcessingConfigBuilder {
        ProcessingConfigBuilder::new()
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// - `max_dimension` is zero
    /// - `padding_ratio` is not a finite value within 0.0-1.0
    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 {
            return Err(CutoutError::config_value_error(
                "max dimension",
                self.max_dimension,
                "1-",
            ));
        }
        if !self.padding_ratio.is_finite() || !(0.0..=1.0).contains(&self.padding_ratio) {
            return Err(CutoutError::config_value_error(
                "padding ratio",
                self.padding_ratio,
                "0.0-1.0",
            ));
        }
        Ok(())
    }
}

/// Builder for `ProcessingConfig`
#[derive(Debug, Default)]
pub struct ProcessingConfigBuilder {
    config: ProcessingConfig,
}

impl ProcessingConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_dimension(mut self, max_dimension: u32) -> Self {
        self.config.max_dimension = max_dimension;
        self
    }

    #[must_use]
    pub fn padding_floor(mut self, padding_floor: u32) -> Self {
        self.config.padding_floor = padding_floor;
        self
    }

    #[must_use]
    pub fn padding_ratio(mut self, padding_ratio: f32) -> Self {
        self.config.padding_ratio = padding_ratio;
        self
    }

    #[must_use]
    pub fn png_compression(mut self, compression: PngCompression) -> Self {
        self.config.png_compression = compression;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// Returns `CutoutError::InvalidConfig` when validation fails
    pub fn build(self) -> Result<ProcessingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// User-facing error messages returned by the HTTP service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMessages {
    pub no_image: String,
    pub empty_filename: String,
    pub image_too_large: String,
    pub processing_failed: String,
}

impl Default for ServerMessages {
    fn default() -> Self {
        Self {
            no_image: "没有上传图片".to_string(),
            empty_filename: "文件名为空".to_string(),
            image_too_large: "图片太大，请上传5MB以内的图片".to_string(),
            processing_failed: "处理失败".to_string(),
        }
    }
}

/// Configuration for the HTTP service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Name reported by `GET /health`
    pub service_name: String,
    /// Largest accepted `image` part, in bytes
    pub max_upload_bytes: u64,
    /// Largest accepted multipart request body, in bytes
    pub max_request_bytes: u64,
    /// Error messages sent to clients
    pub messages: ServerMessages,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            service_name: "rembg-api".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            max_request_bytes: 10 * 1024 * 1024,
            messages: ServerMessages::default(),
        }
    }
}

impl ServerConfig {
    /// Resolve the socket address to bind
    ///
    /// # Errors
    /// Returns `CutoutError::InvalidConfig` if the host is not an IP address
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr> {
        let ip: std::net::IpAddr = self.host.parse().map_err(|e| {
            CutoutError::invalid_config(format!("Invalid host '{}': {}", self.host, e))
        })?;
        Ok(std::net::SocketAddr::new(ip, self.port))
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// - Upload limit is zero or larger than the request limit
    /// - Service name is empty
    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(CutoutError::invalid_config(
                "Upload limit must be greater than zero",
            ));
        }
        if self.max_upload_bytes > self.max_request_bytes {
            return Err(CutoutError::invalid_config(format!(
                "Upload limit ({} bytes) exceeds request limit ({} bytes)",
                self.max_upload_bytes, self.max_request_bytes
            )));
        }
        if self.service_name.trim().is_empty() {
            return Err(CutoutError::invalid_config("Service name must not be empty"));
        }
        self.socket_addr().map(|_| ())
    }
}
