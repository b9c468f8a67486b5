//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliPngCompression, LogFormat};
use crate::{
    config::{PngCompression, ProcessingConfig, ServerConfig},
    tracing_config::{TracingConfig, TracingFormat},
};
use anyhow::{Context, Result};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Smallest request body accepted, whatever the upload limit
const MIN_REQUEST_BYTES: u64 = 10 * BYTES_PER_MB;

/// Convert CLI arguments to library configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    pub(crate) fn processing_config(cli: &Cli) -> Result<ProcessingConfig> {
        let compression = match cli.png_compression {
            CliPngCompression::Fast => PngCompression::Fast,
            CliPngCompression::Default => PngCompression::Default,
            CliPngCompression::Best => PngCompression::Best,
        };

        ProcessingConfig::builder()
            .max_dimension(cli.max_dimension)
            .png_compression(compression)
            .build()
            .context("Invalid processing configuration")
    }

    pub(crate) fn server_config(cli: &Cli) -> Result<ServerConfig> {
        if cli.max_upload_mb == 0 {
            anyhow::bail!("--max-upload-mb must be at least 1");
        }

        let max_upload_bytes = cli
            .max_upload_mb
            .checked_mul(BYTES_PER_MB)
            .context("--max-upload-mb is too large")?;

        let mut config = ServerConfig {
            host: cli.host.clone(),
            port: cli.port,
            service_name: cli.service_name.clone(),
            max_upload_bytes,
            max_request_bytes: max_upload_bytes.saturating_mul(2).max(MIN_REQUEST_BYTES),
            ..ServerConfig::default()
        };
        config.messages.image_too_large =
            format!("图片太大，请上传{}MB以内的图片", cli.max_upload_mb);

        config.validate().context("Invalid server configuration")?;
        Ok(config)
    }

    pub(crate) fn tracing_config(cli: &Cli) -> Result<TracingConfig> {
        let format = match cli.log_format {
            LogFormat::Console => TracingFormat::Console,
            LogFormat::Compact => TracingFormat::Compact,
            #[cfg(feature = "tracing-json")]
            LogFormat::Json => TracingFormat::Json,
            #[cfg(not(feature = "tracing-json"))]
            LogFormat::Json => {
                anyhow::bail!("JSON logging requires the tracing-json feature")
            },
        };

        Ok(TracingConfig::new()
            .with_verbosity(cli.verbose)
            .with_format(format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["wordcard-cutout", "--model", "model.onnx"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_server_config_matches_library_defaults() {
        let config = CliConfigBuilder::server_config(&parse(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_upload_limit_scales_request_limit_and_message() {
        let config = CliConfigBuilder::server_config(&parse(&["--max-upload-mb", "8"])).unwrap();
        assert_eq!(config.max_upload_bytes, 8 * BYTES_PER_MB);
        assert_eq!(config.max_request_bytes, 16 * BYTES_PER_MB);
        assert!(config.messages.image_too_large.contains("8MB"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(CliConfigBuilder::server_config(&parse(&["--max-upload-mb", "0"])).is_err());
        assert!(CliConfigBuilder::server_config(&parse(&["--host", "localhost:80"])).is_err());
        assert!(CliConfigBuilder::processing_config(&parse(&["--max-dimension", "0"])).is_err());
    }

    #[test]
    fn test_processing_config_from_flags() {
        let config = CliConfigBuilder::processing_config(&parse(&[
            "--max-dimension",
            "640",
            "--png-compression",
            "fast",
        ]))
        .unwrap();
        assert_eq!(config.max_dimension, 640);
        assert_eq!(config.png_compression, PngCompression::Fast);
    }

    #[test]
    fn test_tracing_config_from_flags() {
        let config = CliConfigBuilder::tracing_config(&parse(&["-v", "--log-format", "compact"]))
            .unwrap();
        assert_eq!(config.verbosity, 1);
        assert_eq!(config.format, TracingFormat::Compact);
    }
}
