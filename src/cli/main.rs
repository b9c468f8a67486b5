//! Entry points for the `wordcard-cutout` and `update-placeholders` binaries

use super::config::CliConfigBuilder;
use crate::{
    backfill::{run_backfill_with, BackfillConfig},
    inference::BackgroundRemover,
    processor::CutoutProcessor,
    server::{self, AppState},
    tracing_config::TracingConfig,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

/// Background removal service for word card images
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "wordcard-cutout")]
pub struct Cli {
    /// Interface to bind
    #[arg(long, env = "WORDCARD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "WORDCARD_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Segmentation model: a folder with model.onnx (and preprocessor_config.json) or an .onnx file
    #[arg(short, long, env = "WORDCARD_MODEL", value_name = "PATH")]
    pub model: PathBuf,

    /// Longest side, in pixels, an upload is downscaled to
    #[arg(long, env = "WORDCARD_MAX_DIMENSION", default_value_t = crate::config::DEFAULT_MAX_DIMENSION)]
    pub max_dimension: u32,

    /// Largest accepted upload, in megabytes
    #[arg(long, env = "WORDCARD_MAX_UPLOAD_MB", default_value_t = 5)]
    pub max_upload_mb: u64,

    /// Name reported by GET /health
    #[arg(long, env = "WORDCARD_SERVICE_NAME", default_value = "rembg-api")]
    pub service_name: String,

    /// PNG compression level for responses
    #[arg(long, value_enum, default_value_t = CliPngCompression::Best)]
    pub png_compression: CliPngCompression,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, env = "WORDCARD_LOG_FORMAT", default_value_t = LogFormat::Console)]
    pub log_format: LogFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum LogFormat {
    Console,
    Compact,
    /// Requires the `tracing-json` feature
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliPngCompression {
    Fast,
    Default,
    Best,
}

/// Run the HTTP service until Ctrl-C
pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    CliConfigBuilder::tracing_config(&cli)?
        .init()
        .context("Failed to initialize tracing")?;

    let processing = CliConfigBuilder::processing_config(&cli).context("Invalid processing options")?;
    let server_config = CliConfigBuilder::server_config(&cli).context("Invalid server options")?;

    tracing::info!(model = %cli.model.display(), "Loading background remover");
    let remover = load_remover(cli.model.clone()).await?;

    let processor = CutoutProcessor::new(processing, remover)?;
    let state = AppState::new(server_config, processor)?;

    server::serve(state).await.context("Server failed")
}

#[cfg(feature = "tract")]
async fn load_remover(model: PathBuf) -> Result<Arc<dyn BackgroundRemover>> {
    use crate::backends::TractBackend;

    let display = model.display().to_string();
    let backend = tokio::task::spawn_blocking(move || TractBackend::from_path(model))
        .await
        .context("Model loading task failed")?
        .with_context(|| format!("Failed to load model from {display}"))?;

    Ok(Arc::new(backend))
}

#[cfg(not(feature = "tract"))]
async fn load_remover(_model: PathBuf) -> Result<Arc<dyn BackgroundRemover>> {
    anyhow::bail!("No inference backend compiled in. Please rebuild with --features tract")
}

/// Backfill placeholder card images into the word libraries
///
/// Runs against `src/data/libraries` under the current directory and prints
/// one line per library.
pub fn update_placeholders() -> Result<()> {
    TracingConfig::new()
        .with_env_filter("warn")
        .init()
        .context("Failed to initialize tracing")?;

    let config = BackfillConfig::default();
    let summary = run_backfill_with(&config, |report| println!("{report}"))
        .context("Placeholder backfill failed")?;

    tracing::debug!(
        files = summary.reports.len(),
        skipped = summary.files_skipped(),
        filled = summary.total_filled(),
        "Backfill finished"
    );
    println!("Done!");

    Ok(())
}
