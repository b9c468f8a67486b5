//! Word card background removal service
//!
//! Serves `GET /health` and `POST /remove-background` backed by a local
//! segmentation model.

#[cfg(feature = "cli")]
use wordcard_cutout::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
