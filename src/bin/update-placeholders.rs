//! Backfill placeholder card images into the word library data files
//!
//! Run from the project root; takes no arguments.

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    wordcard_cutout::cli::update_placeholders()
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
