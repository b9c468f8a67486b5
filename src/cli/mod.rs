//! CLI module for the wordcard-cutout binaries
//!
//! This module is only available when the "cli" feature is enabled.

mod config;
#[path = "main.rs"]
mod main_impl;

pub use main_impl::{main, update_placeholders, Cli, CliPngCompression, LogFormat};
