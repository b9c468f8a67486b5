//! Stateless services used by the cutout pipeline

pub mod io;
pub mod trim;

pub use io::ImageIOService;
pub use trim::{TransparentTrimmer, TrimOptions};
