//! Background removal backends
//!
//! - Tract backend (pure Rust ONNX inference, no external runtime)

#[cfg(feature = "tract")]
pub mod tract;

// Test doubles for pipeline and server tests
#[cfg(test)]
pub mod test_utils;

#[cfg(feature = "tract")]
pub use self::tract::TractBackend;
