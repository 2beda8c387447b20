//! Aztec symbol detection
//!
//! This module contains the matrix path from a binary image to a module grid:
//! - Bullseye scanning and ring tracing
//! - Orientation marks and the mode message
//! - Perspective grid sampling

/// Aztec detector orchestrating the stages below
pub mod aztec;
/// Bullseye candidate scan and ring tracing
pub mod bullseye;
/// Orientation marks and mode message decoding
pub mod orientation;
/// Module grid sampling through a perspective transform
pub mod sampler;

pub use aztec::{AztecDetector, DetectOptions, DetectorResult};
