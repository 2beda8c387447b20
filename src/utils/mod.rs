//! Utility functions
//!
//! Geometry helpers for the detector: perspective transforms and polygon checks.

/// Perspective transforms and polygon checks
pub mod geometry;
