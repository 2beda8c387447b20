//! Environment-tunable defaults, parsed once per process.

use std::sync::OnceLock;

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(default)
}

static MAX_FINDER_CANDIDATES: OnceLock<usize> = OnceLock::new();

/// Upper bound on bullseye candidates examined per image
pub fn max_finder_candidates() -> usize {
    *MAX_FINDER_CANDIDATES
        .get_or_init(|| parse_env_usize("BARCODE_MAX_FINDER_CANDIDATES", 24).clamp(1, 256))
}

static REPROJECTION_TOLERANCE: OnceLock<f32> = OnceLock::new();

/// Largest accepted re-projection error of the symbol centre, in modules
pub fn reprojection_tolerance() -> f32 {
    *REPROJECTION_TOLERANCE
        .get_or_init(|| parse_env_f32("BARCODE_REPROJECTION_TOLERANCE", 1.0))
}

static ROW_STEP: OnceLock<usize> = OnceLock::new();

/// Distance between scanned rows for linear symbols; 0 picks height / 32
pub fn row_step() -> usize {
    *ROW_STEP.get_or_init(|| parse_env_usize("BARCODE_ROW_STEP", 0))
}

static MIN_LINE_COUNT: OnceLock<usize> = OnceLock::new();

/// Rows that must agree before a linear result is reported
pub fn min_line_count() -> usize {
    *MIN_LINE_COUNT.get_or_init(|| parse_env_usize("BARCODE_MIN_LINE_COUNT", 1).max(1))
}

static AZTEC_MIN_EC_PERCENT: OnceLock<usize> = OnceLock::new();

/// Minimum share of an Aztec symbol spent on check words
pub fn aztec_min_ec_percent() -> usize {
    *AZTEC_MIN_EC_PERCENT
        .get_or_init(|| parse_env_usize("BARCODE_AZTEC_MIN_EC_PERCENT", 33).clamp(5, 95))
}
