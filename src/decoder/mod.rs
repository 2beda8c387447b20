//! Symbol decoding modules
//!
//! Everything that turns sampled modules or scanned rows into content:
//! - Error correction (Reed-Solomon over GF(2^m))
//! - Code 128 row decoding and its per-row state
//! - Aztec codeword extraction and high-level mode machine

/// Aztec payload decoder (layers, codewords, modes)
pub mod aztec;
/// Code 128 row decoder
pub mod code128;
/// Environment-tunable defaults
pub mod config;
/// Galois field arithmetic tables
pub mod galois;
/// Reed-Solomon error correction
pub mod reed_solomon;
/// State threaded through successive row decodes
pub mod state;
/// Code 128 pattern and value tables
pub mod tables;

pub use aztec::AztecDecoder;
pub use code128::Code128Reader;
pub use state::DecodingState;
