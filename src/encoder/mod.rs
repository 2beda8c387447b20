//! Symbol writers
//!
//! - Code 128 code set selection and module patterns
//! - Aztec high-level encoding, layer selection and symbol layout
//! - Module-to-pixel rendering shared by both

/// Aztec writer
pub mod aztec;
/// Code 128 writer
pub mod code128;
/// Module-to-pixel rendering
pub mod render;

pub use aztec::{AztecCode, AztecWriter};
pub use code128::Code128Writer;
