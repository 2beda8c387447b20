//! Core data structures shared by readers and writers.

/// Bit sequence of one row or codeword stream
pub mod bit_array;
/// Decoded token stream
pub mod content;
/// Packed 2D module grid
pub mod matrix;
/// Image and grid coordinates
pub mod point;
/// Decode results and format identifiers
pub mod result;

pub use bit_array::BitArray;
pub use content::{Content, FunctionCode, Token};
pub use matrix::BitMatrix;
pub use point::{Point, PointI};
pub use result::{BarcodeFormat, Decoded, SymbolMetadata};
