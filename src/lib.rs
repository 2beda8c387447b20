//! rust_barcode - Aztec and Code 128 barcode reading and writing
//!
//! A pure Rust library that locates and decodes barcodes in a binarized image
//! and renders text into the module pattern of a symbology:
//! - Aztec: bullseye detection, orientation, perspective sampling, Reed-Solomon
//!   correction of the mode message and the data layers
//! - Code 128: stateful row decoding with code sets A/B/C and function codes
//!
//! Image acquisition and thresholding are left to the caller; the entry points
//! take a [`BitMatrix`] where set bits are dark modules.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

mod debug;

/// Symbol decoding (Reed-Solomon, Code 128 rows, Aztec payloads)
pub mod decoder;
/// Symbol detection (Aztec bullseye, orientation, sampling)
pub mod detector;
/// Symbol writers and rendering
pub mod encoder;
/// Error types
pub mod error;
/// Core data structures (BitMatrix, BitArray, Content, results)
pub mod models;
/// Reader and writer capabilities and the multi-format dispatcher
pub mod reader;
/// Geometry helpers
pub mod utils;

pub use decoder::{AztecDecoder, Code128Reader, DecodingState};
pub use detector::{AztecDetector, DetectOptions, DetectorResult};
pub use encoder::{AztecCode, AztecWriter, Code128Writer};
pub use error::{CorrectionError, DecodeError, EncodeError, ErrorKind};
pub use models::{
    BarcodeFormat, BitArray, BitMatrix, Content, Decoded, FunctionCode, Point, SymbolMetadata,
    Token,
};
pub use reader::{
    AztecReader, DecodeHints, LinearReader, MatrixReader, MultiFormatReader, RowReader, Writer,
    encode,
};

/// Luminance below which a pixel counts as dark in [`decode_luma`]
pub const DEFAULT_THRESHOLD: u8 = 128;

/// Decode one symbol of any supported format
///
/// # Arguments
/// * `matrix` - Binarized image, set bits are dark
///
/// # Returns
/// The first symbol found, trying formats in [`BarcodeFormat::ALL`] order
pub fn decode(matrix: &BitMatrix) -> Result<Decoded, DecodeError> {
    MultiFormatReader::new().decode(matrix)
}

/// Decode a grayscale image thresholded at [`DEFAULT_THRESHOLD`]
pub fn decode_luma(image: &image::GrayImage) -> Result<Decoded, DecodeError> {
    decode(&BitMatrix::from_luma(image, DEFAULT_THRESHOLD))
}

/// Decode several images in parallel with default hints
pub fn decode_batch(images: &[BitMatrix]) -> Vec<Result<Decoded, DecodeError>> {
    MultiFormatReader::new().decode_batch(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty() {
        assert!(decode(&BitMatrix::new(10, 10)).is_err());
        assert!(decode(&BitMatrix::new(0, 0)).is_err());
    }

    #[test]
    fn test_luma_round_trip() {
        let matrix = encode(BarcodeFormat::Code128, "LUMA", 0, 20).unwrap();
        let decoded = decode_luma(&matrix.to_luma()).unwrap();
        assert_eq!(decoded.text, "LUMA");
        assert_eq!(decoded.format, BarcodeFormat::Code128);
    }
}
