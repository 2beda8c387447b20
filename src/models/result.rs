use crate::models::{Content, Point};
use std::fmt;
use std::str::FromStr;

/// Symbologies known to the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarcodeFormat {
    /// Aztec 2D matrix
    Aztec,
    /// Code 128 linear
    Code128,
}

impl BarcodeFormat {
    /// Every supported format, in default dispatch order
    pub const ALL: [BarcodeFormat; 2] = [BarcodeFormat::Aztec, BarcodeFormat::Code128];

    /// Short lowercase name
    pub fn name(self) -> &'static str {
        match self {
            BarcodeFormat::Aztec => "aztec",
            BarcodeFormat::Code128 => "code128",
        }
    }

    /// Linear symbologies are decoded row by row
    pub fn is_linear(self) -> bool {
        matches!(self, BarcodeFormat::Code128)
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BarcodeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "aztec" => Ok(BarcodeFormat::Aztec),
            "code128" => Ok(BarcodeFormat::Code128),
            other => Err(format!("unknown barcode format: {other}")),
        }
    }
}

/// Symbology-specific facts about a decoded symbol
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolMetadata {
    /// Linear symbol found on a scan row
    Linear {
        /// Row the symbol was read from
        row: usize,
        /// Consecutive rows that produced the same content
        line_count: usize,
        /// Measured pixels per module
        module_width: f32,
    },
    /// Aztec matrix symbol
    Aztec {
        /// Compact (true) or full-range symbol
        compact: bool,
        /// Number of data layers
        layers: usize,
        /// Number of data codewords
        data_blocks: usize,
        /// Reader initialization symbol
        reader_init: bool,
        /// Codewords repaired by error correction
        errors_corrected: usize,
    },
}

/// Successfully decoded symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Symbology
    pub format: BarcodeFormat,
    /// Token stream with function codes preserved
    pub content: Content,
    /// Rendered text
    pub text: String,
    /// ISO/IEC 15424 symbology identifier, e.g. `]C1`
    pub symbology_identifier: String,
    /// Symbol outline in image coordinates (row endpoints for linear symbols)
    pub position: Vec<Point>,
    /// Symbology-specific facts
    pub metadata: SymbolMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!("Code-128".parse::<BarcodeFormat>(), Ok(BarcodeFormat::Code128));
        assert_eq!("aztec".parse::<BarcodeFormat>(), Ok(BarcodeFormat::Aztec));
        assert!("qr".parse::<BarcodeFormat>().is_err());
        assert_eq!(BarcodeFormat::Aztec.to_string(), "aztec");
        assert!(BarcodeFormat::Code128.is_linear());
    }
}
