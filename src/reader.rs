//! Reader and writer capabilities, and the multi-format dispatcher.
//!
//! Row readers ([`RowReader`]) decode one scanned line at a time and thread a
//! [`DecodingState`] between calls. Matrix readers ([`MatrixReader`]) take a
//! whole binarized image. [`LinearReader`] turns any row reader into a matrix
//! reader by scanning rows outward from the middle, and [`MultiFormatReader`]
//! dispatches over an ordered table of matrix readers.

use crate::debug::trace;
use crate::decoder::aztec::AztecDecoder;
use crate::decoder::code128::Code128Reader;
use crate::decoder::config;
use crate::decoder::state::DecodingState;
use crate::detector::{AztecDetector, DetectOptions};
use crate::encoder::{AztecWriter, Code128Writer};
use crate::error::{DecodeError, EncodeError};
use crate::models::{BarcodeFormat, BitArray, BitMatrix, Decoded, SymbolMetadata};
use rayon::prelude::*;
use std::fmt;

/// Decodes a symbology one scanned row at a time
pub trait RowReader: Send + Sync {
    /// Symbology this reader understands
    fn format(&self) -> BarcodeFormat;

    /// Fresh state to thread through [`RowReader::decode_row`]
    fn create_state(&self) -> DecodingState;

    /// Decode the first symbol found on `row`
    fn decode_row(
        &self,
        row_number: usize,
        row: &BitArray,
        state: &mut DecodingState,
    ) -> Result<Decoded, DecodeError>;
}

/// Decodes a symbology from a whole binarized image
pub trait MatrixReader: Send + Sync {
    /// Symbology this reader understands
    fn format(&self) -> BarcodeFormat;

    /// Locate and decode one symbol
    fn decode(&self, matrix: &BitMatrix) -> Result<Decoded, DecodeError>;
}

/// Renders text as a symbol
pub trait Writer {
    /// Symbology this writer produces
    fn format(&self) -> BarcodeFormat;

    /// Encode `text` (function codes as `U+00F1..U+00F4`) into at least
    /// `width` x `height` pixels
    fn encode(&self, text: &str, width: usize, height: usize) -> Result<BitMatrix, EncodeError>;
}

impl RowReader for Code128Reader {
    fn format(&self) -> BarcodeFormat {
        BarcodeFormat::Code128
    }

    fn create_state(&self) -> DecodingState {
        Code128Reader::create_state(self)
    }

    fn decode_row(
        &self,
        row_number: usize,
        row: &BitArray,
        state: &mut DecodingState,
    ) -> Result<Decoded, DecodeError> {
        Code128Reader::decode_row(self, row_number, row, state)
    }
}

impl Writer for Code128Writer {
    fn format(&self) -> BarcodeFormat {
        BarcodeFormat::Code128
    }

    fn encode(&self, text: &str, width: usize, height: usize) -> Result<BitMatrix, EncodeError> {
        Code128Writer::encode(self, text, width, height)
    }
}

impl Writer for AztecWriter {
    fn format(&self) -> BarcodeFormat {
        BarcodeFormat::Aztec
    }

    fn encode(&self, text: &str, width: usize, height: usize) -> Result<BitMatrix, EncodeError> {
        AztecWriter::encode(self, text, width, height)
    }
}

/// Decoding preferences
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeHints {
    /// Formats to try, in order
    pub formats: Vec<BarcodeFormat>,
    /// Render FNC1 as GS1 group separators in linear results
    pub assume_gs1: bool,
    /// Also try matrix symbols as their mirror image
    pub try_mirrored: bool,
    /// Rows that must agree before a linear result is reported
    pub min_line_count: usize,
    /// Distance between scanned rows; 0 picks height / 32
    pub row_step: usize,
}

impl Default for DecodeHints {
    fn default() -> Self {
        Self {
            formats: BarcodeFormat::ALL.to_vec(),
            assume_gs1: false,
            try_mirrored: true,
            min_line_count: config::min_line_count(),
            row_step: config::row_step(),
        }
    }
}

/// Aztec detection followed by payload decoding
#[derive(Debug, Clone, Copy)]
pub struct AztecReader {
    options: DetectOptions,
    try_mirrored: bool,
}

impl Default for AztecReader {
    fn default() -> Self {
        Self {
            options: DetectOptions::default(),
            try_mirrored: true,
        }
    }
}

impl AztecReader {
    /// Create a reader with default detection options
    pub fn new() -> Self {
        Self::default()
    }

    /// Retry as a mirror image when the plain reading fails
    pub fn with_mirrored(mut self, try_mirrored: bool) -> Self {
        self.try_mirrored = try_mirrored;
        self
    }

    /// Replace the detection options
    pub fn with_options(mut self, options: DetectOptions) -> Self {
        self.options = options;
        self
    }
}

impl MatrixReader for AztecReader {
    fn format(&self) -> BarcodeFormat {
        BarcodeFormat::Aztec
    }

    fn decode(&self, matrix: &BitMatrix) -> Result<Decoded, DecodeError> {
        let passes: &[bool] = if self.try_mirrored {
            &[false, true]
        } else {
            &[false]
        };
        let mut best: Option<DecodeError> = None;
        for &mirrored in passes {
            let detector = AztecDetector::with_options(DetectOptions {
                mirrored,
                ..self.options
            });
            let attempt = detector
                .detect(matrix)
                .and_then(|detected| AztecDecoder::new().decode(detected));
            match attempt {
                Ok(decoded) => return Ok(decoded),
                Err(err) => {
                    trace!("aztec reader: mirrored={} failed: {}", mirrored, err);
                    best = Some(match best {
                        Some(current) => current.most_specific(err),
                        None => err,
                    });
                }
            }
        }
        Err(best.unwrap_or(DecodeError::FinderNotFound))
    }
}

/// Scans image rows with a [`RowReader`]
#[derive(Debug, Clone)]
pub struct LinearReader<R> {
    reader: R,
    min_line_count: usize,
    row_step: usize,
}

impl<R: RowReader> LinearReader<R> {
    /// Scan with the configured row step and line count
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            min_line_count: config::min_line_count(),
            row_step: config::row_step(),
        }
    }

    /// Rows that must agree before a result is reported
    pub fn with_min_line_count(mut self, lines: usize) -> Self {
        self.min_line_count = lines.max(1);
        self
    }

    /// 0 picks height / 32
    pub fn with_row_step(mut self, step: usize) -> Self {
        self.row_step = step;
        self
    }

    fn row_step_for(&self, height: usize) -> usize {
        if self.row_step == 0 {
            (height / 32).max(1)
        } else {
            self.row_step
        }
    }
}

impl<R: RowReader> MatrixReader for LinearReader<R> {
    fn format(&self) -> BarcodeFormat {
        self.reader.format()
    }

    /// Rows are visited from the middle outward, alternating below and above.
    /// Each row is read forwards and reversed. Every side and direction keeps
    /// its own state, so agreeing lines are neighbours. Once a row decodes, its
    /// module width is handed to the rows after it as their scale.
    fn decode(&self, matrix: &BitMatrix) -> Result<Decoded, DecodeError> {
        let height = matrix.height();
        let width = matrix.width();
        let step = self.row_step_for(height);
        let middle = height / 2;

        // [below, above] x [forward, backward]
        let mut states: [[DecodingState; 2]; 2] =
            std::array::from_fn(|_| std::array::from_fn(|_| self.reader.create_state()));
        let mut scale: Option<f32> = None;
        let mut best: Option<DecodeError> = None;

        for x in 0..height {
            let offset = (x + 1) / 2 * step;
            let row_number = if x % 2 == 0 {
                Some(middle + offset)
            } else {
                middle.checked_sub(offset)
            };
            let Some(row_number) = row_number.filter(|&r| r < height) else {
                break;
            };

            let mut row = matrix.row(row_number);
            if let Some(scale) = scale {
                row = row.with_scale(scale);
            }
            let mut reversed = row.clone();
            reversed.reverse();

            let [forward, backward] = &mut states[x % 2];
            for (is_reversed, row, state) in [(false, &row, forward), (true, &reversed, backward)] {
                match self.reader.decode_row(row_number, row, state) {
                    Ok(mut decoded) => {
                        if is_reversed {
                            unreverse_position(&mut decoded, width);
                        }
                        let lines = match decoded.metadata {
                            SymbolMetadata::Linear {
                                line_count,
                                module_width,
                                ..
                            } => {
                                scale.get_or_insert(module_width);
                                line_count
                            }
                            SymbolMetadata::Aztec { .. } => 1,
                        };
                        if lines >= self.min_line_count {
                            trace!(
                                "linear reader: row {} accepted after {} agreeing lines",
                                row_number,
                                lines
                            );
                            return Ok(decoded);
                        }
                    }
                    Err(err) => {
                        best = Some(match best {
                            Some(current) => current.most_specific(err),
                            None => err,
                        });
                    }
                }
            }
        }
        Err(best.unwrap_or(DecodeError::StartPatternNotFound))
    }
}

/// Map row endpoints of a reversed read back to image columns
fn unreverse_position(decoded: &mut Decoded, width: usize) {
    for point in &mut decoded.position {
        point.x = width as f32 - point.x;
    }
    decoded.position.reverse();
}

/// Matrix reader for one format configured from `hints`
pub fn reader_for(format: BarcodeFormat, hints: &DecodeHints) -> Box<dyn MatrixReader> {
    match format {
        BarcodeFormat::Aztec => Box::new(AztecReader::new().with_mirrored(hints.try_mirrored)),
        BarcodeFormat::Code128 => Box::new(
            LinearReader::new(Code128Reader::new().with_gs1(hints.assume_gs1))
                .with_min_line_count(hints.min_line_count)
                .with_row_step(hints.row_step),
        ),
    }
}

/// Writer for one format with default settings
pub fn writer_for(format: BarcodeFormat) -> Box<dyn Writer> {
    match format {
        BarcodeFormat::Aztec => Box::new(AztecWriter::new()),
        BarcodeFormat::Code128 => Box::new(Code128Writer::new()),
    }
}

/// Encode `text` as `format` into at least `width` x `height` pixels
pub fn encode(
    format: BarcodeFormat,
    text: &str,
    width: usize,
    height: usize,
) -> Result<BitMatrix, EncodeError> {
    writer_for(format).encode(text, width, height)
}

/// Ordered dispatch table of matrix readers
pub struct MultiFormatReader {
    readers: Vec<Box<dyn MatrixReader>>,
}

impl Default for MultiFormatReader {
    fn default() -> Self {
        Self::with_hints(&DecodeHints::default())
    }
}

impl fmt::Debug for MultiFormatReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiFormatReader")
            .field("formats", &self.formats())
            .finish()
    }
}

impl MultiFormatReader {
    /// Dispatch over every supported format with default hints
    pub fn new() -> Self {
        Self::default()
    }

    /// One reader per requested format, in the hints' order
    pub fn with_hints(hints: &DecodeHints) -> Self {
        Self {
            readers: hints
                .formats
                .iter()
                .map(|&format| reader_for(format, hints))
                .collect(),
        }
    }

    /// Append a reader to the dispatch table
    pub fn with_reader(mut self, reader: Box<dyn MatrixReader>) -> Self {
        self.readers.push(reader);
        self
    }

    /// Formats in dispatch order
    pub fn formats(&self) -> Vec<BarcodeFormat> {
        self.readers.iter().map(|reader| reader.format()).collect()
    }

    /// First successful reader wins; otherwise the most specific failure
    pub fn decode(&self, matrix: &BitMatrix) -> Result<Decoded, DecodeError> {
        let mut best: Option<DecodeError> = None;
        for reader in &self.readers {
            match reader.decode(matrix) {
                Ok(decoded) => return Ok(decoded),
                Err(err) => {
                    trace!("dispatch: {} failed: {}", reader.format(), err);
                    best = Some(match best {
                        Some(current) => current.most_specific(err),
                        None => err,
                    });
                }
            }
        }
        Err(best.unwrap_or(DecodeError::FinderNotFound))
    }

    /// Decode independent images in parallel; results keep the input order
    pub fn decode_batch(&self, images: &[BitMatrix]) -> Vec<Result<Decoded, DecodeError>> {
        images.par_iter().map(|image| self.decode(image)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FunctionCode;

    fn mirror(matrix: &BitMatrix) -> BitMatrix {
        let mut out = BitMatrix::new(matrix.width(), matrix.height());
        for y in 0..matrix.height() {
            for x in 0..matrix.width() {
                if matrix.get(x, y) {
                    out.set(matrix.width() - 1 - x, y, true);
                }
            }
        }
        out
    }

    #[test]
    fn test_code128_through_dispatch() {
        let image = encode(BarcodeFormat::Code128, "Hello 128", 240, 40).unwrap();
        let decoded = MultiFormatReader::new().decode(&image).unwrap();
        assert_eq!(decoded.format, BarcodeFormat::Code128);
        assert_eq!(decoded.text, "Hello 128");
        assert_eq!(decoded.symbology_identifier, "]C0");
        assert_eq!(decoded.position.len(), 2);
        assert!(decoded.position[0].x < decoded.position[1].x);
    }

    #[test]
    fn test_reversed_row() {
        let image = mirror(&encode(BarcodeFormat::Code128, "BACKWARDS", 200, 8).unwrap());
        let reader = LinearReader::new(Code128Reader::new()).with_min_line_count(1);
        let decoded = reader.decode(&image).unwrap();
        assert_eq!(decoded.text, "BACKWARDS");
        assert!(decoded.position[0].x < decoded.position[1].x);
    }

    #[test]
    fn test_line_count_confirmation() {
        let image = encode(BarcodeFormat::Code128, "ROWS", 0, 1).unwrap();
        let strict = LinearReader::new(Code128Reader::new()).with_min_line_count(2);
        assert!(strict.decode(&image).is_err());

        let tall = encode(BarcodeFormat::Code128, "ROWS", 0, 10).unwrap();
        let decoded = strict.with_row_step(1).decode(&tall).unwrap();
        match decoded.metadata {
            SymbolMetadata::Linear { line_count, .. } => assert_eq!(line_count, 2),
            other => panic!("unexpected metadata {other:?}"),
        }
    }

    #[test]
    fn test_blank_rows_break_confirmation() {
        let mut image = encode(BarcodeFormat::Code128, "ROWS", 0, 8).unwrap();
        for y in (1..image.height()).step_by(2) {
            for x in 0..image.width() {
                image.set(x, y, false);
            }
        }
        let reader = LinearReader::new(Code128Reader::new())
            .with_min_line_count(2)
            .with_row_step(1);
        assert!(reader.decode(&image).is_err());
        assert!(reader.with_min_line_count(1).decode(&image).is_ok());
    }

    #[test]
    fn test_gs1_hint() {
        let image = encode(BarcodeFormat::Code128, "\u{f1}0112345678901231", 0, 10).unwrap();
        let hints = DecodeHints {
            formats: vec![BarcodeFormat::Code128],
            assume_gs1: true,
            ..DecodeHints::default()
        };
        let decoded = MultiFormatReader::with_hints(&hints).decode(&image).unwrap();
        assert_eq!(decoded.symbology_identifier, "]C1");
        assert_eq!(
            decoded.content.function_position(FunctionCode::Fnc1),
            Some(0)
        );
    }

    #[test]
    fn test_aztec_through_dispatch() {
        let image = encode(BarcodeFormat::Aztec, "Dispatch to Aztec", 120, 120).unwrap();
        let decoded = MultiFormatReader::new().decode(&image).unwrap();
        assert_eq!(decoded.format, BarcodeFormat::Aztec);
        assert_eq!(decoded.text, "Dispatch to Aztec");
        assert_eq!(decoded.position.len(), 4);
    }

    #[test]
    fn test_format_filter() {
        let image = encode(BarcodeFormat::Aztec, "only aztec", 100, 100).unwrap();
        let hints = DecodeHints {
            formats: vec![BarcodeFormat::Code128],
            ..DecodeHints::default()
        };
        let reader = MultiFormatReader::with_hints(&hints);
        assert_eq!(reader.formats(), vec![BarcodeFormat::Code128]);
        assert!(reader.decode(&image).is_err());
    }

    #[test]
    fn test_empty_table() {
        let hints = DecodeHints {
            formats: Vec::new(),
            ..DecodeHints::default()
        };
        let reader = MultiFormatReader::with_hints(&hints);
        assert_eq!(
            reader.decode(&BitMatrix::square(10)).unwrap_err(),
            DecodeError::FinderNotFound
        );
        let reader = reader.with_reader(reader_for(BarcodeFormat::Code128, &hints));
        assert_eq!(reader.formats(), vec![BarcodeFormat::Code128]);
    }

    #[test]
    fn test_decode_batch_keeps_order() {
        let images = vec![
            encode(BarcodeFormat::Code128, "first", 0, 12).unwrap(),
            BitMatrix::square(40),
            encode(BarcodeFormat::Aztec, "third", 90, 90).unwrap(),
        ];
        let results = MultiFormatReader::new().decode_batch(&images);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().text, "first");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().text, "third");
    }

    #[test]
    fn test_writers() {
        assert_eq!(writer_for(BarcodeFormat::Aztec).format(), BarcodeFormat::Aztec);
        assert_eq!(writer_for(BarcodeFormat::Code128).format(), BarcodeFormat::Code128);
        assert!(matches!(
            encode(BarcodeFormat::Code128, "", 0, 0),
            Err(EncodeError::InvalidLength { .. })
        ));
    }
}
