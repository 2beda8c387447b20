//! Aztec payload decoding: layer bit extraction, Reed-Solomon correction, bit
//! unstuffing and the high-level character mode machine.

use crate::debug::trace;
use crate::decoder::galois::GaloisField;
use crate::decoder::reed_solomon::{BlockSpec, ReedSolomonDecoder};
use crate::detector::DetectorResult;
use crate::error::DecodeError;
use crate::models::{
    BarcodeFormat, BitArray, BitMatrix, Content, Decoded, FunctionCode, SymbolMetadata, Token,
};
use std::sync::OnceLock;

/// Character modes of the high-level encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Mode {
    Upper,
    Lower,
    Mixed,
    Punct,
    Digit,
}

impl Mode {
    pub(crate) const ALL: [Mode; 5] = [Mode::Upper, Mode::Lower, Mode::Mixed, Mode::Punct, Mode::Digit];

    /// Width of one code in this mode
    pub(crate) fn code_bits(self) -> usize {
        if self == Mode::Digit { 4 } else { 5 }
    }

    fn index(self) -> usize {
        match self {
            Mode::Upper => 0,
            Mode::Lower => 1,
            Mode::Mixed => 2,
            Mode::Punct => 3,
            Mode::Digit => 4,
        }
    }
}

/// Meaning of one code in one mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Entry {
    Byte(u8),
    Pair(&'static [u8; 2]),
    Shift(Mode),
    Latch(Mode),
    BinaryShift,
    Flag,
}

const MIXED_SYMBOLS: &[u8; 8] = b"@\\^_`|~\x7f";
const PUNCT_SYMBOLS: &[u8; 25] = b"!\"#$%&'()*+,-./:;<=>?[]{}";
pub(crate) const PUNCT_PAIRS: [&[u8; 2]; 4] = [b"\r\n", b". ", b", ", b": "];

/// Table lookup; `None` for codes a mode does not define
pub(crate) fn entry(mode: Mode, code: u8) -> Option<Entry> {
    use Entry::*;
    let text_mode = matches!(mode, Mode::Upper | Mode::Lower | Mode::Mixed);
    Some(match (mode, code) {
        (_, 0) if text_mode => Shift(Mode::Punct),
        (_, 1) if text_mode => Byte(b' '),
        (_, 31) if text_mode => BinaryShift,
        (Mode::Upper, 2..=27) => Byte(b'A' + code - 2),
        (Mode::Upper, 28) => Latch(Mode::Lower),
        (Mode::Upper | Mode::Lower, 29) => Latch(Mode::Mixed),
        (Mode::Upper | Mode::Lower, 30) => Latch(Mode::Digit),
        (Mode::Lower, 2..=27) => Byte(b'a' + code - 2),
        (Mode::Lower, 28) => Shift(Mode::Upper),
        (Mode::Mixed, 2..=14) => Byte(code - 1),
        (Mode::Mixed, 15..=19) => Byte(code + 12),
        (Mode::Mixed, 20..=27) => Byte(MIXED_SYMBOLS[usize::from(code - 20)]),
        (Mode::Mixed, 28) => Latch(Mode::Lower),
        (Mode::Mixed, 29) => Latch(Mode::Upper),
        (Mode::Mixed, 30) => Latch(Mode::Punct),
        (Mode::Punct, 0) => Flag,
        (Mode::Punct, 1) => Byte(b'\r'),
        (Mode::Punct, 2..=5) => Pair(PUNCT_PAIRS[usize::from(code - 2)]),
        (Mode::Punct, 6..=30) => Byte(PUNCT_SYMBOLS[usize::from(code - 6)]),
        (Mode::Punct, 31) => Latch(Mode::Upper),
        (Mode::Digit, 0) => Shift(Mode::Punct),
        (Mode::Digit, 1) => Byte(b' '),
        (Mode::Digit, 2..=11) => Byte(b'0' + code - 2),
        (Mode::Digit, 12) => Byte(b','),
        (Mode::Digit, 13) => Byte(b'.'),
        (Mode::Digit, 14) => Latch(Mode::Upper),
        (Mode::Digit, 15) => Shift(Mode::Upper),
        _ => return None,
    })
}

static CHAR_CODES: OnceLock<[[Option<u8>; 256]; 5]> = OnceLock::new();

/// Code of a single byte in `mode`, if the mode has one
pub(crate) fn char_code(mode: Mode, byte: u8) -> Option<u8> {
    let table = CHAR_CODES.get_or_init(|| {
        let mut table = [[None; 256]; 5];
        for mode in Mode::ALL {
            for code in 0..(1u8 << mode.code_bits()) {
                if let Some(Entry::Byte(b)) = entry(mode, code) {
                    table[mode.index()][usize::from(b)] = Some(code);
                }
            }
        }
        table
    });
    table[mode.index()][usize::from(byte)]
}

/// Codeword width by layer count
pub(crate) fn word_size(layers: usize) -> usize {
    match layers {
        0..=2 => 6,
        3..=8 => 8,
        9..=22 => 10,
        _ => 12,
    }
}

/// Bits available in the data layers
pub(crate) fn total_bits_in_layers(layers: usize, compact: bool) -> usize {
    ((if compact { 88 } else { 112 }) + 16 * layers) * layers
}

/// Module index of each position of the layer grid once the reference grid
/// lines of full symbols are skipped
pub(crate) fn alignment_map(layers: usize, compact: bool) -> Vec<usize> {
    let base = (if compact { 11 } else { 14 }) + 4 * layers;
    if compact {
        return (0..base).collect();
    }
    let size = base + 1 + 2 * ((base / 2 - 1) / 15);
    let orig_center = base / 2;
    let center = size / 2;
    let mut map = vec![0usize; base];
    for i in 0..orig_center {
        let offset = i + i / 15;
        map[orig_center - i - 1] = center - offset - 1;
        map[orig_center + i] = center + offset + 1;
    }
    map
}

/// Visit every data-layer bit position in reading order as
/// `(bit_index, x, y)`, innermost layer last
pub(crate) fn for_each_layer_module(
    layers: usize,
    compact: bool,
    mut visit: impl FnMut(usize, usize, usize),
) {
    let base = (if compact { 11 } else { 14 }) + 4 * layers;
    let map = alignment_map(layers, compact);
    let mut row_offset = 0;
    for i in 0..layers {
        let row_size = (layers - i) * 4 + if compact { 9 } else { 12 };
        let low = i * 2;
        let high = base - 1 - low;
        for j in 0..row_size {
            let column_offset = j * 2;
            for k in 0..2 {
                let bit = row_offset + column_offset + k;
                visit(bit, map[low + k], map[low + j]);
                visit(bit + 2 * row_size, map[low + j], map[high - k]);
                visit(bit + 4 * row_size, map[high - k], map[high - j]);
                visit(bit + 6 * row_size, map[high - j], map[low + k]);
            }
        }
        row_offset += row_size * 8;
    }
}

/// Aztec payload decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct AztecDecoder;

impl AztecDecoder {
    /// Create a decoder
    pub fn new() -> Self {
        Self
    }

    /// Decode a sampled symbol
    pub fn decode(&self, detected: DetectorResult) -> Result<Decoded, DecodeError> {
        let compact = detected.is_compact();
        let layers = detected.layers();
        let data_blocks = detected.data_blocks();
        let reader_init = detected.reader_init();
        let corners = detected.corners();

        let raw = extract_bits(detected.bits(), layers, compact)?;
        let (corrected, errors_corrected) = correct_bits(&raw, layers, data_blocks)?;
        let content = decode_high_level(&corrected)?;
        if content.is_empty() {
            return Err(DecodeError::Format("symbol carries no data"));
        }
        trace!(
            "aztec: {} tokens, {} codewords corrected",
            content.len(),
            errors_corrected
        );

        Ok(Decoded {
            format: BarcodeFormat::Aztec,
            text: content.gs1_text(),
            symbology_identifier: format!("]z{}", symbology_modifier(&content)),
            content,
            position: corners.to_vec(),
            metadata: SymbolMetadata::Aztec {
                compact,
                layers,
                data_blocks,
                reader_init,
                errors_corrected,
            },
        })
    }
}

/// Read the data layers in codeword order
pub(crate) fn extract_bits(
    matrix: &BitMatrix,
    layers: usize,
    compact: bool,
) -> Result<BitArray, DecodeError> {
    let expected = crate::detector::aztec::dimension(compact, layers);
    if matrix.width() != expected || matrix.height() != expected {
        return Err(DecodeError::Format("grid size disagrees with layer count"));
    }
    let mut raw = BitArray::new(total_bits_in_layers(layers, compact));
    for_each_layer_module(layers, compact, |bit, x, y| {
        if matrix.get(x, y) {
            raw.set(bit);
        }
    });
    Ok(raw)
}

/// Correct the codewords and strip the stuffed bits. Returns the data bits and
/// the number of repaired codewords.
pub(crate) fn correct_bits(
    raw: &BitArray,
    layers: usize,
    data_blocks: usize,
) -> Result<(BitArray, usize), DecodeError> {
    let word_size = word_size(layers);
    let field = GaloisField::for_word_size(word_size)
        .ok_or(DecodeError::Format("unsupported codeword size"))?;

    let num_codewords = raw.len() / word_size;
    if num_codewords < data_blocks || data_blocks == 0 {
        return Err(DecodeError::Format("more data words than codewords"));
    }
    let offset = raw.len() % word_size;
    let words: Vec<u16> = (0..num_codewords)
        .map(|i| raw.read_bits(offset + i * word_size, word_size) as u16)
        .collect();

    // Aztec carries the whole message in one block
    let block = BlockSpec {
        data: data_blocks,
        ec: num_codewords - data_blocks,
    };
    let (data, corrected) = ReedSolomonDecoder::new(field).correct_blocks(&words, &[block])?;

    let mask = (1u16 << word_size) - 1;
    let mut bits = BitArray::empty();
    for &word in &data {
        if word == 0 || word == mask {
            return Err(DecodeError::Format("all-zero or all-one data word"));
        }
        if word == 1 || word == mask - 1 {
            // Stuffed word: the low bit only breaks the run
            for _ in 0..word_size - 1 {
                bits.append_bit(word > 1);
            }
        } else {
            bits.append_bits(u32::from(word), word_size);
        }
    }
    Ok((bits, corrected))
}

/// Run the character mode machine over the unstuffed data bits
pub(crate) fn decode_high_level(bits: &BitArray) -> Result<Content, DecodeError> {
    let end = bits.len();
    let mut content = Content::new();
    let mut latch = Mode::Upper;
    let mut shift = Mode::Upper;
    let mut binary = false;
    let mut index = 0;

    while index < end {
        if binary {
            if end - index < 5 {
                break;
            }
            let mut length = bits.read_bits(index, 5) as usize;
            index += 5;
            if length == 0 {
                if end - index < 11 {
                    break;
                }
                length = bits.read_bits(index, 11) as usize + 31;
                index += 11;
            }
            for _ in 0..length {
                if end - index < 8 {
                    index = end;
                    break;
                }
                content.push_byte(bits.read_bits(index, 8) as u8);
                index += 8;
            }
            binary = false;
            shift = latch;
            continue;
        }

        let size = shift.code_bits();
        if end - index < size {
            break;
        }
        let code = bits.read_bits(index, size) as u8;
        index += size;
        let Some(entry) = entry(shift, code) else {
            return Err(DecodeError::Format("undefined code"));
        };
        match entry {
            Entry::Byte(b) => {
                content.push_byte(b);
                shift = latch;
            }
            Entry::Pair(pair) => {
                content.push_byte(pair[0]);
                content.push_byte(pair[1]);
                shift = latch;
            }
            Entry::Shift(mode) => {
                latch = shift;
                shift = mode;
            }
            Entry::Latch(mode) => {
                latch = mode;
                shift = mode;
            }
            Entry::BinaryShift => {
                latch = shift;
                binary = true;
            }
            Entry::Flag => {
                if end - index < 3 {
                    break;
                }
                let n = bits.read_bits(index, 3) as usize;
                index += 3;
                match n {
                    0 => content.push_function(FunctionCode::Fnc1),
                    7 => return Err(DecodeError::Format("reserved FLG(7)")),
                    _ => {
                        if end - index < 4 * n {
                            break;
                        }
                        let mut eci = 0u32;
                        for _ in 0..n {
                            let digit = bits.read_bits(index, 4);
                            index += 4;
                            if !(2..=11).contains(&digit) {
                                return Err(DecodeError::Format("invalid ECI digit"));
                            }
                            eci = eci * 10 + (digit - 2);
                        }
                        content.push_eci(eci);
                    }
                }
                shift = latch;
            }
        }
    }
    Ok(content)
}

/// `]z` modifier: FNC1 position plus 3 when an ECI is present
fn symbology_modifier(content: &Content) -> u8 {
    let tokens = content.tokens();
    let fnc1 = Token::Function(FunctionCode::Fnc1);
    let mut modifier = if tokens.first() == Some(&fnc1) {
        1
    } else if tokens.get(1) == Some(&fnc1) {
        2
    } else {
        0
    };
    if tokens.iter().any(|t| matches!(t, Token::Eci(_))) {
        modifier += 3;
    }
    modifier
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::aztec::AztecWriter;
    use crate::models::Point;

    fn bits(text: &str) -> BitArray {
        BitArray::parse(text).unwrap()
    }

    fn detected(code: &crate::encoder::aztec::AztecCode) -> DetectorResult {
        DetectorResult::new(
            code.matrix.clone(),
            code.compact,
            code.layers,
            code.data_blocks,
            code.reader_init,
            [Point::new(0.0, 0.0); 4],
        )
    }

    #[test]
    fn test_tables() {
        assert_eq!(entry(Mode::Upper, 2), Some(Entry::Byte(b'A')));
        assert_eq!(entry(Mode::Lower, 27), Some(Entry::Byte(b'z')));
        assert_eq!(entry(Mode::Mixed, 14), Some(Entry::Byte(b'\r')));
        assert_eq!(entry(Mode::Mixed, 15), Some(Entry::Byte(0x1b)));
        assert_eq!(entry(Mode::Mixed, 27), Some(Entry::Byte(0x7f)));
        assert_eq!(entry(Mode::Punct, 30), Some(Entry::Byte(b'}')));
        assert_eq!(entry(Mode::Digit, 16), None);
        assert_eq!(char_code(Mode::Punct, b'!'), Some(6));
        assert_eq!(char_code(Mode::Digit, b'9'), Some(11));
        assert_eq!(char_code(Mode::Upper, b'a'), None);
        assert_eq!(char_code(Mode::Mixed, 0x0e), None);
    }

    #[test]
    fn test_alignment_map_skips_reference_lines() {
        assert_eq!(alignment_map(1, true), (0..15).collect::<Vec<_>>());
        // 5 full layers: 34 positions on a 37 module grid, lines at 2, 18, 34
        let map = alignment_map(5, false);
        assert_eq!(map.len(), 34);
        assert!(!map.contains(&2) && !map.contains(&18) && !map.contains(&34));
        assert_eq!(map[0], 0);
        assert_eq!(map[33], 36);
    }

    #[test]
    fn test_high_level_modes() {
        // U 'A', L/L, 'b', PS '.', D/L, '1', '2', U/L, 'C'
        let data = bits("00010 11100 00011 00000 10011 11110 0011 0100 1110 00100");
        let content = decode_high_level(&data).unwrap();
        assert_eq!(content.text(), "Ab.12C");
    }

    #[test]
    fn test_binary_shift() {
        // B/S, length 2, 0xE9 0x41
        let data = bits("11111 00010 11101001 01000001 00010");
        assert_eq!(decode_high_level(&data).unwrap().bytes(), vec![0xe9, b'A', b'A']);
    }

    #[test]
    fn test_flg_tokens() {
        // P/S FLG(0), '1', then P/S FLG(2) ECI 26
        let data = bits("00000 00000 000 11110 0011 0000 00000 010 0100 1000");
        let content = decode_high_level(&data).unwrap();
        assert_eq!(
            content.tokens(),
            &[
                Token::Function(FunctionCode::Fnc1),
                Token::Byte(b'1'),
                Token::Eci(26)
            ]
        );
        assert_eq!(symbology_modifier(&content), 4);
    }

    #[test]
    fn test_reserved_flag_and_bad_eci_digit() {
        assert_eq!(
            decode_high_level(&bits("00000 00000 111")),
            Err(DecodeError::Format("reserved FLG(7)"))
        );
        assert_eq!(
            decode_high_level(&bits("00000 00000 001 0001")),
            Err(DecodeError::Format("invalid ECI digit"))
        );
    }

    #[test]
    fn test_unstuffing() {
        // 6-bit words: 000001 (five zeros), 111110 (five ones), 010101
        let raw_words = [0b000001u16, 0b111110, 0b010101];
        let mut raw = BitArray::empty();
        // 1 layer: 17 words, the first data words carry the payload
        let ec = crate::decoder::reed_solomon::ReedSolomonEncoder::new(
            GaloisField::aztec_data_6(),
        )
        .check_symbols(&raw_words, 17 - 3);
        raw.append_bits(0, total_bits_in_layers(1, true) % 6);
        for &w in raw_words.iter().chain(&ec) {
            raw.append_bits(u32::from(w), 6);
        }
        let (data, corrected) = correct_bits(&raw, 1, 3).unwrap();
        assert_eq!(corrected, 0);
        assert_eq!(data.to_string(), "0000011111010101");
    }

    #[test]
    fn test_all_ones_word_is_format_error() {
        let words = [0b111111u16, 0b010101];
        let ec = crate::decoder::reed_solomon::ReedSolomonEncoder::new(
            GaloisField::aztec_data_6(),
        )
        .check_symbols(&words, 17 - 2);
        let mut raw = BitArray::empty();
        raw.append_bits(0, 2);
        for &w in words.iter().chain(&ec) {
            raw.append_bits(u32::from(w), 6);
        }
        assert_eq!(
            correct_bits(&raw, 1, 2),
            Err(DecodeError::Format("all-zero or all-one data word"))
        );
    }

    #[test]
    fn test_decode_written_symbol() {
        let code = AztecWriter::new()
            .encode_symbol(&Content::from("This is an Aztec symbol, 12345."))
            .unwrap();
        let decoded = AztecDecoder::new().decode(detected(&code)).unwrap();
        assert_eq!(decoded.text, "This is an Aztec symbol, 12345.");
        assert_eq!(decoded.symbology_identifier, "]z0");
        assert_eq!(
            decoded.metadata,
            SymbolMetadata::Aztec {
                compact: code.compact,
                layers: code.layers,
                data_blocks: code.data_blocks,
                reader_init: false,
                errors_corrected: 0,
            }
        );
    }

    #[test]
    fn test_decode_repairs_damaged_modules() {
        let code = AztecWriter::new()
            .encode_symbol(&Content::from("Error correction at work"))
            .unwrap();
        let mut damaged = code.matrix.clone();
        // Two modules in the outermost layer
        damaged.toggle(0, 0);
        damaged.toggle(1, 5);
        let result = DetectorResult::new(
            damaged,
            code.compact,
            code.layers,
            code.data_blocks,
            false,
            [Point::new(0.0, 0.0); 4],
        );
        let decoded = AztecDecoder::new().decode(result).unwrap();
        assert_eq!(decoded.text, "Error correction at work");
        match decoded.metadata {
            SymbolMetadata::Aztec { errors_corrected, .. } => assert!(errors_corrected >= 1),
            other => panic!("unexpected metadata {other:?}"),
        }
    }

    #[test]
    fn test_wrong_grid_size() {
        let result = DetectorResult::new(
            BitMatrix::square(19),
            true,
            1,
            4,
            false,
            [Point::new(0.0, 0.0); 4],
        );
        assert_eq!(
            AztecDecoder::new().decode(result).unwrap_err(),
            DecodeError::Format("grid size disagrees with layer count")
        );
    }
}
