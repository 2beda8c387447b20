//! Aztec writer.
//!
//! Text is encoded greedily into the character modes, stuffed into codewords,
//! protected with Reed-Solomon check words and laid out around the bullseye.

use crate::debug::trace;
use crate::decoder::aztec::{
    Mode, PUNCT_PAIRS, char_code, for_each_layer_module, total_bits_in_layers, word_size,
};
use crate::decoder::config;
use crate::decoder::galois::GaloisField;
use crate::decoder::reed_solomon::{BlockSpec, ReedSolomonEncoder};
use crate::encoder::render::render_matrix;
use crate::error::EncodeError;
use crate::models::{BitArray, BitMatrix, Content, FunctionCode, Token};

/// Default quiet zone around rendered symbols, in modules
pub const DEFAULT_QUIET_ZONE: usize = 2;

/// Longest byte run one binary shift can carry
const MAX_BINARY_SHIFT: usize = 2047 + 31;

/// Largest ECI designator that fits the six FLG digits
const MAX_ECI: u32 = 999_999;

/// An encoded symbol
#[derive(Debug, Clone, PartialEq)]
pub struct AztecCode {
    /// Compact (true) or full-range symbol
    pub compact: bool,
    /// Modules per side
    pub size: usize,
    /// Number of data layers
    pub layers: usize,
    /// Data codewords, as announced in the mode message
    pub data_blocks: usize,
    /// Reader initialization symbol
    pub reader_init: bool,
    /// Modules, dark set
    pub matrix: BitMatrix,
}

/// Aztec writer
#[derive(Debug, Clone, Copy)]
pub struct AztecWriter {
    ec_percent: usize,
    layers: i32,
    reader_init: bool,
    quiet_zone: usize,
}

impl Default for AztecWriter {
    fn default() -> Self {
        Self {
            ec_percent: config::aztec_min_ec_percent(),
            layers: 0,
            reader_init: false,
            quiet_zone: DEFAULT_QUIET_ZONE,
        }
    }
}

impl AztecWriter {
    /// Create a writer with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum share of the symbol spent on check words, in percent
    pub fn with_ec_percent(mut self, percent: usize) -> Self {
        self.ec_percent = percent;
        self
    }

    /// Fix the layer count: negative for compact symbols (-1..=-4), positive
    /// for full-range ones (1..=32), 0 for the smallest that fits
    pub fn with_layers(mut self, layers: i32) -> Self {
        self.layers = layers;
        self
    }

    /// Mark the symbol as a reader initialization (programming) symbol
    pub fn with_reader_init(mut self, reader_init: bool) -> Self {
        self.reader_init = reader_init;
        self
    }

    /// Quiet zone in modules added by `encode`
    pub fn with_quiet_zone(mut self, modules: usize) -> Self {
        self.quiet_zone = modules;
        self
    }

    /// Encode `content` into a module matrix
    pub fn encode_symbol(&self, content: &Content) -> Result<AztecCode, EncodeError> {
        if !(1..=99).contains(&self.ec_percent) {
            return Err(EncodeError::InvalidParameter(
                "error correction percentage must be within 1..=99",
            ));
        }
        if content.is_empty() {
            return Err(EncodeError::InvalidParameter("nothing to encode"));
        }

        let bits = encode_high_level(content)?;
        let ecc_bits = bits.len() * self.ec_percent / 100 + 11;
        let (compact, layers, stuffed) = self.choose_layers(&bits, ecc_bits)?;

        let word_size = word_size(layers);
        let total_bits = total_bits_in_layers(layers, compact);
        let message_bits = generate_check_words(&stuffed, total_bits, word_size)?;
        let data_blocks = stuffed.len() / word_size;
        let mode_message = generate_mode_message(compact, layers, data_blocks, self.reader_init)?;
        trace!(
            "aztec writer: {} bits, {} layers ({}), {} data words",
            bits.len(),
            layers,
            if compact { "compact" } else { "full" },
            data_blocks
        );

        let matrix = draw_symbol(compact, layers, &message_bits, &mode_message);
        Ok(AztecCode {
            compact,
            size: matrix.width(),
            layers,
            data_blocks,
            reader_init: self.reader_init,
            matrix,
        })
    }

    /// Encode writer input text (`U+00F1` for FNC1) and render it into at
    /// least `width` x `height` pixels
    pub fn encode(&self, text: &str, width: usize, height: usize) -> Result<BitMatrix, EncodeError> {
        let content = Content::from_marked(text)?;
        let code = self.encode_symbol(&content)?;
        Ok(render_matrix(&code.matrix, width, height, self.quiet_zone))
    }

    fn choose_layers(
        &self,
        bits: &BitArray,
        ecc_bits: usize,
    ) -> Result<(bool, usize, BitArray), EncodeError> {
        // The reader-init flag shares the data-word field of the mode message
        let fits_reader_init = |compact: bool, layers: usize| {
            let max_layers = if compact { 1 } else { 22 };
            !self.reader_init || layers <= max_layers
        };

        if self.layers != 0 {
            let compact = self.layers < 0;
            let layers = self.layers.unsigned_abs() as usize;
            let max_layers = if compact { 4 } else { 32 };
            if layers > max_layers {
                return Err(EncodeError::InvalidParameter("layer count out of range"));
            }
            if !fits_reader_init(compact, layers) {
                return Err(EncodeError::InvalidParameter(
                    "reader initialization needs a smaller symbol",
                ));
            }
            let word_size = word_size(layers);
            let total = total_bits_in_layers(layers, compact);
            let usable = total - total % word_size;
            let stuffed = stuff_bits(bits, word_size);
            if stuffed.len() + ecc_bits > usable || (compact && stuffed.len() > word_size * 64) {
                return Err(EncodeError::DataTooLarge);
            }
            return Ok((compact, layers, stuffed));
        }

        // Compact 1..=4 first, then full 4..=32
        let total_size_bits = bits.len() + ecc_bits;
        let mut stuffed: Option<(usize, BitArray)> = None;
        for i in 0..=32usize {
            let compact = i <= 3;
            let layers = if compact { i + 1 } else { i };
            if !fits_reader_init(compact, layers) {
                continue;
            }
            let total = total_bits_in_layers(layers, compact);
            if total_size_bits > total {
                continue;
            }
            let word_size = word_size(layers);
            let current = match stuffed.take() {
                Some((size, bits)) if size == word_size => bits,
                _ => stuff_bits(bits, word_size),
            };
            let usable = total - total % word_size;
            let fits = !(compact && current.len() > word_size * 64)
                && current.len() + ecc_bits <= usable;
            if fits {
                return Ok((compact, layers, current));
            }
            stuffed = Some((word_size, current));
        }
        Err(EncodeError::DataTooLarge)
    }
}

/// Greedy high-level encoding into the character modes
pub(crate) fn encode_high_level(content: &Content) -> Result<BitArray, EncodeError> {
    let tokens = content.tokens();
    let mut bits = BitArray::empty();
    let mut mode = Mode::Upper;
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            Token::Function(FunctionCode::Fnc1) => {
                append_flag(&mut bits, mode, 0);
                i += 1;
            }
            Token::Function(function) => {
                return Err(EncodeError::InvalidCharacter {
                    character: function.escape(),
                    position: i,
                });
            }
            Token::Eci(eci) => {
                if eci > MAX_ECI {
                    return Err(EncodeError::InvalidParameter("ECI designator above 999999"));
                }
                let digits = eci.to_string();
                append_flag(&mut bits, mode, digits.len() as u32);
                for d in digits.bytes() {
                    bits.append_bits(u32::from(d - b'0') + 2, 4);
                }
                i += 1;
            }
            Token::Byte(_) => i += encode_text(&mut bits, &mut mode, tokens, i),
        }
    }
    Ok(bits)
}

/// P/S FLG(n), or just FLG(n) when latched in punctuation
fn append_flag(bits: &mut BitArray, mode: Mode, n: u32) {
    if mode != Mode::Punct {
        bits.append_bits(0, mode.code_bits());
    }
    bits.append_bits(0, 5);
    bits.append_bits(n, 3);
}

fn byte_at(tokens: &[Token], i: usize) -> Option<u8> {
    match tokens.get(i) {
        Some(Token::Byte(b)) => Some(*b),
        _ => None,
    }
}

/// Punctuation pair code starting at `i`
fn pair_at(tokens: &[Token], i: usize) -> Option<u8> {
    let pair = [byte_at(tokens, i)?, byte_at(tokens, i + 1)?];
    PUNCT_PAIRS
        .iter()
        .position(|p| **p == pair)
        .map(|index| index as u8 + 2)
}

/// Characters from `i` on that `mode` encodes without leaving it
fn run_length(tokens: &[Token], i: usize, mode: Mode) -> usize {
    let mut j = i;
    loop {
        if mode == Mode::Punct && pair_at(tokens, j).is_some() {
            j += 2;
            continue;
        }
        match byte_at(tokens, j) {
            Some(b) if char_code(mode, b).is_some() => j += 1,
            _ => break,
        }
    }
    j - i
}

/// One latch step from `from` towards `to`
fn latch_step(from: Mode, to: Mode) -> (u32, Mode) {
    match (from, to) {
        (Mode::Upper, Mode::Lower) => (28, Mode::Lower),
        (Mode::Upper, Mode::Digit) => (30, Mode::Digit),
        (Mode::Upper, _) => (29, Mode::Mixed),
        (Mode::Lower, Mode::Mixed | Mode::Punct) => (29, Mode::Mixed),
        (Mode::Lower, _) => (30, Mode::Digit),
        (Mode::Mixed, Mode::Lower) => (28, Mode::Lower),
        (Mode::Mixed, Mode::Punct) => (30, Mode::Punct),
        (Mode::Mixed, _) => (29, Mode::Upper),
        (Mode::Punct, _) => (31, Mode::Upper),
        (Mode::Digit, _) => (14, Mode::Upper),
    }
}

fn latch_to(bits: &mut BitArray, mode: &mut Mode, target: Mode) {
    while *mode != target {
        let (code, next) = latch_step(*mode, target);
        bits.append_bits(code, mode.code_bits());
        *mode = next;
    }
}

/// Encode the character (or pair, or binary run) at `i`; returns the number of
/// tokens consumed
fn encode_text(bits: &mut BitArray, mode: &mut Mode, tokens: &[Token], i: usize) -> usize {
    let Some(byte) = byte_at(tokens, i) else {
        return 1;
    };

    if let Some(code) = pair_at(tokens, i) {
        // Digit mode writes ". " and ", " cheaper as two characters
        let digit_friendly = *mode == Mode::Digit && (code == 3 || code == 4);
        if !digit_friendly {
            if *mode != Mode::Punct {
                bits.append_bits(0, mode.code_bits());
            }
            bits.append_bits(u32::from(code), 5);
            return 2;
        }
    }

    if let Some(code) = char_code(*mode, byte) {
        bits.append_bits(u32::from(code), mode.code_bits());
        return 1;
    }

    let target = [Mode::Upper, Mode::Lower, Mode::Digit, Mode::Mixed, Mode::Punct]
        .into_iter()
        .filter(|&m| char_code(m, byte).is_some())
        .map(|m| (m, run_length(tokens, i, m)))
        .fold(None, |best: Option<(Mode, usize)>, (m, run)| match best {
            Some((_, best_run)) if best_run >= run => best,
            _ => Some((m, run)),
        });

    let Some((target, run)) = target else {
        return encode_binary(bits, mode, tokens, i);
    };

    match target {
        Mode::Punct if run < 3 => {
            bits.append_bits(0, mode.code_bits());
        }
        Mode::Upper if run < 3 && matches!(*mode, Mode::Lower | Mode::Digit) => {
            let shift = if *mode == Mode::Lower { 28 } else { 15 };
            bits.append_bits(shift, mode.code_bits());
        }
        _ => latch_to(bits, mode, target),
    }
    // Shifted characters are always read with five bits
    let code = char_code(target, byte).map_or(0, u32::from);
    bits.append_bits(code, target.code_bits());
    1
}

/// Binary shift over the bytes no character mode can express
fn encode_binary(bits: &mut BitArray, mode: &mut Mode, tokens: &[Token], i: usize) -> usize {
    let mut end = i;
    while end - i < MAX_BINARY_SHIFT {
        match byte_at(tokens, end) {
            Some(b) if Mode::ALL.iter().all(|&m| char_code(m, b).is_none()) => end += 1,
            _ => break,
        }
    }
    let length = end - i;

    if matches!(*mode, Mode::Digit | Mode::Punct) {
        latch_to(bits, mode, Mode::Upper);
    }
    bits.append_bits(31, 5);
    if length <= 31 {
        bits.append_bits(length as u32, 5);
    } else {
        bits.append_bits(0, 5);
        bits.append_bits((length - 31) as u32, 11);
    }
    for j in i..end {
        if let Some(b) = byte_at(tokens, j) {
            bits.append_bits(u32::from(b), 8);
        }
    }
    length
}

/// Split into codewords, breaking every all-zero or all-one run of
/// `word_size - 1` bits with a complementary stuffed bit
pub(crate) fn stuff_bits(bits: &BitArray, word_size: usize) -> BitArray {
    let n = bits.len();
    let mask = (1u32 << word_size) - 2;
    let mut out = BitArray::empty();
    let mut i = 0;
    while i < n {
        let mut word = 0u32;
        for j in 0..word_size {
            if i + j >= n || bits.get(i + j) {
                word |= 1 << (word_size - 1 - j);
            }
        }
        if word & mask == mask {
            out.append_bits(word & mask, word_size);
            i += word_size - 1;
        } else if word & mask == 0 {
            out.append_bits(word | 1, word_size);
            i += word_size - 1;
        } else {
            out.append_bits(word, word_size);
            i += word_size;
        }
    }
    out
}

/// Data words followed by check words, right-aligned in `total_bits`
fn generate_check_words(
    bits: &BitArray,
    total_bits: usize,
    word_size: usize,
) -> Result<BitArray, EncodeError> {
    let field = GaloisField::for_word_size(word_size)
        .ok_or(EncodeError::InvalidParameter("unsupported codeword size"))?;
    let message_words = bits.len() / word_size;
    let total_words = total_bits / word_size;
    let data: Vec<u16> = (0..message_words)
        .map(|i| bits.read_bits(i * word_size, word_size) as u16)
        .collect();
    let block = BlockSpec {
        data: message_words,
        ec: total_words - message_words,
    };
    let words = ReedSolomonEncoder::new(field).encode_blocks(&data, &[block]);

    let mut out = BitArray::empty();
    out.append_bits(0, total_bits % word_size);
    for &word in &words {
        out.append_bits(u32::from(word), word_size);
    }
    Ok(out)
}

fn generate_mode_message(
    compact: bool,
    layers: usize,
    data_blocks: usize,
    reader_init: bool,
) -> Result<BitArray, EncodeError> {
    let mut bits = BitArray::empty();
    let mut words = (data_blocks - 1) as u32;
    if compact {
        if reader_init {
            words |= 0x20;
        }
        bits.append_bits((layers - 1) as u32, 2);
        bits.append_bits(words, 6);
        generate_check_words(&bits, 28, 4)
    } else {
        if reader_init {
            words |= 0x400;
        }
        bits.append_bits((layers - 1) as u32, 5);
        bits.append_bits(words, 11);
        generate_check_words(&bits, 40, 4)
    }
}

fn draw_symbol(compact: bool, layers: usize, message: &BitArray, mode_message: &BitArray) -> BitMatrix {
    let size = crate::detector::aztec::dimension(compact, layers);
    let mut matrix = BitMatrix::square(size);
    for_each_layer_module(layers, compact, |bit, x, y| {
        if message.get(bit) {
            matrix.set(x, y, true);
        }
    });

    let center = size / 2;
    draw_mode_message(&mut matrix, compact, center, mode_message);
    if compact {
        draw_bullseye(&mut matrix, center, 5);
    } else {
        draw_bullseye(&mut matrix, center, 7);
        let base = 14 + 4 * layers;
        // Reference grid: every 16th line through the centre, alternating modules
        let mut i = 0;
        let mut j = 0;
        while i < base / 2 - 1 {
            let mut k = center & 1;
            while k < size {
                matrix.set(center - j, k, true);
                matrix.set(center + j, k, true);
                matrix.set(k, center - j, true);
                matrix.set(k, center + j, true);
                k += 2;
            }
            i += 15;
            j += 16;
        }
    }
    matrix
}

fn draw_mode_message(matrix: &mut BitMatrix, compact: bool, center: usize, message: &BitArray) {
    if compact {
        for i in 0..7 {
            let offset = center - 3 + i;
            if message.get(i) {
                matrix.set(offset, center - 5, true);
            }
            if message.get(i + 7) {
                matrix.set(center + 5, offset, true);
            }
            if message.get(20 - i) {
                matrix.set(offset, center + 5, true);
            }
            if message.get(27 - i) {
                matrix.set(center - 5, offset, true);
            }
        }
    } else {
        for i in 0..10 {
            let offset = center - 5 + i + i / 5;
            if message.get(i) {
                matrix.set(offset, center - 7, true);
            }
            if message.get(i + 10) {
                matrix.set(center + 7, offset, true);
            }
            if message.get(29 - i) {
                matrix.set(offset, center + 7, true);
            }
            if message.get(39 - i) {
                matrix.set(center - 7, offset, true);
            }
        }
    }
}

/// Dark rings at even distances up to `size - 1`, plus the orientation marks
/// on the ring at distance `size`
fn draw_bullseye(matrix: &mut BitMatrix, center: usize, size: usize) {
    for i in (0..size).step_by(2) {
        for j in center - i..=center + i {
            matrix.set(j, center - i, true);
            matrix.set(j, center + i, true);
            matrix.set(center - i, j, true);
            matrix.set(center + i, j, true);
        }
    }
    matrix.set(center - size, center - size, true);
    matrix.set(center - size + 1, center - size, true);
    matrix.set(center - size, center - size + 1, true);
    matrix.set(center + size, center - size, true);
    matrix.set(center + size, center - size + 1, true);
    matrix.set(center + size, center + size - 1, true);
}
