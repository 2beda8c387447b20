//! Code 128 writer.
//!
//! Code sets are chosen greedily: code C for runs of four or more digits (or
//! pairs around FNC1), code A only for control characters, code B otherwise.

use crate::debug::trace;
use crate::decoder::tables::{
    self, CODE_CODE_A, CODE_CODE_B, CODE_CODE_C, CODE_FNC_1, CODE_FNC_2, CODE_FNC_3,
    CODE_FNC_4_A, CODE_FNC_4_B, CODE_START_A, CODE_START_B, CODE_START_C, CODE_STOP,
};
use crate::encoder::render::render_linear;
use crate::error::EncodeError;
use crate::models::{BitArray, BitMatrix, FunctionCode};

/// Longest accepted input, in characters
pub const MAX_LENGTH: usize = 80;

/// Default total quiet zone in modules, half on each side
pub const DEFAULT_MARGIN: usize = 10;

/// What the characters at a position allow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookahead {
    Uncodable,
    OneDigit,
    TwoDigits,
    Fnc1,
}

/// Code 128 writer. Input text uses `U+00F1..U+00F4` for FNC1..FNC4.
#[derive(Debug, Clone, Copy)]
pub struct Code128Writer {
    margin: usize,
}

impl Default for Code128Writer {
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
        }
    }
}

impl Code128Writer {
    /// Create a writer with the default margin
    pub fn new() -> Self {
        Self::default()
    }

    /// Total quiet zone in modules (split over both sides)
    pub fn with_margin(mut self, modules: usize) -> Self {
        self.margin = modules;
        self
    }

    /// Total quiet zone in modules
    pub fn margin(&self) -> usize {
        self.margin
    }

    /// Symbol values from start to stop, check symbol included
    pub fn encode_values(&self, text: &str) -> Result<Vec<u8>, EncodeError> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() || chars.len() > MAX_LENGTH {
            return Err(EncodeError::InvalidLength {
                len: chars.len(),
                max: MAX_LENGTH,
            });
        }
        if let Some((position, &character)) = chars
            .iter()
            .enumerate()
            .find(|(_, c)| FunctionCode::from_escape(**c).is_none() && u32::from(**c) > 127)
        {
            return Err(EncodeError::InvalidCharacter {
                character,
                position,
            });
        }
        if chars.iter().all(|&c| FunctionCode::from_escape(c).is_some()) {
            return Err(EncodeError::InvalidParameter(
                "function codes need at least one data character",
            ));
        }

        let mut start = None;
        let mut data: Vec<u8> = Vec::with_capacity(chars.len() + 4);
        let mut code_set = None;
        let mut position = 0usize;

        while position < chars.len() {
            let new_code_set = choose_code(&chars, position, code_set);
            if Some(new_code_set) != code_set {
                match code_set {
                    None => {
                        start = Some(match new_code_set {
                            CODE_CODE_A => CODE_START_A,
                            CODE_CODE_B => CODE_START_B,
                            _ => CODE_START_C,
                        })
                    }
                    Some(_) => data.push(new_code_set),
                }
                code_set = Some(new_code_set);
                continue;
            }

            let c = chars[position];
            let value = match FunctionCode::from_escape(c) {
                Some(FunctionCode::Fnc1) => CODE_FNC_1,
                Some(FunctionCode::Fnc2) => CODE_FNC_2,
                Some(FunctionCode::Fnc3) => CODE_FNC_3,
                Some(FunctionCode::Fnc4) if new_code_set == CODE_CODE_A => CODE_FNC_4_A,
                Some(FunctionCode::Fnc4) => CODE_FNC_4_B,
                None => match new_code_set {
                    // Control characters follow the underscore in code A
                    CODE_CODE_A if c < ' ' => c as u8 + 64,
                    CODE_CODE_A | CODE_CODE_B => c as u8 - b' ',
                    _ => {
                        let pair = digit_value(c) * 10 + digit_value(chars[position + 1]);
                        position += 1;
                        pair
                    }
                },
            };
            data.push(value);
            position += 1;
        }

        let start = start.ok_or(EncodeError::InvalidParameter("no code set chosen"))?;
        let check = tables::checksum(start, &data);
        trace!(
            "code128: start {} with {} symbols, check {}",
            start,
            data.len(),
            check
        );

        let mut values = Vec::with_capacity(data.len() + 3);
        values.push(start);
        values.extend_from_slice(&data);
        values.push(check);
        values.push(CODE_STOP);
        Ok(values)
    }

    /// Modules of the whole symbol, quiet zones included
    pub fn encode_modules(&self, text: &str) -> Result<BitArray, EncodeError> {
        let values = self.encode_values(text)?;
        let leading = self.margin / 2;
        let mut bits = BitArray::empty().with_scale(1.0);
        bits.append_bits(0, leading);
        append_symbols(&mut bits, &values);
        bits.append_bits(0, self.margin - leading);
        Ok(bits)
    }

    /// Render into a matrix at least `width` x `height` pixels (0 for minimum)
    pub fn encode(&self, text: &str, width: usize, height: usize) -> Result<BitMatrix, EncodeError> {
        let values = self.encode_values(text)?;
        let mut code = BitArray::empty();
        append_symbols(&mut code, &values);
        Ok(render_linear(&code, width, height, self.margin))
    }
}

fn append_symbols(bits: &mut BitArray, values: &[u8]) {
    for &value in values {
        let mut dark = true;
        for &width in tables::pattern(value) {
            for _ in 0..width {
                bits.append_bit(dark);
            }
            dark = !dark;
        }
    }
}

fn digit_value(c: char) -> u8 {
    c.to_digit(10).map_or(0, |d| d as u8)
}

fn find_lookahead(chars: &[char], start: usize) -> Lookahead {
    let Some(&c) = chars.get(start) else {
        return Lookahead::Uncodable;
    };
    if FunctionCode::from_escape(c) == Some(FunctionCode::Fnc1) {
        return Lookahead::Fnc1;
    }
    if !c.is_ascii_digit() {
        return Lookahead::Uncodable;
    }
    match chars.get(start + 1) {
        Some(next) if next.is_ascii_digit() => Lookahead::TwoDigits,
        _ => Lookahead::OneDigit,
    }
}

/// Code set for the character at `start` given the current one (`None` before the start symbol)
fn choose_code(chars: &[char], start: usize, current: Option<u8>) -> u8 {
    let mut lookahead = find_lookahead(chars, start);
    match lookahead {
        Lookahead::OneDigit => {
            return if current == Some(CODE_CODE_A) {
                CODE_CODE_A
            } else {
                CODE_CODE_B
            };
        }
        Lookahead::Uncodable => {
            if let Some(&c) = chars.get(start) {
                let stays_in_a = current == Some(CODE_CODE_A)
                    && (c < '`' || FunctionCode::from_escape(c).is_some());
                if c < ' ' || stays_in_a {
                    return CODE_CODE_A;
                }
            }
            return CODE_CODE_B;
        }
        Lookahead::TwoDigits | Lookahead::Fnc1 => {}
    }

    match current {
        Some(CODE_CODE_A) if lookahead == Lookahead::Fnc1 => CODE_CODE_A,
        Some(CODE_CODE_C) => CODE_CODE_C,
        Some(CODE_CODE_B) => {
            if lookahead == Lookahead::Fnc1 {
                return CODE_CODE_B;
            }
            match find_lookahead(chars, start + 2) {
                Lookahead::Uncodable | Lookahead::OneDigit => CODE_CODE_B,
                Lookahead::Fnc1 => {
                    if find_lookahead(chars, start + 3) == Lookahead::TwoDigits {
                        CODE_CODE_C
                    } else {
                        CODE_CODE_B
                    }
                }
                Lookahead::TwoDigits => {
                    // At least four digits: switch now only for an even run
                    let mut index = start + 4;
                    loop {
                        lookahead = find_lookahead(chars, index);
                        if lookahead != Lookahead::TwoDigits {
                            break;
                        }
                        index += 2;
                    }
                    if lookahead == Lookahead::OneDigit {
                        CODE_CODE_B
                    } else {
                        CODE_CODE_C
                    }
                }
            }
        }
        _ => {
            if lookahead == Lookahead::Fnc1 {
                lookahead = find_lookahead(chars, start + 1);
            }
            if lookahead == Lookahead::TwoDigits {
                CODE_CODE_C
            } else {
                CODE_CODE_B
            }
        }
    }
}
