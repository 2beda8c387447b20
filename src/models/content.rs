//! Decoded (or to-be-encoded) symbol content.
//!
//! Function codes are kept as explicit tokens instead of being folded into the
//! text, so a decoded symbol can be re-encoded without losing them.

use crate::error::EncodeError;

/// ASCII group separator, the GS1 rendering of a non-leading FNC1
pub const GROUP_SEPARATOR: char = '\u{1d}';

/// Function characters shared by the linear symbologies (FNC1 also appears in Aztec)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    /// FNC1, GS1 application identifier marker
    Fnc1,
    /// FNC2, message append
    Fnc2,
    /// FNC3, reader initialization
    Fnc3,
    /// FNC4, extended ASCII shift
    Fnc4,
}

impl FunctionCode {
    /// Escape character used for this function code in writer input text
    pub const fn escape(self) -> char {
        match self {
            FunctionCode::Fnc1 => '\u{f1}',
            FunctionCode::Fnc2 => '\u{f2}',
            FunctionCode::Fnc3 => '\u{f3}',
            FunctionCode::Fnc4 => '\u{f4}',
        }
    }

    /// Inverse of [`FunctionCode::escape`]
    pub fn from_escape(c: char) -> Option<Self> {
        match c {
            '\u{f1}' => Some(FunctionCode::Fnc1),
            '\u{f2}' => Some(FunctionCode::Fnc2),
            '\u{f3}' => Some(FunctionCode::Fnc3),
            '\u{f4}' => Some(FunctionCode::Fnc4),
            _ => None,
        }
    }
}

/// One unit of symbol content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Data byte (ISO-8859-1 when rendered as text)
    Byte(u8),
    /// Function code
    Function(FunctionCode),
    /// Extended channel interpretation designator
    Eci(u32),
}

/// Ordered token stream of one symbol
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Content {
    tokens: Vec<Token>,
}

impl Content {
    /// Empty content
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse writer input: `U+00F1..U+00F4` are FNC1..FNC4, every other
    /// character must fit in one byte.
    pub fn from_marked(text: &str) -> Result<Self, EncodeError> {
        let mut content = Self::new();
        for (position, c) in text.chars().enumerate() {
            if let Some(function) = FunctionCode::from_escape(c) {
                content.push_function(function);
            } else if let Ok(byte) = u8::try_from(u32::from(c)) {
                content.push_byte(byte);
            } else {
                return Err(EncodeError::InvalidCharacter {
                    character: c,
                    position,
                });
            }
        }
        Ok(content)
    }

    /// Append a data byte
    pub fn push_byte(&mut self, byte: u8) {
        self.tokens.push(Token::Byte(byte));
    }

    /// Append every byte of an ASCII/Latin-1 string
    pub fn push_str(&mut self, text: &str) {
        for c in text.chars() {
            if let Ok(byte) = u8::try_from(u32::from(c)) {
                self.push_byte(byte);
            }
        }
    }

    /// Append a function code
    pub fn push_function(&mut self, function: FunctionCode) {
        self.tokens.push(Token::Function(function));
    }

    /// Append an ECI designator
    pub fn push_eci(&mut self, eci: u32) {
        self.tokens.push(Token::Eci(eci));
    }

    /// All tokens in order
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when no token has been recorded
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token index of the first occurrence of `function`
    pub fn function_position(&self, function: FunctionCode) -> Option<usize> {
        self.tokens
            .iter()
            .position(|t| *t == Token::Function(function))
    }

    /// Data bytes only, function codes and ECIs skipped
    pub fn bytes(&self) -> Vec<u8> {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                Token::Byte(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    /// Writer-input form: function codes become their escape characters
    pub fn to_marked_string(&self) -> String {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                Token::Byte(b) => Some(char::from(*b)),
                Token::Function(f) => Some(f.escape()),
                Token::Eci(_) => None,
            })
            .collect()
    }

    /// Visible text. Function codes are consumed; FNC4 shifts the next byte
    /// into the upper half of ISO-8859-1 and two consecutive FNC4s toggle
    /// that shift permanently.
    pub fn text(&self) -> String {
        self.render(false)
    }

    /// Visible text with GS1 rendering: a leading FNC1 is dropped, later ones
    /// become the group separator.
    pub fn gs1_text(&self) -> String {
        self.render(true)
    }

    fn render(&self, gs1: bool) -> String {
        let mut out = String::with_capacity(self.tokens.len());
        let mut upper_latched = false;
        let mut upper_shift = false;
        let mut seen_data = false;
        for token in &self.tokens {
            match token {
                Token::Byte(b) => {
                    let byte = if upper_latched != upper_shift {
                        b.wrapping_add(128)
                    } else {
                        *b
                    };
                    out.push(char::from(byte));
                    upper_shift = false;
                    seen_data = true;
                }
                Token::Function(FunctionCode::Fnc4) => {
                    if upper_shift {
                        upper_latched = !upper_latched;
                        upper_shift = false;
                    } else {
                        upper_shift = true;
                    }
                }
                Token::Function(FunctionCode::Fnc1) if gs1 && seen_data => {
                    out.push(GROUP_SEPARATOR);
                }
                Token::Function(_) | Token::Eci(_) => {}
            }
        }
        out
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        let mut content = Self::new();
        content.push_str(text);
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marked_round_trip() {
        let text = "\u{f1}10958\u{f1}17160526";
        let content = Content::from_marked(text).unwrap();
        assert_eq!(content.len(), 15);
        assert_eq!(content.to_marked_string(), text);
        assert_eq!(content.text(), "1095817160526");
        assert_eq!(content.gs1_text(), "10958\u{1d}17160526");
    }

    #[test]
    fn test_invalid_character() {
        let err = Content::from_marked("ab\u{263a}").unwrap_err();
        assert_eq!(
            err,
            EncodeError::InvalidCharacter {
                character: '\u{263a}',
                position: 2
            }
        );
    }

    #[test]
    fn test_fnc4_shift_and_latch() {
        let mut content = Content::new();
        content.push_function(FunctionCode::Fnc4);
        content.push_byte(b'A');
        content.push_byte(b'A');
        content.push_function(FunctionCode::Fnc4);
        content.push_function(FunctionCode::Fnc4);
        content.push_byte(b'B');
        content.push_byte(b'C');
        assert_eq!(content.text(), "\u{c1}A\u{c2}\u{c3}");
    }

    #[test]
    fn test_function_position() {
        let content = Content::from_marked("1\u{f1}2").unwrap();
        assert_eq!(content.function_position(FunctionCode::Fnc1), Some(1));
        assert_eq!(content.function_position(FunctionCode::Fnc2), None);
        assert_eq!(content.bytes(), b"12".to_vec());
    }
}
