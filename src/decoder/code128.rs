//! Code 128 row decoding.
//!
//! Symbols are matched by comparing run widths against the pattern table with a
//! variance score, so the row may be at any pixel scale.

use crate::debug::trace;
use crate::decoder::state::DecodingState;
use crate::decoder::tables::{
    self, CODE_CODE_A, CODE_CODE_B, CODE_CODE_C, CODE_FNC_1, CODE_FNC_2, CODE_FNC_3,
    CODE_FNC_4_A, CODE_FNC_4_B, CODE_PATTERNS, CODE_SHIFT, CODE_START_A, CODE_START_B,
    CODE_START_C, CODE_STOP, STOP_PATTERN, SYMBOL_MODULES,
};
use crate::error::DecodeError;
use crate::models::{
    BarcodeFormat, BitArray, Content, Decoded, FunctionCode, Point, SymbolMetadata,
};

const MAX_AVG_VARIANCE: f32 = 0.25;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;
/// Largest relative difference between a row's known scale and the start pattern's module width
const MAX_SCALE_DEVIATION: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

impl CodeSet {
    fn from_start(code: u8) -> Option<Self> {
        match code {
            CODE_START_A => Some(CodeSet::A),
            CODE_START_B => Some(CodeSet::B),
            CODE_START_C => Some(CodeSet::C),
            _ => None,
        }
    }

    fn shifted(self) -> Self {
        match self {
            CodeSet::A => CodeSet::B,
            CodeSet::B => CodeSet::A,
            CodeSet::C => CodeSet::C,
        }
    }
}

/// Where the start pattern sits on the row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StartPattern {
    begin: usize,
    end: usize,
    code: u8,
}

impl StartPattern {
    fn module_width(&self) -> f32 {
        (self.end - self.begin) as f32 / SYMBOL_MODULES as f32
    }
}

/// Code 128 row reader
#[derive(Debug, Clone, Copy, Default)]
pub struct Code128Reader {
    assume_gs1: bool,
}

impl Code128Reader {
    /// Create a reader with plain text rendering
    pub fn new() -> Self {
        Self::default()
    }

    /// Render FNC1 as GS1 group separators in the decoded text
    pub fn with_gs1(mut self, assume_gs1: bool) -> Self {
        self.assume_gs1 = assume_gs1;
        self
    }

    /// Fresh state for this reader
    pub fn create_state(&self) -> DecodingState {
        DecodingState::Code128(Default::default())
    }

    /// Decode the first Code 128 symbol on `row`.
    ///
    /// `state` accumulates across rows of the same image; on success the result's
    /// line count tells how many consecutive rows produced the same content.
    /// A row that fails breaks the run. When `row` carries a scale, a start
    /// pattern of a clearly different module width is not accepted.
    pub fn decode_row(
        &self,
        row_number: usize,
        row: &BitArray,
        state: &mut DecodingState,
    ) -> Result<Decoded, DecodeError> {
        let mut code128_state = state.take_code128();
        let symbol = read_symbol(row);
        let line_count = match &symbol {
            Ok((_, _, content)) => code128_state.confirm(content),
            Err(_) => {
                code128_state.interrupt();
                0
            }
        };
        *state = DecodingState::Code128(code128_state);
        let (start, end, content) = symbol?;

        let symbology_identifier = format!("]C{}", symbology_modifier(&content));
        let text = if self.assume_gs1 {
            content.gs1_text()
        } else {
            content.text()
        };
        let module_width = start.module_width();
        let y = row_number as f32;

        Ok(Decoded {
            format: BarcodeFormat::Code128,
            text,
            symbology_identifier,
            position: vec![
                Point::new(start.begin as f32, y),
                Point::new(end as f32, y),
            ],
            metadata: SymbolMetadata::Linear {
                row: row_number,
                line_count,
                module_width,
            },
            content,
        })
    }
}

/// Start pattern, end of the stop pattern and content of the first symbol on `row`
fn read_symbol(row: &BitArray) -> Result<(StartPattern, usize, Content), DecodeError> {
    let start = find_start_pattern(row)?;
    if let Some(scale) = row.scale() {
        let measured = start.module_width();
        if (measured - scale).abs() > scale * MAX_SCALE_DEVIATION {
            trace!(
                "code128: start pattern module width {} against row scale {}",
                measured,
                scale
            );
            return Err(DecodeError::StartPatternNotFound);
        }
    }

    let mut values: Vec<u8> = Vec::with_capacity(20);
    let mut counters = [0usize; 6];
    let mut next_start = start.end;
    let mut last_start;
    loop {
        let code = decode_code(row, &mut counters, next_start)?;
        last_start = next_start;
        next_start += counters.iter().sum::<usize>();
        match code {
            CODE_START_A | CODE_START_B | CODE_START_C => {
                return Err(DecodeError::Format("start code inside symbol"));
            }
            CODE_STOP => break,
            _ => values.push(code),
        }
    }

    // The matcher only looked at six of the stop pattern's seven runs
    next_start = row.next_unset(next_start);
    let quiet_end = row.len().min(next_start + (next_start - last_start) / 2);
    if !row.is_range(next_start, quiet_end, false) {
        trace!("code128: no quiet zone after stop at {}", next_start);
        return Err(DecodeError::StopPatternNotFound);
    }

    let Some(expected) = values.pop() else {
        return Err(DecodeError::Format("missing check symbol"));
    };
    if values.is_empty() {
        return Err(DecodeError::Format("symbol carries no data"));
    }
    let computed = tables::checksum(start.code, &values);
    if computed != expected {
        trace!(
            "code128: checksum {} does not match check symbol {}",
            computed,
            expected
        );
        return Err(DecodeError::ChecksumMismatch { expected, computed });
    }

    let content = interpret(start.code, &values)?;
    if content.bytes().is_empty() {
        return Err(DecodeError::Format("symbol carries no data"));
    }
    Ok((start, next_start, content))
}

/// Average per-module deviation of `counters` from `pattern`, or infinity when
/// any single run is off by more than `max_individual` modules
fn pattern_match_variance(counters: &[usize], pattern: &[u8], max_individual: f32) -> f32 {
    let total: usize = counters.iter().sum();
    let pattern_length: usize = pattern.iter().take(counters.len()).map(|&p| p as usize).sum();
    if total < pattern_length || pattern_length == 0 {
        return f32::INFINITY;
    }
    let unit = total as f32 / pattern_length as f32;
    let max_individual = max_individual * unit;

    let mut total_variance = 0.0f32;
    for (&counter, &expected) in counters.iter().zip(pattern) {
        let scaled = expected as f32 * unit;
        let variance = (counter as f32 - scaled).abs();
        if variance > max_individual {
            return f32::INFINITY;
        }
        total_variance += variance;
    }
    total_variance / total as f32
}

/// Fill `counters` with consecutive run lengths starting at `start`. The last
/// run may be cut off by the end of the row.
fn record_pattern(row: &BitArray, start: usize, counters: &mut [usize]) -> bool {
    counters.fill(0);
    let end = row.len();
    if start >= end {
        return false;
    }
    let mut is_white = !row.get(start);
    let mut position = 0usize;
    let mut i = start;
    while i < end {
        if row.get(i) != is_white {
            counters[position] += 1;
        } else {
            position += 1;
            if position == counters.len() {
                break;
            }
            counters[position] = 1;
            is_white = !is_white;
        }
        i += 1;
    }
    position == counters.len() || (position == counters.len() - 1 && i == end)
}

fn find_start_pattern(row: &BitArray) -> Result<StartPattern, DecodeError> {
    let width = row.len();
    let row_offset = row.next_set(0);

    let mut counters = [0usize; 6];
    let mut position = 0usize;
    let mut pattern_start = row_offset;
    let mut is_white = false;

    for i in row_offset..width {
        if row.get(i) != is_white {
            counters[position] += 1;
            continue;
        }
        if position == counters.len() - 1 {
            let mut best_variance = MAX_AVG_VARIANCE;
            let mut best_match = None;
            for code in CODE_START_A..=CODE_START_C {
                let variance = pattern_match_variance(
                    &counters,
                    &CODE_PATTERNS[code as usize],
                    MAX_INDIVIDUAL_VARIANCE,
                );
                if variance < best_variance {
                    best_variance = variance;
                    best_match = Some(code);
                }
            }
            // Quiet zone of at least half the start pattern, clamped at the row start
            if let Some(code) = best_match {
                let quiet_start = pattern_start.saturating_sub((i - pattern_start) / 2);
                if row.is_range(quiet_start, pattern_start, false) {
                    return Ok(StartPattern {
                        begin: pattern_start,
                        end: i,
                        code,
                    });
                }
            }
            pattern_start += counters[0] + counters[1];
            counters.copy_within(2.., 0);
            counters[position - 1] = 0;
            counters[position] = 0;
            position -= 1;
        } else {
            position += 1;
        }
        counters[position] = 1;
        is_white = !is_white;
    }
    Err(DecodeError::StartPatternNotFound)
}

/// Match the six runs at `offset` against every symbol, the stop pattern included
fn decode_code(row: &BitArray, counters: &mut [usize; 6], offset: usize) -> Result<u8, DecodeError> {
    if !record_pattern(row, offset, counters) {
        return Err(DecodeError::StopPatternNotFound);
    }
    let mut best_variance = MAX_AVG_VARIANCE;
    let mut best_match = None;
    let candidates = CODE_PATTERNS
        .iter()
        .map(|p| p.as_slice())
        .chain(std::iter::once(STOP_PATTERN.as_slice()));
    for (value, pattern) in candidates.enumerate() {
        let variance = pattern_match_variance(counters, pattern, MAX_INDIVIDUAL_VARIANCE);
        if variance < best_variance {
            best_variance = variance;
            best_match = Some(value as u8);
        }
    }
    best_match.ok_or(DecodeError::StopPatternNotFound)
}

/// Turn checked symbol values into content tokens
fn interpret(start_code: u8, values: &[u8]) -> Result<Content, DecodeError> {
    let mut code_set =
        CodeSet::from_start(start_code).ok_or(DecodeError::Format("unknown start code"))?;
    let mut shift_pending = false;
    let mut content = Content::new();

    for &value in values {
        let set = if shift_pending {
            code_set.shifted()
        } else {
            code_set
        };
        shift_pending = false;

        match set {
            CodeSet::C if value < 100 => {
                content.push_byte(b'0' + value / 10);
                content.push_byte(b'0' + value % 10);
            }
            CodeSet::A if value < 64 => content.push_byte(b' ' + value),
            CodeSet::A if value < 96 => content.push_byte(value - 64),
            CodeSet::B if value < 96 => content.push_byte(b' ' + value),
            _ => match (set, value) {
                (_, CODE_FNC_1) => content.push_function(FunctionCode::Fnc1),
                (CodeSet::A | CodeSet::B, CODE_FNC_2) => {
                    content.push_function(FunctionCode::Fnc2)
                }
                (CodeSet::A | CodeSet::B, CODE_FNC_3) => {
                    content.push_function(FunctionCode::Fnc3)
                }
                (CodeSet::A | CodeSet::B, CODE_SHIFT) => shift_pending = true,
                (CodeSet::A | CodeSet::B, CODE_CODE_C) => code_set = CodeSet::C,
                (CodeSet::A, CODE_FNC_4_A) | (CodeSet::B, CODE_FNC_4_B) => {
                    content.push_function(FunctionCode::Fnc4)
                }
                (CodeSet::A | CodeSet::C, CODE_CODE_B) => code_set = CodeSet::B,
                (CodeSet::B | CodeSet::C, CODE_CODE_A) => code_set = CodeSet::A,
                _ => return Err(DecodeError::Format("symbol value invalid in code set")),
            },
        }
    }
    Ok(content)
}

/// 1 when FNC1 leads, 2 when it follows one data character, 4 for FNC2
fn symbology_modifier(content: &Content) -> u8 {
    match content.function_position(FunctionCode::Fnc1) {
        Some(0) => 1,
        Some(1) => 2,
        _ if content.function_position(FunctionCode::Fnc2).is_some() => 4,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: &str = "00000";
    const START_B: &str = "11010010000";
    const START_C: &str = "11010011100";
    const FNC1: &str = "11110101110";
    const SWITCH_B: &str = "10111101110";
    const STOP: &str = "1100011101011";

    fn fnc1_123() -> BitArray {
        let bits = [
            QUIET, START_C, FNC1, "10110011100", SWITCH_B, "11001011100", "10101111000", STOP, QUIET,
        ]
        .concat();
        BitArray::parse(&bits).unwrap()
    }

    #[test]
    fn test_decode_fnc1_row() {
        let reader = Code128Reader::new();
        let mut state = reader.create_state();
        let result = reader.decode_row(0, &fnc1_123(), &mut state).unwrap();
        assert_eq!(result.text, "123");
        assert_eq!(result.content.to_marked_string(), "\u{f1}123");
        assert_eq!(result.symbology_identifier, "]C1");
        assert_eq!(result.position[0], Point::new(5.0, 0.0));
        match result.metadata {
            SymbolMetadata::Linear {
                line_count,
                module_width,
                ..
            } => {
                assert_eq!(line_count, 1);
                assert!((module_width - 1.0).abs() < 1e-6);
            }
            other => panic!("unexpected metadata {other:?}"),
        }
    }

    #[test]
    fn test_decode_scaled_row() {
        let row = fnc1_123().scaled(3);
        let result = Code128Reader::new()
            .decode_row(4, &row, &mut DecodingState::Empty)
            .unwrap();
        assert_eq!(result.text, "123");
        assert_eq!(result.position[0], Point::new(15.0, 4.0));
    }

    #[test]
    fn test_line_count_accumulates() {
        let reader = Code128Reader::new();
        let mut state = reader.create_state();
        let row = fnc1_123();
        reader.decode_row(0, &row, &mut state).unwrap();
        let second = reader.decode_row(1, &row, &mut state).unwrap();
        assert!(matches!(
            second.metadata,
            SymbolMetadata::Linear { line_count: 2, .. }
        ));
        state.reset();
        assert!(state.is_fresh());
    }

    #[test]
    fn test_failed_row_breaks_the_run() {
        let reader = Code128Reader::new();
        let mut state = reader.create_state();
        let good = fnc1_123();
        let mut corrupt = good.clone();
        corrupt.flip(40);
        reader.decode_row(0, &good, &mut state).unwrap();
        assert!(reader.decode_row(1, &corrupt, &mut state).is_err());
        let third = reader.decode_row(2, &good, &mut state).unwrap();
        assert!(matches!(
            third.metadata,
            SymbolMetadata::Linear { line_count: 1, .. }
        ));
    }

    #[test]
    fn test_row_scale_must_match_start_pattern() {
        let reader = Code128Reader::new();
        let row = fnc1_123().scaled(3);
        assert!(reader
            .decode_row(0, &row.clone().with_scale(3.2), &mut DecodingState::Empty)
            .is_ok());
        assert_eq!(
            reader
                .decode_row(0, &row.with_scale(1.0), &mut DecodingState::Empty)
                .unwrap_err(),
            DecodeError::StartPatternNotFound
        );
    }

    #[test]
    fn test_wrong_check_symbol() {
        // Check symbol 92 replaced with 56
        let bits = [
            QUIET, START_C, FNC1, "10110011100", SWITCH_B, "11001011100", "11100010110", STOP, QUIET,
        ]
        .concat();
        let row = BitArray::parse(&bits).unwrap();
        let err = Code128Reader::new()
            .decode_row(0, &row, &mut DecodingState::Empty)
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::ChecksumMismatch {
                expected: 56,
                computed: 92
            }
        );
    }

    #[test]
    fn test_missing_quiet_zone() {
        let bits = ["1", START_B, "10011100110", STOP].concat();
        let row = BitArray::parse(&bits).unwrap();
        assert_eq!(
            Code128Reader::new()
                .decode_row(0, &row, &mut DecodingState::Empty)
                .unwrap_err(),
            DecodeError::StartPatternNotFound
        );
    }

    #[test]
    fn test_truncated_symbol() {
        let bits = [QUIET, START_B, "10011100110", "11001110010", QUIET].concat();
        let row = BitArray::parse(&bits).unwrap();
        assert_eq!(
            Code128Reader::new()
                .decode_row(0, &row, &mut DecodingState::Empty)
                .unwrap_err(),
            DecodeError::StopPatternNotFound
        );
    }

    #[test]
    fn test_blank_row() {
        let row = BitArray::new(120);
        assert_eq!(
            Code128Reader::new()
                .decode_row(0, &row, &mut DecodingState::Empty)
                .unwrap_err(),
            DecodeError::StartPatternNotFound
        );
    }

    #[test]
    fn test_interpret_code_sets() {
        // Start A: 'A', LF, SHIFT 'a', CODE C "42"
        let content = interpret(CODE_START_A, &[33, 74, CODE_SHIFT, 65, CODE_CODE_C, 42]).unwrap();
        assert_eq!(content.text(), "A\na42");
        // FNC4 in B followed by 'A'
        let extended = interpret(CODE_START_B, &[CODE_FNC_4_B, 33]).unwrap();
        assert_eq!(extended.text(), "\u{c1}");
        assert_eq!(extended.to_marked_string(), "\u{f4}A");
    }

    #[test]
    fn test_variance_rejects_short_runs() {
        assert!(pattern_match_variance(&[1, 1, 1], &[2, 2, 2], 0.7).is_infinite());
        assert!(pattern_match_variance(&[2, 1, 2, 2, 2, 2], &CODE_PATTERNS[0], 0.7) < 1e-6);
    }

    #[test]
    fn test_symbology_modifier() {
        assert_eq!(symbology_modifier(&Content::from_marked("\u{f1}01").unwrap()), 1);
        assert_eq!(symbology_modifier(&Content::from_marked("A\u{f1}01").unwrap()), 2);
        assert_eq!(symbology_modifier(&Content::from_marked("\u{f2}1").unwrap()), 4);
        assert_eq!(symbology_modifier(&Content::from("AB")), 0);
    }
}
