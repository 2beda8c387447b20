//! Per-symbology state threaded through successive row decodes.

use crate::models::Content;

/// Opaque state owned by the caller and handed to every `decode_row` call.
///
/// Each row reader only understands its own variant. Handing it a state of a
/// different variant (or [`DecodingState::Empty`]) makes it start afresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DecodingState {
    /// No reader has used this state yet
    #[default]
    Empty,
    /// Code 128 confirmation buffer
    Code128(Code128State),
}

impl DecodingState {
    /// Forget everything accumulated so far, keeping the variant
    pub fn reset(&mut self) {
        match self {
            DecodingState::Empty => {}
            DecodingState::Code128(state) => *state = Code128State::default(),
        }
    }

    /// True when no row has been decoded into this state
    pub fn is_fresh(&self) -> bool {
        match self {
            DecodingState::Empty => true,
            DecodingState::Code128(state) => state.rows_decoded == 0,
        }
    }

    /// Move the Code 128 variant out, or a fresh one if the state holds anything else
    pub(crate) fn take_code128(&mut self) -> Code128State {
        match std::mem::take(self) {
            DecodingState::Code128(state) => state,
            DecodingState::Empty => Code128State::default(),
        }
    }
}

/// Tracks how many consecutive rows agreed on the same content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Code128State {
    last: Option<Content>,
    line_count: usize,
    rows_decoded: usize,
}

impl Code128State {
    /// Record a decoded row; returns the current agreement count
    pub(crate) fn confirm(&mut self, content: &Content) -> usize {
        self.rows_decoded += 1;
        if self.last.as_ref() == Some(content) {
            self.line_count += 1;
        } else {
            self.last = Some(content.clone());
            self.line_count = 1;
        }
        self.line_count
    }

    /// Record a row that produced nothing; the next success counts from 1
    pub(crate) fn interrupt(&mut self) {
        self.rows_decoded += 1;
        self.last = None;
        self.line_count = 0;
    }

    /// Rows that reproduced the last content
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Rows read since creation or the last reset, failed ones included
    pub fn rows_decoded(&self) -> usize {
        self.rows_decoded
    }

    /// Last content seen
    pub fn last(&self) -> Option<&Content> {
        self.last.as_ref()
    }
}
