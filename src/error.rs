//! Error types shared by detection, decoding, correction and encoding.

use thiserror::Error;

/// Coarse failure classes, stable across individual error variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Finder, orientation or perspective failure
    Geometry,
    /// Aztec mode message could not be corrected
    ModeMessage,
    /// Start or stop pattern missing in a linear row
    Pattern,
    /// Linear checksum mismatch
    Checksum,
    /// More damage than the error-correction budget allows
    CorrectionCapacityExceeded,
    /// Structurally invalid symbol content
    Format,
    /// Writer input rejected
    InvalidInput,
}

/// Reed-Solomon failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrectionError {
    /// The damage exceeds what the check symbols can repair
    #[error("too many errors to correct (capacity {ec_count} check symbols)")]
    CapacityExceeded {
        /// Check symbols in the block
        ec_count: usize,
    },
    /// Codeword layout inconsistent with the request
    #[error("invalid correction input: {0}")]
    InvalidInput(&'static str),
}

/// Detection and decoding failures. No partial payload accompanies any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// No location exhibited the finder signature
    #[error("finder pattern not found")]
    FinderNotFound,
    /// Orientation marks match no rotation within tolerance
    #[error("orientation marks are ambiguous")]
    OrientationAmbiguous,
    /// Perspective transform is singular or fails validation
    #[error("perspective transform is degenerate")]
    GeometryDegenerate,
    /// Mode message failed error correction
    #[error("mode message is corrupt")]
    ModeMessageCorrupt,
    /// No start pattern with a quiet zone on the row
    #[error("start pattern not found")]
    StartPatternNotFound,
    /// Symbol stream ended without a valid stop pattern
    #[error("stop pattern not found")]
    StopPatternNotFound,
    /// Weighted checksum disagrees with the check symbol
    #[error("checksum mismatch: symbol carries {expected}, data sums to {computed}")]
    ChecksumMismatch {
        /// Value of the check symbol
        expected: u8,
        /// Value computed from the data symbols
        computed: u8,
    },
    /// Reed-Solomon correction failed
    #[error(transparent)]
    Correction(#[from] CorrectionError),
    /// Structurally invalid content
    #[error("invalid symbol format: {0}")]
    Format(&'static str),
}

impl DecodeError {
    /// Failure class
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::FinderNotFound
            | DecodeError::OrientationAmbiguous
            | DecodeError::GeometryDegenerate => ErrorKind::Geometry,
            DecodeError::ModeMessageCorrupt => ErrorKind::ModeMessage,
            DecodeError::StartPatternNotFound | DecodeError::StopPatternNotFound => {
                ErrorKind::Pattern
            }
            DecodeError::ChecksumMismatch { .. } => ErrorKind::Checksum,
            DecodeError::Correction(CorrectionError::CapacityExceeded { .. }) => {
                ErrorKind::CorrectionCapacityExceeded
            }
            DecodeError::Correction(CorrectionError::InvalidInput(_)) | DecodeError::Format(_) => {
                ErrorKind::Format
            }
        }
    }

    /// Ranking used when several attempts fail: the later a stage fails, the
    /// more informative its error.
    pub(crate) fn specificity(&self) -> u8 {
        match self {
            DecodeError::FinderNotFound | DecodeError::StartPatternNotFound => 0,
            DecodeError::StopPatternNotFound => 1,
            DecodeError::OrientationAmbiguous | DecodeError::GeometryDegenerate => 2,
            DecodeError::ModeMessageCorrupt => 3,
            DecodeError::ChecksumMismatch { .. } => 4,
            DecodeError::Correction(_) => 5,
            DecodeError::Format(_) => 6,
        }
    }

    /// Keep whichever error got further; ties keep `self`
    pub(crate) fn most_specific(self, other: DecodeError) -> DecodeError {
        if other.specificity() > self.specificity() {
            other
        } else {
            self
        }
    }
}

/// Writer failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Character outside the symbology's alphabet
    #[error("character {character:?} at position {position} cannot be encoded")]
    InvalidCharacter {
        /// Offending character
        character: char,
        /// Index in the input, counted in characters
        position: usize,
    },
    /// Input length outside the supported range
    #[error("content length {len} is outside 1..={max}")]
    InvalidLength {
        /// Supplied length
        len: usize,
        /// Maximum supported length
        max: usize,
    },
    /// Content does not fit in the largest symbol
    #[error("data too large for the symbol")]
    DataTooLarge,
    /// Writer option out of range
    #[error("invalid writer parameter: {0}")]
    InvalidParameter(&'static str),
}

impl EncodeError {
    /// Failure class
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(DecodeError::FinderNotFound.kind(), ErrorKind::Geometry);
        assert_eq!(DecodeError::ModeMessageCorrupt.kind(), ErrorKind::ModeMessage);
        assert_eq!(
            DecodeError::from(CorrectionError::CapacityExceeded { ec_count: 4 }).kind(),
            ErrorKind::CorrectionCapacityExceeded
        );
        assert_eq!(EncodeError::DataTooLarge.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_most_specific() {
        let finder = DecodeError::FinderNotFound;
        assert_eq!(
            finder.clone().most_specific(DecodeError::ModeMessageCorrupt),
            DecodeError::ModeMessageCorrupt
        );
        assert_eq!(
            DecodeError::GeometryDegenerate.most_specific(DecodeError::OrientationAmbiguous),
            DecodeError::GeometryDegenerate
        );
        assert_eq!(
            DecodeError::Format("x").most_specific(finder),
            DecodeError::Format("x")
        );
    }

    #[test]
    fn test_messages() {
        let err = DecodeError::ChecksumMismatch {
            expected: 92,
            computed: 17,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: symbol carries 92, data sums to 17"
        );
        assert_eq!(
            DecodeError::from(CorrectionError::CapacityExceeded { ec_count: 6 }).to_string(),
            "too many errors to correct (capacity 6 check symbols)"
        );
    }
}
