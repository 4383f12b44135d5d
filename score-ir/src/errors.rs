//! Errors of the voice time model.
//!
//! Only [IrError::InvalidDuration] rejects the call that produced it.
//! Everything else is either returned for the caller to inspect, or
//! recovered locally and pushed to the diagnostics list of the measure
//! and its voice.

use crate::primitives::{VoiceId, WholeNotes};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IrError {
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
    #[error("Malformed repeat (input line {line}): {reason}")]
    MalformedRepeat { reason: String, line: u32 },
    #[error(
        "Measure {measure} overflows: accumulated {accumulated}, \
        full measure {full}"
    )]
    MeasureOverflow {
        measure: String,
        accumulated: WholeNotes,
        full: WholeNotes,
    },
    #[error(
        "Position of element at input line {line} in measure {measure} \
        corrected from {stored} to {recomputed}"
    )]
    PositionInconsistency {
        measure: String,
        line: u32,
        stored: WholeNotes,
        recomputed: WholeNotes,
    },
    #[error("Compressed run wraps no measure: {0}")]
    EmptyCompressedRun(String),
    #[error("Malformed measure repeat: {0}")]
    MalformedMeasureRepeat(String),
    #[error("Measure {0} is already finalized")]
    MeasureAlreadyFinalized(String),
    #[error("Voice {0} is already finalized")]
    VoiceFinalized(VoiceId),
    #[error("Can not merge slices sequences of sizes {0} and {1}")]
    SliceSequenceMismatch(usize, usize),
}
pub type IrResult<T> = Result<T, IrError>;
