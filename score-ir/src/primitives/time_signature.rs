use std::fmt::Display;

use crate::{IrError, IrResult};

use super::WholeNotes;

/// Governs the full-measure duration.
///
/// Senza misura (cadenzas) has no full-measure duration, so every
/// measure under it is regular.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeSignature {
    Measured { beats: u32, beat_type: u32 },
    SenzaMisura,
}
impl TimeSignature {
    pub fn new(beats: u32, beat_type: u32) -> IrResult<Self> {
        match beats == 0 || beat_type == 0 {
            true => Err(IrError::InvalidDuration(format!(
                "time signature {}/{}",
                beats, beat_type
            ))),
            false => Ok(Self::Measured { beats, beat_type }),
        }
    }
    /// # Example
    /// ```
    /// use score_ir::primitives::{TimeSignature, WholeNotes};
    /// let ts = TimeSignature::new(6, 8).unwrap();
    /// assert_eq!(
    ///     ts.full_measure_duration(),
    ///     Some(WholeNotes::new(3, 4).unwrap())
    /// );
    /// assert_eq!(TimeSignature::SenzaMisura.full_measure_duration(), None);
    /// ```
    pub fn full_measure_duration(&self) -> Option<WholeNotes> {
        match self {
            Self::Measured { beats, beat_type } => {
                WholeNotes::new(*beats as i64, *beat_type as i64).ok()
            }
            Self::SenzaMisura => None,
        }
    }
}
impl Default for TimeSignature {
    fn default() -> Self {
        Self::Measured {
            beats: 4,
            beat_type: 4,
        }
    }
}
impl Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Measured { beats, beat_type } => {
                write!(f, "{}/{}", beats, beat_type)
            }
            Self::SenzaMisura => write!(f, "senza-misura"),
        }
    }
}
