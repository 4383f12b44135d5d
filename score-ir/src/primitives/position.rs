//! Everything needed to manipulate positions of elements.
//!
//! There are two kinds of positions: in measure and in voice.
//!
//! [MeasurePosition] is a distance from the measure start.
//! [VoicePosition] is a distance from the voice start, which is the
//! sum of the accumulated durations of all preceding measures.
//! Neither can be negative.
//!
//! # Examples
//!
//! ```
//! use score_ir::primitives::{MeasurePosition, VoicePosition, WholeNotes};
//!
//! let quarter = WholeNotes::new(1, 4).unwrap();
//! let a = MeasurePosition::zero() + quarter;
//! let b = MeasurePosition::from_ratio(3, 4).unwrap();
//! assert_eq!(b - a, WholeNotes::new(1, 2).unwrap());
//! assert_eq!(a - b, WholeNotes::new(-1, 2).unwrap());
//!
//! let measure_start = VoicePosition::from_ratio(7, 8).unwrap();
//! assert_eq!(
//!     measure_start + b,
//!     VoicePosition::from_ratio(13, 8).unwrap()
//! );
//! assert!(MeasurePosition::from_ratio(-1, 4).is_err());
//! ```

use std::{
    fmt::Display,
    ops::{Add, AddAssign, Sub},
};

use crate::{IrError, IrResult};

use super::WholeNotes;

fn non_negative(value: WholeNotes, what: &str) -> IrResult<WholeNotes> {
    match value.is_negative() {
        true => Err(IrError::InvalidDuration(format!(
            "{} can not be negative: {}",
            what, value
        ))),
        false => Ok(value),
    }
}

/// Position in measure in whole notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct MeasurePosition {
    position: WholeNotes,
}
impl MeasurePosition {
    pub fn new(position: WholeNotes) -> IrResult<Self> {
        Ok(Self {
            position: non_negative(position, "position in measure")?,
        })
    }
    pub fn from_ratio(numerator: i64, denominator: i64) -> IrResult<Self> {
        Self::new(WholeNotes::new(numerator, denominator)?)
    }
    pub fn zero() -> Self {
        Self::default()
    }
    pub fn get(&self) -> WholeNotes {
        self.position
    }
    /// Distance to the other position, regardless of order.
    pub fn distance_to(&self, other: &Self) -> WholeNotes {
        match self.position > other.position {
            true => self.position - other.position,
            false => other.position - self.position,
        }
    }
}
impl Display for MeasurePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.position)
    }
}
/// Durations added to positions are never negative.
impl Add<WholeNotes> for MeasurePosition {
    fn add(self, rhs: WholeNotes) -> Self::Output {
        Self {
            position: self.position + rhs,
        }
    }
    type Output = Self;
}
impl AddAssign<WholeNotes> for MeasurePosition {
    fn add_assign(&mut self, rhs: WholeNotes) {
        self.position += rhs;
    }
}
/// Signed distance between positions.
impl Sub for MeasurePosition {
    fn sub(self, rhs: Self) -> Self::Output {
        self.position - rhs.position
    }
    type Output = WholeNotes;
}

/// Position in voice in whole notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct VoicePosition {
    position: WholeNotes,
}
impl VoicePosition {
    pub fn new(position: WholeNotes) -> IrResult<Self> {
        Ok(Self {
            position: non_negative(position, "position in voice")?,
        })
    }
    pub fn from_ratio(numerator: i64, denominator: i64) -> IrResult<Self> {
        Self::new(WholeNotes::new(numerator, denominator)?)
    }
    pub fn zero() -> Self {
        Self::default()
    }
    pub fn get(&self) -> WholeNotes {
        self.position
    }
}
impl Display for VoicePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.position)
    }
}
impl Add<WholeNotes> for VoicePosition {
    fn add(self, rhs: WholeNotes) -> Self::Output {
        Self {
            position: self.position + rhs,
        }
    }
    type Output = Self;
}
impl Add<MeasurePosition> for VoicePosition {
    fn add(self, rhs: MeasurePosition) -> Self::Output {
        Self {
            position: self.position + rhs.get(),
        }
    }
    type Output = Self;
}
impl AddAssign<WholeNotes> for VoicePosition {
    fn add_assign(&mut self, rhs: WholeNotes) {
        self.position += rhs;
    }
}
impl Sub for VoicePosition {
    fn sub(self, rhs: Self) -> Self::Output {
        self.position - rhs.position
    }
    type Output = WholeNotes;
}
