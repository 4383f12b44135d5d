//! Exact musical durations, measured in whole notes.
//!
//! `1` is a whole note, `1/4` is a quarter. Values are always kept
//! reduced and never rounded, so any chain of additions and
//! subtractions is reversible.
//!
//! # Example
//!
//! ```
//! use score_ir::primitives::WholeNotes;
//! let quarter = WholeNotes::new(1, 4).unwrap();
//! let eighth = WholeNotes::new(1, 8).unwrap();
//! assert_eq!(quarter + eighth, WholeNotes::new(3, 8).unwrap());
//! assert_eq!((quarter + eighth) - eighth, quarter);
//! assert_eq!(quarter.times(4), WholeNotes::new(1, 1).unwrap());
//! assert!(WholeNotes::new(1, 0).is_err());
//! ```

use std::{
    cmp::Ordering,
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use fraction::Fraction;

use crate::{IrError, IrResult};

#[derive(Debug, Clone, Copy)]
pub struct WholeNotes {
    fraction: Fraction,
}
impl WholeNotes {
    /// Fails with [IrError::InvalidDuration] on zero or negative
    /// denominator.
    pub fn new(numerator: i64, denominator: i64) -> IrResult<Self> {
        if denominator <= 0 {
            return Err(IrError::InvalidDuration(format!(
                "{}/{}: denominator should be positive",
                numerator, denominator
            )));
        }
        Ok(Self::from_parts(numerator as i128, denominator as i128))
    }
    pub fn zero() -> Self {
        Self {
            fraction: Fraction::new(0_u64, 1_u64),
        }
    }
    pub fn from_integer(value: u32) -> Self {
        Self {
            fraction: Fraction::new(value as u64, 1_u64),
        }
    }
    /// Rejects NaN and infinite fractions.
    pub fn from_fraction(fraction: Fraction) -> IrResult<Self> {
        if fraction.is_nan() || fraction.is_infinite() {
            return Err(IrError::InvalidDuration(format!(
                "{} is not a finite duration",
                fraction
            )));
        }
        Ok(Self { fraction })
    }
    fn from_parts(numerator: i128, denominator: i128) -> Self {
        let magnitude = u64::try_from(numerator.unsigned_abs())
            .unwrap_or(u64::MAX);
        let denominator = u64::try_from(denominator).unwrap_or(u64::MAX);
        let fraction = match numerator < 0 {
            true => Fraction::new_neg(magnitude, denominator),
            false => Fraction::new(magnitude, denominator),
        };
        Self { fraction }
    }

    pub fn get(&self) -> Fraction {
        self.fraction
    }
    pub fn numerator(&self) -> i64 {
        let magnitude = self.fraction.numer().copied().unwrap_or(0) as i64;
        match self.fraction.is_sign_negative() {
            true => -magnitude,
            false => magnitude,
        }
    }
    pub fn denominator(&self) -> i64 {
        self.fraction.denom().copied().unwrap_or(1) as i64
    }
    pub fn is_zero(&self) -> bool {
        self.numerator() == 0
    }
    pub fn is_negative(&self) -> bool {
        self.numerator() < 0
    }

    /// Multiply by an integer factor (repeat counts, replicas).
    pub fn times(&self, factor: u32) -> Self {
        Self::from_parts(
            self.numerator() as i128 * factor as i128,
            self.denominator() as i128,
        )
    }

    /// Multiply by `numerator / denominator` (tuplet ratios).
    pub fn scaled(&self, numerator: u32, denominator: u32) -> IrResult<Self> {
        if denominator == 0 {
            return Err(IrError::InvalidDuration(format!(
                "can not scale {} by {}/0",
                self, numerator
            )));
        }
        Ok(Self::from_parts(
            self.numerator() as i128 * numerator as i128,
            self.denominator() as i128 * denominator as i128,
        ))
    }

    /// Distance from `self` to the next multiple of `full`.
    ///
    /// for example: 3/8 in 4/4 gives 5/8, and 0 gives the full measure.
    pub fn distance_to_next_boundary(&self, full: WholeNotes) -> WholeNotes {
        if full.numerator() <= 0 {
            return Self::zero();
        }
        if self.is_negative() {
            return -*self;
        }
        let (a, b) = (self.numerator() as i128, self.denominator() as i128);
        let (c, d) = (full.numerator() as i128, full.denominator() as i128);
        let remainder = Self::from_parts((a * d).rem_euclid(c * b), b * d);
        full - remainder
    }
}
impl Default for WholeNotes {
    fn default() -> Self {
        Self::zero()
    }
}
impl PartialEq for WholeNotes {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for WholeNotes {}
impl PartialOrd for WholeNotes {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for WholeNotes {
    fn cmp(&self, other: &Self) -> Ordering {
        let left = self.numerator() as i128 * other.denominator() as i128;
        let right = other.numerator() as i128 * self.denominator() as i128;
        left.cmp(&right)
    }
}
impl Display for WholeNotes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.denominator() {
            1 => write!(f, "{}", self.numerator()),
            d => write!(f, "{}/{}", self.numerator(), d),
        }
    }
}
impl Add for WholeNotes {
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            fraction: self.fraction + rhs.fraction,
        }
    }
    type Output = Self;
}
impl AddAssign for WholeNotes {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
impl Sub for WholeNotes {
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            fraction: self.fraction - rhs.fraction,
        }
    }
    type Output = Self;
}
impl SubAssign for WholeNotes {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}
impl Neg for WholeNotes {
    fn neg(self) -> Self::Output {
        Self::zero() - self
    }
    type Output = Self;
}
impl Sum for WholeNotes {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, item| acc + item)
    }
}
impl<'a> Sum<&'a WholeNotes> for WholeNotes {
    fn sum<I: Iterator<Item = &'a WholeNotes>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, item| acc + *item)
    }
}
