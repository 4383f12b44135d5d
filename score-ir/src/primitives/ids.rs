//! Identifiers and non-owning back-references.
//!
//! Uplinks are plain lookups into the tree owned by a voice, so the
//! ownership stays a strict tree: voice → segment → measure → element.

use std::fmt::Display;

/// Voice number. Shadow voices derive theirs from the regular voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VoiceId(pub u32);
impl VoiceId {
    pub const HARMONIES_BASE: u32 = 20;
    pub const FIGURED_BASS_BASE: u32 = 40;

    pub fn harmonies(&self) -> Self {
        Self(self.0 + Self::HARMONIES_BASE)
    }
    pub fn figured_bass(&self) -> Self {
        Self(self.0 + Self::FIGURED_BASS_BASE)
    }
}
impl Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 0-based ordinal of the measure in its voice, kept by clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MeasureId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SegmentId(pub usize);

/// Where an element lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeasureUplink {
    pub voice: VoiceId,
    pub measure: MeasureId,
}
