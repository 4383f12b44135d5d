//! Value types, from which the voice is constructed.
//!
//! Durations and positions are exact rationals in whole notes.
//! Elements are placed into measures, measures are owned by segments
//! and compressed runs of [crate::dom].

pub mod element;
pub mod ids;
pub mod measure;
pub mod position;
pub mod time_signature;
pub mod whole_notes;

pub use element::{
    BarLineKind, BreakKind, Chord, ElementKind, FiguredBass, FlatNote,
    FlatNoteKind, Harmony, MeasureElement, Note, Rest, SoloStatus, Tuplet,
};
pub use ids::{MeasureId, MeasureUplink, SegmentId, VoiceId};
pub use measure::{
    IncompleteKind, Measure, MeasureKind, PuristNumbering, RepeatContext,
};
pub use position::{MeasurePosition, VoicePosition};
pub use time_signature::TimeSignature;
pub use whole_notes::WholeNotes;
