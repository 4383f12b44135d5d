//! Voice-level time model of a music notation intermediate representation.
//!
//! The import layer drives a [dom::Voice] by sequential calls: measures,
//! elements, backups, repeats and compressed runs. The voice keeps exact
//! positions of everything it owns, classifies measures, builds repeats
//! and keeps harmonies and figured bass aligned with its own time line.
//! Once finalized, the voice is walked by output backends through
//! [visitor::VoiceVisitor], or read as flat measures and measures slices.

pub mod dom;
pub mod errors;
pub mod options;
pub mod primitives;
pub mod visitor;

pub use errors::{IrError, IrResult};
pub use options::IrOptions;
