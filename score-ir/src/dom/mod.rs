//! Structure of a voice: segments of measures, repeats with endings and
//! compressed runs.
//!
//! A finalized [Voice] owns a list of [VoiceElement], every one of them
//! is either a plain [Segment], a [Repeat] whose common part and
//! endings hold elements again, or a compressed node wrapping the
//! measures it stands for.
//!
//! # Example
//!
//! ```
//! use score_ir::dom::{EndingKind, Voice, VoiceElement};
//! use score_ir::primitives::{
//!     MeasureElement, TimeSignature, VoiceId, WholeNotes,
//! };
//! let whole = WholeNotes::from_integer(1);
//! let mut voice = Voice::new(VoiceId(1), TimeSignature::default());
//! voice.start_repeat().unwrap();
//! voice.start_measure("1").unwrap();
//! voice.append(MeasureElement::note("c'", whole)).unwrap();
//! voice.start_ending(vec![1], EndingKind::Hooked).unwrap();
//! voice.start_measure("2").unwrap();
//! voice.append(MeasureElement::note("d'", whole)).unwrap();
//! voice.end_repeat(None).unwrap();
//! voice.end_ending().unwrap();
//! voice.start_ending(vec![2], EndingKind::Hookless).unwrap();
//! voice.start_measure("3").unwrap();
//! voice.append(MeasureElement::note("e'", whole)).unwrap();
//! voice.end_ending().unwrap();
//! voice.finalize_voice().unwrap();
//!
//! match &voice.initial_elements()[0] {
//!     VoiceElement::Repeat(repeat) => assert_eq!(repeat.endings().len(), 2),
//!     other => panic!("expected repeat, got {:?}", other),
//! }
//! assert_eq!(voice.measures_flat().len(), 3);
//! ```

mod compression;
mod repeat;
mod segment;
mod shadow;
mod slices;
mod voice;

pub use compression::{MeasureRepeat, MultipleMeasureRest, ReplicaExpansion};
pub use repeat::{EndingKind, Repeat, RepeatEnding, RepeatPhase};
pub use segment::Segment;
pub use shadow::{ShadowKind, ShadowVoice, ShadowVoices};
pub use slices::{
    MeasuresSlice, MeasuresSlicesSequence, NoteEvent, NoteEventKind,
    SimultaneousNotesChunk,
};
pub use voice::Voice;

use crate::primitives::{Measure, VoiceId};

#[derive(Debug, Clone, PartialEq)]
pub enum VoiceElement {
    Segment(Segment),
    Repeat(Repeat),
    MultipleMeasureRest(MultipleMeasureRest),
    MeasureRepeat(MeasureRepeat),
}
impl VoiceElement {
    /// All the measures inside, with compressed runs expanded.
    pub fn measures(&self) -> Vec<&Measure> {
        let mut measures = Vec::new();
        collect_measures(std::slice::from_ref(self), &mut measures);
        measures
    }
    pub(crate) fn create_deep_clone(&self, voice: VoiceId) -> Self {
        match self {
            Self::Segment(segment) => {
                Self::Segment(segment.create_deep_clone(voice))
            }
            Self::Repeat(repeat) => {
                Self::Repeat(repeat.create_deep_clone(voice))
            }
            Self::MultipleMeasureRest(rest) => {
                Self::MultipleMeasureRest(rest.create_deep_clone(voice))
            }
            Self::MeasureRepeat(repeat) => {
                Self::MeasureRepeat(repeat.create_deep_clone(voice))
            }
        }
    }
}

pub(crate) fn collect_measures<'a>(
    elements: impl IntoIterator<Item = &'a VoiceElement>,
    out: &mut Vec<&'a Measure>,
) {
    for element in elements {
        match element {
            VoiceElement::Segment(segment) => out.extend(segment.measures()),
            VoiceElement::Repeat(repeat) => {
                collect_measures(repeat.common_part(), out);
                for ending in repeat.endings() {
                    collect_measures(ending.elements(), out);
                }
            }
            VoiceElement::MultipleMeasureRest(rest) => {
                out.extend(rest.measures())
            }
            VoiceElement::MeasureRepeat(repeat) => {
                out.extend(repeat.measures(ReplicaExpansion::Full))
            }
        }
    }
}
