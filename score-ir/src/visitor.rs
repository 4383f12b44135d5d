//! Walking a finalized voice.
//!
//! Backends implement [VoiceVisitor], overriding only the callbacks
//! they need. Every structure is entered by a `*_start` call and left by
//! the matching `*_end` call, measures in voice order.
//!
//! # Example
//!
//! ```
//! use score_ir::dom::Voice;
//! use score_ir::primitives::{
//!     Measure, MeasureElement, TimeSignature, VoiceId, WholeNotes,
//! };
//! use score_ir::visitor::{FlatViewVisitor, VoiceVisitor};
//!
//! #[derive(Default)]
//! struct Counter(usize);
//! impl VoiceVisitor for Counter {
//!     fn visit_measure_start(&mut self, _measure: &Measure) {
//!         self.0 += 1;
//!     }
//! }
//!
//! let mut voice = Voice::new(VoiceId(1), TimeSignature::default());
//! let half = WholeNotes::new(1, 2).unwrap();
//! for pitch in ["c'", "d'", "e'", "f'"] {
//!     voice.append(MeasureElement::note(pitch, half)).unwrap();
//!     if pitch == "d'" {
//!         voice.end_measure().unwrap();
//!     }
//! }
//! voice.finalize_voice().unwrap();
//!
//! let mut counter = Counter::default();
//! voice.browse(&mut counter);
//! assert_eq!(counter.0, 2);
//! assert_eq!(
//!     FlatViewVisitor::render(&voice),
//!     "1 [1] regular: c':1/2 d':1/2\n2 [2] regular: e':1/2 f':1/2"
//! );
//! ```

use crate::{
    dom::{
        MeasureRepeat, MultipleMeasureRest, Repeat, RepeatEnding,
        ReplicaExpansion, Segment, Voice, VoiceElement,
    },
    primitives::{Measure, MeasureElement},
    IrOptions,
};

#[allow(unused_variables)]
pub trait VoiceVisitor {
    fn visit_voice_start(&mut self, voice: &Voice) {}
    fn visit_voice_end(&mut self, voice: &Voice) {}
    fn visit_segment_start(&mut self, segment: &Segment) {}
    fn visit_segment_end(&mut self, segment: &Segment) {}
    fn visit_repeat_start(&mut self, repeat: &Repeat) {}
    fn visit_common_part_start(&mut self, repeat: &Repeat) {}
    fn visit_common_part_end(&mut self, repeat: &Repeat) {}
    fn visit_ending_start(&mut self, ending: &RepeatEnding) {}
    fn visit_ending_end(&mut self, ending: &RepeatEnding) {}
    fn visit_repeat_end(&mut self, repeat: &Repeat) {}
    fn visit_multiple_rest_start(&mut self, rest: &MultipleMeasureRest) {}
    fn visit_multiple_rest_end(&mut self, rest: &MultipleMeasureRest) {}
    fn visit_measure_repeat_start(&mut self, repeat: &MeasureRepeat) {}
    /// Between the pattern and the replicas, if they are visited.
    fn visit_measure_repeat_replicas(&mut self, repeat: &MeasureRepeat) {}
    fn visit_measure_repeat_end(&mut self, repeat: &MeasureRepeat) {}
    fn visit_measure_start(&mut self, measure: &Measure) {}
    fn visit_element(&mut self, element: &MeasureElement) {}
    fn visit_measure_end(&mut self, measure: &Measure) {}
}

/// What is walked inside compressed runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expansion {
    /// Visit measures inside multiple rests.
    pub multiple_rests: bool,
    pub replicas: ReplicaExpansion,
}
impl Default for Expansion {
    fn default() -> Self {
        Self {
            multiple_rests: false,
            replicas: ReplicaExpansion::Full,
        }
    }
}
impl From<&IrOptions> for Expansion {
    fn from(options: &IrOptions) -> Self {
        Self {
            replicas: match options.expand_measure_repeat_replicas {
                true => ReplicaExpansion::Full,
                false => ReplicaExpansion::PatternOnly,
            },
            ..Default::default()
        }
    }
}

pub(crate) fn browse_voice(
    voice: &Voice,
    visitor: &mut impl VoiceVisitor,
    expansion: Expansion,
) {
    if !voice.is_finalized() {
        log::warn!("browsing voice {}, which is not finalized", voice.id());
    }
    visitor.visit_voice_start(voice);
    browse_elements(voice.initial_elements(), visitor, expansion);
    visitor.visit_voice_end(voice);
}

fn browse_elements(
    elements: &[VoiceElement],
    visitor: &mut impl VoiceVisitor,
    expansion: Expansion,
) {
    for element in elements {
        match element {
            VoiceElement::Segment(segment) => {
                visitor.visit_segment_start(segment);
                browse_measures(segment.measures(), visitor);
                visitor.visit_segment_end(segment);
            }
            VoiceElement::Repeat(repeat) => {
                visitor.visit_repeat_start(repeat);
                visitor.visit_common_part_start(repeat);
                browse_elements(repeat.common_part(), visitor, expansion);
                visitor.visit_common_part_end(repeat);
                for ending in repeat.endings() {
                    visitor.visit_ending_start(ending);
                    browse_elements(ending.elements(), visitor, expansion);
                    visitor.visit_ending_end(ending);
                }
                visitor.visit_repeat_end(repeat);
            }
            VoiceElement::MultipleMeasureRest(rest) => {
                visitor.visit_multiple_rest_start(rest);
                if expansion.multiple_rests {
                    browse_measures(rest.measures(), visitor);
                }
                visitor.visit_multiple_rest_end(rest);
            }
            VoiceElement::MeasureRepeat(repeat) => {
                visitor.visit_measure_repeat_start(repeat);
                browse_measures(repeat.pattern().measures(), visitor);
                if expansion.replicas == ReplicaExpansion::Full {
                    visitor.visit_measure_repeat_replicas(repeat);
                    browse_measures(repeat.replicas().measures(), visitor);
                }
                visitor.visit_measure_repeat_end(repeat);
            }
        }
    }
}

fn browse_measures(measures: &[Measure], visitor: &mut impl VoiceVisitor) {
    for measure in measures {
        visitor.visit_measure_start(measure);
        for element in measure.elements() {
            visitor.visit_element(element);
        }
        visitor.visit_measure_end(measure);
    }
}

/// Line per measure and per structure boundary, for logs and tests.
#[derive(Debug, Default)]
pub struct FlatViewVisitor {
    lines: Vec<String>,
    current: Option<String>,
}
impl FlatViewVisitor {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
    pub fn render(voice: &Voice) -> String {
        let mut visitor = Self::default();
        voice.browse(&mut visitor);
        visitor.lines.join("\n")
    }
}
impl VoiceVisitor for FlatViewVisitor {
    fn visit_repeat_start(&mut self, repeat: &Repeat) {
        self.lines.push(match repeat.is_start_inferred() {
            true => "|: (inferred)".to_string(),
            false => "|:".to_string(),
        });
    }
    fn visit_repeat_end(&mut self, repeat: &Repeat) {
        self.lines.push(match repeat.times() {
            Some(times) => format!(":| x{}", times),
            None => ":|".to_string(),
        });
    }
    fn visit_ending_start(&mut self, ending: &RepeatEnding) {
        self.lines.push(format!(
            "[{} {:?}",
            ending.numbers_label(),
            ending.kind()
        ));
    }
    fn visit_ending_end(&mut self, _ending: &RepeatEnding) {
        self.lines.push("]".to_string());
    }
    fn visit_multiple_rest_start(&mut self, rest: &MultipleMeasureRest) {
        self.lines.push(format!("R x{}", rest.measures_count()));
    }
    fn visit_measure_repeat_start(&mut self, repeat: &MeasureRepeat) {
        self.lines.push(format!(
            "% x{} of {}",
            repeat.replicas_number(),
            repeat.measures_number()
        ));
    }
    fn visit_measure_start(&mut self, measure: &Measure) {
        let purist = match measure.purist_number() {
            Some(number) => number.to_string(),
            None => "-".to_string(),
        };
        let kind = match measure.kind() {
            Some(kind) => kind.to_string(),
            None => "open".to_string(),
        };
        self.current =
            Some(format!("{} [{}] {}:", measure.number(), purist, kind));
    }
    fn visit_element(&mut self, element: &MeasureElement) {
        if let Some(line) = self.current.as_mut() {
            line.push(' ');
            line.push_str(&element.kind().label());
        }
    }
    fn visit_measure_end(&mut self, _measure: &Measure) {
        if let Some(line) = self.current.take() {
            self.lines.push(line);
        }
    }
}
