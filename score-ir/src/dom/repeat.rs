//! Repeats: a common part and its alternate endings.
//!
//! While a repeat is being built, it lives on the voice's repeat stack
//! as [PendingRepeat], innermost on top. Closed material is pushed to
//! the accumulator of the top entry, so nested repeats land inside the
//! common part or the ending of their parent.

use crate::primitives::VoiceId;

use super::VoiceElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndingKind {
    /// Followed by another ending.
    Hooked,
    /// Terminates the repeat.
    Hookless,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatEnding {
    numbers: Vec<u32>,
    kind: EndingKind,
    elements: Vec<VoiceElement>,
}
impl RepeatEnding {
    pub fn numbers(&self) -> &[u32] {
        &self.numbers
    }
    /// Like "1,2".
    pub fn numbers_label(&self) -> String {
        self.numbers
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
    pub fn kind(&self) -> EndingKind {
        self.kind
    }
    pub fn elements(&self) -> &[VoiceElement] {
        &self.elements
    }
    pub(crate) fn create_deep_clone(&self, voice: VoiceId) -> Self {
        Self {
            numbers: self.numbers.clone(),
            kind: self.kind,
            elements: clone_elements(&self.elements, voice),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Repeat {
    common_part: Vec<VoiceElement>,
    endings: Vec<RepeatEnding>,
    times: Option<u32>,
    start_inferred: bool,
}
impl Repeat {
    pub fn common_part(&self) -> &[VoiceElement] {
        &self.common_part
    }
    pub fn endings(&self) -> &[RepeatEnding] {
        &self.endings
    }
    /// Explicit repetitions count from the source, if any.
    pub fn times(&self) -> Option<u32> {
        self.times
    }
    /// The start was synthesized from a repeat end or an ending start
    /// without an open repeat.
    pub fn is_start_inferred(&self) -> bool {
        self.start_inferred
    }
    /// Rebuild the common part and every ending by `f`.
    pub(crate) fn map_elements(
        self,
        f: &mut impl FnMut(Vec<VoiceElement>) -> Vec<VoiceElement>,
    ) -> Self {
        Self {
            common_part: f(self.common_part),
            endings: self
                .endings
                .into_iter()
                .map(|ending| RepeatEnding {
                    elements: f(ending.elements),
                    ..ending
                })
                .collect(),
            ..self
        }
    }
    pub(crate) fn create_deep_clone(&self, voice: VoiceId) -> Self {
        Self {
            common_part: clone_elements(&self.common_part, voice),
            endings: self
                .endings
                .iter()
                .map(|e| e.create_deep_clone(voice))
                .collect(),
            times: self.times,
            start_inferred: self.start_inferred,
        }
    }
}

pub(crate) fn clone_elements(
    elements: &[VoiceElement],
    voice: VoiceId,
) -> Vec<VoiceElement> {
    elements.iter().map(|e| e.create_deep_clone(voice)).collect()
}

/// State of the top of the repeat stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepeatPhase {
    CommonPart,
    InEnding,
    /// A hooked ending is closed, the next one may follow.
    AwaitingEnding,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingRepeat {
    phase: RepeatPhase,
    common_part: Vec<VoiceElement>,
    endings: Vec<RepeatEnding>,
    accumulator: Vec<VoiceElement>,
    open_ending: Option<(Vec<u32>, EndingKind)>,
    times: Option<u32>,
    start_inferred: bool,
    pub start_line: u32,
}
impl PendingRepeat {
    pub fn new(start_line: u32) -> Self {
        Self {
            phase: RepeatPhase::CommonPart,
            common_part: Vec::new(),
            endings: Vec::new(),
            accumulator: Vec::new(),
            open_ending: None,
            times: None,
            start_inferred: false,
            start_line,
        }
    }
    /// Repeat without an explicit start.
    pub fn inferred(start_line: u32) -> Self {
        Self {
            start_inferred: true,
            ..Self::new(start_line)
        }
    }

    pub fn phase(&self) -> RepeatPhase {
        self.phase
    }
    pub fn accumulator_mut(&mut self) -> &mut Vec<VoiceElement> {
        &mut self.accumulator
    }
    pub fn open_ending_kind(&self) -> Option<EndingKind> {
        self.open_ending.as_ref().map(|(_, kind)| *kind)
    }
    pub fn set_times(&mut self, times: Option<u32>) {
        if times.is_some() {
            self.times = times;
        }
    }
    /// Everything accumulated so far, in order.
    pub fn elements(&self) -> impl Iterator<Item = &VoiceElement> {
        self.common_part
            .iter()
            .chain(self.endings.iter().flat_map(|e| e.elements.iter()))
            .chain(self.accumulator.iter())
    }

    pub fn open_ending(&mut self, numbers: Vec<u32>, kind: EndingKind) {
        if self.phase == RepeatPhase::CommonPart {
            self.common_part = std::mem::take(&mut self.accumulator);
        }
        self.open_ending = Some((numbers, kind));
        self.phase = RepeatPhase::InEnding;
    }

    /// None, if there is no open ending.
    pub fn close_ending(&mut self) -> Option<EndingKind> {
        let (numbers, kind) = self.open_ending.take()?;
        self.endings.push(RepeatEnding {
            numbers,
            kind,
            elements: std::mem::take(&mut self.accumulator),
        });
        self.phase = RepeatPhase::AwaitingEnding;
        Some(kind)
    }

    /// Completed repeat, and the material accumulated after its last
    /// ending, which belongs after it.
    pub fn into_repeat(mut self) -> (Repeat, Vec<VoiceElement>) {
        let trailing = match self.phase {
            RepeatPhase::CommonPart => {
                self.common_part = std::mem::take(&mut self.accumulator);
                Vec::new()
            }
            RepeatPhase::InEnding => {
                self.close_ending();
                Vec::new()
            }
            RepeatPhase::AwaitingEnding => {
                std::mem::take(&mut self.accumulator)
            }
        };
        let repeat = Repeat {
            common_part: self.common_part,
            endings: self.endings,
            times: self.times,
            start_inferred: self.start_inferred,
        };
        (repeat, trailing)
    }

    pub fn create_deep_clone(&self, voice: VoiceId) -> Self {
        Self {
            phase: self.phase,
            common_part: clone_elements(&self.common_part, voice),
            endings: self
                .endings
                .iter()
                .map(|e| e.create_deep_clone(voice))
                .collect(),
            accumulator: clone_elements(&self.accumulator, voice),
            open_ending: self.open_ending.clone(),
            times: self.times,
            start_inferred: self.start_inferred,
            start_line: self.start_line,
        }
    }

    /// All the material, in order, as ordinary music.
    pub fn downgrade(self) -> Vec<VoiceElement> {
        let mut elements = self.common_part;
        for ending in self.endings {
            elements.extend(ending.elements);
        }
        elements.extend(self.accumulator);
        elements
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::{Segment, VoiceElement};
    use crate::primitives::{SegmentId, VoiceId};

    use super::{EndingKind, PendingRepeat, RepeatPhase};

    fn segment(id: usize) -> VoiceElement {
        VoiceElement::Segment(Segment::new(SegmentId(id), VoiceId(1)))
    }

    #[test]
    fn phases() {
        let mut pending = PendingRepeat::new(10);
        pending.accumulator_mut().push(segment(0));
        pending.open_ending(vec![1], EndingKind::Hooked);
        assert_eq!(pending.phase(), RepeatPhase::InEnding);
        pending.accumulator_mut().push(segment(1));
        assert_eq!(pending.close_ending(), Some(EndingKind::Hooked));
        assert_eq!(pending.phase(), RepeatPhase::AwaitingEnding);
        assert_eq!(pending.close_ending(), None);
        pending.open_ending(vec![2, 3], EndingKind::Hookless);
        pending.accumulator_mut().push(segment(2));
        pending.set_times(Some(3));
        let (repeat, trailing) = pending.into_repeat();
        assert!(trailing.is_empty());
        assert_eq!(repeat.common_part(), &[segment(0)]);
        assert_eq!(repeat.endings().len(), 2);
        assert_eq!(repeat.endings()[1].numbers_label(), "2,3");
        assert_eq!(repeat.endings()[1].kind(), EndingKind::Hookless);
        assert_eq!(repeat.times(), Some(3));
    }

    #[test]
    fn downgrade_keeps_order() {
        let mut pending = PendingRepeat::new(0);
        pending.accumulator_mut().push(segment(0));
        pending.open_ending(vec![1], EndingKind::Hooked);
        pending.accumulator_mut().push(segment(1));
        assert_eq!(pending.elements().count(), 2);
        assert_eq!(pending.downgrade(), vec![segment(0), segment(1)]);
    }
}
