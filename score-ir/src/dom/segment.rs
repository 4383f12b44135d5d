use derivative::Derivative;

use crate::{
    primitives::{Measure, SegmentId, VoiceId},
    IrError, IrResult,
};

/// Contiguous run of measures.
///
/// Measures are never reordered. Only the last, not finalized measure
/// can be removed.
#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq)]
pub struct Segment {
    id: SegmentId,
    #[derivative(PartialEq = "ignore")]
    voice: VoiceId,
    measures: Vec<Measure>,
}
impl Segment {
    pub fn new(id: SegmentId, voice: VoiceId) -> Self {
        Self {
            id,
            voice,
            measures: Vec::new(),
        }
    }
    pub fn id(&self) -> SegmentId {
        self.id
    }
    pub fn voice(&self) -> VoiceId {
        self.voice
    }
    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }
    pub(crate) fn measures_mut(&mut self) -> &mut [Measure] {
        &mut self.measures
    }
    pub fn len(&self) -> usize {
        self.measures.len()
    }
    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    pub fn append_measure(&mut self, mut measure: Measure) {
        measure.set_first_in_segment(self.measures.is_empty());
        self.measures.push(measure);
    }
    pub fn last_measure(&self) -> Option<&Measure> {
        self.measures.last()
    }
    pub fn last_measure_mut(&mut self) -> Option<&mut Measure> {
        self.measures.last_mut()
    }

    pub fn remove_last_measure(&mut self) -> IrResult<Option<Measure>> {
        match self.measures.last() {
            Some(measure) if measure.is_finalized() => Err(
                IrError::MeasureAlreadyFinalized(measure.number().to_string()),
            ),
            _ => Ok(self.measures.pop()),
        }
    }

    /// Detach `count` last measures, if there are enough.
    pub(crate) fn take_last_measures(
        &mut self,
        count: usize,
    ) -> Option<Vec<Measure>> {
        let len = self.measures.len();
        match count > len {
            true => None,
            false => Some(self.measures.split_off(len - count)),
        }
    }

    pub(crate) fn into_measures(self) -> Vec<Measure> {
        self.measures
    }

    pub fn create_deep_clone(&self, voice: VoiceId) -> Self {
        Self {
            id: self.id,
            voice,
            measures: self
                .measures
                .iter()
                .map(|m| m.create_deep_clone(voice))
                .collect(),
        }
    }
}
