//! Harmonies and figured bass shadow voices.
//!
//! A shadow voice is owned by its regular voice and holds one measure
//! per regular measure, with the same id, number and start. Items are
//! inserted at explicit positions while the regular measure is open.
//! When the regular measure is finalized, the shadow measure is
//! synchronized: every item extends to the next one or to the regular
//! measure end, gaps are filled with skips, and the regular measure
//! classification is copied.

use std::collections::BTreeMap;

use derivative::Derivative;

use crate::{
    primitives::{
        ElementKind, Measure, MeasureElement, MeasureId, MeasurePosition,
        VoiceId, VoicePosition, WholeNotes,
    },
    IrResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowKind {
    Harmonies,
    FiguredBass,
}
impl ShadowKind {
    /// Which shadow voice takes the element, if any.
    pub fn of(kind: &ElementKind) -> Option<Self> {
        match kind {
            ElementKind::Harmony(_) => Some(Self::Harmonies),
            ElementKind::FiguredBass(_) => Some(Self::FiguredBass),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq)]
pub struct ShadowVoice {
    #[derivative(PartialEq = "ignore")]
    id: VoiceId,
    #[derivative(PartialEq = "ignore")]
    regular: VoiceId,
    kind: ShadowKind,
    measures: BTreeMap<MeasureId, Measure>,
}
impl ShadowVoice {
    pub fn new(regular: VoiceId, kind: ShadowKind) -> Self {
        let id = match kind {
            ShadowKind::Harmonies => regular.harmonies(),
            ShadowKind::FiguredBass => regular.figured_bass(),
        };
        Self {
            id,
            regular,
            kind,
            measures: BTreeMap::new(),
        }
    }
    pub fn id(&self) -> VoiceId {
        self.id
    }
    /// Back-link to the owning voice.
    pub fn regular_voice(&self) -> VoiceId {
        self.regular
    }
    pub fn kind(&self) -> ShadowKind {
        self.kind
    }
    /// In measure order.
    pub fn measures(&self) -> impl Iterator<Item = &Measure> {
        self.measures.values()
    }
    pub fn measure(&self, id: MeasureId) -> Option<&Measure> {
        self.measures.get(&id)
    }
    /// Items, which are not padding.
    pub fn items(&self) -> impl Iterator<Item = &MeasureElement> {
        self.measures()
            .flat_map(|m| m.elements())
            .filter(|e| !e.kind().is_skip())
    }

    fn measure_for(&mut self, regular: &Measure) -> &mut Measure {
        let id = self.id;
        self.measures
            .entry(regular.id())
            .or_insert_with(|| regular.create_newborn_clone(id))
    }

    pub(crate) fn insert(
        &mut self,
        regular: &Measure,
        element: MeasureElement,
        position: MeasurePosition,
    ) -> IrResult<()> {
        self.measure_for(regular).insert_ordered(element, position)
    }

    /// Back-fill display durations and padding after `regular` is
    /// finalized. Does nothing on the second call.
    pub(crate) fn sync(&mut self, regular: &Measure) {
        let end = MeasurePosition::zero() + regular.accumulated_duration();
        let shadow = self.measure_for(regular);
        if shadow.is_finalized() {
            return;
        }
        let uplink = shadow.uplink();
        let skip = |from: MeasurePosition, to: MeasurePosition| {
            let mut skip = MeasureElement::skip(to - from);
            skip.place(from, VoicePosition::zero(), uplink);
            skip
        };
        let mut items: Vec<MeasureElement> = shadow
            .elements()
            .iter()
            .filter(|e| !e.kind().is_skip())
            .cloned()
            .collect();
        let next_positions: Vec<MeasurePosition> = items
            .iter()
            .skip(1)
            .map(|e| e.measure_position())
            .chain(std::iter::once(end))
            .collect();

        let mut elements = Vec::new();
        let mut cursor = MeasurePosition::zero();
        for (mut item, next) in items.drain(..).zip(next_positions) {
            let at = item.measure_position();
            if at > end {
                log::warn!(
                    "{} at {} is past the end of measure {} ({})",
                    item.kind().label(),
                    at,
                    regular.number(),
                    end
                );
            }
            if at > cursor {
                elements.push(skip(cursor, at));
            }
            let duration = match next > at {
                true => next - at,
                false => WholeNotes::zero(),
            };
            item.kind_mut().set_display_duration(duration);
            cursor = cursor.max(at + duration);
            elements.push(item);
        }
        if cursor < end {
            elements.push(skip(cursor, end));
        }
        shadow.replace_elements(elements);
        shadow.adopt_classification(regular);
    }

    pub(crate) fn create_deep_clone(&self, regular: VoiceId) -> Self {
        let mut clone = Self::new(regular, self.kind);
        let id = clone.id;
        clone.measures = self
            .measures
            .iter()
            .map(|(measure_id, m)| (*measure_id, m.create_deep_clone(id)))
            .collect();
        clone
    }
}

/// Shadow voices of a regular voice, created on the first item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShadowVoices {
    harmonies: Option<ShadowVoice>,
    figured_bass: Option<ShadowVoice>,
}
impl ShadowVoices {
    pub fn harmonies(&self) -> Option<&ShadowVoice> {
        self.harmonies.as_ref()
    }
    pub fn figured_bass(&self) -> Option<&ShadowVoice> {
        self.figured_bass.as_ref()
    }

    pub(crate) fn insert(
        &mut self,
        kind: ShadowKind,
        regular_voice: VoiceId,
        regular: &Measure,
        element: MeasureElement,
        position: MeasurePosition,
    ) -> IrResult<()> {
        let slot = match kind {
            ShadowKind::Harmonies => &mut self.harmonies,
            ShadowKind::FiguredBass => &mut self.figured_bass,
        };
        slot.get_or_insert_with(|| {
            log::debug!("new {:?} voice for voice {}", kind, regular_voice);
            ShadowVoice::new(regular_voice, kind)
        })
        .insert(regular, element, position)
    }

    pub(crate) fn sync(&mut self, regular: &Measure) {
        for shadow in [&mut self.harmonies, &mut self.figured_bass]
            .into_iter()
            .flatten()
        {
            shadow.sync(regular);
        }
    }

    pub(crate) fn create_deep_clone(&self, regular: VoiceId) -> Self {
        Self {
            harmonies: self
                .harmonies
                .as_ref()
                .map(|h| h.create_deep_clone(regular)),
            figured_bass: self
                .figured_bass
                .as_ref()
                .map(|f| f.create_deep_clone(regular)),
        }
    }
}
