//! Measures slices: one measure of every voice in a part, side by side.
//!
//! A voice produces a sequence of single-measure slices. Sequences of
//! the voices of a part are merged slice by slice, and then analyzed
//! for notes and rests, which sound alone.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::{
    primitives::{
        FlatNote, FlatNoteKind, Measure, MeasureUplink, MeasurePosition,
        SoloStatus,
    },
    IrError, IrResult,
};

/// Stops are ordered before starts at the same position, so touching
/// notes never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NoteEventKind {
    Stop,
    Start,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub position: MeasurePosition,
    pub kind: NoteEventKind,
    /// Index in [MeasuresSlice::notes_flat].
    pub note: usize,
}

/// Notes, starting at the same position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimultaneousNotesChunk {
    pub position: MeasurePosition,
    pub notes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasuresSlice {
    measure_number: String,
    purist_number: Option<u32>,
    measures: Vec<MeasureUplink>,
    notes_flat: Vec<FlatNote>,
    note_events: Vec<NoteEvent>,
    chunks: Vec<SimultaneousNotesChunk>,
}
impl MeasuresSlice {
    pub fn new(measure: &Measure) -> Self {
        let mut slice = Self {
            measure_number: measure.number().to_string(),
            purist_number: measure.purist_number(),
            measures: vec![measure.uplink()],
            notes_flat: measure
                .notes_flat()
                .iter()
                .filter(|n| n.kind != FlatNoteKind::Skip)
                .cloned()
                .collect(),
            note_events: Vec::new(),
            chunks: Vec::new(),
        };
        slice.rebuild();
        slice
    }
    pub fn measure_number(&self) -> &str {
        &self.measure_number
    }
    pub fn purist_number(&self) -> Option<u32> {
        self.purist_number
    }
    pub fn measures(&self) -> &[MeasureUplink] {
        &self.measures
    }
    pub fn notes_flat(&self) -> &[FlatNote] {
        &self.notes_flat
    }
    pub fn note_events(&self) -> &[NoteEvent] {
        &self.note_events
    }
    pub fn chunks(&self) -> &[SimultaneousNotesChunk] {
        &self.chunks
    }
    pub fn voices_count(&self) -> usize {
        self.measures.iter().map(|m| m.voice).unique().count()
    }

    fn rebuild(&mut self) {
        self.note_events = self
            .notes_flat
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.duration.is_zero())
            .flat_map(|(idx, n)| {
                [
                    NoteEvent {
                        position: n.position,
                        kind: NoteEventKind::Start,
                        note: idx,
                    },
                    NoteEvent {
                        position: n.end_position(),
                        kind: NoteEventKind::Stop,
                        note: idx,
                    },
                ]
            })
            .sorted_by_key(|e| (e.position, e.kind, e.note))
            .collect();
        let mut by_position: BTreeMap<MeasurePosition, Vec<usize>> =
            BTreeMap::new();
        for (idx, note) in self.notes_flat.iter().enumerate() {
            by_position.entry(note.position).or_default().push(idx);
        }
        self.chunks = by_position
            .into_iter()
            .map(|(position, notes)| SimultaneousNotesChunk {
                position,
                notes,
            })
            .collect();
    }

    /// Slice with the measures and notes of both.
    ///
    /// Number is taken from `self`.
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.measures.extend(other.measures.iter().copied());
        merged.notes_flat.extend(other.notes_flat.iter().cloned());
        merged.rebuild();
        merged
    }

    /// Mark notes, which are the only sounding ones from their start to
    /// their stop, and rests, which are the only silent ones.
    ///
    /// Single-voice slices have no solo notes.
    pub fn identify_solo_notes_and_rests(&mut self) {
        let mut solo = vec![false; self.notes_flat.len()];
        if self.voices_count() > 1 {
            let is_rest: Vec<bool> = self
                .notes_flat
                .iter()
                .map(|n| n.kind == FlatNoteKind::Rest)
                .collect();
            let mut sounding: Vec<usize> = Vec::new();
            for event in self.note_events.iter() {
                let note = event.note;
                match event.kind {
                    NoteEventKind::Start => {
                        let mut alone = true;
                        for other in sounding.iter() {
                            if is_rest[*other] == is_rest[note] {
                                solo[*other] = false;
                                alone = false;
                            }
                        }
                        solo[note] = alone;
                        sounding.push(note);
                    }
                    NoteEventKind::Stop => sounding.retain(|n| *n != note),
                }
            }
        }
        for (note, solo) in self.notes_flat.iter_mut().zip_eq(solo) {
            note.solo = match (solo, note.kind) {
                (false, _) => SoloStatus::NotSolo,
                (true, FlatNoteKind::Rest) => SoloStatus::SoloRest,
                (true, _) => SoloStatus::SoloNote,
            };
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeasuresSlicesSequence {
    slices: Vec<MeasuresSlice>,
}
impl MeasuresSlicesSequence {
    pub fn from_measures<'a>(
        measures: impl IntoIterator<Item = &'a Measure>,
    ) -> Self {
        Self {
            slices: measures.into_iter().map(MeasuresSlice::new).collect(),
        }
    }
    pub fn slices(&self) -> &[MeasuresSlice] {
        &self.slices
    }
    pub fn len(&self) -> usize {
        self.slices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Slice-by-slice merge of two voices of the same part.
    ///
    /// # Example
    ///
    /// ```
    /// use score_ir::dom::Voice;
    /// use score_ir::primitives::{
    ///     MeasureElement, TimeSignature, VoiceId, WholeNotes,
    /// };
    /// use score_ir::IrError;
    /// let mut voices: Vec<Voice> = (1..=2)
    ///     .map(|id| Voice::new(VoiceId(id), TimeSignature::default()))
    ///     .collect();
    /// let whole = WholeNotes::from_integer(1);
    /// for (voice, bars) in voices.iter_mut().zip([2, 3]) {
    ///     for _ in 0..bars {
    ///         voice.append(MeasureElement::note("c'", whole)).unwrap();
    ///         voice.end_measure().unwrap();
    ///     }
    ///     voice.finalize_voice().unwrap();
    /// }
    /// let merged = voices[0].slices().merge(voices[1].slices());
    /// assert_eq!(merged, Err(IrError::SliceSequenceMismatch(2, 3)));
    /// ```
    pub fn merge(&self, other: &Self) -> IrResult<Self> {
        if self.len() != other.len() {
            return Err(IrError::SliceSequenceMismatch(
                self.len(),
                other.len(),
            ));
        }
        Ok(Self {
            slices: self
                .slices
                .iter()
                .zip(other.slices.iter())
                .map(|(a, b)| a.merge(b))
                .collect(),
        })
    }

    pub fn identify_solo_notes_and_rests(&mut self) {
        for slice in self.slices.iter_mut() {
            slice.identify_solo_notes_and_rests();
        }
    }

    pub fn solo_notes(&self) -> impl Iterator<Item = &FlatNote> {
        self.slices
            .iter()
            .flat_map(|s| s.notes_flat())
            .filter(|n| n.solo != SoloStatus::NotSolo)
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use crate::primitives::{
        Measure, MeasureElement, MeasureId, PuristNumbering, SoloStatus,
        TimeSignature, VoiceId, VoicePosition, WholeNotes,
    };

    use super::{MeasuresSlice, NoteEventKind};

    fn wn(n: i64, d: i64) -> WholeNotes {
        WholeNotes::new(n, d).unwrap()
    }

    fn measure(voice: u32, elements: Vec<MeasureElement>) -> Measure {
        let mut measure = Measure::new(
            MeasureId(0),
            VoiceId(voice),
            "1",
            TimeSignature::default(),
            VoicePosition::zero(),
        );
        for element in elements {
            measure.append(element).unwrap();
        }
        measure.finalize(&mut PuristNumbering::default());
        measure
    }

    #[test]
    fn stops_before_starts() {
        let slice = MeasuresSlice::new(&measure(
            1,
            vec![
                MeasureElement::note("c'", wn(1, 2)),
                MeasureElement::note("d'", wn(1, 2)),
            ],
        ));
        slice
            .note_events()
            .iter()
            .map(|e| (e.kind, e.note))
            .zip_eq([
                (NoteEventKind::Start, 0),
                (NoteEventKind::Stop, 0),
                (NoteEventKind::Start, 1),
                (NoteEventKind::Stop, 1),
            ])
            .for_each(|(a, b)| assert_eq!(a, b));
        assert_eq!(slice.chunks().len(), 2);
    }

    #[test]
    fn solo_notes_and_rests() {
        let upper = measure(
            1,
            vec![
                MeasureElement::note("c''", wn(1, 2)),
                MeasureElement::rest(wn(1, 2)),
            ],
        );
        let lower = measure(
            2,
            vec![
                MeasureElement::rest(wn(1, 2)),
                MeasureElement::note("c", wn(1, 4)),
                MeasureElement::note("d", wn(1, 4)),
            ],
        );
        let mut alone = MeasuresSlice::new(&upper);
        alone.identify_solo_notes_and_rests();
        assert!(alone
            .notes_flat()
            .iter()
            .all(|n| n.solo == SoloStatus::NotSolo));

        let mut slice =
            MeasuresSlice::new(&upper).merge(&MeasuresSlice::new(&lower));
        assert_eq!(slice.voices_count(), 2);
        slice.identify_solo_notes_and_rests();
        slice
            .notes_flat()
            .iter()
            .map(|n| (n.label.as_str(), n.solo))
            .zip_eq([
                ("c''", SoloStatus::SoloNote),
                ("r", SoloStatus::SoloRest),
                ("r", SoloStatus::SoloRest),
                ("c", SoloStatus::SoloNote),
                ("d", SoloStatus::SoloNote),
            ])
            .for_each(|(a, b)| assert_eq!(a, b));
    }

    #[test]
    fn overlapping_notes_are_not_solo() {
        let upper = measure(1, vec![MeasureElement::note("e'", wn(1, 1))]);
        let lower = measure(
            2,
            vec![
                MeasureElement::note("c", wn(1, 2)),
                MeasureElement::rest(wn(1, 2)),
            ],
        );
        let mut slice =
            MeasuresSlice::new(&upper).merge(&MeasuresSlice::new(&lower));
        slice.identify_solo_notes_and_rests();
        slice
            .notes_flat()
            .iter()
            .map(|n| n.solo)
            .zip_eq([
                SoloStatus::NotSolo,
                SoloStatus::NotSolo,
                SoloStatus::SoloRest,
            ])
            .for_each(|(a, b)| assert_eq!(a, b));
    }
}
