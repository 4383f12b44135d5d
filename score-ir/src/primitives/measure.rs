//! Measure is an ordered timeline of the elements of one voice.
//!
//! Elements are kept sorted by their position in measure. Equal positions
//! keep the insertion order. The running position is where the next
//! appended element lands: appends advance it, a backup rewinds it
//! without removing anything, and padding fills gaps with skips.
//!
//! Measure kind and purist number are determined once, by
//! [Measure::finalize], and never change afterwards.
//!
//! # Example
//!
//! ```
//! use score_ir::primitives::{
//!     Measure, MeasureElement, MeasureId, MeasureKind, PuristNumbering,
//!     TimeSignature, VoiceId, VoicePosition, WholeNotes,
//! };
//! let quarter = WholeNotes::new(1, 4).unwrap();
//! let mut measure = Measure::new(
//!     MeasureId(0),
//!     VoiceId(1),
//!     "1",
//!     TimeSignature::new(4, 4).unwrap(),
//!     VoicePosition::zero(),
//! );
//! for pitch in ["c'", "d'", "e'", "f'"] {
//!     measure.append(MeasureElement::note(pitch, quarter)).unwrap();
//! }
//! let mut numbering = PuristNumbering::default();
//! assert_eq!(measure.finalize(&mut numbering), MeasureKind::Regular);
//! assert_eq!(measure.purist_number(), Some(1));
//! assert_eq!(measure.accumulated_duration(), quarter.times(4));
//! ```

use std::fmt::Display;

use derivative::Derivative;

use crate::{IrError, IrResult};

use super::{
    ElementKind, FlatNote, MeasureElement, MeasureId, MeasurePosition,
    MeasureUplink, TimeSignature, VoiceId, VoicePosition, WholeNotes,
};

/// Sub-classification of measures, shorter than the time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncompleteKind {
    /// Pickup at the start of the voice.
    Anacrusis,
    Standalone,
    LastInCommonPart,
    LastInHookedEnding,
    LastInHooklessEnding,
    NextAfterCommonPart,
    NextAfterHookedEnding,
    NextAfterHooklessEnding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasureKind {
    Regular,
    Incomplete(IncompleteKind),
    Overflowing,
    /// Full measure of rests only.
    Rest,
    MusicallyEmpty,
}
impl Display for MeasureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regular => write!(f, "regular"),
            Self::Incomplete(IncompleteKind::Anacrusis) => {
                write!(f, "anacrusis")
            }
            Self::Incomplete(kind) => write!(f, "incomplete({:?})", kind),
            Self::Overflowing => write!(f, "overflowing"),
            Self::Rest => write!(f, "rest"),
            Self::MusicallyEmpty => write!(f, "empty"),
        }
    }
}

/// Where the measure stands relatively to repeat boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RepeatContext {
    #[default]
    Standalone,
    LastInCommonPart,
    LastInHookedEnding,
    LastInHooklessEnding,
    NextAfterCommonPart,
    NextAfterHookedEnding,
    NextAfterHooklessEnding,
}
impl RepeatContext {
    fn incomplete_kind(&self) -> IncompleteKind {
        match self {
            Self::Standalone => IncompleteKind::Standalone,
            Self::LastInCommonPart => IncompleteKind::LastInCommonPart,
            Self::LastInHookedEnding => IncompleteKind::LastInHookedEnding,
            Self::LastInHooklessEnding => {
                IncompleteKind::LastInHooklessEnding
            }
            Self::NextAfterCommonPart => IncompleteKind::NextAfterCommonPart,
            Self::NextAfterHookedEnding => {
                IncompleteKind::NextAfterHookedEnding
            }
            Self::NextAfterHooklessEnding => {
                IncompleteKind::NextAfterHooklessEnding
            }
        }
    }
}

/// Running state of the bar-check numbering of a voice.
///
/// Incomplete measures share their number with the neighbours until
/// their durations add up to a full measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PuristNumbering {
    current: u32,
    since_last_regular_end: WholeNotes,
}
impl Default for PuristNumbering {
    fn default() -> Self {
        Self {
            current: 1,
            since_last_regular_end: WholeNotes::zero(),
        }
    }
}
impl PuristNumbering {
    /// Number, the next complete measure gets.
    pub fn current(&self) -> u32 {
        self.current
    }
    fn advance(&mut self) {
        self.current += 1;
        self.since_last_regular_end = WholeNotes::zero();
    }
    fn assign(
        &mut self,
        kind: MeasureKind,
        accumulated: WholeNotes,
        full: Option<WholeNotes>,
    ) -> u32 {
        match kind {
            MeasureKind::Incomplete(IncompleteKind::Anacrusis) => {
                self.since_last_regular_end += accumulated;
                0
            }
            MeasureKind::Incomplete(_) => {
                let number = self.current;
                self.since_last_regular_end += accumulated;
                if let Some(full) = full {
                    if self.since_last_regular_end >= full {
                        self.advance();
                    }
                }
                number
            }
            MeasureKind::Regular
            | MeasureKind::Overflowing
            | MeasureKind::Rest
            | MeasureKind::MusicallyEmpty => {
                let number = self.current;
                self.advance();
                number
            }
        }
    }
}

#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq)]
pub struct Measure {
    id: MeasureId,
    #[derivative(PartialEq = "ignore")]
    voice: VoiceId,
    number: String,
    time_signature: TimeSignature,
    voice_start: VoicePosition,
    current_position: MeasurePosition,
    elements: Vec<MeasureElement>,
    notes_flat: Vec<FlatNote>,
    first_in_voice: bool,
    first_in_segment: bool,
    repeat_context: RepeatContext,
    closed: bool,
    kind: Option<MeasureKind>,
    purist_number: Option<u32>,
    numbering_input: Option<PuristNumbering>,
    diagnostics: Vec<IrError>,
}
impl Measure {
    /// # Parameters:
    /// * number: label from the source, not necessary numeric.
    /// * voice_start: position of the measure start in the voice.
    pub fn new(
        id: MeasureId,
        voice: VoiceId,
        number: impl Into<String>,
        time_signature: TimeSignature,
        voice_start: VoicePosition,
    ) -> Self {
        Self {
            id,
            voice,
            number: number.into(),
            time_signature,
            voice_start,
            current_position: MeasurePosition::zero(),
            elements: Vec::new(),
            notes_flat: Vec::new(),
            first_in_voice: false,
            first_in_segment: false,
            repeat_context: RepeatContext::Standalone,
            closed: false,
            kind: None,
            purist_number: None,
            numbering_input: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn id(&self) -> MeasureId {
        self.id
    }
    pub fn voice(&self) -> VoiceId {
        self.voice
    }
    pub fn uplink(&self) -> MeasureUplink {
        MeasureUplink {
            voice: self.voice,
            measure: self.id,
        }
    }
    pub fn number(&self) -> &str {
        &self.number
    }
    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }
    /// None for senza misura.
    pub fn full_measure_duration(&self) -> Option<WholeNotes> {
        self.time_signature.full_measure_duration()
    }
    pub fn voice_start(&self) -> VoicePosition {
        self.voice_start
    }
    pub fn current_position(&self) -> MeasurePosition {
        self.current_position
    }
    /// The farthest point reached, either by the running position or by
    /// the end of any element.
    pub fn accumulated_duration(&self) -> WholeNotes {
        self.elements
            .iter()
            .map(|e| e.end_position())
            .fold(self.current_position, |acc, end| acc.max(end))
            .get()
    }
    pub fn elements(&self) -> &[MeasureElement] {
        &self.elements
    }
    pub fn elements_at(
        &self,
        position: MeasurePosition,
    ) -> impl Iterator<Item = &MeasureElement> {
        self.elements
            .iter()
            .filter(move |e| e.measure_position() == position)
    }
    pub fn notes_flat(&self) -> &[FlatNote] {
        &self.notes_flat
    }
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
    pub fn is_first_in_voice(&self) -> bool {
        self.first_in_voice
    }
    pub fn set_first_in_voice(&mut self, value: bool) {
        self.first_in_voice = value;
    }
    pub fn is_first_in_segment(&self) -> bool {
        self.first_in_segment
    }
    pub fn set_first_in_segment(&mut self, value: bool) {
        self.first_in_segment = value;
    }
    pub fn repeat_context(&self) -> RepeatContext {
        self.repeat_context
    }
    pub fn set_repeat_context(&mut self, context: RepeatContext) {
        self.repeat_context = context;
    }
    /// Closed measures take no more appends from the voice.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
    pub fn close(&mut self) {
        self.closed = true;
    }
    pub fn is_finalized(&self) -> bool {
        self.kind.is_some()
    }
    /// None until finalized.
    pub fn kind(&self) -> Option<MeasureKind> {
        self.kind
    }
    /// None until finalized.
    pub fn purist_number(&self) -> Option<u32> {
        self.purist_number
    }
    pub fn diagnostics(&self) -> &[IrError] {
        &self.diagnostics
    }

    fn check_not_finalized(&self) -> IrResult<()> {
        match self.is_finalized() {
            true => Err(IrError::MeasureAlreadyFinalized(self.number.clone())),
            false => Ok(()),
        }
    }

    /// Put element to the timeline, not touching the running position.
    fn place(&mut self, mut element: MeasureElement, at: MeasurePosition) {
        if let ElementKind::TimeSignature(ts) = element.kind() {
            self.time_signature = *ts;
        }
        element.place(at, self.voice_start + at, self.uplink());
        let idx = self
            .elements
            .partition_point(|e| e.measure_position() <= at);
        self.elements.insert(idx, element);
        self.rebuild_notes_flat();
    }

    fn rebuild_notes_flat(&mut self) {
        let uplink = self.uplink();
        let notes = self
            .elements
            .iter()
            .flat_map(|e| e.flat_notes(uplink))
            .collect();
        self.notes_flat = notes;
    }

    /// Place element at the running position and advance it by the
    /// element duration.
    ///
    /// After a backup, the element is inserted among already placed
    /// ones, after those at the same position.
    pub fn append(&mut self, element: MeasureElement) -> IrResult<()> {
        self.check_not_finalized()?;
        element.kind().validate()?;
        let at = self.current_position;
        let duration = element.sounding_duration();
        self.place(element, at);
        self.current_position = at + duration;
        Ok(())
    }

    /// Insert element at explicit position.
    ///
    /// Positions past the running one are padded up to and then
    /// appended. Earlier positions leave the running position as is.
    ///
    /// # Example
    /// ```
    /// use score_ir::primitives::{
    ///     ElementKind, Measure, MeasureElement, MeasureId, MeasurePosition,
    ///     TimeSignature, VoiceId, VoicePosition, WholeNotes,
    /// };
    /// let half = WholeNotes::new(1, 2).unwrap();
    /// let mut measure = Measure::new(
    ///     MeasureId(0),
    ///     VoiceId(1),
    ///     "1",
    ///     TimeSignature::default(),
    ///     VoicePosition::zero(),
    /// );
    /// measure.append(MeasureElement::note("c'", half)).unwrap();
    /// let bar = MeasureElement::new(ElementKind::BarCheck);
    /// measure
    ///     .insert_at(bar, MeasurePosition::from_ratio(1, 4).unwrap())
    ///     .unwrap();
    /// assert_eq!(measure.current_position().get(), half);
    /// let late = MeasureElement::note("d'", half);
    /// measure
    ///     .insert_at(late, MeasurePosition::from_ratio(3, 4).unwrap())
    ///     .unwrap();
    /// // gap from 1/2 to 3/4 is padded
    /// assert!(measure.elements()[2].kind().is_skip());
    /// assert_eq!(
    ///     measure.current_position().get(),
    ///     WholeNotes::new(5, 4).unwrap()
    /// );
    /// ```
    pub fn insert_at(
        &mut self,
        element: MeasureElement,
        position: MeasurePosition,
    ) -> IrResult<()> {
        self.check_not_finalized()?;
        element.kind().validate()?;
        if position >= self.current_position {
            self.pad_to(position)?;
            return self.append(element);
        }
        self.place(element, position);
        Ok(())
    }

    /// Ordered insertion without padding, used for shadow voices items.
    pub(crate) fn insert_ordered(
        &mut self,
        element: MeasureElement,
        position: MeasurePosition,
    ) -> IrResult<()> {
        self.check_not_finalized()?;
        element.kind().validate()?;
        self.place(element, position);
        Ok(())
    }

    /// Fill the gap between the running position and `position` with
    /// a skip. Does nothing, if there is no gap.
    pub fn pad_to(&mut self, position: MeasurePosition) -> IrResult<()> {
        self.check_not_finalized()?;
        if position <= self.current_position {
            return Ok(());
        }
        let from = self.current_position;
        self.place(MeasureElement::skip(position - from), from);
        self.current_position = position;
        Ok(())
    }

    pub fn forward(&mut self, duration: WholeNotes) -> IrResult<()> {
        if duration.is_negative() {
            return Err(IrError::InvalidDuration(format!(
                "can not forward by {} in measure {}",
                duration, self.number
            )));
        }
        self.pad_to(self.current_position + duration)
    }

    /// Rewind the running position. A position past the running one is
    /// treated as forward.
    pub fn backup_to(&mut self, position: MeasurePosition) -> IrResult<()> {
        self.check_not_finalized()?;
        if position > self.current_position {
            log::warn!(
                "backup to {} is past the running position {} \
                in measure {}, padding instead",
                position,
                self.current_position,
                self.number
            );
            return self.pad_to(position);
        }
        self.current_position = position;
        Ok(())
    }

    /// Recompute positions in voice from the measure start.
    fn reconcile_positions(&mut self) {
        for element in self.elements.iter_mut() {
            let recomputed = self.voice_start + element.measure_position();
            if element.voice_position() == recomputed {
                continue;
            }
            let error = IrError::PositionInconsistency {
                measure: self.number.clone(),
                line: element.input_line(),
                stored: element.voice_position().get(),
                recomputed: recomputed.get(),
            };
            log::warn!("{}", error);
            self.diagnostics.push(error);
            element.set_voice_position(recomputed);
        }
    }

    fn is_rest_measure(&self) -> bool {
        let mut has_rest = false;
        for element in self.elements.iter() {
            match element.kind() {
                ElementKind::Rest(_) => has_rest = true,
                ElementKind::Skip(_) => (),
                kind if kind.sounding_duration().is_zero() => (),
                _ => return false,
            }
        }
        has_rest
    }

    fn mark_full_measure_rest(&mut self, full: WholeNotes) {
        let rests: Vec<usize> = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind().is_rest())
            .map(|(idx, _)| idx)
            .collect();
        if rests.len() != 1 {
            return;
        }
        if let ElementKind::Rest(rest) = self.elements[rests[0]].kind_mut() {
            rest.full_measure = rest.duration == full;
        }
    }

    /// Classify the measure and take its purist number.
    ///
    /// Finalizing twice changes nothing.
    pub fn finalize(
        &mut self,
        numbering: &mut PuristNumbering,
    ) -> MeasureKind {
        if let Some(kind) = self.kind {
            log::debug!("measure {} is already finalized", self.number);
            return kind;
        }
        self.numbering_input = Some(*numbering);
        self.closed = true;
        self.reconcile_positions();
        let accumulated = self.accumulated_duration();
        let full = self.full_measure_duration();
        let kind = match full {
            _ if accumulated.is_zero() => MeasureKind::MusicallyEmpty,
            None => MeasureKind::Regular,
            Some(full) if accumulated == full => {
                match self.is_rest_measure() {
                    true => MeasureKind::Rest,
                    false => MeasureKind::Regular,
                }
            }
            Some(full) if accumulated < full => {
                MeasureKind::Incomplete(match self.first_in_voice {
                    true => IncompleteKind::Anacrusis,
                    false => self.repeat_context.incomplete_kind(),
                })
            }
            Some(full) => {
                let error = IrError::MeasureOverflow {
                    measure: self.number.clone(),
                    accumulated,
                    full,
                };
                log::warn!("{}", error);
                self.diagnostics.push(error);
                MeasureKind::Overflowing
            }
        };
        if let (MeasureKind::Rest, Some(full)) = (kind, full) {
            self.mark_full_measure_rest(full);
        }
        let purist = numbering.assign(kind, accumulated, full);
        log::debug!(
            "finalized measure {} (purist {}) as {}",
            self.number,
            purist,
            kind
        );
        self.kind = Some(kind);
        self.purist_number = Some(purist);
        kind
    }

    /// Empty measure with the same number, time signature and start,
    /// placed into another voice.
    pub fn create_newborn_clone(&self, voice: VoiceId) -> Self {
        let mut clone = Self::new(
            self.id,
            voice,
            self.number.clone(),
            self.time_signature,
            self.voice_start,
        );
        clone.first_in_voice = self.first_in_voice;
        clone.first_in_segment = self.first_in_segment;
        clone.repeat_context = self.repeat_context;
        clone
    }

    /// Full copy, re-linked to `voice`.
    ///
    /// Finalized measures are finalized again from the same inputs, so
    /// the clone carries re-derived kind and purist number.
    pub fn create_deep_clone(&self, voice: VoiceId) -> Self {
        let mut clone = self.clone();
        clone.voice = voice;
        for element in clone.elements.iter_mut() {
            element.relink(voice);
        }
        clone.rebuild_notes_flat();
        if let (Some(kind), Some(mut numbering)) =
            (self.kind, self.numbering_input)
        {
            clone.kind = None;
            clone.purist_number = None;
            clone.diagnostics.clear();
            let cloned_kind = clone.finalize(&mut numbering);
            if cloned_kind != kind || clone.purist_number != self.purist_number
            {
                log::error!(
                    "clone of measure {} finalized differently: \
                    {} ({:?}) instead of {} ({:?})",
                    self.number,
                    cloned_kind,
                    clone.purist_number,
                    kind,
                    self.purist_number
                );
            }
        }
        clone
    }

    /// Replace the timeline by already placed elements.
    pub(crate) fn replace_elements(&mut self, elements: Vec<MeasureElement>) {
        let uplink = self.uplink();
        let start = self.voice_start;
        self.elements = elements;
        for element in self.elements.iter_mut() {
            let at = element.measure_position();
            element.place(at, start + at, uplink);
        }
        self.current_position = self
            .elements
            .iter()
            .map(|e| e.end_position())
            .fold(MeasurePosition::zero(), |acc, end| acc.max(end));
        self.rebuild_notes_flat();
    }

    /// Take kind and number from the measure, this one shadows.
    pub(crate) fn adopt_classification(&mut self, regular: &Measure) {
        self.closed = true;
        self.kind = regular.kind;
        self.purist_number = regular.purist_number;
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use crate::primitives::{
        IncompleteKind, Measure, MeasureElement, MeasureId, MeasureKind,
        MeasurePosition, PuristNumbering, RepeatContext, TimeSignature,
        VoiceId, VoicePosition, WholeNotes,
    };
    use crate::IrError;

    fn wn(n: i64, d: i64) -> WholeNotes {
        WholeNotes::new(n, d).unwrap()
    }
    fn pos(n: i64, d: i64) -> MeasurePosition {
        MeasurePosition::from_ratio(n, d).unwrap()
    }
    fn measure(beats: u32, beat_type: u32) -> Measure {
        Measure::new(
            MeasureId(0),
            VoiceId(1),
            "1",
            TimeSignature::new(beats, beat_type).unwrap(),
            VoicePosition::zero(),
        )
    }

    #[test]
    fn backup_and_append_keep_order() {
        let mut m = measure(4, 4);
        m.append(MeasureElement::note("c'", wn(1, 2))).unwrap();
        m.append(MeasureElement::note("d'", wn(1, 2))).unwrap();
        m.backup_to(pos(1, 2)).unwrap();
        m.append(MeasureElement::note("f'", wn(1, 4))).unwrap();
        assert_eq!(m.current_position(), pos(3, 4));
        assert_eq!(m.accumulated_duration(), wn(1, 1));
        m.elements()
            .iter()
            .map(|e| e.kind().label())
            .zip_eq(["c':1/2", "d':1/2", "f':1/4"])
            .for_each(|(a, b)| assert_eq!(a, b));
        assert_eq!(m.elements_at(pos(1, 2)).count(), 2);
    }

    #[test]
    fn backup_forward_pads() {
        let mut m = measure(4, 4);
        m.append(MeasureElement::note("c'", wn(1, 4))).unwrap();
        m.backup_to(pos(1, 2)).unwrap();
        assert_eq!(m.current_position(), pos(1, 2));
        assert!(m.elements()[1].kind().is_skip());
        m.forward(wn(1, 4)).unwrap();
        assert_eq!(m.current_position(), pos(3, 4));
        assert!(m.forward(wn(-1, 4)).is_err());
    }

    #[test]
    fn invalid_duration_leaves_measure_unchanged() {
        let mut m = measure(4, 4);
        m.append(MeasureElement::note("c'", wn(1, 4))).unwrap();
        let before = m.clone();
        let result = m.append(MeasureElement::note("d'", wn(-1, 4)));
        assert!(matches!(result, Err(IrError::InvalidDuration(_))));
        assert_eq!(m, before);
    }

    #[test]
    fn classification() {
        let mut numbering = PuristNumbering::default();

        let mut pickup = measure(4, 4);
        pickup.set_first_in_voice(true);
        pickup.append(MeasureElement::note("g", wn(1, 8))).unwrap();
        assert_eq!(
            pickup.finalize(&mut numbering),
            MeasureKind::Incomplete(IncompleteKind::Anacrusis)
        );
        assert_eq!(pickup.purist_number(), Some(0));

        let mut rest = measure(3, 4);
        rest.append(MeasureElement::rest(wn(3, 4))).unwrap();
        assert_eq!(rest.finalize(&mut numbering), MeasureKind::Rest);
        assert_eq!(rest.purist_number(), Some(1));
        assert_eq!(rest.elements()[0].kind().label(), "R:3/4");

        let mut over = measure(2, 4);
        over.append(MeasureElement::note("c'", wn(3, 4))).unwrap();
        assert_eq!(over.finalize(&mut numbering), MeasureKind::Overflowing);
        assert!(matches!(
            over.diagnostics()[0],
            IrError::MeasureOverflow { .. }
        ));

        let mut empty = measure(4, 4);
        empty
            .append(MeasureElement::new(crate::primitives::ElementKind::Clef(
                "bass".into(),
            )))
            .unwrap();
        assert_eq!(
            empty.finalize(&mut numbering),
            MeasureKind::MusicallyEmpty
        );

        let mut free = Measure::new(
            MeasureId(4),
            VoiceId(1),
            "5",
            TimeSignature::SenzaMisura,
            VoicePosition::zero(),
        );
        free.append(MeasureElement::note("c'", wn(7, 4))).unwrap();
        assert_eq!(free.finalize(&mut numbering), MeasureKind::Regular);
        assert_eq!(free.purist_number(), Some(4));
    }

    #[test]
    fn anacrusis_counts_toward_next_incomplete() {
        let mut numbering = PuristNumbering::default();
        let mut pickup = measure(4, 4);
        pickup.set_first_in_voice(true);
        pickup.append(MeasureElement::note("g", wn(1, 4))).unwrap();
        pickup.finalize(&mut numbering);
        assert_eq!(numbering.current(), 1);

        let mut rest_of_bar = measure(4, 4);
        rest_of_bar.set_repeat_context(RepeatContext::NextAfterCommonPart);
        rest_of_bar
            .append(MeasureElement::note("c'", wn(3, 4)))
            .unwrap();
        rest_of_bar.finalize(&mut numbering);
        assert_eq!(pickup.purist_number(), Some(0));
        assert_eq!(rest_of_bar.purist_number(), Some(1));
        assert_eq!(numbering.current(), 2);
    }

    #[test]
    fn incomplete_halves_share_number() {
        let mut numbering = PuristNumbering::default();
        let mut first = measure(4, 4);
        first.set_repeat_context(RepeatContext::LastInCommonPart);
        first.append(MeasureElement::note("c'", wn(1, 2))).unwrap();
        let mut second = measure(4, 4);
        second.set_repeat_context(RepeatContext::NextAfterCommonPart);
        second.append(MeasureElement::note("d'", wn(1, 2))).unwrap();
        assert_eq!(
            first.finalize(&mut numbering),
            MeasureKind::Incomplete(IncompleteKind::LastInCommonPart)
        );
        assert_eq!(numbering.current(), 1);
        assert_eq!(
            second.finalize(&mut numbering),
            MeasureKind::Incomplete(IncompleteKind::NextAfterCommonPart)
        );
        assert_eq!(first.purist_number(), Some(1));
        assert_eq!(second.purist_number(), Some(1));
        assert_eq!(numbering.current(), 2);
    }

    #[test]
    fn finalized_measure_is_frozen() {
        let mut numbering = PuristNumbering::default();
        let mut m = measure(4, 4);
        m.append(MeasureElement::rest(wn(1, 1))).unwrap();
        m.finalize(&mut numbering);
        assert_eq!(m.finalize(&mut numbering), MeasureKind::Rest);
        assert_eq!(numbering.current(), 2);
        assert!(matches!(
            m.append(MeasureElement::rest(wn(1, 4))),
            Err(IrError::MeasureAlreadyFinalized(_))
        ));
    }

    #[test]
    fn stale_voice_position_corrected() {
        let mut m = Measure::new(
            MeasureId(3),
            VoiceId(1),
            "4",
            TimeSignature::default(),
            VoicePosition::from_ratio(3, 1).unwrap(),
        );
        m.append(MeasureElement::note("c'", wn(1, 1))).unwrap();
        m.elements[0].set_voice_position(VoicePosition::zero());
        m.finalize(&mut PuristNumbering::default());
        assert_eq!(
            m.elements()[0].voice_position(),
            VoicePosition::from_ratio(3, 1).unwrap()
        );
        assert!(matches!(
            m.diagnostics()[0],
            IrError::PositionInconsistency { .. }
        ));
    }

    #[test]
    fn deep_clone_refinalizes() {
        let mut numbering = PuristNumbering::default();
        numbering.advance();
        let mut m = measure(4, 4);
        m.append(MeasureElement::note("c'", wn(1, 4))).unwrap();
        m.append(MeasureElement::note("e'", wn(3, 4))).unwrap();
        m.finalize(&mut numbering);
        let clone = m.create_deep_clone(VoiceId(7));
        assert_eq!(clone, m);
        assert_eq!(clone.purist_number(), Some(2));
        assert_eq!(clone.voice(), VoiceId(7));
        assert!(clone
            .elements()
            .iter()
            .all(|e| e.uplink().map(|u| u.voice) == Some(VoiceId(7))));
    }
}
