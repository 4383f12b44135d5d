//! Voice is built by sequential calls of the import layer.
//!
//! Measures are finalized lazily: a measure is classified only when the
//! next measure starts, or when a structural event (repeat, ending,
//! compressed run) or the voice end supplies its repeat context. An
//! empty measure, opened right before a structural event, is moved
//! across it, so it starts the new structure instead of ending the old
//! one.
//!
//! # Example
//!
//! ```
//! use score_ir::dom::Voice;
//! use score_ir::primitives::{
//!     IncompleteKind, MeasureElement, MeasureKind, TimeSignature, VoiceId,
//!     WholeNotes,
//! };
//! let mut voice = Voice::new(VoiceId(1), TimeSignature::default());
//! voice.start_measure("0").unwrap();
//! voice
//!     .append(MeasureElement::note("g", WholeNotes::new(1, 8).unwrap()))
//!     .unwrap();
//! voice.start_measure("1").unwrap();
//! voice
//!     .append(MeasureElement::note("c'", WholeNotes::from_integer(1)))
//!     .unwrap();
//! voice.finalize_voice().unwrap();
//!
//! let measures = voice.measures_flat();
//! assert_eq!(
//!     measures[0].kind(),
//!     Some(MeasureKind::Incomplete(IncompleteKind::Anacrusis))
//! );
//! assert_eq!(measures[0].purist_number(), Some(0));
//! assert_eq!(measures[1].purist_number(), Some(1));
//! assert_eq!(
//!     measures[1].voice_start().get(),
//!     WholeNotes::new(1, 8).unwrap()
//! );
//! ```

use crate::{
    primitives::{
        ElementKind, Measure, MeasureElement, MeasureId, MeasureKind,
        MeasurePosition, PuristNumbering, RepeatContext, SegmentId,
        TimeSignature, VoiceId, VoicePosition, WholeNotes,
    },
    visitor::{browse_voice, Expansion, VoiceVisitor},
    IrError, IrOptions, IrResult,
};

use super::{
    collect_measures,
    compression::{compress_rest_runs, PendingCompression},
    repeat::{clone_elements, PendingRepeat},
    EndingKind, MeasureRepeat, MeasuresSlicesSequence, MultipleMeasureRest,
    RepeatPhase, Segment, ShadowKind, ShadowVoices, VoiceElement,
};

/// Contexts of the last measure of an ending and of the measure after.
fn ending_contexts(kind: EndingKind) -> (RepeatContext, RepeatContext) {
    match kind {
        EndingKind::Hooked => (
            RepeatContext::LastInHookedEnding,
            RepeatContext::NextAfterHookedEnding,
        ),
        EndingKind::Hookless => (
            RepeatContext::LastInHooklessEnding,
            RepeatContext::NextAfterHooklessEnding,
        ),
    }
}

#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    options: IrOptions,
    time_signature: TimeSignature,
    initial_elements: Vec<VoiceElement>,
    current_segment: Segment,
    repeats: Vec<PendingRepeat>,
    compression: Option<PendingCompression>,
    shadows: ShadowVoices,
    numbering: PuristNumbering,
    next_measure_id: usize,
    next_segment_id: usize,
    /// Taken by the next created measure.
    next_measure_context: RepeatContext,
    /// Start of the next measure.
    position: VoicePosition,
    current_line: u32,
    /// An ending was closed by a repeat end, and its own end is still
    /// expected.
    ending_end_expected: bool,
    diagnostics: Vec<IrError>,
    finalized: bool,
    slices: MeasuresSlicesSequence,
}
impl Voice {
    pub fn new(id: VoiceId, time_signature: TimeSignature) -> Self {
        Self {
            id,
            options: IrOptions::default(),
            time_signature,
            initial_elements: Vec::new(),
            current_segment: Segment::new(SegmentId(0), id),
            repeats: Vec::new(),
            compression: None,
            shadows: ShadowVoices::default(),
            numbering: PuristNumbering::default(),
            next_measure_id: 0,
            next_segment_id: 1,
            next_measure_context: RepeatContext::Standalone,
            position: VoicePosition::zero(),
            current_line: 0,
            ending_end_expected: false,
            diagnostics: Vec::new(),
            finalized: false,
            slices: MeasuresSlicesSequence::default(),
        }
    }
    pub fn with_options(mut self, options: IrOptions) -> Self {
        self.options = options;
        self
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }
    pub fn options(&self) -> &IrOptions {
        &self.options
    }
    /// Time signature, the next measure starts with.
    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }
    /// Top-level structure. Complete only after
    /// [Voice::finalize_voice].
    pub fn initial_elements(&self) -> &[VoiceElement] {
        &self.initial_elements
    }
    /// Measures, not yet flushed to the structure.
    pub fn current_segment(&self) -> &Segment {
        &self.current_segment
    }
    /// Phases of the open repeats, the innermost last.
    pub fn repeat_phases(&self) -> Vec<RepeatPhase> {
        self.repeats.iter().map(|r| r.phase()).collect()
    }
    pub fn shadows(&self) -> &ShadowVoices {
        &self.shadows
    }
    pub fn purist_numbering(&self) -> PuristNumbering {
        self.numbering
    }
    /// Start of the next measure in the voice.
    pub fn position(&self) -> VoicePosition {
        self.position
    }
    /// Everything reported during construction, in order.
    pub fn diagnostics(&self) -> &[IrError] {
        &self.diagnostics
    }
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
    /// Empty before [Voice::finalize_voice].
    pub fn slices(&self) -> &MeasuresSlicesSequence {
        &self.slices
    }

    /// All the measures in voice order, compressed runs expanded.
    pub fn measures_flat(&self) -> Vec<&Measure> {
        let mut measures = Vec::new();
        collect_measures(&self.initial_elements, &mut measures);
        for pending in self.repeats.iter() {
            collect_measures(pending.elements(), &mut measures);
        }
        if let Some(PendingCompression::MeasureRepeat { pattern, .. }) =
            &self.compression
        {
            measures.extend(pattern.measures());
        }
        measures.extend(self.current_segment.measures());
        measures
    }

    /// Walk the finalized structure with expansion taken from options.
    pub fn browse(&self, visitor: &mut impl VoiceVisitor) {
        self.browse_with(visitor, Expansion::from(&self.options));
    }
    pub fn browse_with(
        &self,
        visitor: &mut impl VoiceVisitor,
        expansion: Expansion,
    ) {
        browse_voice(self, visitor, expansion);
    }

    /// Copy, owned by another voice.
    ///
    /// Every measure is re-linked to `id` and its classification is
    /// derived again, shadow voices are copied as well.
    pub fn create_deep_clone(&self, id: VoiceId) -> Self {
        let mut clone = Self {
            id,
            options: self.options.clone(),
            time_signature: self.time_signature,
            initial_elements: clone_elements(&self.initial_elements, id),
            current_segment: self.current_segment.create_deep_clone(id),
            repeats: self
                .repeats
                .iter()
                .map(|r| r.create_deep_clone(id))
                .collect(),
            compression: self
                .compression
                .as_ref()
                .map(|c| c.create_deep_clone(id)),
            shadows: self.shadows.create_deep_clone(id),
            numbering: self.numbering,
            next_measure_id: self.next_measure_id,
            next_segment_id: self.next_segment_id,
            next_measure_context: self.next_measure_context,
            position: self.position,
            current_line: self.current_line,
            ending_end_expected: self.ending_end_expected,
            diagnostics: self.diagnostics.clone(),
            finalized: self.finalized,
            slices: MeasuresSlicesSequence::default(),
        };
        if clone.finalized {
            let slices =
                MeasuresSlicesSequence::from_measures(clone.measures_flat());
            clone.slices = slices;
        }
        clone
    }

    fn check_open(&self) -> IrResult<()> {
        match self.finalized {
            true => Err(IrError::VoiceFinalized(self.id)),
            false => Ok(()),
        }
    }

    fn report(&mut self, error: IrError) -> IrError {
        log::warn!("voice {}: {}", self.id, error);
        self.diagnostics.push(error.clone());
        error
    }

    fn malformed_repeat(&mut self, reason: impl Into<String>) -> IrError {
        let error = IrError::MalformedRepeat {
            reason: reason.into(),
            line: self.current_line,
        };
        self.report(error)
    }

    fn new_segment(&mut self) -> Segment {
        let id = SegmentId(self.next_segment_id);
        self.next_segment_id += 1;
        Segment::new(id, self.id)
    }

    fn has_open_measure(&self) -> bool {
        matches!(
            self.current_segment.last_measure(),
            Some(m) if !m.is_closed()
        )
    }

    /// Close the last measure, if open, and advance the voice position.
    fn close_last_measure(&mut self) {
        if let Some(measure) = self.current_segment.last_measure_mut() {
            if !measure.is_closed() {
                measure.close();
                self.position =
                    measure.voice_start() + measure.accumulated_duration();
            }
        }
    }

    /// Classify the last measure of the current segment.
    ///
    /// `context` overrides the repeat context, the measure got on
    /// creation.
    fn finalize_last_measure(&mut self, context: Option<RepeatContext>) {
        if let Err(error) = self.finalize_and_split(context) {
            log::debug!("compressed run dropped: {}", error);
        }
    }

    /// Same as `finalize_last_measure`, fails when a multiple
    /// rest, broken by the measure, has no rest measures.
    fn finalize_and_split(
        &mut self,
        context: Option<RepeatContext>,
    ) -> IrResult<()> {
        self.close_last_measure();
        let measure = match self.current_segment.last_measure_mut() {
            Some(measure) if !measure.is_finalized() => measure,
            _ => return Ok(()),
        };
        if let Some(context) = context {
            measure.set_repeat_context(context);
        }
        measure.finalize(&mut self.numbering);
        self.diagnostics.extend(measure.diagnostics().iter().cloned());
        self.shadows.sync(measure);
        self.close_rests_before_music()
    }

    /// A multiple rest ends before the first measure, that is not a
    /// rest. The measure stays ordinary music after the run.
    fn close_rests_before_music(&mut self) -> IrResult<()> {
        let open =
            matches!(self.compression, Some(PendingCompression::Rests { .. }));
        let music = matches!(
            self.current_segment.last_measure().and_then(|m| m.kind()),
            Some(kind) if kind != MeasureKind::Rest
        );
        if !(open && music) {
            return Ok(());
        }
        let moved = self
            .current_segment
            .take_last_measures(1)
            .unwrap_or_default();
        if let Some(measure) = moved.first() {
            log::debug!(
                "voice {}: multiple rest ends before measure {}",
                self.id,
                measure.number()
            );
        }
        let result = self.close_compression();
        for measure in moved {
            self.current_segment.append_measure(measure);
        }
        result
    }

    fn begin_measure(&mut self, number: String) {
        self.finalize_last_measure(None);
        if let Some(PendingCompression::Rests { declared }) = self.compression
        {
            if self.current_segment.len() >= declared as usize {
                log::debug!(
                    "voice {}: multiple rest of {} measures is complete",
                    self.id,
                    declared
                );
                self.close_compression_reported();
            }
        }
        let id = MeasureId(self.next_measure_id);
        self.next_measure_id += 1;
        let mut measure = Measure::new(
            id,
            self.id,
            number,
            self.time_signature,
            self.position,
        );
        measure.set_first_in_voice(id == MeasureId(0));
        measure.set_repeat_context(std::mem::take(
            &mut self.next_measure_context,
        ));
        self.current_segment.append_measure(measure);
    }

    fn open_measure_mut(&mut self) -> &mut Measure {
        if !self.has_open_measure() {
            let number = (self.next_measure_id + 1).to_string();
            log::debug!("voice {}: implicit measure {}", self.id, number);
            self.begin_measure(number);
        }
        let last = self.current_segment.len() - 1;
        &mut self.current_segment.measures_mut()[last]
    }

    /// Open a new measure, closing the previous one.
    ///
    /// `number` is the label from the source, not necessary numeric.
    pub fn start_measure(
        &mut self,
        number: impl Into<String>,
    ) -> IrResult<()> {
        self.check_open()?;
        self.ending_end_expected = false;
        self.begin_measure(number.into());
        Ok(())
    }

    /// Close the open measure. Its classification waits for the next
    /// event.
    pub fn end_measure(&mut self) -> IrResult<()> {
        self.check_open()?;
        match self.has_open_measure() {
            true => self.close_last_measure(),
            false => log::warn!("voice {}: no open measure to end", self.id),
        }
        Ok(())
    }

    fn validate(&self, element: &MeasureElement) -> IrResult<()> {
        element.kind().validate().map_err(|error| {
            log::error!(
                "voice {}, input line {}: {}",
                self.id,
                element.input_line(),
                error
            );
            error
        })
    }

    fn route_to_shadow(
        &mut self,
        kind: ShadowKind,
        element: MeasureElement,
        position: MeasurePosition,
    ) -> IrResult<()> {
        self.open_measure_mut();
        let last = self.current_segment.len() - 1;
        let regular = &self.current_segment.measures()[last];
        self.shadows
            .insert(kind, self.id, regular, element, position)
    }

    /// Append element at the running position of the open measure,
    /// opening one if needed.
    ///
    /// Harmonies and figured bass go to the shadow voices at the same
    /// position, and do not advance the running position.
    pub fn append(&mut self, element: MeasureElement) -> IrResult<()> {
        self.check_open()?;
        self.validate(&element)?;
        self.current_line = element.input_line();
        if let Some(kind) = ShadowKind::of(element.kind()) {
            let position = self.open_measure_mut().current_position();
            return self.route_to_shadow(kind, element, position);
        }
        if let ElementKind::TimeSignature(ts) = element.kind() {
            self.time_signature = *ts;
        }
        self.open_measure_mut().append(element)
    }

    /// Insert element at the position in the open measure.
    pub fn insert_at(
        &mut self,
        element: MeasureElement,
        position: MeasurePosition,
    ) -> IrResult<()> {
        self.check_open()?;
        self.validate(&element)?;
        self.current_line = element.input_line();
        if let Some(kind) = ShadowKind::of(element.kind()) {
            return self.route_to_shadow(kind, element, position);
        }
        if let ElementKind::TimeSignature(ts) = element.kind() {
            self.time_signature = *ts;
        }
        self.open_measure_mut().insert_at(element, position)
    }

    /// Rewind the running position of the open measure.
    pub fn backup_to(&mut self, position: MeasurePosition) -> IrResult<()> {
        self.check_open()?;
        self.open_measure_mut().backup_to(position)
    }

    pub fn forward(&mut self, duration: WholeNotes) -> IrResult<()> {
        self.check_open()?;
        if duration.is_negative() {
            let error = IrError::InvalidDuration(format!(
                "can not forward by {} in voice {}",
                duration, self.id
            ));
            log::error!("{}", error);
            return Err(error);
        }
        self.open_measure_mut().forward(duration)
    }

    /// Input line, used in diagnostics of the following structural
    /// events.
    pub fn set_input_line(&mut self, line: u32) {
        self.current_line = line;
    }

    // Structure.

    fn detach_fresh_measure(&mut self) -> Option<Measure> {
        let fresh = matches!(
            self.current_segment.last_measure(),
            Some(m) if !m.is_closed() && m.is_empty()
        );
        match fresh {
            true => self.current_segment.remove_last_measure().ok().flatten(),
            false => None,
        }
    }

    fn reattach(&mut self, fresh: Option<Measure>) {
        if let Some(mut measure) = fresh {
            let context = std::mem::take(&mut self.next_measure_context);
            if context != RepeatContext::Standalone {
                measure.set_repeat_context(context);
            }
            self.current_segment.append_measure(measure);
        }
    }

    /// Where closed material goes.
    fn target(&mut self) -> &mut Vec<VoiceElement> {
        match self.repeats.last_mut() {
            Some(pending) => pending.accumulator_mut(),
            None => &mut self.initial_elements,
        }
    }

    fn flush_segment(&mut self) {
        if self.current_segment.is_empty() {
            return;
        }
        let fresh = self.new_segment();
        let segment = std::mem::replace(&mut self.current_segment, fresh);
        self.target().push(VoiceElement::Segment(segment));
    }

    fn close_top_repeat(&mut self) {
        if let Some(pending) = self.repeats.pop() {
            let (repeat, trailing) = pending.into_repeat();
            log::debug!(
                "voice {}: repeat with {} endings closed",
                self.id,
                repeat.endings().len()
            );
            let target = self.target();
            target.push(VoiceElement::Repeat(repeat));
            target.extend(trailing);
        }
    }

    /// A repeat, waiting for one more ending, is complete once other
    /// music starts.
    fn close_awaiting_repeat(&mut self) {
        if let Some(RepeatPhase::AwaitingEnding) =
            self.repeats.last().map(|r| r.phase())
        {
            self.close_top_repeat();
        }
    }

    /// Wrap the current segment into the pending compressed node.
    fn close_compression(&mut self) -> IrResult<()> {
        let pending = match self.compression.take() {
            Some(pending) => pending,
            None => return Ok(()),
        };
        let fresh = self.new_segment();
        let run = std::mem::replace(&mut self.current_segment, fresh);
        let node = match pending {
            PendingCompression::Rests { declared } => {
                MultipleMeasureRest::new(run, Some(declared))
                    .map(VoiceElement::MultipleMeasureRest)
            }
            PendingCompression::MeasureRepeat { pattern, slashes } => {
                match run.is_empty() {
                    true => {
                        // pattern stays as ordinary music
                        self.target().push(VoiceElement::Segment(pattern));
                        Err(IrError::EmptyCompressedRun(
                            "measure repeat has no replicas".to_string(),
                        ))
                    }
                    false => MeasureRepeat::new(pattern, run, slashes)
                        .map(VoiceElement::MeasureRepeat),
                }
            }
        };
        match node {
            Ok(node) => {
                self.target().push(node);
                Ok(())
            }
            Err(error) => Err(self.report(error)),
        }
    }

    /// Close the pending compressed run, failures are already in
    /// diagnostics.
    fn close_compression_reported(&mut self) {
        if let Err(error) = self.close_compression() {
            log::debug!("compressed run dropped: {}", error);
        }
    }

    /// Common part of all structural events: finalize the last measure
    /// with `context`, and flush what is built so far.
    ///
    /// Returns detached empty measure, which belongs after the event.
    fn prepare_boundary(
        &mut self,
        context: Option<RepeatContext>,
        close_awaiting: bool,
    ) -> Option<Measure> {
        let fresh = self.detach_fresh_measure();
        self.finalize_last_measure(context);
        if close_awaiting {
            self.close_awaiting_repeat();
        }
        self.close_compression_reported();
        self.flush_segment();
        fresh
    }

    /// There are measures to build an inferred repeat from.
    fn has_material(&self) -> bool {
        let fresh = matches!(
            self.current_segment.last_measure(),
            Some(m) if !m.is_closed() && m.is_empty()
        );
        self.current_segment.len() > fresh as usize
            || self.compression.is_some()
    }

    /// Open a repeat, whose common part is the current segment.
    fn infer_repeat_start(
        &mut self,
        event: &str,
    ) -> IrResult<Option<Measure>> {
        if !self.options.infer_repeat_starts || !self.has_material() {
            return Err(self.malformed_repeat(format!(
                "{} without an open repeat",
                event
            )));
        }
        self.malformed_repeat(format!(
            "{} without an open repeat, repeat start inferred",
            event
        ));
        let fresh = self.detach_fresh_measure();
        self.finalize_last_measure(Some(RepeatContext::LastInCommonPart));
        self.repeats.push(PendingRepeat::inferred(self.current_line));
        self.close_compression_reported();
        self.flush_segment();
        Ok(fresh)
    }

    pub fn start_repeat(&mut self) -> IrResult<()> {
        self.check_open()?;
        self.ending_end_expected = false;
        let fresh = self.prepare_boundary(None, true);
        log::debug!("voice {}: repeat start", self.id);
        self.repeats.push(PendingRepeat::new(self.current_line));
        self.reattach(fresh);
        Ok(())
    }

    /// Repeat end barline.
    ///
    /// Closes the common part of a simple repeat, or the open ending.
    /// Without an open repeat, the current segment becomes the common
    /// part of an inferred one.
    pub fn end_repeat(&mut self, times: Option<u32>) -> IrResult<()> {
        self.check_open()?;
        let top = self
            .repeats
            .last()
            .map(|r| (r.phase(), r.open_ending_kind()));
        match top {
            None => {
                let fresh = self.infer_repeat_start("repeat end")?;
                self.close_simple_repeat(times, fresh);
            }
            Some((RepeatPhase::CommonPart, _)) => {
                let fresh = self.prepare_boundary(
                    Some(RepeatContext::LastInCommonPart),
                    false,
                );
                self.close_simple_repeat(times, fresh);
            }
            Some((RepeatPhase::InEnding, kind)) => {
                let kind = kind.unwrap_or(EndingKind::Hooked);
                let (last, next) = ending_contexts(kind);
                let fresh = self.prepare_boundary(Some(last), false);
                if let Some(pending) = self.repeats.last_mut() {
                    pending.set_times(times);
                    pending.close_ending();
                }
                if kind == EndingKind::Hookless {
                    self.close_top_repeat();
                }
                self.ending_end_expected = true;
                self.next_measure_context = next;
                self.reattach(fresh);
            }
            Some((RepeatPhase::AwaitingEnding, _)) => {
                if let Some(pending) = self.repeats.last_mut() {
                    pending.set_times(times);
                }
            }
        }
        Ok(())
    }

    fn close_simple_repeat(
        &mut self,
        times: Option<u32>,
        fresh: Option<Measure>,
    ) {
        if let Some(pending) = self.repeats.last_mut() {
            pending.set_times(times);
        }
        self.close_top_repeat();
        self.next_measure_context = RepeatContext::NextAfterCommonPart;
        self.reattach(fresh);
    }

    /// Start of an alternate ending, numbered like "1,2".
    pub fn start_ending(
        &mut self,
        numbers: Vec<u32>,
        kind: EndingKind,
    ) -> IrResult<()> {
        self.check_open()?;
        self.ending_end_expected = false;
        let phase = self.repeats.last().map(|r| r.phase());
        let (fresh, next) = match phase {
            Some(RepeatPhase::CommonPart) => (
                self.prepare_boundary(
                    Some(RepeatContext::LastInCommonPart),
                    false,
                ),
                RepeatContext::NextAfterCommonPart,
            ),
            Some(RepeatPhase::AwaitingEnding) => (
                self.prepare_boundary(None, false),
                self.next_measure_context,
            ),
            Some(RepeatPhase::InEnding) => {
                self.malformed_repeat(
                    "ending start while the previous ending is open",
                );
                let open = self
                    .repeats
                    .last()
                    .and_then(|r| r.open_ending_kind())
                    .unwrap_or(EndingKind::Hooked);
                let (last, next) = ending_contexts(open);
                let fresh = self.prepare_boundary(Some(last), false);
                if let Some(pending) = self.repeats.last_mut() {
                    pending.close_ending();
                }
                (fresh, next)
            }
            None => (
                self.infer_repeat_start("ending start")?,
                RepeatContext::NextAfterCommonPart,
            ),
        };
        log::debug!("voice {}: ending {:?} ({:?})", self.id, numbers, kind);
        if let Some(pending) = self.repeats.last_mut() {
            pending.open_ending(numbers, kind);
        }
        self.next_measure_context = next;
        self.reattach(fresh);
        Ok(())
    }

    /// End of the open ending. A hookless ending closes the repeat.
    pub fn end_ending(&mut self) -> IrResult<()> {
        self.check_open()?;
        if self.ending_end_expected {
            self.ending_end_expected = false;
            return Ok(());
        }
        let open = self.repeats.last().and_then(|r| r.open_ending_kind());
        match open {
            Some(kind) => {
                let (last, next) = ending_contexts(kind);
                let fresh = self.prepare_boundary(Some(last), false);
                if let Some(pending) = self.repeats.last_mut() {
                    pending.close_ending();
                }
                if kind == EndingKind::Hookless {
                    self.close_top_repeat();
                }
                self.next_measure_context = next;
                self.reattach(fresh);
                Ok(())
            }
            None => Err(self.malformed_repeat("ending end without an ending")),
        }
    }

    /// Start of a run of `count` full-bar rests, which is closed
    /// automatically when the next measure after the run starts.
    pub fn start_multiple_rest(&mut self, count: u32) -> IrResult<()> {
        self.check_open()?;
        let fresh = self.prepare_boundary(None, true);
        self.compression = Some(PendingCompression::Rests { declared: count });
        self.reattach(fresh);
        Ok(())
    }

    pub fn end_multiple_rest(&mut self) -> IrResult<()> {
        self.check_open()?;
        let open = matches!(
            self.compression,
            Some(PendingCompression::Rests { .. })
        );
        if !open {
            return Err(self.report(IrError::EmptyCompressedRun(
                "no multiple rest is open".to_string(),
            )));
        }
        let fresh = self.detach_fresh_measure();
        let result = self
            .finalize_and_split(None)
            .and_then(|_| self.close_compression());
        self.reattach(fresh);
        result
    }

    /// Start replicas of the last `pattern_measures` measures.
    pub fn start_measure_repeat(
        &mut self,
        pattern_measures: usize,
        slashes: u32,
    ) -> IrResult<()> {
        self.check_open()?;
        if pattern_measures == 0 {
            return Err(self.report(IrError::MalformedMeasureRepeat(
                "pattern of zero measures".to_string(),
            )));
        }
        let fresh = self.detach_fresh_measure();
        self.finalize_last_measure(None);
        self.close_awaiting_repeat();
        self.close_compression_reported();
        let measures =
            match self.current_segment.take_last_measures(pattern_measures) {
                Some(measures) => measures,
                None => {
                    let error = IrError::MalformedMeasureRepeat(format!(
                        "pattern of {} measures, but only {} available",
                        pattern_measures,
                        self.current_segment.len()
                    ));
                    self.reattach(fresh);
                    return Err(self.report(error));
                }
            };
        self.flush_segment();
        let mut pattern = self.new_segment();
        for measure in measures {
            pattern.append_measure(measure);
        }
        self.compression =
            Some(PendingCompression::MeasureRepeat { pattern, slashes });
        self.reattach(fresh);
        Ok(())
    }

    pub fn end_measure_repeat(&mut self) -> IrResult<()> {
        self.check_open()?;
        if !matches!(
            self.compression,
            Some(PendingCompression::MeasureRepeat { .. })
        ) {
            return Err(self.report(IrError::MalformedMeasureRepeat(
                "no measure repeat is open".to_string(),
            )));
        }
        let fresh = self.detach_fresh_measure();
        self.finalize_last_measure(None);
        let result = self.close_compression();
        self.reattach(fresh);
        result
    }

    /// Close everything still open, and build the final structure.
    ///
    /// Repeats without an end are closed, or, when only their common
    /// part was seen, kept as ordinary music. After this call, every
    /// mutation fails with [IrError::VoiceFinalized].
    pub fn finalize_voice(&mut self) -> IrResult<()> {
        if self.finalized {
            log::debug!("voice {} is already finalized", self.id);
            return Ok(());
        }
        let context = self
            .repeats
            .last()
            .and_then(|r| r.open_ending_kind())
            .map(|kind| ending_contexts(kind).0);
        self.finalize_last_measure(context);
        self.close_compression_reported();
        while let Some(phase) = self.repeats.last().map(|r| r.phase()) {
            match phase {
                RepeatPhase::AwaitingEnding => self.close_top_repeat(),
                RepeatPhase::InEnding => {
                    self.flush_segment();
                    self.malformed_repeat("ending is not ended at voice end");
                    self.close_top_repeat();
                }
                RepeatPhase::CommonPart => {
                    self.flush_segment();
                    self.malformed_repeat(
                        "repeat is not ended at voice end, \
                        kept as ordinary music",
                    );
                    if let Some(pending) = self.repeats.pop() {
                        let elements = pending.downgrade();
                        self.target().extend(elements);
                    }
                }
            }
        }
        self.flush_segment();
        if self.options.compress_full_bar_rests {
            let elements = std::mem::take(&mut self.initial_elements);
            self.initial_elements = compress_rest_runs(
                elements,
                self.options.min_full_bar_rests_to_compress,
                self.id,
                &mut self.next_segment_id,
            );
        }
        let mut measures = Vec::new();
        collect_measures(&self.initial_elements, &mut measures);
        for measure in measures.iter() {
            self.shadows.sync(measure);
        }
        self.slices = MeasuresSlicesSequence::from_measures(measures);
        self.finalized = true;
        log::debug!(
            "voice {} finalized with {} slices",
            self.id,
            self.slices.len()
        );
        Ok(())
    }
}
