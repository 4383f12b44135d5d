//! Compressed runs: multiple full-bar rests and measure repeats.
//!
//! A compressed node wraps the measures it represents, instead of
//! replacing them, so both the summary and the uncompressed view stay
//! available. Measures inside are finalized as usual, so compression
//! never affects purist numbering.

use crate::{
    primitives::{Measure, MeasureKind, SegmentId, VoiceId, WholeNotes},
    IrError, IrResult,
};

use super::{Segment, VoiceElement};

#[derive(Debug, Clone, PartialEq)]
pub struct MultipleMeasureRest {
    measures: Segment,
    declared_count: Option<u32>,
    /// Render every rest measure instead of one multi-measure bar.
    use_symbols: bool,
}
impl MultipleMeasureRest {
    /// `declared_count` is None for runs found by automatic compression.
    pub fn new(
        measures: Segment,
        declared_count: Option<u32>,
    ) -> IrResult<Self> {
        if measures.is_empty() {
            return Err(IrError::EmptyCompressedRun(format!(
                "multiple rest of {} measures",
                declared_count.unwrap_or(0)
            )));
        }
        if let Some(declared) = declared_count {
            if declared as usize != measures.len() {
                log::warn!(
                    "multiple rest declared {} measures, but wraps {}",
                    declared,
                    measures.len()
                );
            }
        }
        Ok(Self {
            measures,
            declared_count,
            use_symbols: false,
        })
    }
    pub fn measures_count(&self) -> usize {
        self.measures.len()
    }
    pub fn declared_count(&self) -> Option<u32> {
        self.declared_count
    }
    pub fn use_symbols(&self) -> bool {
        self.use_symbols
    }
    pub fn set_use_symbols(&mut self, value: bool) {
        self.use_symbols = value;
    }
    /// Uncompressed view.
    pub fn measures(&self) -> &[Measure] {
        self.measures.measures()
    }
    pub fn segment(&self) -> &Segment {
        &self.measures
    }
    /// Total duration of the represented measures.
    pub fn duration(&self) -> WholeNotes {
        self.measures
            .measures()
            .iter()
            .map(|m| m.accumulated_duration())
            .sum()
    }
    pub(crate) fn create_deep_clone(&self, voice: VoiceId) -> Self {
        Self {
            measures: self.measures.create_deep_clone(voice),
            declared_count: self.declared_count,
            use_symbols: self.use_symbols,
        }
    }
}

/// How much of a measure repeat is visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicaExpansion {
    /// The pattern only: enough for notations which print
    /// the pattern and the count.
    PatternOnly,
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasureRepeat {
    pattern: Segment,
    replicas: Segment,
    slashes: u32,
}
impl MeasureRepeat {
    pub fn new(
        pattern: Segment,
        replicas: Segment,
        slashes: u32,
    ) -> IrResult<Self> {
        if pattern.is_empty() {
            return Err(IrError::MalformedMeasureRepeat(
                "empty pattern".to_string(),
            ));
        }
        if replicas.is_empty() {
            return Err(IrError::EmptyCompressedRun(format!(
                "measure repeat of {} measures has no replicas",
                pattern.len()
            )));
        }
        if replicas.len() % pattern.len() != 0 {
            log::warn!(
                "{} replica measures do not divide by pattern of {}",
                replicas.len(),
                pattern.len()
            );
        }
        Ok(Self {
            pattern,
            replicas,
            slashes,
        })
    }
    /// Pattern length in measures.
    pub fn measures_number(&self) -> usize {
        self.pattern.len()
    }
    pub fn replicas_number(&self) -> usize {
        self.replicas.len() / self.pattern.len().max(1)
    }
    pub fn slashes(&self) -> u32 {
        self.slashes
    }
    pub fn pattern(&self) -> &Segment {
        &self.pattern
    }
    pub fn replicas(&self) -> &Segment {
        &self.replicas
    }
    pub fn measures(&self, expansion: ReplicaExpansion) -> Vec<&Measure> {
        let pattern = self.pattern.measures().iter();
        match expansion {
            ReplicaExpansion::PatternOnly => pattern.collect(),
            ReplicaExpansion::Full => {
                pattern.chain(self.replicas.measures().iter()).collect()
            }
        }
    }
    pub(crate) fn create_deep_clone(&self, voice: VoiceId) -> Self {
        Self {
            pattern: self.pattern.create_deep_clone(voice),
            replicas: self.replicas.create_deep_clone(voice),
            slashes: self.slashes,
        }
    }
}

/// Compressed run, open in the voice.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PendingCompression {
    Rests { declared: u32 },
    MeasureRepeat { pattern: Segment, slashes: u32 },
}
impl PendingCompression {
    pub fn create_deep_clone(&self, voice: VoiceId) -> Self {
        match self {
            Self::Rests { declared } => Self::Rests {
                declared: *declared,
            },
            Self::MeasureRepeat { pattern, slashes } => Self::MeasureRepeat {
                pattern: pattern.create_deep_clone(voice),
                slashes: *slashes,
            },
        }
    }
}

/// Wrap runs of consecutive rest measures of the same duration.
///
/// Only plain segments are split: existing compressed nodes are kept
/// as is, repeats are processed recursively.
pub(crate) fn compress_rest_runs(
    elements: Vec<VoiceElement>,
    min_run: usize,
    voice: VoiceId,
    next_segment_id: &mut usize,
) -> Vec<VoiceElement> {
    let mut result = Vec::new();
    for element in elements {
        match element {
            VoiceElement::Segment(segment) => result.extend(split_segment(
                segment,
                min_run.max(1),
                voice,
                next_segment_id,
            )),
            VoiceElement::Repeat(repeat) => {
                result.push(VoiceElement::Repeat(repeat.map_elements(
                    &mut |elements| {
                        compress_rest_runs(
                            elements,
                            min_run,
                            voice,
                            next_segment_id,
                        )
                    },
                )))
            }
            other => result.push(other),
        }
    }
    result
}

fn allocate_segment_id(next_segment_id: &mut usize) -> SegmentId {
    *next_segment_id += 1;
    SegmentId(*next_segment_id - 1)
}

fn split_segment(
    segment: Segment,
    min_run: usize,
    voice: VoiceId,
    next_segment_id: &mut usize,
) -> Vec<VoiceElement> {
    let original_id = segment.id();
    // consecutive measures, grouped to rest runs and the rest
    let mut chunks: Vec<(bool, Vec<Measure>)> = Vec::new();
    for measure in segment.into_measures() {
        let is_rest = measure.kind() == Some(MeasureKind::Rest);
        let joins = match chunks.last() {
            Some((true, run)) => {
                is_rest
                    && run.last().map(|m| m.accumulated_duration())
                        == Some(measure.accumulated_duration())
            }
            Some((false, _)) => !is_rest,
            None => false,
        };
        match joins {
            true => {
                let last = chunks.len() - 1;
                chunks[last].1.push(measure);
            }
            false => chunks.push((is_rest, vec![measure])),
        }
    }
    if chunks.iter().all(|(is_run, m)| !is_run || m.len() < min_run) {
        let mut segment = Segment::new(original_id, voice);
        chunks
            .into_iter()
            .flat_map(|(_, measures)| measures)
            .for_each(|m| segment.append_measure(m));
        return vec![VoiceElement::Segment(segment)];
    }

    let mut result = Vec::new();
    let mut first_id = Some(original_id);
    let mut plain: Option<Segment> = None;
    for (is_run, measures) in chunks {
        if is_run && measures.len() >= min_run {
            if let Some(done) = plain.take() {
                result.push(VoiceElement::Segment(done));
            }
            let id = first_id
                .take()
                .unwrap_or_else(|| allocate_segment_id(next_segment_id));
            let mut rests = Segment::new(id, voice);
            measures.into_iter().for_each(|m| rests.append_measure(m));
            match MultipleMeasureRest::new(rests, None) {
                Ok(node) => {
                    result.push(VoiceElement::MultipleMeasureRest(node))
                }
                Err(error) => log::error!("{}", error),
            }
            continue;
        }
        let segment = plain.get_or_insert_with(|| {
            let id = first_id
                .take()
                .unwrap_or_else(|| allocate_segment_id(next_segment_id));
            Segment::new(id, voice)
        });
        measures.into_iter().for_each(|m| segment.append_measure(m));
    }
    if let Some(done) = plain {
        result.push(VoiceElement::Segment(done));
    }
    result
}
