//! A smallest piece of music, that is held by Measure.
//!
//! [MeasureElement] is about position and duration, while [ElementKind]
//! tells what the element is. Pitches, clefs and keys are kept as the
//! strings supplied by the import layer.

use derivative::Derivative;

use crate::{IrError, IrResult};

use super::{
    MeasureId, MeasurePosition, MeasureUplink, TimeSignature, VoiceId,
    VoicePosition, WholeNotes,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub pitch: String,
    pub duration: WholeNotes,
    pub tie: bool,
}
impl Note {
    pub fn new(pitch: impl Into<String>, duration: WholeNotes) -> Self {
        Self {
            pitch: pitch.into(),
            duration,
            tie: false,
        }
    }
    pub fn tied(mut self) -> Self {
        self.tie = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rest {
    pub duration: WholeNotes,
    /// Set on finalization, when the rest alone fills a rest measure.
    pub full_measure: bool,
}
impl Rest {
    pub fn new(duration: WholeNotes) -> Self {
        Self {
            duration,
            full_measure: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chord {
    pub pitches: Vec<String>,
    pub duration: WholeNotes,
}
impl Chord {
    pub fn new(pitches: Vec<String>, duration: WholeNotes) -> Self {
        Self { pitches, duration }
    }
}

/// `actual` notes in the time of `normal` ones: a triplet is 3:2.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuplet {
    actual: u32,
    normal: u32,
    members: Vec<ElementKind>,
}
impl Tuplet {
    pub fn new(
        actual: u32,
        normal: u32,
        members: Vec<ElementKind>,
    ) -> IrResult<Self> {
        if actual == 0 || normal == 0 {
            return Err(IrError::InvalidDuration(format!(
                "tuplet ratio {}:{}",
                actual, normal
            )));
        }
        Ok(Self {
            actual,
            normal,
            members,
        })
    }
    pub fn actual(&self) -> u32 {
        self.actual
    }
    pub fn normal(&self) -> u32 {
        self.normal
    }
    pub fn members(&self) -> &[ElementKind] {
        &self.members
    }
    fn sounding(&self, written: WholeNotes) -> WholeNotes {
        // ratio is validated on construction
        written
            .scaled(self.normal, self.actual)
            .unwrap_or_else(|_| WholeNotes::zero())
    }
    pub fn sounding_duration(&self) -> WholeNotes {
        self.sounding(
            self.members.iter().map(|m| m.sounding_duration()).sum(),
        )
    }
}

/// Chord symbol, living in the harmonies shadow voice.
#[derive(Debug, Clone, PartialEq)]
pub struct Harmony {
    pub root: String,
    pub kind: String,
    /// Extends until the next harmony or the measure end.
    pub display_duration: WholeNotes,
}
impl Harmony {
    pub fn new(root: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            kind: kind.into(),
            display_duration: WholeNotes::zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FiguredBass {
    pub figures: Vec<String>,
    pub display_duration: WholeNotes,
}
impl FiguredBass {
    pub fn new(figures: Vec<String>) -> Self {
        Self {
            figures,
            display_duration: WholeNotes::zero(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarLineKind {
    Regular,
    Final,
    RepeatForward,
    RepeatBackward,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    Line,
    Page,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Note(Note),
    Rest(Rest),
    /// Invisible filler, produced by padding.
    Skip(WholeNotes),
    Chord(Chord),
    Tuplet(Tuplet),
    Clef(String),
    Key(String),
    TimeSignature(TimeSignature),
    BarLine(BarLineKind),
    Harmony(Harmony),
    FiguredBass(FiguredBass),
    Break(BreakKind),
    BarCheck,
    BarNumberCheck(u32),
}
impl ElementKind {
    pub fn sounding_duration(&self) -> WholeNotes {
        match self {
            Self::Note(note) => note.duration,
            Self::Rest(rest) => rest.duration,
            Self::Skip(duration) => *duration,
            Self::Chord(chord) => chord.duration,
            Self::Tuplet(tuplet) => tuplet.sounding_duration(),
            Self::Harmony(harmony) => harmony.display_duration,
            Self::FiguredBass(figured) => figured.display_duration,
            Self::Clef(_)
            | Self::Key(_)
            | Self::TimeSignature(_)
            | Self::BarLine(_)
            | Self::Break(_)
            | Self::BarCheck
            | Self::BarNumberCheck(_) => WholeNotes::zero(),
        }
    }

    /// Rejects negative durations anywhere inside.
    pub fn validate(&self) -> IrResult<()> {
        if let Self::Tuplet(tuplet) = self {
            for member in tuplet.members() {
                member.validate()?;
            }
        }
        match self.sounding_duration().is_negative() {
            true => Err(IrError::InvalidDuration(format!(
                "{} has negative duration {}",
                self.label(),
                self.sounding_duration()
            ))),
            false => Ok(()),
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Self::Rest(_))
    }
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }
    /// Harmonies and figured bass, routed to shadow voices.
    pub fn is_shadow_item(&self) -> bool {
        matches!(self, Self::Harmony(_) | Self::FiguredBass(_))
    }

    pub(crate) fn set_display_duration(&mut self, duration: WholeNotes) {
        match self {
            Self::Harmony(harmony) => harmony.display_duration = duration,
            Self::FiguredBass(figured) => figured.display_duration = duration,
            _ => log::error!(
                "display duration can be set only for harmonies and \
                figured bass, got: {:?}",
                self
            ),
        }
    }

    /// Short textual form, used in diagnostics and flat views.
    pub fn label(&self) -> String {
        match self {
            Self::Note(note) => {
                let tie = match note.tie {
                    true => "~",
                    false => "",
                };
                format!("{}:{}{}", note.pitch, note.duration, tie)
            }
            Self::Rest(rest) => match rest.full_measure {
                true => format!("R:{}", rest.duration),
                false => format!("r:{}", rest.duration),
            },
            Self::Skip(duration) => format!("s:{}", duration),
            Self::Chord(chord) => {
                format!("<{}>:{}", chord.pitches.join(" "), chord.duration)
            }
            Self::Tuplet(tuplet) => format!(
                "{}:{}{{{}}}",
                tuplet.actual,
                tuplet.normal,
                tuplet
                    .members
                    .iter()
                    .map(|m| m.label())
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
            Self::Clef(clef) => format!("clef:{}", clef),
            Self::Key(key) => format!("key:{}", key),
            Self::TimeSignature(ts) => format!("time:{}", ts),
            Self::BarLine(kind) => format!("bar:{:?}", kind),
            Self::Harmony(harmony) => format!(
                "{}{}:{}",
                harmony.root, harmony.kind, harmony.display_duration
            ),
            Self::FiguredBass(figured) => format!(
                "<{}>:{}",
                figured.figures.join(" "),
                figured.display_duration
            ),
            Self::Break(kind) => format!("break:{:?}", kind),
            Self::BarCheck => "|".to_string(),
            Self::BarNumberCheck(number) => format!("barcheck:{}", number),
        }
    }

    /// Push flat-notes entries of the element, started at `position`.
    fn flatten(
        &self,
        position: MeasurePosition,
        out: &mut Vec<(MeasurePosition, WholeNotes, FlatNoteKind, String)>,
    ) {
        let duration = self.sounding_duration();
        match self {
            Self::Note(note) => out.push((
                position,
                duration,
                FlatNoteKind::Note,
                note.pitch.clone(),
            )),
            Self::Rest(_) => {
                out.push((position, duration, FlatNoteKind::Rest, "r".into()))
            }
            Self::Skip(_) => {
                out.push((position, duration, FlatNoteKind::Skip, "s".into()))
            }
            Self::Chord(chord) => out.push((
                position,
                duration,
                FlatNoteKind::Chord,
                chord.pitches.join(" "),
            )),
            Self::Tuplet(tuplet) => {
                let mut cursor = position;
                for member in tuplet.members() {
                    let mut nested = Vec::new();
                    member.flatten(cursor, &mut nested);
                    for (pos, dur, kind, label) in nested {
                        let offset = tuplet.sounding((pos - position).max(
                            WholeNotes::zero(),
                        ));
                        out.push((
                            position + offset,
                            tuplet.sounding(dur),
                            kind,
                            label,
                        ));
                    }
                    cursor += member.sounding_duration();
                }
            }
            _ => (),
        }
    }
}

/// Element, placed in a measure.
///
/// Uplinks are ignored on comparison, so clones living in another voice
/// compare equal to their originals.
///
/// # Example
/// ```
/// use score_ir::primitives::{ElementKind, MeasureElement, Note, WholeNotes};
/// let quarter = WholeNotes::new(1, 4).unwrap();
/// let element = MeasureElement::note("c'", quarter).at_line(12);
/// assert_eq!(element.sounding_duration(), quarter);
/// assert_eq!(element.input_line(), 12);
/// assert_eq!(
///     element.kind(),
///     &ElementKind::Note(Note::new("c'", quarter))
/// );
/// ```
#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq)]
pub struct MeasureElement {
    kind: ElementKind,
    measure_position: MeasurePosition,
    voice_position: VoicePosition,
    #[derivative(PartialEq = "ignore")]
    uplink: Option<MeasureUplink>,
    input_line: u32,
}
impl MeasureElement {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            measure_position: MeasurePosition::zero(),
            voice_position: VoicePosition::zero(),
            uplink: None,
            input_line: 0,
        }
    }
    pub fn note(pitch: impl Into<String>, duration: WholeNotes) -> Self {
        Self::new(ElementKind::Note(Note::new(pitch, duration)))
    }
    pub fn rest(duration: WholeNotes) -> Self {
        Self::new(ElementKind::Rest(Rest::new(duration)))
    }
    pub fn skip(duration: WholeNotes) -> Self {
        Self::new(ElementKind::Skip(duration))
    }
    pub fn chord(pitches: &[&str], duration: WholeNotes) -> Self {
        Self::new(ElementKind::Chord(Chord::new(
            pitches.iter().map(|p| p.to_string()).collect(),
            duration,
        )))
    }
    pub fn harmony(root: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(ElementKind::Harmony(Harmony::new(root, kind)))
    }
    pub fn figured_bass(figures: &[&str]) -> Self {
        Self::new(ElementKind::FiguredBass(FiguredBass::new(
            figures.iter().map(|f| f.to_string()).collect(),
        )))
    }
    pub fn time_signature(time_signature: TimeSignature) -> Self {
        Self::new(ElementKind::TimeSignature(time_signature))
    }
    pub fn at_line(mut self, input_line: u32) -> Self {
        self.input_line = input_line;
        self
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }
    pub(crate) fn kind_mut(&mut self) -> &mut ElementKind {
        &mut self.kind
    }
    pub fn sounding_duration(&self) -> WholeNotes {
        self.kind.sounding_duration()
    }
    pub fn measure_position(&self) -> MeasurePosition {
        self.measure_position
    }
    pub fn voice_position(&self) -> VoicePosition {
        self.voice_position
    }
    /// Position right after the element.
    pub fn end_position(&self) -> MeasurePosition {
        self.measure_position + self.sounding_duration()
    }
    pub fn uplink(&self) -> Option<MeasureUplink> {
        self.uplink
    }
    pub fn input_line(&self) -> u32 {
        self.input_line
    }

    pub(crate) fn place(
        &mut self,
        measure_position: MeasurePosition,
        voice_position: VoicePosition,
        uplink: MeasureUplink,
    ) {
        self.measure_position = measure_position;
        self.voice_position = voice_position;
        self.uplink = Some(uplink);
    }
    pub(crate) fn set_voice_position(&mut self, position: VoicePosition) {
        self.voice_position = position;
    }
    pub(crate) fn relink(&mut self, voice: VoiceId) {
        if let Some(uplink) = self.uplink.as_mut() {
            uplink.voice = voice;
        }
    }

    pub(crate) fn flat_notes(
        &self,
        uplink: MeasureUplink,
    ) -> impl Iterator<Item = FlatNote> + '_ {
        let mut entries = Vec::new();
        self.kind.flatten(self.measure_position, &mut entries);
        entries
            .into_iter()
            .map(move |(position, duration, kind, label)| FlatNote {
                uplink,
                position,
                duration,
                kind,
                label,
                input_line: self.input_line,
                solo: SoloStatus::NotSolo,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatNoteKind {
    Note,
    Chord,
    Rest,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoloStatus {
    #[default]
    NotSolo,
    SoloNote,
    SoloRest,
}

/// Entry of the measure's flat notes list, used for cross-voice slicing.
#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq)]
pub struct FlatNote {
    #[derivative(PartialEq = "ignore")]
    pub uplink: MeasureUplink,
    pub position: MeasurePosition,
    pub duration: WholeNotes,
    pub kind: FlatNoteKind,
    pub label: String,
    pub input_line: u32,
    pub solo: SoloStatus,
}
impl FlatNote {
    pub fn end_position(&self) -> MeasurePosition {
        self.position + self.duration
    }
    pub fn measure(&self) -> MeasureId {
        self.uplink.measure
    }
}
