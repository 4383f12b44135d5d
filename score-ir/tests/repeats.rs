use score_ir::dom::{EndingKind, Repeat, Voice, VoiceElement};
use score_ir::primitives::{
    IncompleteKind, MeasureElement, MeasureKind, TimeSignature, VoiceId,
    WholeNotes,
};
use score_ir::visitor::FlatViewVisitor;
use score_ir::{IrError, IrOptions};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn voice() -> Voice {
    Voice::new(VoiceId(1), TimeSignature::default())
}

fn bar(voice: &mut Voice, number: &str, pitch: &str) {
    voice.start_measure(number).expect("Can not start measure");
    voice
        .append(MeasureElement::note(pitch, WholeNotes::from_integer(1)))
        .expect("Can not append note");
}

fn repeat_at(voice: &Voice, idx: usize) -> &Repeat {
    match &voice.initial_elements()[idx] {
        VoiceElement::Repeat(repeat) => repeat,
        other => panic!("expected repeat, got {:?}", other),
    }
}

fn malformed_repeats(voice: &Voice) -> usize {
    voice
        .diagnostics()
        .iter()
        .filter(|e| matches!(e, IrError::MalformedRepeat { .. }))
        .count()
}

#[test]
fn repeat_with_two_endings() {
    init();
    let mut voice = voice();
    voice.start_repeat().unwrap();
    bar(&mut voice, "1", "c'");
    bar(&mut voice, "2", "d'");
    voice.start_ending(vec![1], EndingKind::Hooked).unwrap();
    bar(&mut voice, "3", "e'");
    voice.end_ending().unwrap();
    voice.start_ending(vec![2], EndingKind::Hookless).unwrap();
    bar(&mut voice, "4", "f'");
    voice.end_ending().unwrap();
    assert!(voice.repeat_phases().is_empty());
    voice.finalize_voice().unwrap();

    assert_eq!(voice.initial_elements().len(), 1);
    let repeat = repeat_at(&voice, 0);
    assert!(!repeat.is_start_inferred());
    assert_eq!(repeat.common_part()[0].measures().len(), 2);
    assert_eq!(repeat.endings().len(), 2);
    assert_eq!(repeat.endings()[0].numbers(), &[1]);
    assert_eq!(repeat.endings()[0].kind(), EndingKind::Hooked);
    assert_eq!(repeat.endings()[1].kind(), EndingKind::Hookless);
    assert_eq!(
        voice
            .measures_flat()
            .iter()
            .map(|m| m.purist_number())
            .collect::<Vec<_>>(),
        vec![Some(1), Some(2), Some(3), Some(4)]
    );
    assert!(voice.diagnostics().is_empty());
}

#[test]
fn ending_closed_by_repeat_end() {
    init();
    let mut voice = voice();
    voice.start_repeat().unwrap();
    bar(&mut voice, "1", "c'");
    voice.start_ending(vec![1, 2], EndingKind::Hooked).unwrap();
    bar(&mut voice, "2", "d'");
    voice.end_repeat(Some(3)).unwrap();
    voice.end_ending().unwrap();
    voice.start_ending(vec![3], EndingKind::Hookless).unwrap();
    bar(&mut voice, "3", "e'");
    voice.end_ending().unwrap();
    voice.finalize_voice().unwrap();

    let repeat = repeat_at(&voice, 0);
    assert_eq!(repeat.times(), Some(3));
    assert_eq!(repeat.endings().len(), 2);
    assert_eq!(repeat.endings()[0].numbers_label(), "1,2");
    assert!(voice.diagnostics().is_empty());
}

#[test]
fn simple_repeat_between_segments() {
    init();
    let mut voice = voice();
    bar(&mut voice, "1", "c'");
    voice.start_repeat().unwrap();
    bar(&mut voice, "2", "d'");
    bar(&mut voice, "3", "e'");
    voice.end_repeat(Some(3)).unwrap();
    bar(&mut voice, "4", "f'");
    voice.finalize_voice().unwrap();

    assert_eq!(voice.initial_elements().len(), 3);
    assert!(repeat_at(&voice, 1).endings().is_empty());
    assert_eq!(
        FlatViewVisitor::render(&voice),
        [
            "1 [1] regular: c':1",
            "|:",
            "2 [2] regular: d':1",
            "3 [3] regular: e':1",
            ":| x3",
            "4 [4] regular: f':1",
        ]
        .join("\n")
    );
}

#[test]
fn repeat_start_inferred_from_end() {
    init();
    let mut voice = voice();
    bar(&mut voice, "1", "c'");
    bar(&mut voice, "2", "d'");
    voice.end_repeat(None).unwrap();
    bar(&mut voice, "3", "e'");
    voice.finalize_voice().unwrap();

    assert_eq!(voice.initial_elements().len(), 2);
    let repeat = repeat_at(&voice, 0);
    assert!(repeat.is_start_inferred());
    assert_eq!(repeat.common_part()[0].measures().len(), 2);
    assert_eq!(malformed_repeats(&voice), 1);
}

#[test]
fn ending_without_repeat_start() {
    init();
    let mut voice = voice();
    bar(&mut voice, "1", "c'");
    voice.start_ending(vec![1], EndingKind::Hooked).unwrap();
    bar(&mut voice, "2", "d'");
    voice.end_ending().unwrap();
    voice.start_ending(vec![2], EndingKind::Hookless).unwrap();
    bar(&mut voice, "3", "e'");
    voice.end_ending().unwrap();
    voice.finalize_voice().unwrap();

    let repeat = repeat_at(&voice, 0);
    assert!(repeat.is_start_inferred());
    assert_eq!(repeat.endings().len(), 2);
    assert_eq!(malformed_repeats(&voice), 1);
}

#[test]
fn repeat_end_without_anything_to_repeat() {
    init();
    let mut voice = voice();
    assert!(matches!(
        voice.end_repeat(None),
        Err(IrError::MalformedRepeat { .. })
    ));

    let mut strict = Voice::new(VoiceId(2), TimeSignature::default())
        .with_options(IrOptions {
            infer_repeat_starts: false,
            ..Default::default()
        });
    bar(&mut strict, "1", "c'");
    assert!(strict.end_repeat(None).is_err());
    strict.finalize_voice().unwrap();
    assert!(matches!(
        strict.initial_elements(),
        [VoiceElement::Segment(_)]
    ));
}

#[test]
fn end_ending_without_ending() {
    init();
    let mut voice = voice();
    bar(&mut voice, "1", "c'");
    assert!(matches!(
        voice.end_ending(),
        Err(IrError::MalformedRepeat { .. })
    ));
    assert_eq!(voice.current_segment().len(), 1);
}

#[test]
fn repeat_end_splits_measure() {
    init();
    let half = WholeNotes::new(1, 2).unwrap();
    let mut voice = voice();
    bar(&mut voice, "1", "c'");
    voice.start_repeat().unwrap();
    voice.start_measure("2").unwrap();
    voice.append(MeasureElement::note("d'", half)).unwrap();
    voice.end_repeat(None).unwrap();
    voice.start_measure("2").unwrap();
    voice.append(MeasureElement::note("e'", half)).unwrap();
    bar(&mut voice, "3", "f'");
    voice.finalize_voice().unwrap();

    let measures = voice.measures_flat();
    assert_eq!(
        measures[1].kind(),
        Some(MeasureKind::Incomplete(IncompleteKind::LastInCommonPart))
    );
    assert_eq!(
        measures[2].kind(),
        Some(MeasureKind::Incomplete(IncompleteKind::NextAfterCommonPart))
    );
    assert_eq!(measures[1].purist_number(), Some(2));
    assert_eq!(measures[2].purist_number(), Some(2));
    assert_eq!(measures[3].purist_number(), Some(3));
}

#[test]
fn fresh_measure_moves_into_repeat() {
    init();
    let mut voice = voice();
    bar(&mut voice, "1", "c'");
    voice.start_measure("2").unwrap();
    voice.start_repeat().unwrap();
    voice
        .append(MeasureElement::note("d'", WholeNotes::from_integer(1)))
        .unwrap();
    voice.end_repeat(None).unwrap();
    voice.finalize_voice().unwrap();

    assert!(matches!(
        voice.initial_elements(),
        [VoiceElement::Segment(_), VoiceElement::Repeat(_)]
    ));
    let repeated = repeat_at(&voice, 1).common_part()[0].measures();
    assert_eq!(repeated[0].number(), "2");
    assert!(repeated[0].is_first_in_segment());
}

#[test]
fn unterminated_repeat_is_ordinary_music() {
    init();
    let mut voice = voice();
    voice.start_repeat().unwrap();
    bar(&mut voice, "1", "c'");
    bar(&mut voice, "2", "d'");
    voice.finalize_voice().unwrap();

    assert!(voice.repeat_phases().is_empty());
    assert!(matches!(
        voice.initial_elements(),
        [VoiceElement::Segment(_)]
    ));
    assert_eq!(voice.measures_flat().len(), 2);
    assert_eq!(malformed_repeats(&voice), 1);
}

#[test]
fn nested_repeats() {
    init();
    let mut voice = voice();
    voice.start_repeat().unwrap();
    bar(&mut voice, "1", "c'");
    voice.start_repeat().unwrap();
    bar(&mut voice, "2", "d'");
    voice.end_repeat(None).unwrap();
    assert_eq!(voice.repeat_phases().len(), 1);
    bar(&mut voice, "3", "e'");
    voice.end_repeat(Some(2)).unwrap();
    voice.finalize_voice().unwrap();

    let outer = repeat_at(&voice, 0);
    assert_eq!(outer.times(), Some(2));
    assert!(matches!(
        outer.common_part(),
        [
            VoiceElement::Segment(_),
            VoiceElement::Repeat(_),
            VoiceElement::Segment(_)
        ]
    ));
    assert_eq!(voice.measures_flat().len(), 3);
    assert!(voice.diagnostics().is_empty());
}

#[test]
fn ending_open_at_voice_end() {
    init();
    let mut voice = voice();
    voice.start_repeat().unwrap();
    bar(&mut voice, "1", "c'");
    voice.start_ending(vec![1], EndingKind::Hooked).unwrap();
    voice.start_measure("2").unwrap();
    voice
        .append(MeasureElement::note("d'", WholeNotes::new(1, 2).unwrap()))
        .unwrap();
    voice.finalize_voice().unwrap();

    let repeat = repeat_at(&voice, 0);
    assert_eq!(repeat.endings().len(), 1);
    assert_eq!(
        voice.measures_flat()[1].kind(),
        Some(MeasureKind::Incomplete(IncompleteKind::LastInHookedEnding))
    );
    assert_eq!(malformed_repeats(&voice), 1);
}
