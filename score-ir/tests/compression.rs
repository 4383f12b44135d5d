use score_ir::dom::{EndingKind, ReplicaExpansion, Voice, VoiceElement};
use score_ir::primitives::{
    MeasureElement, TimeSignature, VoiceId, WholeNotes,
};
use score_ir::visitor::{Expansion, FlatViewVisitor};
use score_ir::{IrError, IrOptions};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn voice(compress: bool) -> Voice {
    Voice::new(VoiceId(1), TimeSignature::default()).with_options(IrOptions {
        compress_full_bar_rests: compress,
        ..Default::default()
    })
}

fn purist_numbers(voice: &Voice) -> Vec<Option<u32>> {
    voice
        .measures_flat()
        .iter()
        .map(|m| m.purist_number())
        .collect()
}

fn bar(voice: &mut Voice, number: usize, pitch: Option<&str>) {
    let whole = WholeNotes::from_integer(1);
    voice
        .start_measure(number.to_string())
        .expect("Can not start measure");
    let element = match pitch {
        Some(pitch) => MeasureElement::note(pitch, whole),
        None => MeasureElement::rest(whole),
    };
    voice.append(element).expect("Can not append element");
}

#[test]
fn empty_multiple_rest() {
    init();
    let mut voice = voice(false);
    voice.start_multiple_rest(5).unwrap();
    assert!(matches!(
        voice.end_multiple_rest(),
        Err(IrError::EmptyCompressedRun(_))
    ));
}

#[test]
fn declared_multiple_rest_closes_itself() {
    init();
    let mut voice = voice(false);
    bar(&mut voice, 1, Some("c'"));
    voice.start_multiple_rest(3).unwrap();
    for number in 2..=4 {
        bar(&mut voice, number, None);
    }
    bar(&mut voice, 5, Some("g'"));
    voice.finalize_voice().unwrap();

    assert_eq!(voice.initial_elements().len(), 3);
    match &voice.initial_elements()[1] {
        VoiceElement::MultipleMeasureRest(rest) => {
            assert_eq!(rest.measures_count(), 3);
            assert_eq!(rest.declared_count(), Some(3));
            assert_eq!(rest.duration(), WholeNotes::from_integer(3));
        }
        other => panic!("expected multiple rest, got {:?}", other),
    }
    assert_eq!(
        voice
            .measures_flat()
            .iter()
            .map(|m| m.purist_number())
            .collect::<Vec<_>>(),
        (1..=5).map(Some).collect::<Vec<_>>()
    );
}

#[test]
fn rest_runs_compressed_on_finalize() {
    init();
    let mut voice = voice(true);
    bar(&mut voice, 1, Some("c'"));
    for number in 2..=4 {
        bar(&mut voice, number, None);
    }
    bar(&mut voice, 5, Some("d'"));
    bar(&mut voice, 6, None);
    bar(&mut voice, 7, Some("e'"));
    voice.finalize_voice().unwrap();

    assert!(matches!(
        voice.initial_elements(),
        [
            VoiceElement::Segment(_),
            VoiceElement::MultipleMeasureRest(_),
            VoiceElement::Segment(_)
        ]
    ));
    assert_eq!(voice.measures_flat().len(), 7);
    assert_eq!(voice.slices().len(), 7);
    assert_eq!(
        FlatViewVisitor::render(&voice),
        [
            "1 [1] regular: c':1",
            "R x3",
            "5 [5] regular: d':1",
            "6 [6] rest: R:1",
            "7 [7] regular: e':1",
        ]
        .join("\n")
    );
}

#[test]
fn measure_repeat_of_two_measures() {
    init();
    let mut voice = voice(false);
    bar(&mut voice, 1, Some("c'"));
    bar(&mut voice, 2, Some("d'"));
    voice.start_measure("3").unwrap();
    voice.start_measure_repeat(2, 0).unwrap();
    voice
        .append(MeasureElement::note("c'", WholeNotes::from_integer(1)))
        .unwrap();
    bar(&mut voice, 4, Some("d'"));
    voice.end_measure_repeat().unwrap();
    bar(&mut voice, 5, Some("e'"));
    voice.finalize_voice().unwrap();

    match &voice.initial_elements()[0] {
        VoiceElement::MeasureRepeat(repeat) => {
            assert_eq!(repeat.measures_number(), 2);
            assert_eq!(repeat.replicas_number(), 1);
            let pattern = repeat.measures(ReplicaExpansion::PatternOnly);
            assert_eq!(pattern.len(), 2);
            assert_eq!(repeat.measures(ReplicaExpansion::Full).len(), 4);
        }
        other => panic!("expected measure repeat, got {:?}", other),
    }
    assert_eq!(voice.measures_flat().len(), 5);

    let mut plain = Voice::new(VoiceId(2), TimeSignature::default());
    let pitches = ["c'", "d'", "c'", "d'", "e'"];
    for (idx, pitch) in pitches.into_iter().enumerate() {
        bar(&mut plain, idx + 1, Some(pitch));
    }
    plain.finalize_voice().unwrap();
    assert_eq!(purist_numbers(&voice), purist_numbers(&plain));
    assert_eq!(purist_numbers(&voice), (1..=5).map(Some).collect::<Vec<_>>());

    let mut view = FlatViewVisitor::default();
    voice.browse_with(
        &mut view,
        Expansion {
            multiple_rests: false,
            replicas: ReplicaExpansion::PatternOnly,
        },
    );
    assert_eq!(view.lines().len(), 4);
    assert_eq!(view.lines()[0], "% x1 of 2");
}

#[test]
fn measure_repeat_without_enough_measures() {
    init();
    let mut voice = voice(false);
    bar(&mut voice, 1, Some("c'"));
    assert!(matches!(
        voice.start_measure_repeat(2, 0),
        Err(IrError::MalformedMeasureRepeat(_))
    ));
    voice.finalize_voice().unwrap();
    assert!(matches!(
        voice.initial_elements(),
        [VoiceElement::Segment(_)]
    ));
}

#[test]
fn measure_repeat_without_replicas_restores_pattern() {
    init();
    let mut voice = voice(false);
    bar(&mut voice, 1, Some("c'"));
    voice.start_measure_repeat(1, 0).unwrap();
    assert!(matches!(
        voice.end_measure_repeat(),
        Err(IrError::EmptyCompressedRun(_))
    ));
    voice.finalize_voice().unwrap();
    assert_eq!(voice.measures_flat().len(), 1);
    assert!(matches!(
        voice.initial_elements(),
        [VoiceElement::Segment(_)]
    ));
}

#[test]
fn multiple_rest_ends_before_music() {
    init();
    let mut voice = voice(false);
    voice.start_measure("1").unwrap();
    voice.start_multiple_rest(3).unwrap();
    voice
        .append(MeasureElement::rest(WholeNotes::from_integer(1)))
        .unwrap();
    bar(&mut voice, 2, Some("c'"));
    bar(&mut voice, 3, Some("d'"));
    bar(&mut voice, 4, Some("e'"));
    voice.finalize_voice().unwrap();

    match voice.initial_elements() {
        [
            VoiceElement::MultipleMeasureRest(rest),
            VoiceElement::Segment(music),
        ] => {
            assert_eq!(rest.measures_count(), 1);
            assert_eq!(rest.declared_count(), Some(3));
            assert_eq!(music.len(), 3);
            assert_eq!(music.measures()[0].number(), "2");
        }
        other => panic!("unexpected structure: {:?}", other),
    }
    assert_eq!(purist_numbers(&voice), (1..=4).map(Some).collect::<Vec<_>>());
    assert!(voice.diagnostics().is_empty());
}

#[test]
fn multiple_rest_without_rests() {
    init();
    let mut voice = voice(false);
    voice.start_multiple_rest(2).unwrap();
    bar(&mut voice, 1, Some("c'"));
    assert!(matches!(
        voice.end_multiple_rest(),
        Err(IrError::EmptyCompressedRun(_))
    ));
    bar(&mut voice, 2, Some("d'"));
    voice.finalize_voice().unwrap();

    match voice.initial_elements() {
        [VoiceElement::Segment(music)] => assert_eq!(music.len(), 2),
        other => panic!("unexpected structure: {:?}", other),
    }
    assert_eq!(voice.diagnostics().len(), 1);
}

#[test]
fn multiple_rest_inside_ending() {
    init();
    let mut voice = voice(false);
    voice.start_repeat().unwrap();
    bar(&mut voice, 1, Some("c'"));
    voice.start_ending(vec![1], EndingKind::Hooked).unwrap();
    voice.start_multiple_rest(2).unwrap();
    bar(&mut voice, 2, None);
    bar(&mut voice, 3, None);
    voice.end_ending().unwrap();
    voice.start_ending(vec![2], EndingKind::Hookless).unwrap();
    bar(&mut voice, 4, Some("g'"));
    voice.end_ending().unwrap();
    voice.finalize_voice().unwrap();

    let repeat = match voice.initial_elements() {
        [VoiceElement::Repeat(repeat)] => repeat,
        other => panic!("unexpected structure: {:?}", other),
    };
    match repeat.endings()[0].elements() {
        [VoiceElement::MultipleMeasureRest(rest)] => {
            assert_eq!(rest.measures_count(), 2);
        }
        other => panic!("unexpected ending: {:?}", other),
    }
    assert_eq!(purist_numbers(&voice), (1..=4).map(Some).collect::<Vec<_>>());
    assert!(voice.diagnostics().is_empty());
}
