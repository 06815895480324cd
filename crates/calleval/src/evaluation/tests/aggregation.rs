use super::common::*;
use crate::evaluation::{
    aggregate, aggregate_with, evaluate_segment, CallPhase, ClassifierSource, EvaluationEngine,
    ExternalPredictions, MetricCatalog,
};
use crate::transcript::{CallTranscript, SpeakerId};

fn verdict_of(aggregation: &crate::evaluation::Aggregation, metric: &str) -> f64 {
    aggregation
        .metrics
        .iter()
        .find(|result| result.name == metric)
        .map(|result| result.verdict)
        .expect("metric aggregated")
}

#[test]
fn only_primary_speaker_segments_are_scanned() {
    let catalog = standard_catalog();
    let transcript = five_minute_call(vec![
        caller("Good morning, thanks for calling back.", 0.0),
        agent("Let me check.", 60.0),
    ]);

    let aggregation = aggregate(
        &transcript.segments,
        transcript.primary_speaker.as_ref(),
        transcript.total_duration(),
        &catalog,
        &ExternalPredictions::default(),
    );

    assert_eq!(aggregation.segments_evaluated, 1);
    assert_eq!(verdict_of(&aggregation, "professional_greeting"), 0.0);
    assert_eq!(verdict_of(&aggregation, "sounds_polite_courteous"), 0.0);
}

#[test]
fn one_filler_anywhere_fails_the_inverse_metric() {
    let catalog = standard_catalog();
    let transcript = five_minute_call(vec![
        agent("Let me check that for you.", 60.0),
        caller("Sure.", 65.0),
        agent("Um, one moment.", 120.0),
        agent("Okay, I found it.", 150.0),
    ]);

    let aggregation = aggregate(
        &transcript.segments,
        transcript.primary_speaker.as_ref(),
        transcript.total_duration(),
        &catalog,
        &ExternalPredictions::default(),
    );

    let fillers = aggregation
        .metrics
        .iter()
        .find(|result| result.name == "no_fillers_stammers")
        .expect("metric aggregated");
    assert_eq!(fillers.verdict, 0.0);
    assert_eq!(fillers.evidence.segment_index, Some(2));
    assert_eq!(fillers.evidence.phase, Some(CallPhase::Middle));
    assert_eq!(fillers.evidence.segments_assessed, 3);
    assert!(fillers.evidence.matched_rule.is_some());
}

#[test]
fn normal_metrics_keep_the_first_segment_that_demonstrates_them() {
    let catalog = standard_catalog();
    let transcript = five_minute_call(vec![
        agent("Let me check.", 60.0),
        agent("Can I get your date of birth?", 90.0),
        agent("And your full name, please?", 120.0),
    ]);

    let aggregation = aggregate(
        &transcript.segments,
        transcript.primary_speaker.as_ref(),
        transcript.total_duration(),
        &catalog,
        &ExternalPredictions::default(),
    );

    let verification = aggregation
        .metrics
        .iter()
        .find(|result| result.name == "patient_verification")
        .expect("metric aggregated");
    assert_eq!(verification.verdict, 1.0);
    assert_eq!(verification.evidence.segment_index, Some(1));
}

#[test]
fn or_group_canonical_member_is_credited_by_peer() {
    let catalog = standard_catalog();
    let transcript = five_minute_call(vec![agent("I'm so sorry to hear that.", 90.0)]);

    let aggregation = aggregate(
        &transcript.segments,
        transcript.primary_speaker.as_ref(),
        transcript.total_duration(),
        &catalog,
        &ExternalPredictions::default(),
    );

    let listening = aggregation
        .metrics
        .iter()
        .find(|result| result.name == "active_listening")
        .expect("metric aggregated");
    assert_eq!(listening.verdict, 0.0);
    assert_eq!(listening.credited, 1.0);
    assert_eq!(listening.credited_by.as_deref(), Some("handled_with_care"));
    assert_eq!(verdict_of(&aggregation, "handled_with_care"), 1.0);
}

#[test]
fn per_segment_predictions_feed_their_own_segment() {
    let catalog = classifier_only_catalog();
    let transcript = five_minute_call(vec![agent("first", 10.0), agent("second", 100.0)]);
    let predictions = ExternalPredictions::default()
        .with_call(ClassifierSource::TextClassifier, "empathy", 0.9)
        .with_segment(0, ClassifierSource::TextClassifier, "empathy", 0.1);

    let aggregation = aggregate(
        &transcript.segments,
        transcript.primary_speaker.as_ref(),
        transcript.total_duration(),
        &catalog,
        &predictions,
    );

    let empathy = &aggregation.metrics[0];
    assert_eq!(empathy.verdict, 1.0);
    assert_eq!(empathy.evidence.segment_index, Some(1));
    assert!(!empathy.evidence.no_evidence);
}

#[test]
fn single_classifier_is_enough_but_silence_scores_zero() {
    let engine = EvaluationEngine::new(classifier_only_catalog());
    let transcript = five_minute_call(vec![agent("hello", 10.0)]);

    let audio_only = ExternalPredictions::default().with_call(
        ClassifierSource::AudioClassifier,
        "empathy",
        0.8,
    );
    let scored = engine.evaluate(&transcript, &audio_only);
    assert_eq!(scored.total_score, 10.0);

    let silent = engine.evaluate(&transcript, &ExternalPredictions::default());
    assert_eq!(silent.total_score, 0.0);
    assert!(silent.metrics["empathy"].evidence.no_evidence);
}

#[test]
fn custom_phase_classifier_controls_applicability() {
    let catalog = standard_catalog();
    let transcript = five_minute_call(vec![agent("Good morning, this is Dana.", 0.0)]);

    let aggregation = aggregate_with(
        &transcript.segments,
        transcript.primary_speaker.as_ref(),
        transcript.total_duration(),
        &catalog,
        &ExternalPredictions::default(),
        |_, _| CallPhase::Middle,
        evaluate_segment,
    );

    assert_eq!(verdict_of(&aggregation, "professional_greeting"), 0.0);
    assert_eq!(verdict_of(&aggregation, "no_fillers_stammers"), 1.0);
}

#[test]
fn missing_primary_speaker_falls_back_to_most_talkative() {
    let engine = engine();
    let mut transcript = full_marks_call();
    transcript.primary_speaker = None;

    let scorecard = engine.evaluate(&transcript, &ExternalPredictions::default());

    assert_eq!(scorecard.primary_speaker, Some(SpeakerId::new(AGENT)));
    assert_eq!(scorecard.segments_evaluated, 6);
}

#[test]
fn empty_transcript_produces_all_zero_scorecard() {
    let scorecard = engine().evaluate(&CallTranscript::default(), &ExternalPredictions::default());

    assert_eq!(scorecard.total_score, 0.0);
    assert_eq!(scorecard.percentage, 0.0);
    assert_eq!(scorecard.segments_evaluated, 0);
    assert_eq!(scorecard.primary_speaker, None);
    assert_eq!(scorecard.metrics.len(), 13);
    assert!(scorecard.metrics.values().all(|verdict| !verdict.detected));
}

#[test]
fn silent_segments_do_not_fail_an_inverse_metric() {
    let catalog = MetricCatalog::from_toml_str(
        r#"
version = "test"
max_score = 10.0

[[metrics]]
name = "no_fillers"
weight = 10.0
phases = ["all"]
polarity = "inverse"
"#,
    )
    .expect("rule-less inverse catalog is valid");
    let transcript = five_minute_call(vec![agent("Let me check.", 60.0), agent("Okay.", 120.0)]);
    let predictions = ExternalPredictions::default().with_segment(
        0,
        ClassifierSource::TextClassifier,
        "no_fillers",
        0.95,
    );

    let aggregation = aggregate(
        &transcript.segments,
        transcript.primary_speaker.as_ref(),
        transcript.total_duration(),
        &catalog,
        &predictions,
    );

    let fillers = &aggregation.metrics[0];
    assert_eq!(fillers.verdict, 1.0);
    assert_eq!(fillers.evidence.segment_index, Some(0));
    assert_eq!(fillers.evidence.segments_assessed, 2);
    assert!(!fillers.evidence.no_evidence);

    let scorecard = EvaluationEngine::new(catalog).evaluate(&transcript, &predictions);
    assert_eq!(scorecard.total_score, 10.0);
}
