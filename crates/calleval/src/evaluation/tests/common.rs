use crate::evaluation::{EvaluationEngine, MetricCatalog};
use crate::transcript::{CallTranscript, Segment, SpeakerId};

pub(super) const AGENT: &str = "SPEAKER_00";
pub(super) const CALLER: &str = "SPEAKER_01";

pub(super) fn standard_catalog() -> MetricCatalog {
    MetricCatalog::standard().expect("standard catalog is valid")
}

pub(super) fn engine() -> EvaluationEngine {
    EvaluationEngine::new(standard_catalog())
}

pub(super) fn agent(text: &str, start: f64) -> Segment {
    Segment::new(AGENT, text, start, start + 5.0)
}

pub(super) fn caller(text: &str, start: f64) -> Segment {
    Segment::new(CALLER, text, start, start + 5.0)
}

/// Five-minute call: opening ends at 30s, closing starts at 270s.
pub(super) fn five_minute_call(segments: Vec<Segment>) -> CallTranscript {
    CallTranscript {
        call_id: Some("call-0001".to_string()),
        segments,
        primary_speaker: Some(SpeakerId::new(AGENT)),
        duration_seconds: Some(300.0),
    }
}

/// An agent that hits every behavior on the standard scorecard.
pub(super) fn full_marks_call() -> CallTranscript {
    five_minute_call(vec![
        agent(
            "Good morning, thank you for calling Sunrise Family Practice, this is Dana. Am I speaking with the patient?",
            0.0,
        ),
        caller("Yes, I need to book a follow-up.", 8.0),
        agent(
            "I'd be happy to help. Can you please verify your full name and date of birth?",
            60.0,
        ),
        caller("Maria Lopez, March 3rd 1980. I've been having headaches.", 70.0),
        agent("I understand, and I'm sorry to hear that.", 90.0),
        agent("May I put you on a brief hold while I check the schedule?", 120.0),
        agent(
            "Thank you for holding. To recap, you are booked for Tuesday at 10:30 am.",
            180.0,
        ),
        agent(
            "Is there anything else I can help you with? Have a great day!",
            280.0,
        ),
    ])
}

/// Single rule-less metric so classifier votes are the only evidence.
pub(super) fn classifier_only_catalog() -> MetricCatalog {
    MetricCatalog::from_toml_str(
        r#"
version = "test"
max_score = 10.0

[[metrics]]
name = "empathy"
weight = 10.0
threshold = 0.6
phases = ["all"]
"#,
    )
    .expect("classifier-only catalog is valid")
}
