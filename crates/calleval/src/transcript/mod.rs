//! Transcript shapes produced by the upstream transcription service, plus the small helpers the
//! evaluator and the CLI need around them.

mod redaction;

pub use redaction::{censor_segments, censor_text};

use serde::{Deserialize, Serialize};

/// Diarization label assigned by the transcription service (e.g. `SPEAKER_00`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeakerId(pub String);

impl SpeakerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn unknown_speaker() -> SpeakerId {
    SpeakerId::new("UNKNOWN")
}

/// One timestamped, speaker-attributed utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(alias = "speaker", default = "unknown_speaker")]
    pub speaker_id: SpeakerId,
    #[serde(default)]
    pub text: String,
    #[serde(alias = "start")]
    pub start_seconds: f64,
    #[serde(alias = "end")]
    pub end_seconds: f64,
}

impl Segment {
    pub fn new(speaker: &str, text: &str, start_seconds: f64, end_seconds: f64) -> Self {
        Self {
            speaker_id: SpeakerId::new(speaker),
            text: text.to_string(),
            start_seconds,
            end_seconds,
        }
    }
}

/// A completed call as handed over for evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallTranscript {
    #[serde(default)]
    pub call_id: Option<String>,
    pub segments: Vec<Segment>,
    /// Speaker whose behavior is scored, when the role assignment is already known.
    #[serde(default, alias = "agent_speaker")]
    pub primary_speaker: Option<SpeakerId>,
    #[serde(default, alias = "duration")]
    pub duration_seconds: Option<f64>,
}

impl CallTranscript {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            ..Self::default()
        }
    }

    pub fn total_duration(&self) -> f64 {
        self.duration_seconds
            .unwrap_or_else(|| call_duration(&self.segments))
    }

    /// Declared primary speaker, falling back to the most talkative one.
    pub fn resolve_primary_speaker(&self) -> Option<SpeakerId> {
        self.primary_speaker
            .clone()
            .or_else(|| primary_speaker(&self.segments))
    }
}

/// Picks the speaker with the most segments; ties go to whoever spoke first.
pub fn primary_speaker(segments: &[Segment]) -> Option<SpeakerId> {
    let mut counts: Vec<(&SpeakerId, usize)> = Vec::new();
    for segment in segments {
        match counts
            .iter_mut()
            .find(|(speaker, _)| *speaker == &segment.speaker_id)
        {
            Some((_, count)) => *count += 1,
            None => counts.push((&segment.speaker_id, 1)),
        }
    }

    let mut best: Option<(&SpeakerId, usize)> = None;
    for (speaker, count) in counts {
        if best.map(|(_, top)| count > top).unwrap_or(true) {
            best = Some((speaker, count));
        }
    }
    best.map(|(speaker, _)| speaker.clone())
}

/// Call length in seconds, taken from the latest segment end.
pub fn call_duration(segments: &[Segment]) -> f64 {
    segments
        .iter()
        .map(|segment| segment.end_seconds)
        .filter(|end| end.is_finite())
        .fold(0.0, f64::max)
}

/// Renders whole seconds as `m:ss`.
pub fn format_duration(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };
    format!("{}:{:02}", whole / 60, whole % 60)
}
