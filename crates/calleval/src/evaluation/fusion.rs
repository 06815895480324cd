use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::{MetricDefinition, Polarity};
use super::phase::CallPhase;
use super::predictions::ClassifierSource;
use super::rules::pattern_vote;

/// Detector behind a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    Pattern,
    TextClassifier,
    AudioClassifier,
}

impl From<ClassifierSource> for EvidenceSource {
    fn from(value: ClassifierSource) -> Self {
        match value {
            ClassifierSource::TextClassifier => Self::TextClassifier,
            ClassifierSource::AudioClassifier => Self::AudioClassifier,
        }
    }
}

/// A detector's binary opinion; `None` means it had nothing to say.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvidenceVote {
    pub source: EvidenceSource,
    pub value: Option<f64>,
}

/// Normalized classifier confidences for one metric on one segment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassifierScores {
    pub text: Option<f64>,
    pub audio: Option<f64>,
}

/// Fused outcome for one metric on one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentAssessment {
    pub verdict: f64,
    pub votes: Vec<EvidenceVote>,
    pub matched_rule: Option<String>,
    /// No detector voted; the verdict is the fail-safe 0.
    pub no_evidence: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentVerdict {
    /// The metric is not scored in this phase. Contributes nothing, unlike a 0 verdict.
    NotApplicable,
    Assessed(SegmentAssessment),
}

impl SegmentVerdict {
    pub fn verdict(&self) -> Option<f64> {
        match self {
            SegmentVerdict::NotApplicable => None,
            SegmentVerdict::Assessed(assessment) => Some(assessment.verdict),
        }
    }
}

/// Fuses pattern, text-classifier and audio-classifier opinions for a single segment.
pub fn evaluate(
    metric: &MetricDefinition,
    segment_text: &str,
    phase: CallPhase,
    scores: ClassifierScores,
) -> SegmentVerdict {
    if !metric.applies_to(phase) {
        return SegmentVerdict::NotApplicable;
    }

    let pattern = pattern_vote(&metric.rules, metric.polarity, segment_text);
    let votes = vec![
        EvidenceVote {
            source: EvidenceSource::Pattern,
            value: pattern.value,
        },
        EvidenceVote {
            source: EvidenceSource::TextClassifier,
            value: scores.text.map(|score| binarize(score, metric.threshold)),
        },
        EvidenceVote {
            source: EvidenceSource::AudioClassifier,
            value: scores.audio.map(|score| binarize(score, metric.threshold)),
        },
    ];

    let fused = fuse(metric.polarity, &votes);
    debug!(
        metric = %metric.name,
        ?phase,
        verdict = ?fused,
        matched = pattern.matched.as_deref().unwrap_or("-"),
        "fused segment evidence"
    );

    SegmentVerdict::Assessed(SegmentAssessment {
        verdict: fused.unwrap_or(0.0),
        votes,
        matched_rule: pattern.matched,
        no_evidence: fused.is_none(),
    })
}

/// Combines present votes: any source suffices for normal metrics, every source must agree for
/// inverse ones. `None` when no source voted.
pub fn fuse(polarity: Polarity, votes: &[EvidenceVote]) -> Option<f64> {
    let present = votes.iter().filter_map(|vote| vote.value);
    match polarity {
        Polarity::Normal => present.reduce(f64::max),
        Polarity::Inverse => present.reduce(f64::min),
    }
}

pub(crate) fn binarize(score: f64, threshold: f64) -> f64 {
    if score >= threshold {
        1.0
    } else {
        0.0
    }
}
