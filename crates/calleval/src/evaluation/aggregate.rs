use serde::{Deserialize, Serialize};

use super::catalog::{MetricCatalog, MetricDefinition, Polarity};
use super::fusion::{self, ClassifierScores, EvidenceVote, SegmentVerdict};
use super::phase::{self, CallPhase};
use super::predictions::{ClassifierSource, ExternalPredictions};
use crate::transcript::{Segment, SpeakerId};

/// Audit trail for a metric: the segment that settled its call-level verdict.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricEvidence {
    /// Index of the segment in the full transcript.
    pub segment_index: Option<usize>,
    pub phase: Option<CallPhase>,
    pub matched_rule: Option<String>,
    pub votes: Vec<EvidenceVote>,
    /// Applicable segments that were assessed for this metric.
    pub segments_assessed: usize,
    /// True when no detector voted on any applicable segment.
    pub no_evidence: bool,
}

/// Call-level outcome for one metric after the segment scan.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedMetric {
    pub name: String,
    /// The metric's own verdict.
    pub verdict: f64,
    /// Verdict credited toward the score; for an OR-group's canonical member this is the group's.
    pub credited: f64,
    /// Peer that satisfied the group when the canonical member itself was not detected.
    pub credited_by: Option<String>,
    pub evidence: MetricEvidence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub primary_speaker: Option<SpeakerId>,
    pub segments_evaluated: usize,
    /// Catalog order.
    pub metrics: Vec<AggregatedMetric>,
}

#[derive(Default)]
struct RunningVerdict {
    value: Option<f64>,
    evidence: MetricEvidence,
    any_vote: bool,
}

impl RunningVerdict {
    /// Max across segments for normal metrics, min for inverse ones.
    fn improves(&self, polarity: Polarity, candidate: f64) -> bool {
        match (self.value, polarity) {
            (None, _) => true,
            (Some(current), Polarity::Normal) => candidate > current,
            (Some(current), Polarity::Inverse) => candidate < current,
        }
    }
}

/// Scans the primary speaker's segments with the standard phase classifier and fusion rule.
pub fn aggregate(
    segments: &[Segment],
    primary_speaker: Option<&SpeakerId>,
    total_duration: f64,
    catalog: &MetricCatalog,
    predictions: &ExternalPredictions,
) -> Aggregation {
    aggregate_with(
        segments,
        primary_speaker,
        total_duration,
        catalog,
        predictions,
        phase::classify,
        fusion::evaluate,
    )
}

/// Segment scan with pluggable phase classification and fusion.
pub fn aggregate_with<C, F>(
    segments: &[Segment],
    primary_speaker: Option<&SpeakerId>,
    total_duration: f64,
    catalog: &MetricCatalog,
    predictions: &ExternalPredictions,
    classify: C,
    fuse: F,
) -> Aggregation
where
    C: Fn(f64, f64) -> CallPhase,
    F: Fn(&MetricDefinition, &str, CallPhase, ClassifierScores) -> SegmentVerdict,
{
    let mut running: Vec<RunningVerdict> = catalog
        .metrics()
        .iter()
        .map(|_| RunningVerdict::default())
        .collect();
    let mut segments_evaluated = 0;

    if let Some(speaker) = primary_speaker {
        for (index, segment) in segments.iter().enumerate() {
            if &segment.speaker_id != speaker {
                continue;
            }
            segments_evaluated += 1;
            let phase = classify(segment.start_seconds, total_duration);

            for (metric, state) in catalog.metrics().iter().zip(running.iter_mut()) {
                let scores = ClassifierScores {
                    text: predictions.score_for(
                        index,
                        ClassifierSource::TextClassifier,
                        &metric.name,
                    ),
                    audio: predictions.score_for(
                        index,
                        ClassifierSource::AudioClassifier,
                        &metric.name,
                    ),
                };

                let SegmentVerdict::Assessed(assessment) =
                    fuse(metric, &segment.text, phase, scores)
                else {
                    continue;
                };

                state.evidence.segments_assessed += 1;
                // A silent segment is not an explicit 0; only an all-silent call defaults to 0.
                if assessment.no_evidence {
                    continue;
                }
                state.any_vote = true;

                if state.improves(metric.polarity, assessment.verdict) {
                    state.value = Some(assessment.verdict);
                    state.evidence.segment_index = Some(index);
                    state.evidence.phase = Some(phase);
                    state.evidence.matched_rule = assessment.matched_rule;
                    state.evidence.votes = assessment.votes;
                }
            }
        }
    }

    let mut metrics: Vec<AggregatedMetric> = catalog
        .metrics()
        .iter()
        .zip(running)
        .map(|(metric, state)| {
            let verdict = state.value.unwrap_or(0.0);
            let mut evidence = state.evidence;
            evidence.no_evidence = !state.any_vote;
            AggregatedMetric {
                name: metric.name.clone(),
                verdict,
                credited: verdict,
                credited_by: None,
                evidence,
            }
        })
        .collect();

    resolve_or_groups(catalog, &mut metrics);

    Aggregation {
        primary_speaker: primary_speaker.cloned(),
        segments_evaluated,
        metrics,
    }
}

/// Credits each canonical member with the best verdict across its group.
fn resolve_or_groups(catalog: &MetricCatalog, metrics: &mut [AggregatedMetric]) {
    for index in 0..metrics.len() {
        let canonical = &catalog.metrics()[index];
        if canonical.is_or_peer() {
            continue;
        }

        let mut credited = metrics[index].verdict;
        let mut credited_by = None;
        for peer in catalog.or_peers(&canonical.name) {
            let Some(peer_result) = metrics.iter().find(|result| result.name == peer.name) else {
                continue;
            };
            if peer_result.verdict > credited {
                credited = peer_result.verdict;
                credited_by = Some(peer.name.clone());
            }
        }

        metrics[index].credited = credited;
        metrics[index].credited_by = credited_by;
    }
}
