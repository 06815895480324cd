//! Scorecard evaluation: phase classification, per-segment evidence fusion, call-level
//! aggregation and weighting.

mod aggregate;
mod catalog;
mod fusion;
mod phase;
mod predictions;
mod rules;
mod scorecard;

#[cfg(test)]
mod tests;

pub use aggregate::{aggregate, aggregate_with, AggregatedMetric, Aggregation, MetricEvidence};
pub use catalog::{CatalogError, CatalogSpec, MetricCatalog, MetricDefinition, MetricSpec, Polarity};
pub use fusion::{
    evaluate as evaluate_segment, fuse, ClassifierScores, EvidenceSource, EvidenceVote,
    SegmentAssessment, SegmentVerdict,
};
pub use phase::{classify, CallPhase, PhaseTag};
pub use predictions::{
    ClassifierMap, ClassifierPredictions, ClassifierSource, ExternalPredictions, PredictionValue,
};
pub use rules::{DetectionRule, RuleSet};
pub use scorecard::{build, MetricVerdict, PerformanceRating, PhaseTotal, Scorecard};

use std::sync::Arc;

use tracing::info;

use crate::transcript::CallTranscript;

/// Stateless evaluator that applies the metric catalog to a completed call.
#[derive(Debug, Clone)]
pub struct EvaluationEngine {
    catalog: Arc<MetricCatalog>,
}

impl EvaluationEngine {
    pub fn new(catalog: MetricCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    /// Scores the call's primary speaker. Always yields a scorecard; calls without a usable
    /// speaker or segments score zero.
    pub fn evaluate(
        &self,
        transcript: &CallTranscript,
        predictions: &ExternalPredictions,
    ) -> Scorecard {
        let primary_speaker = transcript.resolve_primary_speaker();
        let aggregation = aggregate(
            &transcript.segments,
            primary_speaker.as_ref(),
            transcript.total_duration(),
            &self.catalog,
            predictions,
        );
        let scorecard = build(&aggregation, &self.catalog);

        info!(
            call_id = transcript.call_id.as_deref().unwrap_or("-"),
            speaker = primary_speaker.as_ref().map(|speaker| speaker.as_str()).unwrap_or("-"),
            segments = scorecard.segments_evaluated,
            total_score = scorecard.total_score,
            max_score = scorecard.max_score,
            "call evaluated"
        );

        scorecard
    }
}
