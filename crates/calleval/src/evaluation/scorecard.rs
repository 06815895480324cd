use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::aggregate::{Aggregation, MetricEvidence};
use super::catalog::{MetricCatalog, Polarity};
use super::phase::PhaseTag;
use crate::transcript::SpeakerId;

const EXCELLENT_PERCENTAGE: f64 = 90.0;
const GOOD_PERCENTAGE: f64 = 80.0;

/// Final pass/fail for one metric together with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricVerdict {
    pub metric_name: String,
    pub label: String,
    /// Whether this metric itself was demonstrated.
    pub detected: bool,
    pub score: f64,
    pub weight: f64,
    pub weighted_score: f64,
    pub phase: PhaseTag,
    pub polarity: Polarity,
    /// Canonical metric this one shares a weight slot with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub or_group: Option<String>,
    /// Group peer that earned this metric's slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credited_by: Option<String>,
    pub evidence: MetricEvidence,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTotal {
    pub score: f64,
    pub max: f64,
}

/// Coarse quality band shown on dashboards and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceRating {
    Excellent,
    Good,
    NeedsImprovement,
}

impl PerformanceRating {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= EXCELLENT_PERCENTAGE {
            Self::Excellent
        } else if percentage >= GOOD_PERCENTAGE {
            Self::Good
        } else {
            Self::NeedsImprovement
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::NeedsImprovement => "Needs Improvement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub catalog_version: String,
    pub primary_speaker: Option<SpeakerId>,
    pub segments_evaluated: usize,
    pub metrics: BTreeMap<String, MetricVerdict>,
    pub total_score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub phase_totals: BTreeMap<PhaseTag, PhaseTotal>,
    pub rating: PerformanceRating,
}

impl Scorecard {
    pub fn passed(&self) -> impl Iterator<Item = &MetricVerdict> {
        self.metrics.values().filter(|verdict| verdict.score > 0.0)
    }

    pub fn missed(&self) -> impl Iterator<Item = &MetricVerdict> {
        self.metrics
            .values()
            .filter(|verdict| verdict.weight > 0.0 && verdict.score <= 0.0)
    }
}

/// Weighs the aggregated verdicts. Pure arithmetic, no failure modes.
pub fn build(aggregation: &Aggregation, catalog: &MetricCatalog) -> Scorecard {
    let mut metrics = BTreeMap::new();
    let mut phase_totals: BTreeMap<PhaseTag, PhaseTotal> = PhaseTag::ordered()
        .into_iter()
        .map(|tag| (tag, PhaseTotal::default()))
        .collect();
    let mut total_score = 0.0;

    for (definition, result) in catalog.metrics().iter().zip(&aggregation.metrics) {
        let weight = if definition.is_or_peer() {
            0.0
        } else {
            definition.weight
        };
        let weighted_score = result.credited * weight;
        total_score += weighted_score;

        let phase = definition.primary_phase();
        let bucket = phase_totals.entry(phase).or_default();
        bucket.score += weighted_score;
        bucket.max += weight;

        metrics.insert(
            definition.name.clone(),
            MetricVerdict {
                metric_name: definition.name.clone(),
                label: definition.label.clone(),
                detected: result.verdict >= 1.0,
                score: result.credited,
                weight,
                weighted_score,
                phase,
                polarity: definition.polarity,
                or_group: definition.or_group.clone(),
                credited_by: result.credited_by.clone(),
                evidence: result.evidence.clone(),
            },
        );
    }

    let max_score = catalog.max_score();
    let percentage = if max_score > 0.0 {
        total_score / max_score * 100.0
    } else {
        0.0
    };

    Scorecard {
        catalog_version: catalog.version().to_string(),
        primary_speaker: aggregation.primary_speaker.clone(),
        segments_evaluated: aggregation.segments_evaluated,
        metrics,
        total_score,
        max_score,
        percentage,
        phase_totals,
        rating: PerformanceRating::from_percentage(percentage),
    }
}
