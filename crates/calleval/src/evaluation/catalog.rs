use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::phase::{CallPhase, PhaseTag};
use super::rules::RuleSet;
use crate::config::EvaluationSettings;

const STANDARD_CATALOG: &str = include_str!("../../catalogs/standard.toml");
const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Whether detecting the phenomenon is good (normal) or bad (inverse, e.g. filler words).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    #[default]
    Normal,
    Inverse,
}

fn default_threshold() -> f64 {
    0.5
}

fn default_max_score() -> f64 {
    100.0
}

/// Metric entry as declared in a catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub weight: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub phases: Vec<PhaseTag>,
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default)]
    pub detection_rules: Vec<String>,
    /// Canonical metric whose weight slot this metric shares.
    #[serde(default)]
    pub or_group: Option<String>,
}

/// Versioned catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSpec {
    pub version: String,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
    pub metrics: Vec<MetricSpec>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unable to read catalog {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("catalog is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("catalog declares no metrics")]
    Empty,
    #[error("catalog max_score must be positive and finite (found {0})")]
    InvalidMaxScore(f64),
    #[error("catalog max_score {configured} does not match the expected {expected}")]
    MaxScoreMismatch { configured: f64, expected: f64 },
    #[error("metric names must not be blank")]
    BlankName,
    #[error("metric '{0}' is declared more than once")]
    DuplicateMetric(String),
    #[error("metric '{metric}' threshold {threshold} is outside 0..=1")]
    InvalidThreshold { metric: String, threshold: f64 },
    #[error("metric '{metric}' weight {weight} must be finite and non-negative")]
    InvalidWeight { metric: String, weight: f64 },
    #[error("metric '{0}' does not apply to any phase")]
    MissingPhases(String),
    #[error("metric '{metric}' shares a weight slot with unknown metric '{peer}'")]
    UnknownOrGroupPeer { metric: String, peer: String },
    #[error("metric '{0}' cannot share a weight slot with itself")]
    SelfReferencingOrGroup(String),
    #[error("metric '{metric}' points at '{peer}', which itself shares another metric's slot")]
    ChainedOrGroup { metric: String, peer: String },
    #[error(
        "metric '{metric}' weight {weight} differs from the slot it shares with '{peer}' ({peer_weight})"
    )]
    OrGroupWeightMismatch {
        metric: String,
        weight: f64,
        peer: String,
        peer_weight: f64,
    },
    #[error("independent metric weights sum to {actual}, expected max_score {expected}")]
    WeightConservation { expected: f64, actual: f64 },
}

/// A validated metric with its detection rules compiled.
#[derive(Debug, Clone)]
pub struct MetricDefinition {
    pub name: String,
    pub label: String,
    pub weight: f64,
    pub threshold: f64,
    pub phases: Vec<PhaseTag>,
    pub polarity: Polarity,
    pub rules: RuleSet,
    pub or_group: Option<String>,
}

impl MetricDefinition {
    pub fn applies_to(&self, phase: CallPhase) -> bool {
        self.phases.iter().any(|tag| tag.covers(phase))
    }

    /// First declared phase tag, used for report breakdowns.
    pub fn primary_phase(&self) -> PhaseTag {
        self.phases.first().copied().unwrap_or(PhaseTag::All)
    }

    /// True when this metric rides on another metric's weight slot.
    pub fn is_or_peer(&self) -> bool {
        self.or_group.is_some()
    }
}

/// Immutable scorecard definition shared by every evaluation.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    version: String,
    max_score: f64,
    metrics: Vec<MetricDefinition>,
}

impl MetricCatalog {
    /// The built-in front-desk scorecard.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::from_toml_str(STANDARD_CATALOG)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let spec: CatalogSpec = toml::from_str(raw)?;
        Self::from_spec(spec)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Resolves the catalog named by the runtime settings.
    pub fn load(settings: &EvaluationSettings) -> Result<Self, CatalogError> {
        let catalog = match &settings.catalog_path {
            Some(path) => Self::from_path(path)?,
            None => Self::standard()?,
        };

        if let Some(expected) = settings.expected_max_score {
            if (catalog.max_score - expected).abs() > WEIGHT_TOLERANCE {
                return Err(CatalogError::MaxScoreMismatch {
                    configured: catalog.max_score,
                    expected,
                });
            }
        }

        Ok(catalog)
    }

    pub fn from_spec(spec: CatalogSpec) -> Result<Self, CatalogError> {
        if spec.metrics.is_empty() {
            return Err(CatalogError::Empty);
        }
        if !spec.max_score.is_finite() || spec.max_score <= 0.0 {
            return Err(CatalogError::InvalidMaxScore(spec.max_score));
        }

        let mut weights: BTreeMap<&str, (f64, bool)> = BTreeMap::new();
        for metric in &spec.metrics {
            validate_metric(metric)?;
            let is_peer = metric.or_group.is_some();
            if weights
                .insert(metric.name.as_str(), (metric.weight, is_peer))
                .is_some()
            {
                return Err(CatalogError::DuplicateMetric(metric.name.clone()));
            }
        }

        for metric in &spec.metrics {
            let Some(peer) = &metric.or_group else {
                continue;
            };
            if peer == &metric.name {
                return Err(CatalogError::SelfReferencingOrGroup(metric.name.clone()));
            }
            let (peer_weight, peer_is_peer) =
                *weights
                    .get(peer.as_str())
                    .ok_or_else(|| CatalogError::UnknownOrGroupPeer {
                        metric: metric.name.clone(),
                        peer: peer.clone(),
                    })?;
            if peer_is_peer {
                return Err(CatalogError::ChainedOrGroup {
                    metric: metric.name.clone(),
                    peer: peer.clone(),
                });
            }
            if (peer_weight - metric.weight).abs() > WEIGHT_TOLERANCE {
                return Err(CatalogError::OrGroupWeightMismatch {
                    metric: metric.name.clone(),
                    weight: metric.weight,
                    peer: peer.clone(),
                    peer_weight,
                });
            }
        }

        let independent: f64 = spec
            .metrics
            .iter()
            .filter(|metric| metric.or_group.is_none())
            .map(|metric| metric.weight)
            .sum();
        if (independent - spec.max_score).abs() > WEIGHT_TOLERANCE {
            return Err(CatalogError::WeightConservation {
                expected: spec.max_score,
                actual: independent,
            });
        }

        let metrics: Vec<MetricDefinition> = spec
            .metrics
            .into_iter()
            .map(|metric| {
                let rules = RuleSet::compile(&metric.name, &metric.detection_rules);
                if rules.is_empty() {
                    warn!(
                        metric = %metric.name,
                        "metric has no usable detection rules; classifier votes only"
                    );
                }
                MetricDefinition {
                    label: metric.label.unwrap_or_else(|| humanize(&metric.name)),
                    name: metric.name,
                    weight: metric.weight,
                    threshold: metric.threshold,
                    phases: metric.phases,
                    polarity: metric.polarity,
                    rules,
                    or_group: metric.or_group,
                }
            })
            .collect();

        debug!(
            version = %spec.version,
            metrics = metrics.len(),
            max_score = spec.max_score,
            "metric catalog loaded"
        );

        Ok(Self {
            version: spec.version,
            max_score: spec.max_score,
            metrics,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    /// Metrics in declaration order.
    pub fn metrics(&self) -> &[MetricDefinition] {
        &self.metrics
    }

    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.metrics.iter().find(|metric| metric.name == name)
    }

    /// Peers riding on the given canonical metric's weight slot.
    pub fn or_peers<'a>(&'a self, canonical: &'a str) -> impl Iterator<Item = &'a MetricDefinition> {
        self.metrics
            .iter()
            .filter(move |metric| metric.or_group.as_deref() == Some(canonical))
    }
}

fn validate_metric(metric: &MetricSpec) -> Result<(), CatalogError> {
    if metric.name.trim().is_empty() {
        return Err(CatalogError::BlankName);
    }
    if !(0.0..=1.0).contains(&metric.threshold) {
        return Err(CatalogError::InvalidThreshold {
            metric: metric.name.clone(),
            threshold: metric.threshold,
        });
    }
    if !metric.weight.is_finite() || metric.weight < 0.0 {
        return Err(CatalogError::InvalidWeight {
            metric: metric.name.clone(),
            weight: metric.weight,
        });
    }
    if metric.phases.is_empty() {
        return Err(CatalogError::MissingPhases(metric.name.clone()));
    }
    Ok(())
}

fn humanize(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
