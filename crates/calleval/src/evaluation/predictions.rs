//! Boundary types for classifier output.
//!
//! The classification services answer with bare numbers, `{score, label}` records, or envelopes
//! around either. Everything is reduced to `Option<f64>` here so fusion never looks at payload
//! shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

const NEGATIVE_LABELS: &[&str] = &[
    "negative",
    "absent",
    "no",
    "false",
    "not_detected",
    "label_0",
];

/// External detector that may vote on a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierSource {
    #[serde(alias = "text", alias = "bert")]
    TextClassifier,
    #[serde(alias = "audio", alias = "wav2vec2")]
    AudioClassifier,
}

/// One classifier's raw opinion about one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionValue {
    Score(f64),
    Labeled {
        score: f64,
        #[serde(default)]
        label: Option<String>,
    },
    Other(Value),
}

impl PredictionValue {
    /// Scalar confidence in `[0, 1]`, or `None` when the payload carries no usable opinion.
    pub fn normalized(&self) -> Option<f64> {
        let raw = match self {
            PredictionValue::Score(score) => *score,
            PredictionValue::Labeled { score, label } => match label {
                Some(label) if is_negative_label(label) => 1.0 - score,
                _ => *score,
            },
            PredictionValue::Other(Value::Bool(flag)) => {
                if *flag {
                    1.0
                } else {
                    0.0
                }
            }
            PredictionValue::Other(_) => return None,
        };

        raw.is_finite().then(|| raw.clamp(0.0, 1.0))
    }
}

impl From<f64> for PredictionValue {
    fn from(value: f64) -> Self {
        Self::Score(value)
    }
}

fn is_negative_label(label: &str) -> bool {
    let normalized = label.trim().to_ascii_lowercase().replace(['-', ' '], "_");
    NEGATIVE_LABELS.contains(&normalized.as_str())
}

/// Metric-keyed predictions from a single classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PredictionEnvelope")]
pub struct ClassifierPredictions(BTreeMap<String, PredictionValue>);

impl ClassifierPredictions {
    pub fn insert(&mut self, metric: impl Into<String>, value: impl Into<PredictionValue>) {
        self.0.insert(metric.into(), value.into());
    }

    pub fn get(&self, metric: &str) -> Option<&PredictionValue> {
        self.0.get(metric)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Deserialize)]
struct AudioResults {
    #[serde(default)]
    predictions: BTreeMap<String, PredictionValue>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PredictionEnvelope {
    Text {
        #[serde(default)]
        success: Option<bool>,
        #[serde(default)]
        error: Option<String>,
        predictions: BTreeMap<String, PredictionValue>,
    },
    Audio {
        #[serde(default)]
        success: Option<bool>,
        #[serde(default)]
        error: Option<String>,
        results: AudioResults,
    },
    Status {
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
    Bare(BTreeMap<String, PredictionValue>),
}

impl From<PredictionEnvelope> for ClassifierPredictions {
    fn from(value: PredictionEnvelope) -> Self {
        match value {
            PredictionEnvelope::Text {
                success,
                error,
                predictions,
            } => Self::unless_failed(success, error, predictions),
            PredictionEnvelope::Audio {
                success,
                error,
                results,
            } => Self::unless_failed(success, error, results.predictions),
            PredictionEnvelope::Status { success, error } => {
                Self::unless_failed(Some(success), error, BTreeMap::new())
            }
            PredictionEnvelope::Bare(predictions) => Self(predictions),
        }
    }
}

impl ClassifierPredictions {
    /// A response flagged `success: false` carries no usable votes, whatever else it holds.
    fn unless_failed(
        success: Option<bool>,
        error: Option<String>,
        predictions: BTreeMap<String, PredictionValue>,
    ) -> Self {
        if success == Some(false) {
            warn!(
                error = error.as_deref().unwrap_or("unspecified"),
                discarded = predictions.len(),
                "classifier reported failure; treating its votes as absent"
            );
            return Self::default();
        }
        Self(predictions)
    }
}

pub type ClassifierMap = BTreeMap<ClassifierSource, ClassifierPredictions>;

/// Every classifier opinion gathered for a call before evaluation starts.
///
/// Call-level predictions apply to every segment; per-segment entries (keyed by the segment's
/// index in the transcript) take precedence for the metrics they name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PredictionsDocument")]
pub struct ExternalPredictions {
    pub call: ClassifierMap,
    pub segments: BTreeMap<usize, ClassifierMap>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PredictionsDocument {
    CallLevel(ClassifierMap),
    Scoped {
        #[serde(default)]
        call: ClassifierMap,
        // Buffered untagged content cannot parse integer map keys; indices are parsed below.
        #[serde(default)]
        segments: BTreeMap<String, ClassifierMap>,
    },
}

impl From<PredictionsDocument> for ExternalPredictions {
    fn from(value: PredictionsDocument) -> Self {
        match value {
            PredictionsDocument::Scoped { call, segments } => {
                let segments = segments
                    .into_iter()
                    .filter_map(|(key, classifiers)| match key.trim().parse::<usize>() {
                        Ok(index) => Some((index, classifiers)),
                        Err(_) => {
                            warn!(key = %key, "ignoring predictions for non-numeric segment key");
                            None
                        }
                    })
                    .collect();
                Self { call, segments }
            }
            PredictionsDocument::CallLevel(call) => Self {
                call,
                segments: BTreeMap::new(),
            },
        }
    }
}

impl ExternalPredictions {
    pub fn with_call(
        mut self,
        source: ClassifierSource,
        metric: &str,
        value: impl Into<PredictionValue>,
    ) -> Self {
        self.call.entry(source).or_default().insert(metric, value);
        self
    }

    pub fn with_segment(
        mut self,
        segment_index: usize,
        source: ClassifierSource,
        metric: &str,
        value: impl Into<PredictionValue>,
    ) -> Self {
        self.segments
            .entry(segment_index)
            .or_default()
            .entry(source)
            .or_default()
            .insert(metric, value);
        self
    }

    /// Normalized opinion of `source` on `metric` for one segment.
    pub fn score_for(
        &self,
        segment_index: usize,
        source: ClassifierSource,
        metric: &str,
    ) -> Option<f64> {
        let segment_value = self
            .segments
            .get(&segment_index)
            .and_then(|classifiers| classifiers.get(&source))
            .and_then(|predictions| predictions.get(metric));

        segment_value
            .or_else(|| {
                self.call
                    .get(&source)
                    .and_then(|predictions| predictions.get(metric))
            })
            .and_then(PredictionValue::normalized)
    }
}
