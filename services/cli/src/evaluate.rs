use crate::cli::{CatalogArgs, EvaluateArgs};
use crate::render::{self, EvaluationReport};
use calleval::config::{AppConfig, EvaluationSettings};
use calleval::error::AppError;
use calleval::evaluation::{EvaluationEngine, ExternalPredictions, MetricCatalog};
use calleval::transcript::{CallTranscript, SpeakerId};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub(crate) fn run_evaluate(args: EvaluateArgs, config: &AppConfig) -> Result<(), AppError> {
    let catalog = load_catalog(args.catalog, &config.evaluation)?;
    let mut transcript: CallTranscript = read_json(&args.transcript)?;
    if let Some(speaker) = args.speaker {
        transcript.primary_speaker = Some(SpeakerId::new(speaker));
    }
    if transcript.call_id.is_none() {
        transcript.call_id = args
            .transcript
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
    }

    let predictions = match &args.predictions {
        Some(path) => read_json::<ExternalPredictions>(path)?,
        None => {
            debug!("no classifier predictions supplied; scoring from patterns only");
            ExternalPredictions::default()
        }
    };

    if transcript.segments.is_empty() {
        warn!(path = %args.transcript.display(), "transcript has no segments");
    }

    let engine = EvaluationEngine::new(catalog);
    let scorecard = engine.evaluate(&transcript, &predictions);
    let report = EvaluationReport::new(
        &transcript,
        scorecard,
        args.include_transcript,
        args.censor,
    );

    let stdout = io::stdout();
    render::write_report(&report, args.format, stdout.lock())
}

pub(crate) fn run_catalog(args: CatalogArgs, config: &AppConfig) -> Result<(), AppError> {
    let catalog = load_catalog(args.catalog, &config.evaluation)?;
    let stdout = io::stdout();
    render::write_catalog(&catalog, stdout.lock())
}

fn load_catalog(
    path: Option<PathBuf>,
    settings: &EvaluationSettings,
) -> Result<MetricCatalog, AppError> {
    let settings = match path {
        Some(path) => EvaluationSettings {
            catalog_path: Some(path),
            ..settings.clone()
        },
        None => settings.clone(),
    };
    Ok(MetricCatalog::load(&settings)?)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
