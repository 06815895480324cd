use crate::evaluate::{run_catalog, run_evaluate};
use crate::render::OutputFormat;
use calleval::config::AppConfig;
use calleval::error::AppError;
use calleval::telemetry;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "calleval",
    about = "Score recorded service calls against the weighted quality scorecard",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a diarized transcript and print its scorecard
    Evaluate(EvaluateArgs),
    /// Validate a metric catalog and list its metrics
    Catalog(CatalogArgs),
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Transcript JSON with `segments` (speaker, text, start, end)
    #[arg(long)]
    pub(crate) transcript: PathBuf,
    /// Classifier predictions JSON keyed by classifier name
    #[arg(long)]
    pub(crate) predictions: Option<PathBuf>,
    /// TOML catalog to use instead of the configured one
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Speaker to score (defaults to the transcript's primary speaker, then the most talkative)
    #[arg(long)]
    pub(crate) speaker: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
    /// Include the transcript segments in the report
    #[arg(long)]
    pub(crate) include_transcript: bool,
    /// Mask profanity in any transcript text that is printed
    #[arg(long)]
    pub(crate) censor: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// TOML catalog to validate instead of the configured one
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Evaluate(args) => run_evaluate(args, &config),
        Command::Catalog(args) => run_catalog(args, &config),
    }
}
