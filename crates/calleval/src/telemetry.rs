//! Tracing setup shared by the evaluator library and the `calleval` binary.

use crate::config::TelemetryConfig;
use std::fmt;
use std::io::{self, IsTerminal};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    InvalidFilter {
        origin: FilterOrigin,
        value: String,
        source: ParseError,
    },
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

/// Where a rejected filter directive came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOrigin {
    Environment,
    Config,
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidFilter { origin, value, .. } => {
                let name = match origin {
                    FilterOrigin::Environment => EnvFilter::DEFAULT_ENV,
                    FilterOrigin::Config => "APP_LOG_LEVEL",
                };
                write!(f, "{name} holds an invalid log filter '{value}'")
            }
            TelemetryError::AlreadyInstalled(err) => {
                write!(f, "a tracing subscriber is already installed: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidFilter { source, .. } => Some(source),
            TelemetryError::AlreadyInstalled(err) => Some(&**err),
        }
    }
}

/// Installs the global fmt subscriber on stderr so reports on stdout stay machine readable.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(env_directives.as_deref(), &config.log_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .compact()
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)
}

/// `RUST_LOG` directives take precedence; a blank value falls back to the configured level.
fn build_filter(env_directives: Option<&str>, log_level: &str) -> Result<EnvFilter, TelemetryError> {
    let (origin, value) = match env_directives.map(str::trim) {
        Some(directives) if !directives.is_empty() => (FilterOrigin::Environment, directives),
        _ => (FilterOrigin::Config, log_level.trim()),
    };

    EnvFilter::try_new(value).map_err(|source| TelemetryError::InvalidFilter {
        origin,
        value: value.to_string(),
        source,
    })
}
