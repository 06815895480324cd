pub mod config;
pub mod error;
pub mod evaluation;
pub mod telemetry;
pub mod transcript;
