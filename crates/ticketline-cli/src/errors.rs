//! Error types for the console runtime.
//!
//! Only failures that prevent a session from starting live here. Errors
//! raised while a session runs are reported on one line and never end it.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to resolve server address {endpoint}: {source}")]
    Resolve { endpoint: String, source: io::Error },
    #[error("could not establish transport for {endpoint}: {source}")]
    Bind { endpoint: String, source: io::Error },
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("console output failed: {0}")]
    Session(#[source] io::Error),
}
