//! Error types for the CLI

use std::path::PathBuf;

use scaleproof_common::telemetry::TelemetryError;
use scaleproof_common::template::RenderError;
use scaleproof_scenario::ScenarioError;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario file: {message}")]
    InvalidScenario { message: String },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("cluster error: {0}")]
    Cluster(#[from] scaleproof_common::Error),

    #[error("logging setup failed: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("scenario '{name}' failed: {source}")]
    ScenarioFailed {
        name: String,
        #[source]
        source: ScenarioError,
    },

    #[error("validation error: {message}")]
    Validation { message: String },
}

impl Error {
    pub fn invalid_scenario(message: impl Into<String>) -> Self {
        Error::InvalidScenario {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }
}
