//! Error taxonomy shared by ingestion, backfill, the query service and the HTTP layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    /// A required credential or setting is missing. Fatal to the request.
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        instructions: Vec<String>,
    },

    /// Provider returned non-2xx or the network call failed.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// An external job ran but reported failure.
    #[error("Upstream failed: {0}")]
    UpstreamFailed(String),

    /// A single stored record could not be parsed.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        instructions: Vec<String>,
    },
}

impl TrackerError {
    pub fn config(message: impl Into<String>) -> Self {
        TrackerError::Configuration {
            message: message.into(),
            instructions: Vec::new(),
        }
    }

    /// Stable code used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            TrackerError::Configuration { .. } => "configuration_error",
            TrackerError::UpstreamUnavailable(_) => "upstream_unavailable",
            TrackerError::UpstreamFailed(_) => "upstream_failed",
            TrackerError::MalformedRecord(_) => "malformed_record",
            TrackerError::Timeout { .. } => "timeout",
            TrackerError::InvalidObservation(_) => "invalid_observation",
            TrackerError::Store(_) => "store_error",
            TrackerError::BadRequest { .. } => "bad_request",
        }
    }

    pub fn instructions(&self) -> &[String] {
        match self {
            TrackerError::Configuration { instructions, .. }
            | TrackerError::BadRequest { instructions, .. } => instructions,
            _ => &[],
        }
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        TrackerError::Store(err.to_string())
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        TrackerError::UpstreamUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::MalformedRecord(err.to_string())
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
