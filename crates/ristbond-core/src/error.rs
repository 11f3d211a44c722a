//! Unified error type for the bonding appliance controller.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for the control plane to derive an HTTP status code via [`Error::http_status`].

use std::fmt;

use serde::Serialize;

/// A single field-level problem found while validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. `rist.senders[2].weight`).
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_problems(problems: &[ValidationError]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Unified error type covering all failure modes of the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The persisted configuration could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// A replacement configuration was rejected before anything was touched.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// One or more fields are out of their documented ranges.
    #[error("Validation failed: {}", join_problems(.0))]
    Validation(Vec<ValidationError>),

    /// `ingest.source` names a kind the encoder synthesizer does not know.
    #[error("Unsupported ingest kind: {0}")]
    UnsupportedIngestKind(String),

    /// The active sender shape needs at least one enabled path.
    #[error("No enabled senders")]
    NoEnabledSenders,

    /// A sender index outside `0..len`.
    #[error("Bad sender index {index} (configured senders: {len})")]
    BadIndex {
        /// The index that was requested.
        index: usize,
        /// Number of configured senders.
        len: usize,
    },

    /// The targeted sender is disabled in the configuration.
    #[error("Sender {0} is disabled")]
    SenderDisabled(usize),

    /// The stored config wires a path differently from the running encoder.
    #[error("Restart required: {0}")]
    RestartRequired(String),

    /// A weight outside `0..=1000`.
    #[error("Weight out of range (0..=1000): {0}")]
    WeightOutOfRange(i64),

    /// Spawning an external process failed.
    #[error("Launch failure [{name}]: {message}")]
    LaunchFailure {
        /// Declared process name.
        name: String,
        /// Human-readable error description.
        message: String,
    },

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "log").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Config(_) => 400,
            Error::InvalidConfig(_) => 400,
            Error::Validation(_) => 400,
            Error::UnsupportedIngestKind(_) => 400,
            Error::NoEnabledSenders => 422,
            Error::BadIndex { .. } => 400,
            Error::SenderDisabled(_) => 409,
            Error::RestartRequired(_) => 409,
            Error::WeightOutOfRange(_) => 400,
            Error::LaunchFailure { .. } => 502,
            Error::NotFound { .. } => 404,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::LaunchFailure`].
    pub fn launch(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::LaunchFailure {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
