use thiserror::Error;

/// Failure inside a single extractor.
///
/// Never escapes the pipeline: the fault boundary around each extractor turns
/// it into a diagnostic.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no successful response to {0}")]
    MissingResponse(String),

    #[error("malformed response to {command}: {reason}")]
    Malformed { command: String, reason: String },

    #[error("{0}")]
    Internal(String),
}

impl ExtractError {
    pub fn malformed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        ExtractError::Malformed {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

/// Snapshot serialization failure.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("snapshot serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot mapping must be an object, got {0}")]
    NotAnObject(&'static str),

    #[error("confidence {value} for '{field}' is outside [0, 1]")]
    ConfidenceOutOfRange { field: String, value: f64 },
}
