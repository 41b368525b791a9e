//! Error types for stub registration, loading and normalization.
//!
//! Only configuration-time failures surface as errors. Problems found while
//! serving a request (for example a scenario that cannot be resolved) make the
//! affected stub lose selection instead.

use uuid::Uuid;

/// Errors raised while building, loading or registering stubs
#[derive(Debug, thiserror::Error)]
pub enum StubError {
    #[error("Malformed stub mapping: {0}")]
    Deserialization(#[from] serde_json::Error),
    #[error("Stub mapping is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("Conflicting URL criteria: {} are set together", .0.join(", "))]
    ConflictingUrlPatterns(Vec<&'static str>),
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("Stub {0} sets newScenarioState without a scenarioName")]
    TransitionWithoutScenario(Uuid),
    #[error("Stub {0} sets requiredScenarioState without a scenarioName")]
    RequiredStateWithoutScenario(Uuid),
    #[error("Stub {0} binds a scenario with a blank name")]
    BlankScenarioName(Uuid),
    #[error("Stub {0} is already registered")]
    DuplicateId(Uuid),
    #[error("Stub {0} not found")]
    NotFound(Uuid),
    #[error("Mapping store failure: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl StubError {
    pub(crate) fn invalid_pattern(pattern: impl Into<String>, reason: impl ToString) -> Self {
        StubError::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}
