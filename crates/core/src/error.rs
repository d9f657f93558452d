//! # Error Types
//!
//! The failure taxonomy of the pipeline. Only [`PipelineError`] ever reaches a
//! caller of `generate`/`iterate`; generation and scoring failures are
//! recovered where they happen.

use crate::state::IdeaStatus;

/// A structured generation call could not produce usable JSON.
///
/// Always recovered by the agent stage that issued the call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("transport error calling {backend}: {message}")]
    Transport { backend: String, message: String },

    #[error("{backend} timed out after {timeout_secs}s")]
    Timeout { backend: String, timeout_secs: u64 },

    #[error("{backend} returned HTTP {status}: {message}")]
    Api {
        backend: String,
        status: u16,
        message: String,
    },

    #[error("{backend} returned an empty response")]
    EmptyResponse { backend: String },

    #[error("no JSON {expected} found in response: {message}")]
    Extraction { expected: String, message: String },

    #[error("response does not match schema '{schema}': {message}")]
    SchemaMismatch { schema: String, message: String },

    #[error("generator not configured: {message}")]
    Configuration { message: String },
}

impl GenerationError {
    pub(crate) fn transport(backend: &str, err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                backend: backend.to_string(),
                timeout_secs,
            }
        } else {
            Self::Transport {
                backend: backend.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Score recomputation failed; the previous scores stay in effect.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScoringError {
    #[error("component '{component}' produced a non-finite score")]
    NonFinite { component: &'static str },

    #[error("novelty lookup failed: {message}")]
    Novelty { message: String },
}

/// A weight table that breaks the sum-to-one invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("scoring weights must sum to 1.0 (±0.01), got {sum}")]
    SumOutOfTolerance { sum: f64 },

    #[error("scoring weight '{name}' is negative or not finite: {value}")]
    Invalid { name: &'static str, value: f64 },
}

/// Record store failure. Fatal to the current pipeline call.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record not found: {id}")]
    NotFound { id: String },

    #[error("store lock poisoned: {0}")]
    Lock(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A status change the idea lifecycle does not allow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid status transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: IdeaStatus,
    pub to: IdeaStatus,
}

/// The only error surfaced by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error(transparent)]
    Weights(#[from] WeightError),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts_into_pipeline_error() {
        let err: PipelineError = StoreError::NotFound { id: "abc".into() }.into();
        assert!(matches!(err, PipelineError::Persistence(_)));
        assert_eq!(err.to_string(), "persistence failed: record not found: abc");
    }

    #[test]
    fn test_weight_error_message() {
        let err = WeightError::SumOutOfTolerance { sum: 1.2 };
        assert!(err.to_string().contains("1.2"));
    }
}
