use deme_governance::{AggregationError, ProfileConfigError};
use deme_invariance::InvarianceError;
use thiserror::Error;

/// Errors that can occur while loading service configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that abort a service request.
///
/// Per-judge failures and rejected records never surface here; they are
/// carried in the evaluation report and the decision audit.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Profile(#[from] ProfileConfigError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Invariance(#[from] InvarianceError),
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
