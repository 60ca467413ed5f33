use std::result::Result as StdResult;

use thiserror::Error;

/// Unified error type for the planner, engine, and storage layers.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Start date is not set; cannot generate months")]
    MissingStartDate,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Persistence error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = StdResult<T, PlannerError>;

impl From<std::io::Error> for PlannerError {
    fn from(err: std::io::Error) -> Self {
        PlannerError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for PlannerError {
    fn from(err: serde_json::Error) -> Self {
        PlannerError::StorageError(err.to_string())
    }
}
