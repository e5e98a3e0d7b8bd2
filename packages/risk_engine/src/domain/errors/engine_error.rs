//! Orchestration-level error taxonomy: a single enum plus a `Result`
//! alias.

use super::validation_error::FieldError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed with {} error(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("version conflict at epoch {current_epoch}")]
    Conflict { current_epoch: u64 },

    #[error("operation not allowed: {0}")]
    OperationNotAllowed(String),

    #[error("distribution fit failed: {0}")]
    DistributionFit(String),

    #[error("simulation overflow")]
    SimulationOverflow,

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn validation(errors: Vec<FieldError>) -> Self {
        EngineError::Validation(errors)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
