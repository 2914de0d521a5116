//! Store error types.

use thiserror::Error;
use uuid::Uuid;
use vocamatch_common::{ValidationError, VocaError};

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Assessment not found: {0}")]
    AssessmentNotFound(Uuid),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Round {round} already stored for assessment {assessment_id}")]
    DuplicateResponse { assessment_id: Uuid, round: u32 },

    #[error("Assessment {0} is already completed")]
    AlreadyCompleted(Uuid),

    #[error("Assessment {0} is not completed")]
    NotCompleted(Uuid),

    #[error("Derived rows for {actual} cannot be stored under assessment {expected}")]
    AssessmentMismatch { expected: Uuid, actual: Uuid },
}

impl From<DbError> for VocaError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::AssessmentNotFound(id) => VocaError::AssessmentNotFound(id),
            DbError::DuplicateResponse { assessment_id, round } => {
                VocaError::Validation(ValidationError::AlreadySubmitted { assessment_id, round })
            }
            DbError::AlreadyCompleted(id) => VocaError::AssessmentClosed(id),
            other => VocaError::Storage(other.to_string()),
        }
    }
}
