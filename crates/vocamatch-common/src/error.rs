use thiserror::Error;
use uuid::Uuid;

/// Reasons a submitted ranking is rejected before it is stored.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Round {round} expects {expected} needs, got {actual}")]
    LengthMismatch { round: u32, expected: usize, actual: usize },

    #[error("Round {round} ranks need '{need}' more than once")]
    DuplicateNeed { round: u32, need: String },

    #[error("Need '{need}' is not part of round {round}")]
    UnknownNeed { round: u32, need: String },

    #[error("Round {0} is not configured for this instrument")]
    UnknownRound(u32),

    #[error("Round {round} was already submitted for assessment {assessment_id}")]
    AlreadySubmitted { assessment_id: Uuid, round: u32 },
}

#[derive(Debug, Error)]
pub enum VocaError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Assessment {assessment_id} is incomplete: {answered} of {required} rounds answered")]
    IncompleteAssessment {
        assessment_id: Uuid,
        answered: usize,
        required: usize,
    },

    #[error("Assessment {0} is closed")]
    AssessmentClosed(Uuid),

    #[error("Assessment not found: {0}")]
    AssessmentNotFound(Uuid),

    #[error("Occupation catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Unknown instrument version: {0}")]
    UnknownInstrument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl VocaError {
    /// Whether the caller sent something the engine refuses (as opposed to an internal failure).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VocaError::Validation(_)
                | VocaError::IncompleteAssessment { .. }
                | VocaError::AssessmentClosed(_)
                | VocaError::AssessmentNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VocaError>;
