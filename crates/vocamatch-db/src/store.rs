//! Assessment store trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use vocamatch_common::{Assessment, DerivedScores, RoundResponse};

use crate::error::Result;

/// Storage for assessments, their responses, and derived rows.
///
/// Round responses are append-only and unique per (assessment, round).
/// Derived rows are always written as one `DerivedScores` bundle.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Insert a new assessment.
    async fn insert_assessment(&self, assessment: &Assessment) -> Result<()>;

    /// Find an assessment by ID.
    async fn find_assessment(&self, id: Uuid) -> Result<Option<Assessment>>;

    /// IDs of every completed assessment.
    async fn completed_assessments(&self) -> Result<Vec<Uuid>>;

    /// Append a response; returns how many responses the assessment now has.
    ///
    /// Fails with `DuplicateResponse` if the round is already stored and with
    /// `AlreadyCompleted` once the assessment is closed.
    async fn append_response(&self, response: &RoundResponse) -> Result<usize>;

    /// All responses of an assessment, ordered by round index.
    async fn responses(&self, assessment_id: Uuid) -> Result<Vec<RoundResponse>>;

    /// Close an assessment and publish its derived rows in one step.
    async fn complete(
        &self,
        assessment_id: Uuid,
        completed_at: DateTime<Utc>,
        derived: DerivedScores,
    ) -> Result<()>;

    /// Replace all derived rows of a completed assessment.
    async fn replace_derived(&self, assessment_id: Uuid, derived: DerivedScores) -> Result<()>;

    /// Current derived rows, if any.
    async fn derived(&self, assessment_id: Uuid) -> Result<Option<Arc<DerivedScores>>>;

    /// Row counts.
    async fn stats(&self) -> Result<StoreStats>;
}

/// Store statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub assessments: u64,
    pub completed: u64,
    pub responses: u64,
}
