//! Embedded in-memory assessment store.
//!
//! Every assessment lives in one row guarded by a single `RwLock`, so each
//! trait method is one atomic step: a reader never sees a completed
//! assessment without its derived rows, or half of a replacement.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;
use vocamatch_common::{Assessment, DerivedScores, RoundResponse};

use crate::error::{DbError, Result};
use crate::store::{AssessmentStore, StoreStats};

#[derive(Debug)]
struct AssessmentRow {
    assessment: Assessment,
    responses: BTreeMap<u32, RoundResponse>,
    derived: Option<Arc<DerivedScores>>,
}

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    rows: RwLock<HashMap<Uuid, AssessmentRow>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_owner(assessment_id: Uuid, derived: &DerivedScores) -> Result<()> {
    if derived.assessment_id != assessment_id {
        return Err(DbError::AssessmentMismatch {
            expected: assessment_id,
            actual: derived.assessment_id,
        });
    }
    Ok(())
}

#[async_trait]
impl AssessmentStore for InMemoryStore {
    async fn insert_assessment(&self, assessment: &Assessment) -> Result<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&assessment.id) {
            return Err(DbError::Duplicate(format!("assessment {}", assessment.id)));
        }
        rows.insert(
            assessment.id,
            AssessmentRow {
                assessment: assessment.clone(),
                responses: BTreeMap::new(),
                derived: None,
            },
        );
        Ok(())
    }

    async fn find_assessment(&self, id: Uuid) -> Result<Option<Assessment>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&id).map(|r| r.assessment.clone()))
    }

    async fn completed_assessments(&self) -> Result<Vec<Uuid>> {
        let rows = self.rows.read().await;
        let mut ids: Vec<Uuid> = rows
            .values()
            .filter(|r| r.assessment.is_completed())
            .map(|r| r.assessment.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn append_response(&self, response: &RoundResponse) -> Result<usize> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&response.assessment_id)
            .ok_or(DbError::AssessmentNotFound(response.assessment_id))?;

        if row.assessment.is_completed() {
            return Err(DbError::AlreadyCompleted(response.assessment_id));
        }
        if row.responses.contains_key(&response.round_index) {
            return Err(DbError::DuplicateResponse {
                assessment_id: response.assessment_id,
                round: response.round_index,
            });
        }

        row.responses.insert(response.round_index, response.clone());
        debug!(
            assessment_id = %response.assessment_id,
            round = response.round_index,
            stored = row.responses.len(),
            "Stored round response"
        );
        Ok(row.responses.len())
    }

    async fn responses(&self, assessment_id: Uuid) -> Result<Vec<RoundResponse>> {
        let rows = self.rows.read().await;
        let row = rows
            .get(&assessment_id)
            .ok_or(DbError::AssessmentNotFound(assessment_id))?;
        Ok(row.responses.values().cloned().collect())
    }

    async fn complete(
        &self,
        assessment_id: Uuid,
        completed_at: DateTime<Utc>,
        derived: DerivedScores,
    ) -> Result<()> {
        check_owner(assessment_id, &derived)?;
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&assessment_id)
            .ok_or(DbError::AssessmentNotFound(assessment_id))?;
        if row.assessment.is_completed() {
            return Err(DbError::AlreadyCompleted(assessment_id));
        }
        row.assessment.completed_at = Some(completed_at);
        row.derived = Some(Arc::new(derived));
        Ok(())
    }

    async fn replace_derived(&self, assessment_id: Uuid, derived: DerivedScores) -> Result<()> {
        check_owner(assessment_id, &derived)?;
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&assessment_id)
            .ok_or(DbError::AssessmentNotFound(assessment_id))?;
        if !row.assessment.is_completed() {
            return Err(DbError::NotCompleted(assessment_id));
        }
        row.derived = Some(Arc::new(derived));
        Ok(())
    }

    async fn derived(&self, assessment_id: Uuid) -> Result<Option<Arc<DerivedScores>>> {
        let rows = self.rows.read().await;
        let row = rows
            .get(&assessment_id)
            .ok_or(DbError::AssessmentNotFound(assessment_id))?;
        Ok(row.derived.clone())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let rows = self.rows.read().await;
        Ok(StoreStats {
            assessments: rows.len() as u64,
            completed: rows.values().filter(|r| r.assessment.is_completed()).count() as u64,
            responses: rows.values().map(|r| r.responses.len() as u64).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derived_for(id: Uuid) -> DerivedScores {
        DerivedScores {
            assessment_id: id,
            instrument_version: "v1".into(),
            catalog_version: None,
            need_scores: vec![],
            value_scores: vec![],
            matches: vec![],
            computed_at: Utc::now(),
        }
    }

    fn response(id: Uuid, round: u32) -> RoundResponse {
        RoundResponse::new(id, round, vec!["a".into(), "b".into()])
    }

    #[tokio::test]
    async fn test_append_counts_and_rejects_duplicates() {
        let store = InMemoryStore::new();
        let a = Assessment::new(None, "v1");
        store.insert_assessment(&a).await.unwrap();

        assert_eq!(store.append_response(&response(a.id, 2)).await.unwrap(), 1);
        assert_eq!(store.append_response(&response(a.id, 1)).await.unwrap(), 2);

        let mut dup = response(a.id, 2);
        dup.ranking.reverse();
        let err = store.append_response(&dup).await.unwrap_err();
        assert!(matches!(err, DbError::DuplicateResponse { round: 2, .. }));

        let stored = store.responses(a.id).await.unwrap();
        assert_eq!(stored.iter().map(|r| r.round_index).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(stored[1].ranking, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_assessment_rejected() {
        let store = InMemoryStore::new();
        let a = Assessment::new(None, "v1");
        store.insert_assessment(&a).await.unwrap();
        assert!(matches!(store.insert_assessment(&a).await, Err(DbError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_complete_is_terminal() {
        let store = InMemoryStore::new();
        let a = Assessment::new(None, "v1");
        store.insert_assessment(&a).await.unwrap();
        store.append_response(&response(a.id, 1)).await.unwrap();

        assert!(store.derived(a.id).await.unwrap().is_none());
        store.complete(a.id, Utc::now(), derived_for(a.id)).await.unwrap();

        let found = store.find_assessment(a.id).await.unwrap().unwrap();
        assert!(found.is_completed());
        assert!(store.derived(a.id).await.unwrap().is_some());
        assert_eq!(store.completed_assessments().await.unwrap(), vec![a.id]);

        assert!(matches!(
            store.append_response(&response(a.id, 2)).await,
            Err(DbError::AlreadyCompleted(_))
        ));
        assert!(matches!(
            store.complete(a.id, Utc::now(), derived_for(a.id)).await,
            Err(DbError::AlreadyCompleted(_))
        ));
    }

    #[tokio::test]
    async fn test_replace_requires_completion_and_owner() {
        let store = InMemoryStore::new();
        let a = Assessment::new(None, "v1");
        store.insert_assessment(&a).await.unwrap();

        assert!(matches!(
            store.replace_derived(a.id, derived_for(a.id)).await,
            Err(DbError::NotCompleted(_))
        ));
        store.complete(a.id, Utc::now(), derived_for(a.id)).await.unwrap();
        assert!(matches!(
            store.replace_derived(a.id, derived_for(Uuid::new_v4())).await,
            Err(DbError::AssessmentMismatch { .. })
        ));

        let mut next = derived_for(a.id);
        next.catalog_version = Some("2025.2".into());
        store.replace_derived(a.id, next).await.unwrap();
        let current = store.derived(a.id).await.unwrap().unwrap();
        assert_eq!(current.catalog_version.as_deref(), Some("2025.2"));
    }

    #[test]
    fn test_unknown_assessment() {
        tokio_test::block_on(async {
            let store = InMemoryStore::new();
            let id = Uuid::new_v4();
            assert!(store.find_assessment(id).await.unwrap().is_none());
            assert!(matches!(
                store.append_response(&response(id, 1)).await,
                Err(DbError::AssessmentNotFound(_))
            ));
            assert!(matches!(store.derived(id).await, Err(DbError::AssessmentNotFound(_))));
        });
    }

    #[tokio::test]
    async fn test_stats() {
        let store = InMemoryStore::new();
        let a = Assessment::new(None, "v1");
        let b = Assessment::new(None, "v1");
        store.insert_assessment(&a).await.unwrap();
        store.insert_assessment(&b).await.unwrap();
        store.append_response(&response(a.id, 1)).await.unwrap();
        store.append_response(&response(b.id, 1)).await.unwrap();
        store.append_response(&response(b.id, 2)).await.unwrap();
        store.complete(b.id, Utc::now(), derived_for(b.id)).await.unwrap();
        assert_eq!(
            store.stats().await.unwrap(),
            StoreStats { assessments: 2, completed: 1, responses: 3 }
        );
    }

    #[test]
    fn test_error_maps_to_domain_error() {
        use vocamatch_common::{ValidationError, VocaError};
        let id = Uuid::nil();
        let err: VocaError = DbError::DuplicateResponse { assessment_id: id, round: 4 }.into();
        assert!(matches!(
            err,
            VocaError::Validation(ValidationError::AlreadySubmitted { round: 4, .. })
        ));
        let err: VocaError = DbError::AlreadyCompleted(id).into();
        assert!(matches!(err, VocaError::AssessmentClosed(_)));
    }
}
