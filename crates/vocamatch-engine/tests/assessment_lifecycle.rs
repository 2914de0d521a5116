//! End-to-end assessment flow against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use uuid::Uuid;
use vocamatch_common::{InstrumentRegistry, ValidationError, VocaError};
use vocamatch_db::{AssessmentStore, InMemoryStore};
use vocamatch_engine::{start_recompute_queue, AssessmentService, RecomputeTrigger};
use vocamatch_ranker::{OccupationCatalog, StaticCatalog};
use vocamatch_test_utils::{
    profile_matching, rankings_by_need_order, rankings_for_preference, rankings_in_config_order,
    reference_instrument, sample_profiles,
};

fn service(catalog: Option<StaticCatalog>) -> AssessmentService {
    let registry = Arc::new(InstrumentRegistry::new(reference_instrument()));
    let store: Arc<dyn AssessmentStore> = Arc::new(InMemoryStore::new());
    let service = AssessmentService::new(registry, store);
    match catalog {
        Some(c) => service.with_catalog(Arc::new(c)),
        None => service,
    }
}

fn sample_catalog() -> StaticCatalog {
    StaticCatalog::from_profiles("2025.1", sample_profiles(&reference_instrument())).unwrap()
}

async fn complete_with(service: &AssessmentService, rankings: Vec<(u32, Vec<String>)>) -> Uuid {
    let assessment = service.start_assessment(Some("subject-1".into())).await.unwrap();
    for (round, ranking) in rankings {
        service.submit_response(assessment.id, round, ranking).await.unwrap();
    }
    assessment.id
}

#[tokio::test]
async fn test_full_assessment_lifecycle() {
    let service = service(Some(sample_catalog()));
    let instrument = reference_instrument();
    let assessment = service.start_assessment(None).await.unwrap();
    assert!(!assessment.is_completed());
    assert_eq!(assessment.instrument_version, instrument.version());

    let rankings = rankings_by_need_order(&instrument);
    let last = rankings.len() - 1;
    for (i, (round, ranking)) in rankings.into_iter().enumerate() {
        let outcome = service.submit_response(assessment.id, round, ranking).await.unwrap();
        assert_eq!(outcome.answered, i + 1);
        assert_eq!(outcome.required, 21);
        assert_eq!(outcome.completed, i == last);
        if i < last {
            let err = service.get_need_scores(assessment.id).await.unwrap_err();
            assert!(matches!(err, VocaError::IncompleteAssessment { .. }));
        }
    }

    let stored = service.get_assessment(assessment.id).await.unwrap();
    assert!(stored.is_completed());

    let needs = service.get_need_scores(assessment.id).await.unwrap();
    assert_eq!(needs.len(), 21);
    assert!(needs.iter().all(|n| n.appearances == 5 && n.min_possible == -20 && n.max_possible == 20));

    let values = service.get_value_scores(assessment.id).await.unwrap();
    assert_eq!(
        values.iter().map(|v| v.value_code.as_str()).collect::<Vec<_>>(),
        vec!["ACH", "WCO", "REC", "REL", "SUP", "IND"]
    );
    assert_eq!(values[0].std_score_0_100, 100.0 * (38.0 + 40.0) / 80.0);

    let matches = service.get_matches(assessment.id, None).await.unwrap();
    assert_eq!(matches.len(), 6);
    let managers = matches.iter().find(|m| m.occupation_code == "11-1021.00").unwrap();
    assert!(managers.is_strong_match);
    assert_eq!(managers.rank_within_job_zone, Some(1));
    let cooks = matches.iter().find(|m| m.occupation_code == "35-2014.00").unwrap();
    assert!(cooks.correlation < 0.0);
    assert_eq!(cooks.rank_within_job_zone, None);
}

#[tokio::test]
async fn test_submission_after_completion_is_rejected() {
    let service = service(Some(sample_catalog()));
    let instrument = reference_instrument();
    let id = complete_with(&service, rankings_by_need_order(&instrument)).await;
    let before = service.get_derived(id).await.unwrap();

    let round = instrument.round(1).unwrap().needs.clone();
    let err = service.submit_response(id, 1, round).await.unwrap_err();
    assert!(matches!(err, VocaError::AssessmentClosed(_)));

    let after = service.get_derived(id).await.unwrap();
    assert!(before.same_rows(&after));
    assert_eq!(before.computed_at, after.computed_at);
}

#[tokio::test]
async fn test_invalid_submissions_leave_assessment_untouched() {
    let service = service(None);
    let instrument = reference_instrument();
    let assessment = service.start_assessment(None).await.unwrap();
    let round = instrument.round(3).unwrap().needs.clone();

    let short = round[..4].to_vec();
    let err = service.submit_response(assessment.id, 3, short).await.unwrap_err();
    assert!(matches!(
        err,
        VocaError::Validation(ValidationError::LengthMismatch { round: 3, expected: 5, actual: 4 })
    ));

    let mut duplicated = round.clone();
    duplicated[4] = duplicated[0].clone();
    let err = service.submit_response(assessment.id, 3, duplicated).await.unwrap_err();
    assert!(matches!(err, VocaError::Validation(ValidationError::DuplicateNeed { .. })));

    let mut foreign = round.clone();
    foreign[2] = "not_a_need".into();
    let err = service.submit_response(assessment.id, 3, foreign).await.unwrap_err();
    assert!(matches!(err, VocaError::Validation(ValidationError::UnknownNeed { .. })));

    let err = service.submit_response(assessment.id, 99, round.clone()).await.unwrap_err();
    assert!(matches!(err, VocaError::Validation(ValidationError::UnknownRound(99))));

    assert_eq!(service.store().responses(assessment.id).await.unwrap().len(), 0);

    service.submit_response(assessment.id, 3, round.clone()).await.unwrap();
    let mut reversed = round;
    reversed.reverse();
    let err = service.submit_response(assessment.id, 3, reversed).await.unwrap_err();
    assert!(matches!(
        err,
        VocaError::Validation(ValidationError::AlreadySubmitted { round: 3, .. })
    ));
    let stored = service.store().responses(assessment.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].ranking, instrument.round(3).unwrap().needs);
}

#[tokio::test]
async fn test_unknown_assessment() {
    let service = service(None);
    let id = Uuid::new_v4();
    assert!(matches!(
        service.get_assessment(id).await,
        Err(VocaError::AssessmentNotFound(_))
    ));
    assert!(matches!(
        service.submit_response(id, 1, vec![]).await,
        Err(VocaError::AssessmentNotFound(_))
    ));
    assert!(matches!(service.recompute(id).await, Err(VocaError::AssessmentNotFound(_))));
}

#[tokio::test]
async fn test_recompute_is_idempotent() {
    let service = service(Some(sample_catalog()));
    let id = complete_with(&service, rankings_by_need_order(&reference_instrument())).await;
    let first = service.get_derived(id).await.unwrap();

    service.recompute(id).await.unwrap();
    service.recompute(id).await.unwrap();
    let again = service.get_derived(id).await.unwrap();
    assert!(first.same_rows(&again));
}

#[tokio::test]
async fn test_recompute_requires_all_rounds() {
    let service = service(None);
    let assessment = service.start_assessment(None).await.unwrap();
    let err = service.recompute(assessment.id).await.unwrap_err();
    assert!(matches!(
        err,
        VocaError::IncompleteAssessment { answered: 0, required: 21, .. }
    ));
}

#[tokio::test]
async fn test_missing_catalog_then_refresh() {
    let service = service(None);
    let id = complete_with(&service, rankings_by_need_order(&reference_instrument())).await;

    assert_eq!(service.get_need_scores(id).await.unwrap().len(), 21);
    assert!(service.get_matches(id, None).await.unwrap().is_empty());
    assert!(service.get_derived(id).await.unwrap().catalog_version.is_none());
    assert!(service.catalog_version().await.is_none());

    let recomputed = service.replace_catalog(Arc::new(sample_catalog())).await.unwrap();
    assert_eq!(recomputed, 1);
    assert_eq!(service.catalog_version().await.as_deref(), Some("2025.1"));
    assert_eq!(service.get_matches(id, None).await.unwrap().len(), 6);
    assert_eq!(
        service.get_derived(id).await.unwrap().catalog_version.as_deref(),
        Some("2025.1")
    );
}

#[tokio::test]
async fn test_identical_profile_is_first_in_its_zone() {
    let instrument = reference_instrument();
    let scout = service(None);
    let scout_id = complete_with(&scout, rankings_by_need_order(&instrument)).await;
    let needs = scout.get_need_scores(scout_id).await.unwrap();

    let mut profiles = sample_profiles(&instrument);
    profiles.push(profile_matching(&needs, "99-9999.00", 5));
    let service = service(Some(StaticCatalog::from_profiles("twin", profiles).unwrap()));
    let id = complete_with(&service, rankings_by_need_order(&instrument)).await;

    let zone5 = service.get_matches(id, Some(5)).await.unwrap();
    assert_eq!(zone5.len(), 1);
    assert_eq!(zone5[0].occupation_code, "99-9999.00");
    assert_eq!(zone5[0].correlation, 1.0);
    assert!(zone5[0].is_strong_match);
    assert_eq!(zone5[0].rank_within_job_zone, Some(1));

    let all = service.get_matches(id, None).await.unwrap();
    assert_eq!(all.len(), 7);
    assert_eq!(all.last().map(|m| m.job_zone), Some(5));
}

#[tokio::test]
async fn test_flat_subject_matches_nothing() {
    let service = service(Some(sample_catalog()));
    let id = complete_with(&service, rankings_in_config_order(&reference_instrument())).await;
    let matches = service.get_matches(id, None).await.unwrap();
    assert_eq!(matches.len(), 6);
    assert!(matches.iter().all(|m| m.correlation == 0.0 && !m.is_minimum_match));
}

#[tokio::test]
async fn test_job_zone_filter_and_order() {
    let service = service(Some(sample_catalog()));
    let id = complete_with(&service, rankings_by_need_order(&reference_instrument())).await;

    let all = service.get_matches(id, None).await.unwrap();
    let zones: Vec<u8> = all.iter().map(|m| m.job_zone).collect();
    let mut sorted = zones.clone();
    sorted.sort();
    assert_eq!(zones, sorted);

    let zone2 = service.get_matches(id, Some(2)).await.unwrap();
    assert_eq!(zone2.len(), 3);
    assert!(service.get_matches(id, Some(5)).await.unwrap().is_empty());

    for zone in [2u8, 3, 4] {
        let ranks: Vec<u32> = all
            .iter()
            .filter(|m| m.job_zone == zone)
            .filter_map(|m| m.rank_within_job_zone)
            .collect();
        assert_eq!(ranks, (1..=ranks.len() as u32).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_concurrent_submissions_complete_once() {
    let service = Arc::new(service(Some(sample_catalog())));
    let id = service.start_assessment(None).await.unwrap().id;
    let instrument = reference_instrument();

    let handles: Vec<_> = rankings_for_preference(&instrument, &["autonomy", "creativity"])
        .into_iter()
        .map(|(round, ranking)| {
            let service = service.clone();
            tokio::spawn(async move { service.submit_response(id, round, ranking).await })
        })
        .collect();

    let mut completed = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().completed {
            completed += 1;
        }
    }
    assert_eq!(completed, 1);

    let needs = service.get_need_scores(id).await.unwrap();
    let autonomy = needs.iter().find(|n| n.need_code == "autonomy").unwrap();
    assert_eq!(autonomy.std_score_0_100, 100.0);
}

#[tokio::test]
async fn test_recompute_queue_applies_catalog_refresh() {
    let service = Arc::new(service(None));
    let id = complete_with(&service, rankings_by_need_order(&reference_instrument())).await;

    let tx = start_recompute_queue(service.clone());
    let catalog: Arc<dyn OccupationCatalog> = Arc::new(sample_catalog());
    tx.send(RecomputeTrigger::CatalogRefreshed { catalog }).unwrap();
    tx.send(RecomputeTrigger::Assessment(Uuid::new_v4())).unwrap();

    let mut refreshed = false;
    for _ in 0..100 {
        let derived = service.get_derived(id).await.unwrap();
        if derived.catalog_version.as_deref() == Some("2025.1") {
            refreshed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(refreshed);
    assert_eq!(service.get_matches(id, None).await.unwrap().len(), 6);
}
