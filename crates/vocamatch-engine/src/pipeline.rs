//! Score derivation for one completed assessment.
//!
//! Pure and synchronous: the same responses, instrument and catalog always
//! produce the same rows (apart from `computed_at`).

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vocamatch_common::{DerivedScores, Instrument, Result, RoundResponse, ValidationError};
use vocamatch_ranker::{
    aggregate_needs, aggregate_values, match_occupations, rank_points, rank_within_job_zones,
    MatcherOptions, OccupationCatalog, SubjectVector,
};

/// Run normalisation, need and value aggregation, matching and job-zone
/// ranking over a full set of responses.
///
/// With no catalog, or an empty one, need and value rows are still produced;
/// matches are empty and `catalog_version` is `None`.
pub fn derive_scores(
    assessment_id: Uuid,
    instrument: &Instrument,
    responses: &[RoundResponse],
    catalog: Option<&dyn OccupationCatalog>,
    options: &MatcherOptions,
) -> Result<DerivedScores> {
    let start = Instant::now();

    let mut round_points = BTreeMap::new();
    for response in responses {
        let round = instrument
            .round(response.round_index)
            .ok_or(ValidationError::UnknownRound(response.round_index))?;
        round_points.insert(response.round_index, rank_points(round, &response.ranking)?);
    }

    let need_scores = aggregate_needs(assessment_id, instrument, &round_points)?;
    let value_scores = aggregate_values(assessment_id, instrument, &need_scores)?;

    let (catalog_version, matches) = match catalog.filter(|c| !c.is_empty()) {
        Some(catalog) => {
            let subject = SubjectVector::from_need_scores(instrument, &need_scores)?;
            let unranked =
                match_occupations(assessment_id, &subject, instrument, catalog.profiles(), options);
            (Some(catalog.version().to_string()), rank_within_job_zones(unranked))
        }
        None => {
            warn!(%assessment_id, "Occupation catalog unavailable; skipping matching");
            (None, Vec::new())
        }
    };

    let n_minimum = matches.iter().filter(|m| m.is_minimum_match).count();
    debug!(
        %assessment_id,
        needs = need_scores.len(),
        values = value_scores.len(),
        "Aggregated need and value scores"
    );
    info!(
        %assessment_id,
        instrument = %instrument.version(),
        catalog = catalog_version.as_deref().unwrap_or("-"),
        occupations = matches.len(),
        minimum_matches = n_minimum,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Derived assessment scores"
    );

    Ok(DerivedScores {
        assessment_id,
        instrument_version: instrument.version().to_string(),
        catalog_version,
        need_scores,
        value_scores,
        matches,
        computed_at: Utc::now(),
    })
}
