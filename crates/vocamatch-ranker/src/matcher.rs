//! Occupation matching by Pearson correlation.
//!
//! The subject's need vector is centred once; every occupation is then an
//! independent dot product against its own centred reference vector, so the
//! catalog can be mapped in parallel and results never depend on its order.
//!
//! A vector with no variance has no defined correlation. It scores r = 0 and
//! never matches, so a single flat profile cannot abort a matching run.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;
use vocamatch_common::{Instrument, MatchResult, NeedScore, OccupationProfile, Result, VocaError};

use crate::thresholds::MatchThresholds;

const VARIANCE_EPSILON: f64 = 1e-12;

/// Matching knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MatcherOptions {
    pub thresholds: MatchThresholds,
    /// Catalogs at least this large are correlated on the rayon pool.
    pub parallel_threshold: usize,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            thresholds: MatchThresholds::default(),
            parallel_threshold: 64,
        }
    }
}

/// Mean-centred subject vector, ready to correlate against many profiles.
#[derive(Debug, Clone)]
pub struct SubjectVector {
    centred: Vec<f64>,
    sum_sq: f64,
}

impl SubjectVector {
    pub fn new(values: &[f64]) -> Self {
        let (centred, sum_sq) = centre(values);
        Self { centred, sum_sq }
    }

    /// Build from need scores, aligned to the instrument's need order.
    pub fn from_need_scores(instrument: &Instrument, need_scores: &[NeedScore]) -> Result<Self> {
        let mut values = vec![f64::NAN; instrument.needs().len()];
        for score in need_scores {
            if let Some(pos) = instrument.need_position(&score.need_code) {
                values[pos] = score.std_score_0_100;
            }
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(VocaError::Pipeline(format!(
                "no score for need '{}'",
                instrument.needs()[pos].code
            )));
        }
        Ok(Self::new(&values))
    }

    pub fn len(&self) -> usize {
        self.centred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centred.is_empty()
    }

    /// True when every entry is the same (no discrimination across needs).
    pub fn is_degenerate(&self) -> bool {
        self.sum_sq < VARIANCE_EPSILON
    }

    /// Pearson r against another vector of the same length; 0 when undefined.
    pub fn correlate(&self, other: &[f64]) -> f64 {
        if other.len() != self.centred.len() || self.is_degenerate() {
            return 0.0;
        }
        let (other_centred, other_sum_sq) = centre(other);
        if other_sum_sq < VARIANCE_EPSILON {
            return 0.0;
        }
        let cross: f64 = self
            .centred
            .iter()
            .zip(other_centred.iter())
            .map(|(a, b)| a * b)
            .sum();
        let r = cross / (self.sum_sq * other_sum_sq).sqrt();
        if r.is_finite() {
            r.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

fn centre(values: &[f64]) -> (Vec<f64>, f64) {
    if values.is_empty() {
        return (vec![], 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let centred: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let sum_sq = centred.iter().map(|c| c * c).sum();
    (centred, sum_sq)
}

/// Pearson product-moment correlation of two paired samples.
///
/// Returns 0 for mismatched lengths, fewer than two points, or zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }
    SubjectVector::new(x).correlate(y)
}

/// Reference vector of a profile in instrument need order.
/// None if the profile lacks a finite score for some need.
fn profile_vector(instrument: &Instrument, profile: &OccupationProfile) -> Option<Vec<f64>> {
    instrument
        .needs()
        .iter()
        .map(|n| profile.need_scores.get(&n.code).copied().filter(|v| v.is_finite()))
        .collect()
}

fn match_one(
    assessment_id: Uuid,
    subject: &SubjectVector,
    instrument: &Instrument,
    profile: &OccupationProfile,
    thresholds: &MatchThresholds,
) -> MatchResult {
    let correlation = match profile_vector(instrument, profile) {
        Some(reference) => subject.correlate(&reference),
        None => {
            warn!(
                occupation = %profile.code,
                "Occupation profile is missing need scores; treating as no match"
            );
            0.0
        }
    };
    let tier = thresholds.classify(correlation);

    MatchResult {
        assessment_id,
        occupation_code: profile.code.clone(),
        title: profile.title.clone(),
        job_zone: profile.job_zone,
        correlation,
        is_minimum_match: tier.is_minimum_match(),
        is_strong_match: tier.is_strong_match(),
        rank_within_job_zone: None,
    }
}

/// Correlate the subject against every profile. Results are unranked and in
/// catalog order; see `job_zone::rank_within_job_zones`.
pub fn match_occupations(
    assessment_id: Uuid,
    subject: &SubjectVector,
    instrument: &Instrument,
    profiles: &[OccupationProfile],
    options: &MatcherOptions,
) -> Vec<MatchResult> {
    if subject.is_degenerate() {
        debug!(%assessment_id, "Subject vector has zero variance; no occupation can match");
    }

    #[cfg(feature = "parallel")]
    {
        if profiles.len() >= options.parallel_threshold && options.parallel_threshold > 0 {
            use rayon::prelude::*;
            return profiles
                .par_iter()
                .map(|p| match_one(assessment_id, subject, instrument, p, &options.thresholds))
                .collect();
        }
    }

    profiles
        .iter()
        .map(|p| match_one(assessment_id, subject, instrument, p, &options.thresholds))
        .collect()
}
