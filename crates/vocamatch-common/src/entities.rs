/// Core entity types for assessments and their derived scores.
/// Reference data (needs, values, rounds) lives in `instrument`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    InProgress,
    Completed,
}

/// One taking of the instrument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assessment {
    pub id: Uuid,
    pub subject_ref: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub instrument_version: String,
}

impl Assessment {
    pub fn new(subject_ref: Option<String>, instrument_version: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_ref,
            started_at: Utc::now(),
            completed_at: None,
            instrument_version: instrument_version.into(),
        }
    }

    pub fn status(&self) -> AssessmentStatus {
        if self.completed_at.is_some() {
            AssessmentStatus::Completed
        } else {
            AssessmentStatus::InProgress
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status() == AssessmentStatus::Completed
    }
}

// ---------------------------------------------------------------------------
// Round response
// ---------------------------------------------------------------------------

/// One submitted ranking, most important need first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundResponse {
    pub assessment_id: Uuid,
    pub round_index: u32,
    pub ranking: Vec<String>,
    pub submitted_at: DateTime<Utc>,
}

impl RoundResponse {
    pub fn new(assessment_id: Uuid, round_index: u32, ranking: Vec<String>) -> Self {
        Self {
            assessment_id,
            round_index,
            ranking,
            submitted_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Derived scores
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NeedScore {
    pub assessment_id: Uuid,
    pub need_code: String,
    pub raw_score: i32,
    pub appearances: u32,
    pub min_possible: i32,
    pub max_possible: i32,
    pub std_score_0_100: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueScore {
    pub assessment_id: Uuid,
    pub value_code: String,
    pub raw_sum: i32,
    pub raw_mean: f64,
    pub std_score_0_100: f64,
    pub need_count: usize,
}

/// Similarity of one assessment to one occupation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub assessment_id: Uuid,
    pub occupation_code: String,
    pub title: String,
    pub job_zone: u8,
    pub correlation: f64,
    pub is_minimum_match: bool,
    pub is_strong_match: bool,
    /// Dense 1..N among minimum matches of the same job zone.
    pub rank_within_job_zone: Option<u32>,
}

/// Everything the pipeline derives for one assessment. Stored and replaced as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedScores {
    pub assessment_id: Uuid,
    pub instrument_version: String,
    /// None when the catalog was unavailable and matching was skipped.
    pub catalog_version: Option<String>,
    pub need_scores: Vec<NeedScore>,
    pub value_scores: Vec<ValueScore>,
    pub matches: Vec<MatchResult>,
    pub computed_at: DateTime<Utc>,
}

impl DerivedScores {
    /// Compare the derived rows, ignoring when they were computed.
    pub fn same_rows(&self, other: &DerivedScores) -> bool {
        self.assessment_id == other.assessment_id
            && self.instrument_version == other.instrument_version
            && self.catalog_version == other.catalog_version
            && self.need_scores == other.need_scores
            && self.value_scores == other.value_scores
            && self.matches == other.matches
    }
}

// ---------------------------------------------------------------------------
// Occupation reference data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OccupationProfile {
    pub code: String,
    pub title: String,
    pub job_zone: u8,
    /// Reference 0–100 score keyed by need code.
    pub need_scores: HashMap<String, f64>,
}

impl OccupationProfile {
    pub fn new(code: impl Into<String>, title: impl Into<String>, job_zone: u8) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            job_zone,
            need_scores: HashMap::new(),
        }
    }

    pub fn with_score(mut self, need_code: impl Into<String>, score: f64) -> Self {
        self.need_scores.insert(need_code.into(), score);
        self
    }
}
