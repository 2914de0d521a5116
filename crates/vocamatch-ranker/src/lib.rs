//! vocamatch-ranker: Work-value scoring and occupation matching.
//!
//! Stages, in dependency order: rank normalisation, need aggregation,
//! value aggregation, occupation matching, job-zone ranking.

pub mod normalise;
pub mod aggregate;
pub mod values;
pub mod thresholds;
pub mod matcher;
pub mod job_zone;
pub mod catalog_provider;

pub use normalise::{rank_points, std_score_0_100, RoundPoints, RANK_POINTS};
pub use aggregate::aggregate_needs;
pub use values::aggregate_values;
pub use thresholds::{MatchThresholds, MatchTier};
pub use matcher::{match_occupations, pearson, MatcherOptions, SubjectVector};
pub use job_zone::rank_within_job_zones;
pub use catalog_provider::{OccupationCatalog, StaticCatalog};
