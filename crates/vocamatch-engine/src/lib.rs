//! vocamatch-engine: Assessment lifecycle and score derivation.
//!
//! The service accepts round submissions, closes an assessment on its last
//! round, and serves the derived need, value and occupation-match rows.

pub mod pipeline;
pub mod service;
pub mod update;

pub use pipeline::derive_scores;
pub use service::{AssessmentService, SubmissionOutcome};
pub use update::{start_recompute_queue, RecomputeTrigger};
