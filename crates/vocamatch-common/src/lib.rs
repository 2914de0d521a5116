//! vocamatch-common: Shared types, errors, and instrument configuration used across all Vocamatch crates.

pub mod error;
pub mod entities;
pub mod instrument;

// Re-export commonly used types
pub use error::{Result, ValidationError, VocaError};
pub use entities::{
    Assessment, AssessmentStatus, DerivedScores, MatchResult, NeedScore, OccupationProfile,
    RoundResponse, ValueScore,
};
pub use instrument::{Instrument, InstrumentRegistry, InstrumentSpec, Need, NeedBounds, Round, Value};
