//! Vocamatch Store Layer
//!
//! This crate provides the assessment store: assessments, their append-only
//! round responses, and the derived score rows computed from them.
//!
//! # Guarantees
//!
//! - A round response is stored at most once per (assessment, round)
//! - Responses are never accepted for a completed assessment
//! - Completion and its derived rows become visible together
//! - Derived rows are replaced as a whole, never patched
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vocamatch_common::Assessment;
//! use vocamatch_db::{AssessmentStore, InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store: Arc<dyn AssessmentStore> = Arc::new(InMemoryStore::new());
//!     let assessment = Assessment::new(None, "wip-21x5-v1");
//!     store.insert_assessment(&assessment).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod store;
pub mod memory;

pub use error::{DbError, Result};
pub use store::{AssessmentStore, StoreStats};
pub use memory::InMemoryStore;
