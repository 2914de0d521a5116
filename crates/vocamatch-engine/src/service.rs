//! Assessment lifecycle: start, submit rounds, complete, read and recompute.
//!
//! Completion is atomic. The submission that stores the last round runs the
//! pipeline and publishes `completed_at` together with the derived rows, so
//! readers see either no scores or a full consistent set.
//!
//! Every catalog swap bumps a generation counter. Scores are tagged with the
//! generation they were computed against, and a write that lands after a
//! newer swap is recomputed until it matches the current catalog.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vocamatch_common::{
    Assessment, DerivedScores, Instrument, InstrumentRegistry, MatchResult, NeedScore, Result,
    RoundResponse, ValidationError, ValueScore, VocaError,
};
use vocamatch_db::{AssessmentStore, DbError};
use vocamatch_ranker::{rank_points, MatcherOptions, OccupationCatalog};

use crate::pipeline::derive_scores;

/// Result of accepting one round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub assessment_id: Uuid,
    pub round_index: u32,
    pub answered: usize,
    pub required: usize,
    /// True when this submission closed the assessment.
    pub completed: bool,
}

#[derive(Default)]
struct CatalogSlot {
    generation: u64,
    catalog: Option<Arc<dyn OccupationCatalog>>,
}

pub struct AssessmentService {
    instruments: Arc<InstrumentRegistry>,
    store: Arc<dyn AssessmentStore>,
    catalog: RwLock<CatalogSlot>,
    options: MatcherOptions,
}

impl AssessmentService {
    pub fn new(instruments: Arc<InstrumentRegistry>, store: Arc<dyn AssessmentStore>) -> Self {
        Self {
            instruments,
            store,
            catalog: RwLock::new(CatalogSlot::default()),
            options: MatcherOptions::default(),
        }
    }

    pub fn with_catalog(self, catalog: Arc<dyn OccupationCatalog>) -> Self {
        Self {
            catalog: RwLock::new(CatalogSlot {
                generation: 0,
                catalog: Some(catalog),
            }),
            ..self
        }
    }

    pub fn with_options(self, options: MatcherOptions) -> Result<Self> {
        if !options.thresholds.validate() {
            return Err(VocaError::Config(format!(
                "invalid match thresholds: minimum {} strong {}",
                options.thresholds.minimum, options.thresholds.strong
            )));
        }
        Ok(Self { options, ..self })
    }

    pub fn options(&self) -> &MatcherOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<dyn AssessmentStore> {
        &self.store
    }

    /// Open a new assessment on the current instrument version.
    pub async fn start_assessment(&self, subject_ref: Option<String>) -> Result<Assessment> {
        let instrument = self.instruments.current();
        let assessment = Assessment::new(subject_ref, instrument.version());
        self.store.insert_assessment(&assessment).await?;
        info!(
            assessment_id = %assessment.id,
            instrument = %assessment.instrument_version,
            "Started assessment"
        );
        Ok(assessment)
    }

    pub async fn get_assessment(&self, assessment_id: Uuid) -> Result<Assessment> {
        self.store
            .find_assessment(assessment_id)
            .await?
            .ok_or(VocaError::AssessmentNotFound(assessment_id))
    }

    /// Validate and store one round ranking (most important need first).
    ///
    /// Rejected submissions leave the assessment untouched. Storing the last
    /// missing round completes the assessment before this returns.
    pub async fn submit_response(
        &self,
        assessment_id: Uuid,
        round_index: u32,
        ranking: Vec<String>,
    ) -> Result<SubmissionOutcome> {
        let assessment = self.get_assessment(assessment_id).await?;
        if assessment.is_completed() {
            warn!(%assessment_id, round = round_index, "Rejected response for completed assessment");
            return Err(VocaError::AssessmentClosed(assessment_id));
        }
        let instrument = self.instruments.get(&assessment.instrument_version)?;
        let checked = match instrument.round(round_index) {
            Some(round) => rank_points(round, &ranking).map(|_| ()),
            None => Err(ValidationError::UnknownRound(round_index)),
        };
        if let Err(e) = checked {
            warn!(%assessment_id, round = round_index, "Rejected round response: {}", e);
            return Err(e.into());
        }

        let response = RoundResponse::new(assessment_id, round_index, ranking);
        let answered = self.store.append_response(&response).await?;
        let required = instrument.round_count();
        debug!(%assessment_id, round = round_index, answered, required, "Accepted round response");

        let completed = if answered >= required {
            self.complete(&assessment, &instrument).await?
        } else {
            false
        };

        Ok(SubmissionOutcome {
            assessment_id,
            round_index,
            answered,
            required,
            completed,
        })
    }

    /// Run the pipeline and close the assessment.
    ///
    /// Returns false if a concurrent call closed it first.
    async fn complete(&self, assessment: &Assessment, instrument: &Arc<Instrument>) -> Result<bool> {
        let (generation, derived) = self.compute(assessment.id, instrument.clone()).await?;
        match self.store.complete(assessment.id, Utc::now(), derived).await {
            Ok(()) => {
                info!(assessment_id = %assessment.id, "Completed assessment");
                self.catch_up(assessment.id, instrument, generation).await?;
                Ok(true)
            }
            Err(DbError::AlreadyCompleted(_)) => {
                debug!(assessment_id = %assessment.id, "Assessment completed concurrently");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Score stored responses against the current catalog. Returns the
    /// catalog generation the scores belong to.
    async fn compute(
        &self,
        assessment_id: Uuid,
        instrument: Arc<Instrument>,
    ) -> Result<(u64, DerivedScores)> {
        let responses = self.store.responses(assessment_id).await?;
        let (generation, catalog) = {
            let slot = self.catalog.read().await;
            (slot.generation, slot.catalog.clone())
        };
        let options = self.options;

        let derived = tokio::task::spawn_blocking(move || {
            derive_scores(
                assessment_id,
                &instrument,
                &responses,
                catalog.as_deref(),
                &options,
            )
        })
        .await
        .map_err(|e| VocaError::Pipeline(format!("scoring task failed: {e}")))??;
        Ok((generation, derived))
    }

    /// Rewrite the derived rows of a completed assessment until they were
    /// computed against the latest catalog generation.
    async fn catch_up(&self, assessment_id: Uuid, instrument: &Arc<Instrument>, mut written: u64) -> Result<()> {
        loop {
            let current = self.catalog.read().await.generation;
            if current == written {
                return Ok(());
            }
            debug!(%assessment_id, written, current, "Catalog changed while scoring; recomputing");
            let (generation, derived) = self.compute(assessment_id, instrument.clone()).await?;
            self.store.replace_derived(assessment_id, derived).await?;
            written = generation;
        }
    }

    async fn derived(&self, assessment_id: Uuid) -> Result<Arc<DerivedScores>> {
        let assessment = self.get_assessment(assessment_id).await?;
        if !assessment.is_completed() {
            let instrument = self.instruments.get(&assessment.instrument_version)?;
            let answered = self.store.responses(assessment_id).await?.len();
            return Err(VocaError::IncompleteAssessment {
                assessment_id,
                answered,
                required: instrument.round_count(),
            });
        }
        self.store.derived(assessment_id).await?.ok_or_else(|| {
            VocaError::Storage(format!("completed assessment {assessment_id} has no derived scores"))
        })
    }

    pub async fn get_need_scores(&self, assessment_id: Uuid) -> Result<Vec<NeedScore>> {
        Ok(self.derived(assessment_id).await?.need_scores.clone())
    }

    pub async fn get_value_scores(&self, assessment_id: Uuid) -> Result<Vec<ValueScore>> {
        Ok(self.derived(assessment_id).await?.value_scores.clone())
    }

    /// Match results in presentation order, optionally for one job zone.
    pub async fn get_matches(&self, assessment_id: Uuid, job_zone: Option<u8>) -> Result<Vec<MatchResult>> {
        let derived = self.derived(assessment_id).await?;
        Ok(derived
            .matches
            .iter()
            .filter(|m| job_zone.map_or(true, |z| m.job_zone == z))
            .cloned()
            .collect())
    }

    /// The whole derived bundle of a completed assessment.
    pub async fn get_derived(&self, assessment_id: Uuid) -> Result<Arc<DerivedScores>> {
        self.derived(assessment_id).await
    }

    /// Re-run the pipeline from stored responses and replace all derived rows.
    ///
    /// Idempotent for unchanged inputs. An assessment whose rounds are all
    /// stored but was never closed is completed by this call.
    pub async fn recompute(&self, assessment_id: Uuid) -> Result<()> {
        let assessment = self.get_assessment(assessment_id).await?;
        let instrument = self.instruments.get(&assessment.instrument_version)?;

        if !assessment.is_completed() {
            let answered = self.store.responses(assessment_id).await?.len();
            if answered < instrument.round_count() {
                return Err(VocaError::IncompleteAssessment {
                    assessment_id,
                    answered,
                    required: instrument.round_count(),
                });
            }
            warn!(%assessment_id, "All rounds stored but assessment was open; completing");
            if self.complete(&assessment, &instrument).await? {
                return Ok(());
            }
        }

        let (generation, derived) = self.compute(assessment_id, instrument.clone()).await?;
        self.store.replace_derived(assessment_id, derived).await?;
        self.catch_up(assessment_id, &instrument, generation).await?;
        info!(%assessment_id, "Recomputed assessment scores");
        Ok(())
    }

    /// Swap the occupation catalog. Returns how many completed assessments
    /// were recomputed against it.
    ///
    /// Assessments that complete while the swap runs pick up the new catalog
    /// on their own before their submission returns.
    pub async fn replace_catalog(&self, catalog: Arc<dyn OccupationCatalog>) -> Result<usize> {
        let version = catalog.version().to_string();
        let n_profiles = catalog.profiles().len();
        let generation = {
            let mut slot = self.catalog.write().await;
            slot.generation += 1;
            slot.catalog = Some(catalog);
            slot.generation
        };
        info!(catalog = %version, occupations = n_profiles, generation, "Replaced occupation catalog");

        let ids = self.store.completed_assessments().await?;
        let mut recomputed = 0usize;
        for id in ids {
            match self.recompute(id).await {
                Ok(()) => recomputed += 1,
                Err(e) => warn!(assessment_id = %id, error = %e, "Failed to recompute after catalog change"),
            }
        }
        info!(catalog = %version, recomputed, "Catalog refresh complete");
        Ok(recomputed)
    }

    pub async fn catalog_version(&self) -> Option<String> {
        self.catalog
            .read()
            .await
            .catalog
            .as_ref()
            .map(|c| c.version().to_string())
    }
}
