//! Event-driven recomputation of derived scores.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;
use vocamatch_ranker::OccupationCatalog;

use crate::service::AssessmentService;

/// Something that invalidates stored derived rows.
#[derive(Clone)]
pub enum RecomputeTrigger {
    /// Re-derive one assessment from its stored responses.
    Assessment(Uuid),
    /// A new catalog release; swap it in and re-derive every completed assessment.
    CatalogRefreshed { catalog: Arc<dyn OccupationCatalog> },
}

impl fmt::Debug for RecomputeTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assessment(id) => f.debug_tuple("Assessment").field(id).finish(),
            Self::CatalogRefreshed { catalog } => f
                .debug_struct("CatalogRefreshed")
                .field("version", &catalog.version())
                .field("occupations", &catalog.profiles().len())
                .finish(),
        }
    }
}

/// Start the background recompute worker.
///
/// Triggers are handled one at a time in arrival order. Failures are logged
/// and the worker keeps running until every sender is dropped.
pub fn start_recompute_queue(service: Arc<AssessmentService>) -> mpsc::UnboundedSender<RecomputeTrigger> {
    let (tx, mut rx) = mpsc::unbounded_channel::<RecomputeTrigger>();

    tokio::spawn(async move {
        info!("Started recompute queue worker");

        while let Some(trigger) = rx.recv().await {
            match trigger {
                RecomputeTrigger::Assessment(id) => {
                    if let Err(e) = service.recompute(id).await {
                        warn!(assessment_id = %id, "Failed to recompute assessment: {}", e);
                    }
                }
                RecomputeTrigger::CatalogRefreshed { catalog } => {
                    let version = catalog.version().to_string();
                    match service.replace_catalog(catalog).await {
                        Ok(n) => info!(catalog = %version, recomputed = n, "Applied catalog refresh"),
                        Err(e) => warn!(catalog = %version, "Failed to apply catalog refresh: {}", e),
                    }
                }
            }
        }

        info!("Recompute queue closed");
    });

    tx
}
