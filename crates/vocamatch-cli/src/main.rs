//! Vocamatch: work-value assessment scoring and occupation matching.
//! Entry point for the command-line binary.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vocamatch_common::{Instrument, InstrumentRegistry};
use vocamatch_db::{AssessmentStore, InMemoryStore};
use vocamatch_engine::AssessmentService;

/// Score work-value rankings and match them against occupations.
#[derive(Parser)]
#[command(name = "vocamatch")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "VOCAMATCH_CONFIG", default_value = "vocamatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the loaded instrument: values, needs and rounds
    Instrument,
    /// Score a full set of round rankings and print the derived rows as JSON
    Score {
        /// JSON file with `subject_ref` and `rounds`
        #[arg(long)]
        responses: PathBuf,
        /// Only print matches in this job zone (1-5)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        job_zone: Option<u8>,
    },
}

#[derive(Debug, Deserialize)]
struct ResponsesFile {
    subject_ref: Option<String>,
    rounds: Vec<RoundEntry>,
}

#[derive(Debug, Deserialize)]
struct RoundEntry {
    round: u32,
    ranking: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Config is read before logging starts so its filter can apply.
    let (config, config_err) = match config::Config::load(&cli.config) {
        Ok(c) => (c, None),
        Err(e) => (config::Config::default(), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match config_err {
        None => info!(path = %cli.config.display(), "Configuration loaded"),
        Some(e) => warn!("Could not load {}: {e}; using defaults", cli.config.display()),
    }

    let instrument = config.load_instrument()?;

    match cli.command {
        Commands::Instrument => print_instrument(&instrument),
        Commands::Score { responses, job_zone } => {
            score(&config, instrument, &responses, job_zone).await?
        }
    }

    Ok(())
}

fn print_instrument(instrument: &Instrument) {
    println!("Instrument {}", instrument.version());
    println!();
    for value in instrument.values() {
        println!("{}: {}", value.code, value.label);
        for need in instrument.needs_of(&value.code) {
            let appearances = instrument
                .need_bounds(&need.code)
                .map(|b| b.appearances)
                .unwrap_or(0);
            println!("  {:<30} x{}  {}", need.code, appearances, need.label);
        }
    }
    println!();
    for round in instrument.rounds() {
        println!("Round {:>2}: {}", round.index, round.needs.join(", "));
    }
}

async fn score(
    config: &config::Config,
    instrument: Instrument,
    responses_path: &Path,
    job_zone: Option<u8>,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(responses_path)
        .with_context(|| format!("reading {}", responses_path.display()))?;
    let file: ResponsesFile = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", responses_path.display()))?;

    let registry = Arc::new(InstrumentRegistry::new(instrument));
    let store: Arc<dyn AssessmentStore> = Arc::new(InMemoryStore::new());
    let mut service = AssessmentService::new(registry, store).with_options(config.matcher_options())?;

    match config.load_catalog() {
        Ok(Some(catalog)) => service = service.with_catalog(Arc::new(catalog)),
        Ok(None) => warn!("No occupation catalog configured; matches will be empty"),
        Err(e) => warn!("Could not load occupation catalog: {e}"),
    }

    let assessment = service.start_assessment(file.subject_ref).await?;
    let mut completed = false;
    for entry in file.rounds {
        let outcome = service
            .submit_response(assessment.id, entry.round, entry.ranking)
            .await
            .with_context(|| format!("round {}", entry.round))?;
        completed = outcome.completed;
    }
    if !completed {
        // Surfaces the answered/required counts.
        service.get_need_scores(assessment.id).await?;
    }

    let derived = service.get_derived(assessment.id).await?;
    let matches = service.get_matches(assessment.id, job_zone).await?;
    let report = serde_json::json!({
        "assessment_id": assessment.id,
        "instrument_version": derived.instrument_version,
        "catalog_version": derived.catalog_version,
        "need_scores": derived.need_scores,
        "value_scores": derived.value_scores,
        "matches": matches,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
