//! Configuration loading for Vocamatch.
//! Reads vocamatch.toml from the path given by --config or VOCAMATCH_CONFIG.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use vocamatch_common::Instrument;
use vocamatch_ranker::{MatchThresholds, MatcherOptions, StaticCatalog};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub instrument: InstrumentConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// YAML or JSON instrument definition. Built-in reference when absent.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
    #[serde(default = "default_catalog_version")]
    pub version: String,
}

fn default_catalog_version() -> String { "unversioned".to_string() }

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: None,
            version: default_catalog_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_minimum_threshold")]
    pub minimum_threshold: f64,
    #[serde(default = "default_strong_threshold")]
    pub strong_threshold: f64,
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

fn default_minimum_threshold()  -> f64   { 0.291 }
fn default_strong_threshold()   -> f64   { 0.368 }
fn default_parallel_threshold() -> usize { 64 }

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            minimum_threshold: default_minimum_threshold(),
            strong_threshold: default_strong_threshold(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String { "vocamatch=info,warn".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: default_log_filter() }
    }
}


impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy vocamatch.example.toml to vocamatch.toml and edit it.",
                path.display()
            );
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        if !config.matcher_options().thresholds.validate() {
            anyhow::bail!(
                "matching thresholds must satisfy -1 <= minimum ({}) <= strong ({}) <= 1",
                config.matching.minimum_threshold,
                config.matching.strong_threshold
            );
        }
        Ok(config)
    }

    pub fn matcher_options(&self) -> MatcherOptions {
        MatcherOptions {
            thresholds: MatchThresholds {
                minimum: self.matching.minimum_threshold,
                strong: self.matching.strong_threshold,
            },
            parallel_threshold: self.matching.parallel_threshold,
        }
    }

    pub fn load_instrument(&self) -> anyhow::Result<Instrument> {
        match &self.instrument.path {
            Some(path) => Ok(Instrument::from_path(path)?),
            None => Ok(Instrument::reference()),
        }
    }

    /// The configured catalog, or None when no path is set.
    pub fn load_catalog(&self) -> anyhow::Result<Option<StaticCatalog>> {
        match &self.catalog.path {
            Some(path) => Ok(Some(StaticCatalog::from_csv_path(path, self.catalog.version.clone())?)),
            None => Ok(None),
        }
    }
}
