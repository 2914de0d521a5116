//! Trait for occupation reference data access.
//!
//! Provides an abstraction over occupation catalogs, allowing the matcher
//! to read reference profiles without being coupled to where they come from.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use tracing::info;
use vocamatch_common::{OccupationProfile, Result, VocaError};

/// Read-only, versioned catalog of occupation profiles.
///
/// Implementations can use:
/// - a CSV export loaded at startup
/// - a hosted reference database
/// - hand-built fixtures (testing)
pub trait OccupationCatalog: Send + Sync {
    /// Catalog release this data belongs to.
    fn version(&self) -> &str;

    /// All profiles, in no particular order.
    fn profiles(&self) -> &[OccupationProfile];

    /// Look up a single occupation by code.
    fn get(&self, code: &str) -> Option<&OccupationProfile> {
        self.profiles().iter().find(|p| p.code == code)
    }

    fn is_empty(&self) -> bool {
        self.profiles().is_empty()
    }
}

// ── In-memory implementation ─────────────────────────────────────────────────

/// Catalog held fully in memory.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    version: String,
    profiles: Vec<OccupationProfile>,
}

impl StaticCatalog {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            profiles: Vec::new(),
        }
    }

    /// Add one profile, with the same checks as `from_profiles`.
    pub fn with(mut self, profile: OccupationProfile) -> Result<Self> {
        validate_profile(&profile)?;
        if self.get(&profile.code).is_some() {
            return Err(duplicate_code(&profile.code));
        }
        self.profiles.push(profile);
        Ok(self)
    }

    /// Build from already-parsed profiles, rejecting invalid entries.
    pub fn from_profiles(version: impl Into<String>, profiles: Vec<OccupationProfile>) -> Result<Self> {
        let mut codes = HashSet::new();
        for p in &profiles {
            validate_profile(p)?;
            if !codes.insert(p.code.as_str()) {
                return Err(duplicate_code(&p.code));
            }
        }
        Ok(Self {
            version: version.into(),
            profiles,
        })
    }

    /// Load a CSV export.
    ///
    /// Expected columns:
    /// - `occupation_code`
    /// - `title`
    /// - `job_zone` (1–5)
    /// - one column per need code, holding the 0–100 reference score
    pub fn from_csv_path(path: impl AsRef<Path>, version: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            VocaError::CatalogUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_csv_reader(file, version)?;
        info!(
            path = %path.display(),
            version = %catalog.version,
            n_occupations = catalog.profiles.len(),
            "Loaded occupation catalog"
        );
        Ok(catalog)
    }

    pub fn from_csv_reader<R: Read>(reader: R, version: impl Into<String>) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers().map_err(csv_error)?.clone();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| VocaError::Config(format!("catalog CSV missing '{name}' column")))
        };
        let code_idx = column("occupation_code")?;
        let title_idx = column("title")?;
        let zone_idx = column("job_zone")?;
        let need_columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| ![code_idx, title_idx, zone_idx].contains(i))
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        let mut profiles = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.map_err(csv_error)?;
            let field = |idx: usize| record.get(idx).unwrap_or("");

            let code = field(code_idx);
            if code.is_empty() {
                continue;
            }
            let job_zone: u8 = field(zone_idx).parse().map_err(|_| {
                VocaError::Config(format!(
                    "row {}: invalid job_zone '{}' for {}",
                    line + 2,
                    field(zone_idx),
                    code
                ))
            })?;

            let mut profile = OccupationProfile::new(code, field(title_idx), job_zone);
            for (idx, need_code) in &need_columns {
                let raw = field(*idx);
                let score: f64 = raw.parse().map_err(|_| {
                    VocaError::Config(format!(
                        "row {}: invalid score '{}' for need '{}' of {}",
                        line + 2,
                        raw,
                        need_code,
                        code
                    ))
                })?;
                profile.need_scores.insert(need_code.clone(), score);
            }
            profiles.push(profile);
        }

        Self::from_profiles(version, profiles)
    }
}

fn csv_error(e: csv::Error) -> VocaError {
    VocaError::Config(format!("catalog CSV: {e}"))
}

fn duplicate_code(code: &str) -> VocaError {
    VocaError::Config(format!("duplicate occupation code '{code}'"))
}

fn validate_profile(p: &OccupationProfile) -> Result<()> {
    if !(1..=5).contains(&p.job_zone) {
        return Err(VocaError::Config(format!(
            "occupation {} has job zone {}, expected 1-5",
            p.code, p.job_zone
        )));
    }
    if let Some((need, score)) = p
        .need_scores
        .iter()
        .find(|(_, s)| !s.is_finite() || !(0.0..=100.0).contains(*s))
    {
        return Err(VocaError::Config(format!(
            "occupation {} has out-of-range score {} for need '{}'",
            p.code, score, need
        )));
    }
    Ok(())
}

impl OccupationCatalog for StaticCatalog {
    fn version(&self) -> &str {
        &self.version
    }

    fn profiles(&self) -> &[OccupationProfile] {
        &self.profiles
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
