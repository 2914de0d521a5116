//! Versioned instrument configuration.
//!
//! An instrument is the static reference data of one questionnaire version:
//! the Values, the Needs that roll up into them, and the Rounds that present
//! five Needs at a time. Instruments are loaded once (YAML/JSON or the built-in
//! reference design), validated, and shared read-only behind an `Arc`.
//!
//! Score bounds depend only on how often each Need is shown, so they are
//! computed here at load time instead of per assessment.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, VocaError};

/// Number of Needs ranked in every round.
pub const ROUND_SIZE: usize = 5;

/// Points for the top rank; the bottom rank gets the negation.
pub const MAX_ROUND_POINTS: i32 = 4;

/// Version tag of the built-in 21-need, 21-round reference design.
pub const REFERENCE_VERSION: &str = "wip-21x5-v1";

// ── Reference data ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Value {
    pub code: String,
    pub label: String,
    pub order: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Need {
    pub code: String,
    /// Parent Value code.
    pub value_code: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Round {
    pub index: u32,
    pub needs: Vec<String>,
    /// Filled from the instrument version when omitted in the file.
    #[serde(default)]
    pub version: String,
}

impl Round {
    pub fn contains(&self, need_code: &str) -> bool {
        self.needs.iter().any(|n| n == need_code)
    }
}

/// On-disk shape of an instrument file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub version: String,
    pub values: Vec<Value>,
    pub needs: Vec<Need>,
    pub rounds: Vec<Round>,
}

impl InstrumentSpec {
    /// Load from YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Load from JSON file
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save to YAML file
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ── Bounds ───────────────────────────────────────────────────────────────────

/// Score range of a single Need, fixed by its appearance count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NeedBounds {
    pub appearances: u32,
    pub min_possible: i32,
    pub max_possible: i32,
}

impl NeedBounds {
    pub fn from_appearances(appearances: u32) -> Self {
        let span = MAX_ROUND_POINTS * appearances as i32;
        Self {
            appearances,
            min_possible: -span,
            max_possible: span,
        }
    }
}

/// Score range of a Value: the sum of its member Needs' bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValueBounds {
    pub need_count: usize,
    pub min_possible: i32,
    pub max_possible: i32,
}

// ── Instrument ───────────────────────────────────────────────────────────────

/// A validated, indexed instrument version.
#[derive(Debug, Clone)]
pub struct Instrument {
    version: String,
    values: Vec<Value>,
    needs: Vec<Need>,
    rounds: Vec<Round>,
    need_positions: HashMap<String, usize>,
    round_positions: HashMap<u32, usize>,
    need_bounds: HashMap<String, NeedBounds>,
    value_bounds: HashMap<String, ValueBounds>,
}

impl Instrument {
    /// Validate a spec and build the lookup and bounds tables.
    pub fn from_spec(spec: InstrumentSpec) -> Result<Self> {
        validate_spec(&spec)?;
        Ok(Self::index(spec))
    }

    /// Load a YAML (`.yaml`/`.yml`) or JSON instrument file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let spec = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => InstrumentSpec::from_yaml(path)?,
            Some("json") => InstrumentSpec::from_json(path)?,
            other => {
                return Err(VocaError::Config(format!(
                    "unsupported instrument file extension {:?} for {}",
                    other,
                    path.display()
                )))
            }
        };
        let instrument = Self::from_spec(spec)?;
        tracing::info!(
            version = %instrument.version,
            n_needs = instrument.needs.len(),
            n_rounds = instrument.rounds.len(),
            "Loaded instrument"
        );
        Ok(instrument)
    }

    /// The built-in reference instrument: 21 Needs in 6 Values, presented in
    /// 21 rounds of 5 so that every Need appears 5 times and every pair of
    /// Needs meets exactly once.
    pub fn reference() -> Self {
        Self::index(reference_spec())
    }

    fn index(mut spec: InstrumentSpec) -> Self {
        spec.values.sort_by_key(|v| v.order);
        spec.rounds.sort_by_key(|r| r.index);
        for round in &mut spec.rounds {
            if round.version.is_empty() {
                round.version = spec.version.clone();
            }
        }

        let need_positions = spec
            .needs
            .iter()
            .enumerate()
            .map(|(i, n)| (n.code.clone(), i))
            .collect();
        let round_positions = spec
            .rounds
            .iter()
            .enumerate()
            .map(|(i, r)| (r.index, i))
            .collect();

        let mut appearances: HashMap<&str, u32> =
            spec.needs.iter().map(|n| (n.code.as_str(), 0)).collect();
        for round in &spec.rounds {
            for code in &round.needs {
                if let Some(count) = appearances.get_mut(code.as_str()) {
                    *count += 1;
                }
            }
        }
        let need_bounds: HashMap<String, NeedBounds> = appearances
            .into_iter()
            .map(|(code, n)| (code.to_string(), NeedBounds::from_appearances(n)))
            .collect();

        let mut value_bounds = HashMap::new();
        for value in &spec.values {
            let mut bounds = ValueBounds {
                need_count: 0,
                min_possible: 0,
                max_possible: 0,
            };
            for need in spec.needs.iter().filter(|n| n.value_code == value.code) {
                let nb = need_bounds[&need.code];
                bounds.need_count += 1;
                bounds.min_possible += nb.min_possible;
                bounds.max_possible += nb.max_possible;
            }
            value_bounds.insert(value.code.clone(), bounds);
        }

        Self {
            version: spec.version,
            values: spec.values,
            needs: spec.needs,
            rounds: spec.rounds,
            need_positions,
            round_positions,
            need_bounds,
            value_bounds,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Values in presentation order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Needs in canonical order; score vectors follow this order.
    pub fn needs(&self) -> &[Need] {
        &self.needs
    }

    /// Rounds sorted by index.
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn round(&self, index: u32) -> Option<&Round> {
        self.round_positions.get(&index).map(|&i| &self.rounds[i])
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    pub fn need_position(&self, code: &str) -> Option<usize> {
        self.need_positions.get(code).copied()
    }

    pub fn need_bounds(&self, code: &str) -> Option<NeedBounds> {
        self.need_bounds.get(code).copied()
    }

    pub fn value_bounds(&self, code: &str) -> Option<ValueBounds> {
        self.value_bounds.get(code).copied()
    }

    /// Member Needs of a Value, in canonical order.
    pub fn needs_of<'a>(&'a self, value_code: &'a str) -> impl Iterator<Item = &'a Need> + 'a {
        self.needs.iter().filter(move |n| n.value_code == value_code)
    }

    /// Round indices that present the given Need.
    pub fn rounds_containing<'a>(&'a self, need_code: &'a str) -> impl Iterator<Item = u32> + 'a {
        self.rounds
            .iter()
            .filter(move |r| r.contains(need_code))
            .map(|r| r.index)
    }
}

fn validate_spec(spec: &InstrumentSpec) -> Result<()> {
    let fail = |msg: String| Err(VocaError::Config(format!("instrument {}: {}", spec.version, msg)));

    if spec.version.trim().is_empty() {
        return Err(VocaError::Config("instrument version must not be empty".into()));
    }
    if spec.rounds.is_empty() {
        return fail("no rounds configured".into());
    }

    let mut value_codes = HashSet::new();
    for value in &spec.values {
        if !value_codes.insert(value.code.as_str()) {
            return fail(format!("duplicate value code '{}'", value.code));
        }
    }

    let mut need_codes = HashSet::new();
    for need in &spec.needs {
        if !need_codes.insert(need.code.as_str()) {
            return fail(format!("duplicate need code '{}'", need.code));
        }
        if !value_codes.contains(need.value_code.as_str()) {
            return fail(format!(
                "need '{}' belongs to unknown value '{}'",
                need.code, need.value_code
            ));
        }
    }

    for value in &spec.values {
        if !spec.needs.iter().any(|n| n.value_code == value.code) {
            return fail(format!("value '{}' has no needs", value.code));
        }
    }

    let mut round_indices = HashSet::new();
    for round in &spec.rounds {
        if !round_indices.insert(round.index) {
            return fail(format!("duplicate round index {}", round.index));
        }
        if round.needs.len() != ROUND_SIZE {
            return fail(format!(
                "round {} has {} needs, expected {}",
                round.index,
                round.needs.len(),
                ROUND_SIZE
            ));
        }
        let mut seen = HashSet::new();
        for code in &round.needs {
            if !need_codes.contains(code.as_str()) {
                return fail(format!("round {} lists unknown need '{}'", round.index, code));
            }
            if !seen.insert(code.as_str()) {
                return fail(format!("round {} lists need '{}' twice", round.index, code));
            }
        }
    }

    // A need no round shows has no score range.
    for need in &spec.needs {
        if !spec.rounds.iter().any(|r| r.needs.contains(&need.code)) {
            return fail(format!("need '{}' appears in no round", need.code));
        }
    }

    Ok(())
}

/// Perfect difference set modulo 21; its translates form the 21 rounds.
const REFERENCE_DIFFERENCE_SET: [usize; ROUND_SIZE] = [0, 1, 4, 14, 16];

fn reference_spec() -> InstrumentSpec {
    let values = [
        ("ACH", "Achievement"),
        ("WCO", "Working Conditions"),
        ("REC", "Recognition"),
        ("REL", "Relationships"),
        ("SUP", "Support"),
        ("IND", "Independence"),
    ]
    .iter()
    .enumerate()
    .map(|(i, (code, label))| Value {
        code: code.to_string(),
        label: label.to_string(),
        order: i as u32 + 1,
    })
    .collect();

    let needs: Vec<Need> = [
        ("ability_utilization", "ACH", "I could do something that makes use of my abilities."),
        ("achievement", "ACH", "The job could give me a feeling of accomplishment."),
        ("activity", "WCO", "I could be busy all the time."),
        ("independence", "WCO", "I could work alone on the job."),
        ("variety", "WCO", "I could do something different every day."),
        ("compensation", "WCO", "My pay would compare well with that of other workers."),
        ("security", "WCO", "The job would provide for steady employment."),
        ("working_conditions", "WCO", "The job would have good working conditions."),
        ("advancement", "REC", "The job would provide an opportunity for advancement."),
        ("recognition", "REC", "I could receive recognition for the work I do."),
        ("authority", "REC", "I could tell people what to do."),
        ("social_status", "REC", "I could be 'somebody' in the community."),
        ("co_workers", "REL", "My co-workers would be easy to get along with."),
        ("social_service", "REL", "I could do things for other people."),
        ("moral_values", "REL", "I would never be pressured to do things that go against my sense of right and wrong."),
        ("company_policies", "SUP", "I would be treated fairly by the company."),
        ("supervision_human_relations", "SUP", "I would have supervisors who would back up their workers with management."),
        ("supervision_technical", "SUP", "I would have supervisors who train their workers well."),
        ("creativity", "IND", "I could try out my own ideas."),
        ("responsibility", "IND", "I could make decisions on my own."),
        ("autonomy", "IND", "I could plan my work with little supervision."),
    ]
    .iter()
    .map(|(code, value_code, label)| Need {
        code: code.to_string(),
        value_code: value_code.to_string(),
        label: label.to_string(),
    })
    .collect();

    let n = needs.len();
    let rounds = (0..n)
        .map(|shift| Round {
            index: shift as u32 + 1,
            needs: REFERENCE_DIFFERENCE_SET
                .iter()
                .map(|d| needs[(shift + d) % n].code.clone())
                .collect(),
            version: REFERENCE_VERSION.to_string(),
        })
        .collect();

    InstrumentSpec {
        version: REFERENCE_VERSION.to_string(),
        values,
        needs,
        rounds,
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// All instrument versions known to a running engine.
///
/// New assessments start on `current`; older assessments keep scoring
/// against the version they were started with.
#[derive(Debug, Clone)]
pub struct InstrumentRegistry {
    current: String,
    instruments: HashMap<String, Arc<Instrument>>,
}

impl InstrumentRegistry {
    pub fn new(current: Instrument) -> Self {
        let version = current.version().to_string();
        let mut instruments = HashMap::new();
        instruments.insert(version.clone(), Arc::new(current));
        Self {
            current: version,
            instruments,
        }
    }

    /// Add another version. Existing versions are immutable.
    pub fn register(&mut self, instrument: Instrument) -> Result<()> {
        let version = instrument.version().to_string();
        if self.instruments.contains_key(&version) {
            return Err(VocaError::Config(format!(
                "instrument version {version} is already registered"
            )));
        }
        self.instruments.insert(version, Arc::new(instrument));
        Ok(())
    }

    pub fn set_current(&mut self, version: &str) -> Result<()> {
        if !self.instruments.contains_key(version) {
            return Err(VocaError::UnknownInstrument(version.to_string()));
        }
        self.current = version.to_string();
        Ok(())
    }

    pub fn current(&self) -> Arc<Instrument> {
        self.instruments[&self.current].clone()
    }

    pub fn get(&self, version: &str) -> Result<Arc<Instrument>> {
        self.instruments
            .get(version)
            .cloned()
            .ok_or_else(|| VocaError::UnknownInstrument(version.to_string()))
    }

    pub fn versions(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.instruments.keys().map(String::as_str).collect();
        v.sort_unstable();
        v
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
