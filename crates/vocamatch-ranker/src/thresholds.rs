//! Correlation cut-offs for occupation matches.

use serde::{Deserialize, Serialize};

/// Pearson r cut-offs against the reference population.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MatchThresholds {
    /// r ≥ this is a minimum match (≈ p < .10, one-tailed)
    pub minimum: f64,
    /// r ≥ this is a strong match (≈ p < .05, one-tailed)
    pub strong: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            minimum: 0.291,
            strong: 0.368,
        }
    }
}

/// Classification of one correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Strong,
    Minimum,
    NoMatch,
}

impl MatchTier {
    pub fn is_minimum_match(self) -> bool {
        matches!(self, MatchTier::Strong | MatchTier::Minimum)
    }

    pub fn is_strong_match(self) -> bool {
        self == MatchTier::Strong
    }
}

impl MatchThresholds {
    /// Both cut-offs are correlations and strong cannot be looser than minimum.
    pub fn validate(&self) -> bool {
        (-1.0..=1.0).contains(&self.minimum)
            && (-1.0..=1.0).contains(&self.strong)
            && self.minimum <= self.strong
    }

    /// A strong match always also counts as a minimum match.
    pub fn classify(&self, correlation: f64) -> MatchTier {
        if correlation >= self.strong && correlation >= self.minimum {
            MatchTier::Strong
        } else if correlation >= self.minimum {
            MatchTier::Minimum
        } else {
            MatchTier::NoMatch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_valid() {
        let t = MatchThresholds::default();
        assert!(t.validate(), "Default thresholds must be ordered");
    }

    #[test]
    fn test_inverted_thresholds_invalid() {
        let t = MatchThresholds { minimum: 0.5, strong: 0.3 };
        assert!(!t.validate());
        let t = MatchThresholds { minimum: 0.2, strong: 1.5 };
        assert!(!t.validate());
    }

    #[test]
    fn test_classify_boundaries() {
        let t = MatchThresholds::default();
        assert_eq!(t.classify(0.290), MatchTier::NoMatch);
        assert_eq!(t.classify(0.291), MatchTier::Minimum);
        assert_eq!(t.classify(0.367), MatchTier::Minimum);
        assert_eq!(t.classify(0.368), MatchTier::Strong);
        assert_eq!(t.classify(1.0), MatchTier::Strong);
        assert_eq!(t.classify(-1.0), MatchTier::NoMatch);
    }

    #[test]
    fn test_strong_implies_minimum() {
        let t = MatchThresholds::default();
        for i in -100..=100 {
            let tier = t.classify(i as f64 / 100.0);
            assert!(!tier.is_strong_match() || tier.is_minimum_match());
        }
    }
}
