//! Configuration for the resolution pipeline

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How usage-counter feedback reaches the schema store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UsageFeedback {
    /// One detached task applies the events after resolution
    #[default]
    Background,
    /// Events are applied before the pipeline continues
    Inline,
    /// No feedback is sent
    Disabled,
}

/// Configuration for the resolution pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Ambiguity score at or above which alternative interpretations are requested
    pub ambiguity_threshold: f64,

    /// Minimum similarity for fuzzy glossary candidates
    pub fuzzy_similarity_floor: f64,

    /// Minimum similarity for concept-to-glossary matches
    pub concept_similarity_floor: f64,

    /// Minimum confidence of a discovered join path
    pub join_min_confidence: f64,

    /// Best candidates weighing less than this become knowledge boundaries
    pub min_usable_confidence: f64,

    /// Fallback strategies run only when no candidate reached this confidence
    pub oracle_fallback_below: f64,

    /// Confidence assumed when the oracle names a match without one
    pub default_oracle_confidence: f64,

    /// Maximum interpretations kept for an ambiguous query
    pub max_interpretations: usize,

    /// Maximum time for a single oracle call (seconds)
    pub oracle_timeout_secs: u64,

    /// Maximum query length (characters)
    pub max_query_length: usize,

    /// Usage-counter feedback mode
    pub usage_feedback: UsageFeedback,
}

impl ResolverConfig {
    /// Get the oracle timeout as a Duration
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let unit = [
            ("ambiguity_threshold", self.ambiguity_threshold),
            ("fuzzy_similarity_floor", self.fuzzy_similarity_floor),
            ("concept_similarity_floor", self.concept_similarity_floor),
            ("join_min_confidence", self.join_min_confidence),
            ("min_usable_confidence", self.min_usable_confidence),
            ("oracle_fallback_below", self.oracle_fallback_below),
            ("default_oracle_confidence", self.default_oracle_confidence),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be between 0.0 and 1.0", name));
            }
        }
        if self.max_interpretations == 0 {
            return Err("max_interpretations must be greater than 0".to_string());
        }
        if self.oracle_timeout_secs == 0 {
            return Err("oracle_timeout_secs must be greater than 0".to_string());
        }
        if self.max_query_length == 0 {
            return Err("max_query_length must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Strict preset: higher floors, fewer alternatives, feedback applied inline
    pub fn strict() -> Self {
        Self {
            fuzzy_similarity_floor: 0.7,
            concept_similarity_floor: 0.8,
            join_min_confidence: 0.85,
            min_usable_confidence: 0.7,
            oracle_fallback_below: 0.8,
            max_interpretations: 2,
            usage_feedback: UsageFeedback::Inline,
            ..Self::default()
        }
    }

    /// Lenient preset: lower floors, longer oracle timeout
    pub fn lenient() -> Self {
        Self {
            fuzzy_similarity_floor: 0.3,
            concept_similarity_floor: 0.4,
            join_min_confidence: 0.5,
            min_usable_confidence: 0.3,
            oracle_fallback_below: 0.6,
            oracle_timeout_secs: 120,
            max_query_length: 8000,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ambiguity_threshold: 0.5,
            fuzzy_similarity_floor: 0.5,
            concept_similarity_floor: 0.6,
            join_min_confidence: 0.7,
            min_usable_confidence: 0.5,
            oracle_fallback_below: 0.7,
            default_oracle_confidence: 0.7,
            max_interpretations: 3,
            oracle_timeout_secs: 30,
            max_query_length: 2000,
            usage_feedback: UsageFeedback::Background,
        }
    }
}
