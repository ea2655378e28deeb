//! Configuration for the SQL synthesizer

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the SQL synthesizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizerConfig {
    /// Target dialect tag (e.g. "sql", "postgresql", "sqlite")
    pub dialect: String,

    /// Maximum time for a single oracle call (seconds)
    pub oracle_timeout_secs: u64,

    /// Maximum columns listed per table in the generation prompt
    pub max_columns_per_table: usize,

    /// Sampling temperature for generation calls
    pub temperature: f32,
}

impl SynthesizerConfig {
    /// Get the oracle timeout as a Duration
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.dialect.trim().is_empty() {
            return Err("dialect must not be empty".to_string());
        }
        if self.oracle_timeout_secs == 0 {
            return Err("oracle_timeout_secs must be greater than 0".to_string());
        }
        if self.max_columns_per_table == 0 {
            return Err("max_columns_per_table must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0.0 and 2.0".to_string());
        }
        Ok(())
    }

    /// Same configuration targeting another dialect
    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = dialect.into();
        self
    }

    /// Lenient preset: longer timeout and wider table listings
    pub fn lenient() -> Self {
        Self {
            oracle_timeout_secs: 120,
            max_columns_per_table: 100,
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

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            dialect: "sql".to_string(),
            oracle_timeout_secs: 30,
            max_columns_per_table: 40,
            temperature: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SynthesizerConfig::default().validate().is_ok());
        assert!(SynthesizerConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = SynthesizerConfig::default();
        config.oracle_timeout_secs = 0;
        assert!(config.validate().is_err());

        let config = SynthesizerConfig::default().with_dialect("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SynthesizerConfig::from_toml("dialect = \"postgresql\"").unwrap();
        assert_eq!(config.dialect, "postgresql");
        assert_eq!(config.oracle_timeout_secs, 30);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = SynthesizerConfig::lenient().with_dialect("sqlite");
        let text = config.to_toml().unwrap();
        assert_eq!(SynthesizerConfig::from_toml(&text).unwrap(), config);
    }
}
