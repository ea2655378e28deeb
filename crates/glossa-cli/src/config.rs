//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use glossa_llm::ollama::{DEFAULT_ENDPOINT, DEFAULT_MAX_RETRIES};
use glossa_resolver::ResolverConfig;
use glossa_synthesizer::SynthesizerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Language model settings
    #[serde(default)]
    pub oracle: OracleSettings,

    /// Resolution pipeline settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// SQL synthesis settings
    #[serde(default)]
    pub synthesizer: SynthesizerConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputSettings,
}

/// Ollama connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Ollama API endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Attempts per generation
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet format (primary SQL only)
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".glossa").join("config.toml"))
    }

    /// Load configuration from a file, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        if self.oracle.endpoint.trim().is_empty() {
            return Err(CliError::Config("oracle.endpoint must not be empty".into()));
        }
        if self.oracle.model.trim().is_empty() {
            return Err(CliError::Config("oracle.model must not be empty".into()));
        }
        self.resolver
            .validate()
            .map_err(|e| CliError::Config(format!("resolver: {}", e)))?;
        self.synthesizer
            .validate()
            .map_err(|e| CliError::Config(format!("synthesizer: {}", e)))?;
        Ok(())
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table,
            color: true,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.oracle.endpoint, "http://localhost:11434");
        assert_eq!(config.oracle.model, "llama3");
        assert_eq!(config.output.format, OutputFormat::Table);
        assert!(config.output.color);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.oracle.model = "mistral".to_string();
        config.resolver.max_interpretations = 5;
        config.synthesizer.dialect = "postgresql".to_string();
        config.output.format = OutputFormat::Json;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[oracle]\nmodel = \"qwen2\"\n\n[resolver]\nambiguity_threshold = 0.4\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.oracle.model, "qwen2");
        assert_eq!(config.oracle.endpoint, "http://localhost:11434");
        assert_eq!(config.resolver.ambiguity_threshold, 0.4);
        assert_eq!(config.resolver.max_interpretations, 3);
        assert_eq!(config.synthesizer, SynthesizerConfig::default());
    }

    #[test]
    fn test_invalid_section_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[resolver]\nmax_interpretations = 0\n").unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.starts_with("resolver")));
    }

    #[test]
    fn test_malformed_file_is_toml_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[oracle\nmodel = ").unwrap();

        assert!(matches!(Config::load_from(&path), Err(CliError::Toml(_))));
    }
}
