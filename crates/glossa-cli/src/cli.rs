//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Glossa CLI - Translate business questions into SQL.
#[derive(Debug, Parser)]
#[command(name = "glossa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (defaults to ~/.glossa/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (primary SQL only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Translate a question into SQL
    Query(QueryArgs),

    /// Inspect schema catalog files
    Catalog(CatalogArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the query command.
#[derive(Debug, Parser)]
pub struct QueryArgs {
    /// The question, in plain language
    pub text: String,

    /// Tenant whose schema is queried
    #[arg(short, long, env = "GLOSSA_TENANT")]
    pub tenant: String,

    /// Schema catalog (TOML) loaded for the tenant
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// SQLite schema store; in-memory when omitted
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// SQL dialect (e.g. postgresql, sqlite)
    #[arg(short, long)]
    pub dialect: Option<String>,

    /// Extra context for the parser, repeatable
    #[arg(long = "hint")]
    pub hints: Vec<String>,

    /// Ollama API endpoint
    #[arg(long, env = "GLOSSA_OLLAMA_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Model name
    #[arg(short, long, env = "GLOSSA_MODEL")]
    pub model: Option<String>,

    /// Show every interpretation, not only the primary one
    #[arg(short, long)]
    pub all: bool,
}

/// Arguments for the catalog command.
#[derive(Debug, Parser)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub action: CatalogAction,
}

/// Catalog actions.
#[derive(Debug, Subcommand)]
pub enum CatalogAction {
    /// Check a catalog for consistency problems
    Check {
        /// Catalog file
        file: PathBuf,
    },

    /// List the tables and glossary terms of a catalog
    Show {
        /// Catalog file
        file: PathBuf,
    },
}

/// Arguments for the config command.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
