//! Glossa Resolver
//!
//! Turns a natural-language business question into resolved schema constructs and
//! ranked interpretations, then hands them to the SQL synthesizer.
//!
//! # Overview
//!
//! The [`Text2SqlEngine`] runs one asynchronous flow per question. The parser asks
//! the language oracle for the question's facets; entity, attribute and concept
//! resolvers map each mention to tables, columns and glossary meanings; join paths
//! are discovered between the touched tables; the interpretation generator decides
//! whether one reading suffices or several compete; finally every interpretation is
//! rendered to SQL.
//!
//! Mentions that cannot be resolved are never dropped: they come back as
//! knowledge boundaries with suggestions. Oracle and store failures degrade a
//! single resolution, never the whole query.
//!
//! # Architecture
//!
//! ```text
//! question → QueryParser → {Entity, Attribute, Concept} resolvers → join discovery
//!          → InterpretationGenerator → SqlSynthesizer → Text2SqlResponse
//! ```
//!
//! Entity and attribute resolution share one [`StrategyRegistry`]: exact name,
//! case-insensitive name, glossary term, fuzzy glossary term, then the oracle as a
//! fallback.
//!
//! # Example Usage
//!
//! ```no_run
//! use glossa_resolver::{QueryContext, ResolverConfig, Text2SqlEngine};
//! use glossa_synthesizer::SynthesizerConfig;
//! use glossa_llm::OllamaOracle;
//! use glossa_schema::{SchemaCatalog, SqliteSchemaStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteSchemaStore::new(":memory:")?;
//! store.load_catalog("acme", &SchemaCatalog::from_file("catalog.toml")?)?;
//!
//! let engine = Text2SqlEngine::new(
//!     Arc::new(store),
//!     Arc::new(OllamaOracle::default_endpoint("llama3")),
//!     ResolverConfig::default(),
//!     SynthesizerConfig::default(),
//! )?;
//!
//! let context = QueryContext::with_dialect("postgresql");
//! let response = engine
//!     .process_query("Total revenue by region last quarter", "acme", Some(&context))
//!     .await?;
//!
//! for result in &response.sql_results {
//!     println!("{}: {}", result.approach, result.sql);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod attribute;
pub mod concept;
mod config;
mod entity;
mod error;
pub mod interpretation;
pub mod joins;
mod oracle;
pub mod parser;
mod pipeline;
pub mod prompt;
pub mod strategies;
mod strategy;
mod usage;


pub use attribute::AttributeResolver;
pub use concept::ConceptResolver;
pub use config::{ResolverConfig, UsageFeedback};
pub use entity::EntityResolver;
pub use error::{PipelineError, ResolverError};
pub use interpretation::{InterpretationGenerator, InterpretationSet};
pub use joins::JoinDiscovery;
pub use oracle::OracleGateway;
pub use parser::QueryParser;
pub use pipeline::{QueryContext, Text2SqlEngine};
pub use strategy::{
    Candidate, Mention, MentionKind, ResolutionContext, ResolutionStrategy, Resolutions,
    StrategyRegistry,
};
pub use usage::{UsageEvent, UsageRecorder};
