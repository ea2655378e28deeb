//! Glossa SQL Synthesizer
//!
//! Turns resolved interpretations into executable SQL with an explanation and the
//! assumptions the query makes.
//!
//! # Overview
//!
//! For every interpretation the synthesizer builds a generation prompt from the
//! resolved tables, columns, joins and concepts, asks the language oracle for SQL,
//! then asks for a plain-language explanation. Oracle failures never surface to the
//! caller: a deterministic template renders the SQL instead and the explanation is
//! composed locally.
//!
//! # Architecture
//!
//! ```text
//! ResolvedQuery → SqlPromptBuilder → LanguageOracle → extract_sql → classify
//!                        ↘ (oracle failure) template::render
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use glossa_synthesizer::{SqlSynthesizer, SynthesizerConfig};
//! use glossa_llm::MockOracle;
//! use std::sync::Arc;
//!
//! # async fn example(resolved: glossa_domain::ResolvedQuery) {
//! let oracle = MockOracle::new("```sql\nSELECT * FROM customers\n```");
//! let synthesizer = SqlSynthesizer::new(Arc::new(oracle), SynthesizerConfig::default());
//!
//! for result in synthesizer.synthesize(&resolved, Some("postgresql")).await {
//!     println!("[{}] {}", result.approach, result.sql);
//! }
//! # }
//! ```

#![warn(missing_docs)]

pub mod approach;
mod config;
mod error;
pub mod extract;
mod prompt;
mod synthesizer;
pub mod template;

#[cfg(test)]
mod tests;

pub use config::SynthesizerConfig;
pub use error::SynthesisError;
pub use prompt::{explanation_prompt, SqlPromptBuilder};
pub use synthesizer::{local_explanation, SqlSynthesizer};
