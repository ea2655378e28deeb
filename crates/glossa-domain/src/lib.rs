//! Glossa Domain Layer
//!
//! This crate contains the data model and the trait boundaries of the Glossa
//! text-to-SQL resolution pipeline. It defines the records every stage passes
//! along, the deterministic scoring functions, and the two collaborator
//! interfaces the pipeline consumes.
//!
//! ## Key Concepts
//!
//! - **StructuredQuery**: the parser's immutable view of a natural-language question
//! - **Resolution**: a mention mapped to a table or column with a confidence score
//! - **Interpretation**: one self-consistent assignment of mentions for a whole query
//! - **Knowledge boundary**: an explicit record of a mention that could not be resolved
//! - **SchemaContextProvider / LanguageOracle**: the external collaborators
//!
//! ## Architecture
//!
//! - Pure data and pure functions, no I/O
//! - Infrastructure implementations live in other crates (`glossa-schema`, `glossa-llm`)
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod boundary;
pub mod error;
pub mod interpretation;
pub mod query;
pub mod resolution;
pub mod response;
pub mod schema;
pub mod scoring;
pub mod traits;

// Re-exports for convenience
pub use boundary::{BoundaryType, KnowledgeBoundary};
pub use error::SchemaError;
pub use interpretation::{QueryInterpretation, ResolvedQuery};
pub use query::{
    AmbiguityAssessment, Aggregation, Filter, ParseMetadata, SortCriterion, SortDirection,
    StructuredQuery, TimeReference, TimeReferenceKind,
};
pub use resolution::{
    ConceptImplementation, ImplementationKind, JoinColumns, JoinPath, ResolutionMethod,
    ResolvedAttribute, ResolvedConcept, ResolvedEntity,
};
pub use response::{ResponseMetadata, SqlApproach, SqlResult, Text2SqlResponse};
pub use schema::{
    ColumnInfo, ColumnRef, GlossaryTerm, GlossaryTermDetails, SchemaSnapshot, TableInfo,
};
pub use traits::{LanguageOracle, SchemaContextProvider};
