//! Error types for the resolution pipeline

use glossa_domain::SchemaError;
use thiserror::Error;

/// Outcome of a single resolver call that produced nothing
///
/// Resolvers never abort the query on these. They distinguish "the oracle or store
/// failed" from "nothing matched" so the failure can be logged at the right level
/// and recorded on the knowledge boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolverError {
    /// The oracle returned an error string or its sentinel error object
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// The oracle did not answer in time
    #[error("Oracle timeout after {0}s")]
    Timeout(u64),

    /// The call succeeded but produced no usable candidate
    #[error("No candidate: {0}")]
    NoCandidate(String),

    /// A schema context lookup failed
    #[error("Store error: {0}")]
    Store(String),
}

impl From<SchemaError> for ResolverError {
    fn from(e: SchemaError) -> Self {
        ResolverError::Store(e.to_string())
    }
}

/// Terminal failure of a whole query
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Empty or rejected tenant id
    #[error("Invalid tenant: {0}")]
    InvalidTenant(String),

    /// The query text cannot be processed
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Query text exceeds the configured maximum
    #[error("Query too long: {0} chars (max: {1})")]
    QueryTooLong(usize, usize),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal invariant violated
    #[error("Internal error: {0}")]
    Internal(String),
}
