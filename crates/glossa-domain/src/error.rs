//! Error type shared by schema context providers

use thiserror::Error;

/// Errors a [`SchemaContextProvider`](crate::traits::SchemaContextProvider) may report
///
/// The pipeline never aborts on these: a failed lookup is logged and treated as
/// "no information available" so resolution can fall through to the next strategy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// The requested table, term or tenant has no record
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backing store failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// The tenant id was rejected by the store
    #[error("Invalid tenant: {0}")]
    InvalidTenant(String),
}
