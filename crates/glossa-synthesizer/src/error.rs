//! Error types for the SQL synthesizer

use thiserror::Error;

/// Errors from a single SQL generation attempt
///
/// None of these reach the caller of [`SqlSynthesizer::synthesize`]; they select the
/// template fallback instead.
///
/// [`SqlSynthesizer::synthesize`]: crate::SqlSynthesizer::synthesize
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// The oracle reported a failure
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// The oracle did not answer in time
    #[error("Oracle timeout after {0}s")]
    Timeout(u64),

    /// No SQL could be extracted from the response
    #[error("Oracle returned no SQL")]
    EmptySql,
}
