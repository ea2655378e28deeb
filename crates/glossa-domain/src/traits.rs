//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the resolution pipeline and its
//! collaborators. Implementations live in other crates (`glossa-schema`,
//! `glossa-llm`) or in the embedding application.

use crate::error::SchemaError;
use crate::resolution::JoinPath;
use crate::schema::{ColumnInfo, GlossaryTerm, GlossaryTermDetails, TableInfo};
use async_trait::async_trait;
use serde_json::Value;

/// Prefix of the text an oracle returns instead of failing
pub const ORACLE_ERROR_PREFIX: &str = "Error: ";

/// Whether a `generate` result is an oracle error string
pub fn is_oracle_error_text(text: &str) -> bool {
    text.starts_with(ORACLE_ERROR_PREFIX)
}

/// Whether a `generate_structured` result is the sentinel error object
///
/// The sentinel is `{"error": ..., "raw_response": ...}`.
pub fn is_oracle_error_object(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| obj.contains_key("error") && obj.contains_key("raw_response"))
        .unwrap_or(false)
}

/// Source of table, column and glossary facts for a tenant
///
/// Implemented by the infrastructure layer (`glossa-schema`). The tenant id is an
/// opaque partition key.
#[async_trait]
pub trait SchemaContextProvider: Send + Sync {
    /// List tables
    async fn get_tables(&self, tenant_id: &str) -> Result<Vec<TableInfo>, SchemaError>;

    /// List the columns of a table
    async fn get_columns(
        &self,
        tenant_id: &str,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, SchemaError>;

    /// List glossary terms
    async fn get_glossary_terms(&self, tenant_id: &str) -> Result<Vec<GlossaryTerm>, SchemaError>;

    /// Full details of a glossary term, `None` when the term is unknown
    async fn get_glossary_term_details(
        &self,
        tenant_id: &str,
        term: &str,
    ) -> Result<Option<GlossaryTermDetails>, SchemaError>;

    /// Glossary terms whose name or definition mentions the keyword
    async fn search_glossary_terms(
        &self,
        tenant_id: &str,
        keyword: &str,
    ) -> Result<Vec<GlossaryTerm>, SchemaError>;

    /// Record one successful use of a term to resolve a mention to a table
    ///
    /// Must be an append-only event at the store so concurrent increments are
    /// never lost.
    async fn update_term_mapping_usage(
        &self,
        tenant_id: &str,
        term: &str,
        table: &str,
    ) -> Result<(), SchemaError>;

    /// Best path between two tables with confidence at least `min_confidence`
    async fn find_join_path(
        &self,
        tenant_id: &str,
        source_table: &str,
        target_table: &str,
        min_confidence: f64,
    ) -> Result<Option<JoinPath>, SchemaError>;
}

/// Text and structured-JSON generation on demand
///
/// Implemented by the infrastructure layer (`glossa-llm`). Neither method fails:
/// `generate` returns a string starting with [`ORACLE_ERROR_PREFIX`] on transport
/// failure, and `generate_structured` returns `{"error": ..., "raw_response": ...}`
/// when no JSON object could be decoded. Retry, timeout and fallback policy belong
/// to the caller.
#[async_trait]
pub trait LanguageOracle: Send + Sync {
    /// Generate free text
    async fn generate(&self, prompt: &str, temperature: f32) -> String;

    /// Generate a JSON object following `json_schema`
    async fn generate_structured(
        &self,
        prompt: &str,
        json_schema: &Value,
        temperature: f32,
    ) -> Value;

    /// Name of the underlying model, for logs and metadata
    fn model_name(&self) -> &str {
        "llm"
    }
}
