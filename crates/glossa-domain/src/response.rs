//! Pipeline output: SQL results and the response envelope

use crate::boundary::KnowledgeBoundary;
use crate::interpretation::QueryInterpretation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Coarse shape of a generated SQL statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlApproach {
    /// Uses GROUP BY
    Aggregation,
    /// Starts with a WITH clause
    CommonTableExpression,
    /// Nested SELECT
    Subquery,
    /// UNION of selects
    Union,
    /// More than two joins
    MultiJoin,
    /// Plain select
    DirectQuery,
}

impl SqlApproach {
    /// Wire name of the approach
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlApproach::Aggregation => "aggregation",
            SqlApproach::CommonTableExpression => "common_table_expression",
            SqlApproach::Subquery => "subquery",
            SqlApproach::Union => "union",
            SqlApproach::MultiJoin => "multi_join",
            SqlApproach::DirectQuery => "direct_query",
        }
    }
}

impl fmt::Display for SqlApproach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL produced for one interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlResult {
    /// SQL text
    pub sql: String,
    /// Plain-language explanation
    pub explanation: String,
    /// Assumptions made while generating the SQL
    pub assumptions: Vec<String>,
    /// Approach label, `"{approach}_{rationale tag}"`
    pub approach: String,
    /// Approach classification without the tag
    pub approach_kind: SqlApproach,
    /// Index of the interpretation in the response's interpretation list
    pub interpretation_index: usize,
    /// Rationale of the interpretation this SQL implements
    pub interpretation_rationale: String,
    /// Whether this SQL implements the primary interpretation
    pub is_primary: bool,
}

/// Response metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// When the response was assembled
    pub timestamp: DateTime<Utc>,
    /// Version of the resolution engine
    pub engine_version: String,
    /// Unique id of this query run
    pub query_id: String,
    /// Tenant the query ran for
    pub tenant_id: String,
}

/// Complete answer to a natural-language question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text2SqlResponse {
    /// Question as received
    pub original_query: String,
    /// What the question was understood to ask
    pub interpreted_as: String,
    /// Ambiguity score in `[0, 1]`
    pub ambiguity_level: f64,
    /// One SQL result per interpretation, primary first
    pub sql_results: Vec<SqlResult>,
    /// The primary interpretation
    pub primary_interpretation: QueryInterpretation,
    /// All interpretations, primary first
    pub interpretations: Vec<QueryInterpretation>,
    /// Whether competing interpretations were produced
    pub multiple_interpretations: bool,
    /// Entity mention → table, from the primary interpretation
    pub entities_resolved: BTreeMap<String, String>,
    /// Mentions that could not be resolved
    pub unresolved: Vec<KnowledgeBoundary>,
    /// Metadata
    pub metadata: ResponseMetadata,
}

impl Text2SqlResponse {
    /// SQL of the primary interpretation
    pub fn primary_sql(&self) -> Option<&SqlResult> {
        self.sql_results.iter().find(|r| r.is_primary)
    }
}
