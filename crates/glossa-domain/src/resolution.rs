//! Resolved mentions: entities, attributes, concepts and join paths

use crate::schema::ColumnRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a mention was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Exact, case-sensitive schema name match
    DirectMatch,
    /// Schema name match ignoring case
    CaseInsensitiveMatch,
    /// Exact glossary term with schema mappings
    GlossaryTermMapping,
    /// Similar glossary term with schema mappings
    FuzzyGlossaryMatch,
    /// Language oracle answer
    LlmResolution,
    /// Reassigned by an alternative interpretation
    AlternativeInterpretation,
}

impl ResolutionMethod {
    /// Wire name of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMethod::DirectMatch => "direct_match",
            ResolutionMethod::CaseInsensitiveMatch => "case_insensitive_match",
            ResolutionMethod::GlossaryTermMapping => "glossary_term_mapping",
            ResolutionMethod::FuzzyGlossaryMatch => "fuzzy_glossary_match",
            ResolutionMethod::LlmResolution => "llm_resolution",
            ResolutionMethod::AlternativeInterpretation => "alternative_interpretation",
        }
    }
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity mention resolved to a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    /// Mention as it appeared in the query
    pub mention: String,
    /// Resolved table
    pub table_name: String,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// How the table was found
    pub resolution_method: ResolutionMethod,
    /// Glossary term used, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossary_term: Option<String>,
}

/// An attribute mention resolved to a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAttribute {
    /// Mention as it appeared in the query
    pub mention: String,
    /// Table owning the column
    pub table_name: String,
    /// Resolved column
    pub column_name: String,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// How the column was found
    pub resolution_method: ResolutionMethod,
    /// Glossary term used, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossary_term: Option<String>,
}

impl ResolvedAttribute {
    /// The column as a qualified reference
    pub fn column_ref(&self) -> ColumnRef {
        ColumnRef::new(&self.table_name, &self.column_name)
    }
}

/// Shape of a concept's SQL implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationKind {
    /// Restricts rows (WHERE clause)
    Filter,
    /// Selects data (SELECT list / FROM)
    Selection,
    /// Derived value (expression or aggregate)
    Calculation,
    /// Plain mapping to schema constructs
    Mapping,
}

impl ImplementationKind {
    /// Lenient parse of an oracle-provided kind; unknown kinds become `Mapping`
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "filter" | "where" | "condition" => ImplementationKind::Filter,
            "selection" | "select" | "projection" => ImplementationKind::Selection,
            "calculation" | "aggregation" | "expression" | "metric" => {
                ImplementationKind::Calculation
            }
            _ => ImplementationKind::Mapping,
        }
    }
}

/// How a concept is realized in SQL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptImplementation {
    /// Implementation kind
    #[serde(rename = "type")]
    pub kind: ImplementationKind,
    /// SQL fragment or skeleton
    pub sql_fragment: String,
    /// Tables the fragment touches
    #[serde(default)]
    pub tables_involved: Vec<String>,
    /// Columns the fragment touches (`table.column`)
    #[serde(default)]
    pub columns_involved: Vec<String>,
}

/// A business concept resolved to an interpretation and SQL implementation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConcept {
    /// Concept text
    pub concept: String,
    /// Plain-language interpretation
    pub interpretation: String,
    /// SQL implementation
    pub implementation: ConceptImplementation,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Other plausible readings
    #[serde(default)]
    pub alternatives: Vec<String>,
    /// Glossary terms the concept was built from
    #[serde(default)]
    pub component_terms: Vec<String>,
    /// Whether two or more glossary terms were merged
    #[serde(default)]
    pub is_composite: bool,
}

/// One hop of a join path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinColumns {
    /// Left side of the equality
    pub left: ColumnRef,
    /// Right side of the equality
    pub right: ColumnRef,
}

impl JoinColumns {
    /// `left = right` condition text
    pub fn condition(&self) -> String {
        format!("{} = {}", self.left.qualified(), self.right.qualified())
    }
}

/// A connecting path between two tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPath {
    /// Starting table
    pub source: String,
    /// Destination table
    pub target: String,
    /// Tables traversed, source first and target last
    pub path: Vec<String>,
    /// Join conditions, one per hop
    pub columns: Vec<JoinColumns>,
    /// Path confidence in `[0, 1]`
    pub confidence: f64,
}

impl JoinPath {
    /// Map key for a table pair
    pub fn key(source: &str, target: &str) -> String {
        format!("{}_to_{}", source, target)
    }

    /// Whether every table on the path is in `tables`
    pub fn within(&self, tables: &[String]) -> bool {
        tables.contains(&self.source) && tables.contains(&self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_wire_names() {
        let json = serde_json::to_string(&ResolutionMethod::GlossaryTermMapping).unwrap();
        assert_eq!(json, "\"glossary_term_mapping\"");
        assert_eq!(ResolutionMethod::DirectMatch.to_string(), "direct_match");
    }

    #[test]
    fn test_implementation_kind_lenient_parse() {
        assert_eq!(ImplementationKind::parse_lenient("WHERE"), ImplementationKind::Filter);
        assert_eq!(ImplementationKind::parse_lenient("select"), ImplementationKind::Selection);
        assert_eq!(ImplementationKind::parse_lenient("metric"), ImplementationKind::Calculation);
        assert_eq!(ImplementationKind::parse_lenient("???"), ImplementationKind::Mapping);
    }

    #[test]
    fn test_implementation_serializes_kind_as_type() {
        let implementation = ConceptImplementation {
            kind: ImplementationKind::Filter,
            sql_fragment: "WHERE customers.status = '<active>'".to_string(),
            tables_involved: vec!["customers".to_string()],
            columns_involved: vec!["customers.status".to_string()],
        };
        let value = serde_json::to_value(&implementation).unwrap();
        assert_eq!(value["type"], "filter");
    }

    #[test]
    fn test_join_key_and_condition() {
        assert_eq!(JoinPath::key("orders", "customers"), "orders_to_customers");
        let hop = JoinColumns {
            left: ColumnRef::new("orders", "customer_id"),
            right: ColumnRef::new("customers", "id"),
        };
        assert_eq!(hop.condition(), "orders.customer_id = customers.id");
    }
}
