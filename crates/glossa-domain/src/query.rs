//! Structured view of a natural-language question and its ambiguity assessment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ambiguity contribution when no main entity was identified
pub const NO_ENTITY_PENALTY: f64 = 0.3;

/// Ambiguity contribution per explicitly identified ambiguity
pub const PER_AMBIGUITY_PENALTY: f64 = 0.1;

/// Cap on the total contribution of explicit ambiguities
pub const MAX_AMBIGUITY_PENALTY: f64 = 0.5;

/// Ambiguity contribution when a time reference is relative
pub const RELATIVE_TIME_PENALTY: f64 = 0.1;

/// Ambiguity contribution when aggregations have nothing to aggregate
pub const UNTARGETED_AGGREGATION_PENALTY: f64 = 0.2;

/// A filter condition mentioned in the question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Field mention the condition applies to
    pub field: String,
    /// Comparison operator as stated (`=`, `>`, `contains`, ...)
    pub operator: String,
    /// Literal value, kept as text
    pub value: String,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl SortDirection {
    /// SQL keyword for this direction
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A sort criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortCriterion {
    /// Field mention to sort by
    pub field: String,
    /// Direction
    pub direction: SortDirection,
}

/// An aggregation requested by the question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Aggregate function (`count`, `sum`, `avg`, ...)
    pub function: String,
    /// Field mention being aggregated (`*` for row counts)
    pub field: String,
}

/// Whether a time reference names a fixed date or is relative to "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeReferenceKind {
    /// A calendar date, month, year or quarter
    Absolute,
    /// "last month", "yesterday", "this year", ...
    Relative,
}

/// A time expression found in the question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeReference {
    /// Expression as written
    pub text: String,
    /// Classification
    pub kind: TimeReferenceKind,
}

impl TimeReference {
    /// Whether the reference is relative
    pub fn is_relative(&self) -> bool {
        self.kind == TimeReferenceKind::Relative
    }
}

/// Deterministic ambiguity score with the factors that produced it
///
/// Invariant: `score` is the sum of the factor contributions clipped to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguityAssessment {
    /// Score in `[0, 1]`
    pub score: f64,
    /// Human-readable description of each contributing factor
    pub factors: Vec<String>,
}

impl AmbiguityAssessment {
    /// Score the parsed facets of a question
    ///
    /// - +0.3 when no main entity was identified
    /// - +0.1 per explicit ambiguity, at most +0.5
    /// - +0.1 when any time reference is relative
    /// - +0.2 when aggregations are requested but no attribute was identified
    pub fn assess(
        main_entities: &[String],
        identified_ambiguities: &[String],
        time_references: &[TimeReference],
        attributes: &[String],
        aggregation_functions: &[Aggregation],
    ) -> Self {
        let mut score = 0.0;
        let mut factors = Vec::new();

        if main_entities.is_empty() {
            score += NO_ENTITY_PENALTY;
            factors.push("no main entities identified".to_string());
        }

        if !identified_ambiguities.is_empty() {
            let contribution = (PER_AMBIGUITY_PENALTY * identified_ambiguities.len() as f64)
                .min(MAX_AMBIGUITY_PENALTY);
            score += contribution;
            factors.push(format!(
                "{} explicit ambiguities: {}",
                identified_ambiguities.len(),
                identified_ambiguities.join(", ")
            ));
        }

        if time_references.iter().any(TimeReference::is_relative) {
            score += RELATIVE_TIME_PENALTY;
            factors.push("relative time reference".to_string());
        }

        if attributes.is_empty() && !aggregation_functions.is_empty() {
            score += UNTARGETED_AGGREGATION_PENALTY;
            factors.push("aggregation without target attributes".to_string());
        }

        Self {
            score: f64::min(score, 1.0).max(0.0),
            factors,
        }
    }

    /// An assessment with no ambiguity
    pub fn clear() -> Self {
        Self {
            score: 0.0,
            factors: Vec::new(),
        }
    }
}

/// Metadata recorded while parsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseMetadata {
    /// Tenant the query was parsed for
    pub tenant_id: String,
    /// When parsing finished
    pub parsed_at: DateTime<Utc>,
    /// Why the oracle contributed nothing, if it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_error: Option<String>,
}

/// The parser's structured view of a question
///
/// Produced once by the query parser and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
    /// Original question text
    pub raw_query: String,
    /// What the user wants to do, as phrased by the oracle
    pub primary_intent: String,
    /// Entity mentions (candidate tables)
    pub main_entities: Vec<String>,
    /// Attribute mentions (candidate columns)
    pub attributes: Vec<String>,
    /// Filter conditions
    pub filters: Vec<Filter>,
    /// Grouping mentions
    pub grouping_dimensions: Vec<String>,
    /// Sort criteria
    pub sorting_criteria: Vec<SortCriterion>,
    /// Time expressions
    pub time_references: Vec<TimeReference>,
    /// Aggregations
    pub aggregation_functions: Vec<Aggregation>,
    /// Row limit
    pub limit: Option<u64>,
    /// Terms the oracle flagged as ambiguous
    pub identified_ambiguities: Vec<String>,
    /// Deterministic ambiguity assessment
    pub ambiguity_assessment: AmbiguityAssessment,
    /// Parse metadata
    pub metadata: ParseMetadata,
}

impl StructuredQuery {
    /// Every field mention that should resolve to a column, deduplicated in order:
    /// attributes, filter fields, grouping, sorting, then aggregated fields.
    pub fn attribute_mentions(&self) -> Vec<String> {
        let candidates = self
            .attributes
            .iter()
            .chain(self.filters.iter().map(|f| &f.field))
            .chain(self.grouping_dimensions.iter())
            .chain(self.sorting_criteria.iter().map(|s| &s.field))
            .chain(self.aggregation_functions.iter().map(|a| &a.field));

        let mut mentions: Vec<String> = Vec::new();
        for mention in candidates {
            let mention = mention.trim();
            if mention.is_empty() || mention == "*" {
                continue;
            }
            if !mentions.iter().any(|m| m == mention) {
                mentions.push(mention.to_string());
            }
        }
        mentions
    }

    /// Whether the mention is used as a filter field
    pub fn is_filter_field(&self, mention: &str) -> bool {
        self.filters.iter().any(|f| f.field.trim() == mention)
    }
}
