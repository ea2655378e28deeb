//! Query parser: raw text to [`StructuredQuery`]

use crate::oracle::{str_field, OracleGateway};
use crate::prompt::{parse_prompt, parse_schema};
use chrono::Utc;
use glossa_domain::{
    AmbiguityAssessment, Aggregation, Filter, ParseMetadata, SortCriterion, SortDirection,
    StructuredQuery, TimeReference, TimeReferenceKind,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Intent recorded when the oracle contributed nothing
pub const UNKNOWN_INTENT: &str = "unknown";

/// Turns a question into its structured facets with one oracle call
///
/// Never fails: a failed call yields an empty query with intent
/// [`UNKNOWN_INTENT`], and a malformed facet is emptied without affecting the
/// others.
pub struct QueryParser {
    gateway: OracleGateway,
}

impl QueryParser {
    /// Create a parser over the gateway
    pub fn new(gateway: OracleGateway) -> Self {
        Self { gateway }
    }

    /// Parse `query` for `tenant_id`; `hints` are appended to the prompt
    pub async fn parse(&self, query: &str, tenant_id: &str, hints: &[String]) -> StructuredQuery {
        let prompt = parse_prompt(query, hints);
        let (facets, oracle_error) = match self.gateway.structured(&prompt, &parse_schema()).await {
            Ok(map) => (map, None),
            Err(e) => {
                warn!(tenant_id, error = %e, "query parsing degraded to an empty query");
                (Map::new(), Some(e.to_string()))
            }
        };

        let parsed = decode(query, &facets, tenant_id, oracle_error);
        info!(
            tenant_id,
            entities = parsed.main_entities.len(),
            attributes = parsed.attributes.len(),
            ambiguity = parsed.ambiguity_assessment.score,
            "query parsed"
        );
        parsed
    }
}

/// Build a [`StructuredQuery`] from the oracle's facet object
pub fn decode(
    raw_query: &str,
    facets: &Map<String, Value>,
    tenant_id: &str,
    oracle_error: Option<String>,
) -> StructuredQuery {
    let main_entities = string_list(facets, "main_entities");
    let attributes = string_list(facets, "attributes");
    let identified_ambiguities = string_list(facets, "identified_ambiguities");
    let time_references = time_references(facets);
    let aggregation_functions = aggregations(facets);

    let ambiguity_assessment = AmbiguityAssessment::assess(
        &main_entities,
        &identified_ambiguities,
        &time_references,
        &attributes,
        &aggregation_functions,
    );

    StructuredQuery {
        raw_query: raw_query.trim().to_string(),
        primary_intent: str_field(facets, "primary_intent")
            .unwrap_or(UNKNOWN_INTENT)
            .to_string(),
        main_entities,
        attributes,
        filters: filters(facets),
        grouping_dimensions: string_list(facets, "grouping_dimensions"),
        sorting_criteria: sorting(facets),
        time_references,
        aggregation_functions,
        limit: limit(facets),
        identified_ambiguities,
        ambiguity_assessment,
        metadata: ParseMetadata {
            tenant_id: tenant_id.to_string(),
            parsed_at: Utc::now(),
            oracle_error,
        },
    }
}

fn array<'a>(facets: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    match facets.get(key) {
        Some(Value::Array(items)) => items,
        Some(other) if !other.is_null() => {
            debug!(facet = key, "facet is not a list, ignoring it");
            &[]
        }
        _ => &[],
    }
}

/// Scalar rendered as text (filter values may be numbers or booleans)
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn string_list(facets: &Map<String, Value>, key: &str) -> Vec<String> {
    let mut out = Vec::new();
    for item in array(facets, key) {
        if let Some(text) = item.as_str().map(str::trim).filter(|s| !s.is_empty()) {
            push_unique(&mut out, text.to_string());
        }
    }
    out
}

fn filters(facets: &Map<String, Value>) -> Vec<Filter> {
    let mut out = Vec::new();
    for item in array(facets, "filters") {
        let Some(obj) = item.as_object() else { continue };
        let (Some(field), Some(value)) = (
            str_field(obj, "field"),
            obj.get("value").and_then(scalar_text),
        ) else {
            continue;
        };
        push_unique(
            &mut out,
            Filter {
                field: field.to_string(),
                operator: str_field(obj, "operator").unwrap_or("=").to_string(),
                value,
            },
        );
    }
    out
}

fn sorting(facets: &Map<String, Value>) -> Vec<SortCriterion> {
    let mut out = Vec::new();
    for item in array(facets, "sorting_criteria") {
        let (field, direction) = match item {
            Value::String(s) => (s.trim(), None),
            Value::Object(obj) => (str_field(obj, "field").unwrap_or(""), str_field(obj, "direction")),
            _ => continue,
        };
        if field.is_empty() {
            continue;
        }
        let direction = match direction.map(str::to_lowercase).as_deref() {
            Some("desc") | Some("descending") => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        push_unique(
            &mut out,
            SortCriterion {
                field: field.to_string(),
                direction,
            },
        );
    }
    out
}

fn aggregations(facets: &Map<String, Value>) -> Vec<Aggregation> {
    let mut out = Vec::new();
    for item in array(facets, "aggregation_functions") {
        let (function, field) = match item {
            Value::String(s) => (s.trim(), "*"),
            Value::Object(obj) => (
                str_field(obj, "function").unwrap_or(""),
                str_field(obj, "field").unwrap_or("*"),
            ),
            _ => continue,
        };
        if function.is_empty() {
            continue;
        }
        push_unique(
            &mut out,
            Aggregation {
                function: function.to_lowercase(),
                field: field.to_string(),
            },
        );
    }
    out
}

fn time_references(facets: &Map<String, Value>) -> Vec<TimeReference> {
    let mut out = Vec::new();
    for item in array(facets, "time_references") {
        let (text, declared) = match item {
            Value::String(s) => (s.trim(), None),
            Value::Object(obj) => (str_field(obj, "text").unwrap_or(""), str_field(obj, "type")),
            _ => continue,
        };
        if text.is_empty() {
            continue;
        }
        let kind = match declared.map(str::to_lowercase).as_deref() {
            Some("absolute") => TimeReferenceKind::Absolute,
            Some("relative") => TimeReferenceKind::Relative,
            _ => classify_time(text),
        };
        push_unique(
            &mut out,
            TimeReference {
                text: text.to_string(),
                kind,
            },
        );
    }
    out
}

fn limit(facets: &Map<String, Value>) -> Option<u64> {
    match facets.get("limit")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn absolute_time_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:\d{4}-\d{2}-\d{2}|\d{4}-\d{2}|\d{4}|q[1-4]\s+\d{4})$").ok()
    })
    .as_ref()
}

/// Classify a time expression: ISO dates, `YYYY-MM`, bare years and `Qn YYYY` are
/// absolute, everything else is relative
pub fn classify_time(text: &str) -> TimeReferenceKind {
    let absolute = absolute_time_regex()
        .map(|re| re.is_match(text.trim()))
        .unwrap_or(false);
    if absolute {
        TimeReferenceKind::Absolute
    } else {
        TimeReferenceKind::Relative
    }
}
