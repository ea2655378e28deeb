//! Shared fixtures and synthesizer tests

use crate::synthesizer::SqlSynthesizer;
use crate::template::TEMPLATE_ASSUMPTION;
use crate::SynthesizerConfig;
use glossa_domain::interpretation::SINGLE_INTERPRETATION_RATIONALE;
use glossa_domain::{
    AmbiguityAssessment, ColumnInfo, ColumnRef, Filter, JoinColumns, JoinPath, ParseMetadata,
    QueryInterpretation, ResolutionMethod, ResolvedAttribute, ResolvedEntity, ResolvedQuery,
    SchemaSnapshot, SqlApproach, StructuredQuery, TableInfo,
};
use glossa_llm::MockOracle;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const SQL_PROMPT: &str = "expert SQL author";
const EXPLAIN_PROMPT: &str = "Explain in plain language";

fn column(name: &str, data_type: &str) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        data_type: data_type.to_string(),
        description: String::new(),
    }
}

fn table(name: &str) -> TableInfo {
    TableInfo {
        name: name.to_string(),
        description: String::new(),
    }
}

fn entity(mention: &str, table: &str) -> ResolvedEntity {
    ResolvedEntity {
        mention: mention.to_string(),
        table_name: table.to_string(),
        confidence: 1.0,
        resolution_method: ResolutionMethod::DirectMatch,
        glossary_term: None,
    }
}

fn attribute(mention: &str, table: &str, column: &str) -> ResolvedAttribute {
    ResolvedAttribute {
        mention: mention.to_string(),
        table_name: table.to_string(),
        column_name: column.to_string(),
        confidence: 1.0,
        resolution_method: ResolutionMethod::DirectMatch,
        glossary_term: None,
    }
}

fn query(raw: &str, intent: &str, entities: &[&str]) -> StructuredQuery {
    StructuredQuery {
        raw_query: raw.to_string(),
        primary_intent: intent.to_string(),
        main_entities: entities.iter().map(|e| e.to_string()).collect(),
        attributes: Vec::new(),
        filters: Vec::new(),
        grouping_dimensions: Vec::new(),
        sorting_criteria: Vec::new(),
        time_references: Vec::new(),
        aggregation_functions: Vec::new(),
        limit: None,
        identified_ambiguities: Vec::new(),
        ambiguity_assessment: AmbiguityAssessment::clear(),
        metadata: ParseMetadata {
            tenant_id: "acme".to_string(),
            parsed_at: chrono::Utc::now(),
            oracle_error: None,
        },
    }
}

fn interpretation(entities: &[(&str, &str)]) -> QueryInterpretation {
    QueryInterpretation {
        entities: entities
            .iter()
            .map(|(mention, table)| (mention.to_string(), entity(mention, table)))
            .collect(),
        attributes: BTreeMap::new(),
        concepts: BTreeMap::new(),
        join_paths: BTreeMap::new(),
        confidence: 1.0,
        is_primary: true,
        rationale: SINGLE_INTERPRETATION_RATIONALE.to_string(),
    }
}

/// "Show me all customers" against a one-table schema
pub(crate) fn customers_fixture() -> (QueryInterpretation, StructuredQuery, SchemaSnapshot) {
    let schema = SchemaSnapshot {
        tenant_id: "acme".to_string(),
        tables: vec![table("customers")],
        columns: BTreeMap::from([(
            "customers".to_string(),
            vec![
                column("id", "integer"),
                column("name", "text"),
                column("status", "text"),
            ],
        )]),
        glossary: Vec::new(),
    };
    (
        interpretation(&[("customers", "customers")]),
        query("Show me all customers", "list customers", &["customers"]),
        schema,
    )
}

/// Orders joined to customers with `name` and `total` resolved
pub(crate) fn orders_fixture() -> (QueryInterpretation, StructuredQuery, SchemaSnapshot) {
    let mut interp = interpretation(&[("orders", "orders"), ("customers", "customers")]);
    interp
        .attributes
        .insert("name".to_string(), attribute("name", "customers", "name"));
    interp
        .attributes
        .insert("total".to_string(), attribute("total", "orders", "total"));
    interp.join_paths.insert(
        JoinPath::key("orders", "customers"),
        JoinPath {
            source: "orders".to_string(),
            target: "customers".to_string(),
            path: vec!["orders".to_string(), "customers".to_string()],
            columns: vec![JoinColumns {
                left: ColumnRef::new("orders", "customer_id"),
                right: ColumnRef::new("customers", "id"),
            }],
            confidence: 0.95,
        },
    );

    let mut q = query(
        "Total order value per customer",
        "sum order totals by customer",
        &["orders", "customers"],
    );
    q.attributes = vec!["name".to_string(), "total".to_string()];

    let schema = SchemaSnapshot {
        tenant_id: "acme".to_string(),
        tables: vec![table("customers"), table("orders")],
        columns: BTreeMap::from([
            (
                "customers".to_string(),
                vec![column("id", "integer"), column("name", "text")],
            ),
            (
                "orders".to_string(),
                vec![
                    column("id", "integer"),
                    column("customer_id", "integer"),
                    column("total", "numeric"),
                ],
            ),
        ]),
        glossary: Vec::new(),
    };
    (interp, q, schema)
}

pub(crate) fn status_attribute() -> ResolvedAttribute {
    attribute("status", "customers", "status")
}

pub(crate) fn status_filter() -> Filter {
    Filter {
        field: "status".to_string(),
        operator: "=".to_string(),
        value: "active".to_string(),
    }
}

fn resolved(interpretations: Vec<QueryInterpretation>) -> ResolvedQuery {
    let (_, structured, schema) = customers_fixture();
    ResolvedQuery {
        structured,
        entities: interpretations
            .first()
            .map(|i| i.entities.clone())
            .unwrap_or_default(),
        attributes: BTreeMap::new(),
        concepts: BTreeMap::new(),
        join_paths: BTreeMap::new(),
        missing_join_paths: Vec::new(),
        unresolved: Vec::new(),
        interpretations,
        schema,
    }
}

fn synthesizer(oracle: &MockOracle) -> SqlSynthesizer {
    SqlSynthesizer::new(Arc::new(oracle.clone()), SynthesizerConfig::default())
}

#[tokio::test]
async fn test_fenced_sql_is_extracted() {
    let mut oracle = MockOracle::default();
    oracle.add_response(EXPLAIN_PROMPT, "Lists every customer.");
    oracle.add_response(
        SQL_PROMPT,
        "Here you go:\n```sql\nSELECT * FROM customers\n```\nLet me know!",
    );

    let (interp, _, _) = customers_fixture();
    let results = synthesizer(&oracle).synthesize(&resolved(vec![interp]), None).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].sql, "SELECT * FROM customers");
    assert_eq!(results[0].explanation, "Lists every customer.");
    assert!(results[0].assumptions.is_empty());
    assert_eq!(oracle.call_count(), 2);
}

#[tokio::test]
async fn test_oracle_error_falls_back_to_template() {
    let mut oracle = MockOracle::default();
    oracle.add_error(SQL_PROMPT, "connection refused");

    let (interp, _, _) = customers_fixture();
    let results = synthesizer(&oracle).synthesize(&resolved(vec![interp]), None).await;

    assert_eq!(results[0].sql, "SELECT *\nFROM customers");
    assert!(results[0]
        .assumptions
        .iter()
        .any(|a| a == TEMPLATE_ASSUMPTION));
    assert!(results[0].explanation.contains("customers"));
    // no explanation call for template SQL
    assert_eq!(oracle.calls_matching(EXPLAIN_PROMPT), 0);
}

#[tokio::test]
async fn test_slow_oracle_times_out_to_template() {
    let oracle = MockOracle::new("```sql\nSELECT 1\n```").with_latency(Duration::from_secs(3));
    let config = SynthesizerConfig {
        oracle_timeout_secs: 1,
        ..SynthesizerConfig::default()
    };
    let synth = SqlSynthesizer::new(Arc::new(oracle), config);

    let (interp, _, _) = customers_fixture();
    let results = synth.synthesize(&resolved(vec![interp]), None).await;
    assert_eq!(results[0].sql, "SELECT *\nFROM customers");
    assert!(results[0].assumptions.contains(&TEMPLATE_ASSUMPTION.to_string()));
}

#[tokio::test]
async fn test_explanation_assumptions_are_parsed() {
    let mut oracle = MockOracle::default();
    oracle.add_response(
        EXPLAIN_PROMPT,
        "Returns active customers.\n\nAssumptions:\n- Active means status = 'active'\n- All regions are included",
    );
    oracle.add_response(
        SQL_PROMPT,
        "```sql\nSELECT * FROM customers WHERE status = 'active'\n```",
    );

    let (interp, _, _) = customers_fixture();
    let results = synthesizer(&oracle).synthesize(&resolved(vec![interp]), None).await;
    assert_eq!(
        results[0].assumptions,
        vec!["Active means status = 'active'", "All regions are included"]
    );
}

#[tokio::test]
async fn test_empty_explanation_is_composed_locally() {
    let mut oracle = MockOracle::default();
    oracle.add_response(EXPLAIN_PROMPT, "   ");
    oracle.add_response(SQL_PROMPT, "```sql\nSELECT * FROM customers\n```");

    let (interp, _, _) = customers_fixture();
    let results = synthesizer(&oracle).synthesize(&resolved(vec![interp]), None).await;
    assert_eq!(
        results[0].explanation,
        "Answers \"Show me all customers\" using customers (single clear interpretation)."
    );
}

#[tokio::test]
async fn test_approach_and_interpretation_fields() {
    let mut oracle = MockOracle::default();
    oracle.add_response(EXPLAIN_PROMPT, "Lists customers.");
    oracle.add_response(SQL_PROMPT, "```sql\nSELECT * FROM customers\n```");

    let (primary, _, _) = customers_fixture();
    let mut alternative = primary.clone();
    alternative.is_primary = false;
    alternative.confidence = 0.6;
    alternative.rationale = "Broader reading of customers".to_string();

    let results = synthesizer(&oracle)
        .synthesize(&resolved(vec![primary, alternative]), None)
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].approach_kind, SqlApproach::DirectQuery);
    assert_eq!(results[0].approach, "direct_query_single");
    assert!(results[0].is_primary);
    assert_eq!(results[0].interpretation_index, 0);

    assert_eq!(results[1].approach, "direct_query_broader");
    assert!(!results[1].is_primary);
    assert_eq!(results[1].interpretation_index, 1);
    assert_eq!(results[1].interpretation_rationale, "Broader reading of customers");
}

#[tokio::test]
async fn test_dialect_override_reaches_prompt_and_extraction() {
    let mut oracle = MockOracle::default();
    oracle.add_response(EXPLAIN_PROMPT, "Lists customers.");
    oracle.add_response(
        SQL_PROMPT,
        "```sql\nSELECT 1\n```\n```sqlite\nSELECT * FROM customers LIMIT 10\n```",
    );

    let (interp, _, _) = customers_fixture();
    let results = synthesizer(&oracle)
        .synthesize(&resolved(vec![interp]), Some("sqlite"))
        .await;

    assert_eq!(results[0].sql, "SELECT * FROM customers LIMIT 10");
    assert!(oracle.prompts()[0].contains("```sqlite fenced code block"));
}

#[tokio::test]
async fn test_no_interpretations_no_results() {
    let oracle = MockOracle::default();
    let results = synthesizer(&oracle).synthesize(&resolved(Vec::new()), None).await;
    assert!(results.is_empty());
    assert_eq!(oracle.call_count(), 0);
}
