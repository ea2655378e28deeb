//! End-to-end tests for the text-to-SQL engine
//!
//! These tests run the full pipeline against an in-memory schema store and a
//! scripted oracle keyed by prompt substrings.

use async_trait::async_trait;
use glossa_domain::traits::SchemaContextProvider;
use glossa_domain::{
    ColumnInfo, GlossaryTerm, GlossaryTermDetails, JoinPath, ResolutionMethod, SchemaError,
    TableInfo,
};
use glossa_llm::MockOracle;
use glossa_resolver::{
    PipelineError, QueryContext, ResolverConfig, Text2SqlEngine, UsageFeedback,
};
use glossa_schema::{SchemaCatalog, SqliteSchemaStore};
use glossa_synthesizer::SynthesizerConfig;
use std::sync::Arc;
use std::time::Duration;

const PARSE_PROMPT: &str = "Extract the structure";
const CONCEPT_PROMPT: &str = "Explain the business concept";
const INTERPRETATIONS_PROMPT: &str = "Propose alternative interpretations";
const SQL_PROMPT: &str = "expert SQL author";
const EXPLAIN_PROMPT: &str = "Explain in plain language";

const CATALOG: &str = r#"
[[tables]]
name = "customers"
columns = [
    { name = "id", data_type = "integer" },
    { name = "name", data_type = "text" },
    { name = "region", data_type = "text" },
]

[[tables]]
name = "orders"
columns = [
    { name = "id", data_type = "integer" },
    { name = "customer_id", data_type = "integer" },
    { name = "total", data_type = "numeric" },
]

[[glossary]]
name = "Customer"
definition = "A person or company that has placed an order"
mapped_tables = ["customers"]

[[relationships]]
source_table = "orders"
source_column = "customer_id"
target_table = "customers"
target_column = "id"
confidence = 0.95
"#;

fn store() -> Arc<SqliteSchemaStore> {
    let store = SqliteSchemaStore::new(":memory:").unwrap();
    store
        .load_catalog("acme", &SchemaCatalog::from_toml(CATALOG).unwrap())
        .unwrap();
    Arc::new(store)
}

fn inline_config() -> ResolverConfig {
    ResolverConfig {
        usage_feedback: UsageFeedback::Inline,
        ..ResolverConfig::default()
    }
}

fn engine(store: Arc<SqliteSchemaStore>, oracle: MockOracle) -> Text2SqlEngine {
    Text2SqlEngine::new(store, Arc::new(oracle), inline_config(), SynthesizerConfig::default())
        .unwrap()
}

#[tokio::test]
async fn test_glossary_entity_end_to_end() {
    let mut oracle = MockOracle::default();
    oracle.add_response(
        PARSE_PROMPT,
        r#"{"primary_intent": "list all customers", "main_entities": ["Customer"]}"#,
    );
    oracle.add_response(SQL_PROMPT, "```sql\nSELECT * FROM customers\n```");
    oracle.add_response(EXPLAIN_PROMPT, "Lists every customer account.");
    let store = store();
    let engine = engine(store.clone(), oracle.clone());

    let response = engine
        .process_query("Show me all customers", "acme", None)
        .await
        .unwrap();

    assert_eq!(response.original_query, "Show me all customers");
    assert_eq!(response.interpreted_as, "list all customers");
    assert_eq!(
        response.entities_resolved.get("Customer").map(String::as_str),
        Some("customers")
    );
    let entity = &response.primary_interpretation.entities["Customer"];
    assert_eq!(entity.resolution_method, ResolutionMethod::GlossaryTermMapping);
    assert_eq!(entity.confidence, 0.85);

    assert!(!response.multiple_interpretations);
    assert_eq!(response.sql_results.len(), 1);
    assert!(response.sql_results[0].sql.contains("FROM customers"));
    assert!(response.sql_results[0].is_primary);
    assert!(response.unresolved.is_empty());

    assert_eq!(store.usage_count("acme", "Customer").unwrap(), 1);
    assert_eq!(oracle.calls_matching(INTERPRETATIONS_PROMPT), 0);
    assert_eq!(response.metadata.tenant_id, "acme");
    assert!(uuid::Uuid::parse_str(&response.metadata.query_id).is_ok());
    assert!(!response.metadata.engine_version.is_empty());
}

#[tokio::test]
async fn test_ambiguous_query_yields_ranked_interpretations() {
    let mut oracle = MockOracle::default();
    oracle.add_response(
        PARSE_PROMPT,
        r#"{
            "primary_intent": "count big orders from clients",
            "main_entities": ["orders"],
            "aggregation_functions": [{"function": "count"}],
            "time_references": [{"text": "last month", "type": "relative"}],
            "identified_ambiguities": ["big", "recent", "clients"]
        }"#,
    );
    oracle.add_response(
        CONCEPT_PROMPT,
        r#"{"interpretation": "Orders above a size threshold",
            "implementation": {"type": "filter", "sql_fragment": "orders.total > 1000",
                               "tables_involved": ["orders"], "columns_involved": ["orders.total"]},
            "confidence": 0.6}"#,
    );
    oracle.add_response(
        INTERPRETATIONS_PROMPT,
        r#"{"interpretations": [
            {"rationale": "Clients are the customers who placed the orders", "confidence": 0.7,
             "entity_reassignments": {"clients": "customers"}},
            {"rationale": "Big means a large order total", "confidence": 0.6,
             "concept_reinterpretations": {"big": "orders.total above 1000"}}
        ]}"#,
    );
    oracle.add_response(SQL_PROMPT, "```sql\nSELECT COUNT(*) FROM orders\n```");
    oracle.add_response(EXPLAIN_PROMPT, "Counts the orders.");
    let engine = engine(store(), oracle.clone());

    let response = engine
        .process_query("How many big orders did clients place recently?", "acme", None)
        .await
        .unwrap();

    assert!((response.ambiguity_level - 0.6).abs() < 1e-9);
    assert!(response.multiple_interpretations);
    assert_eq!(response.interpretations.len(), 2);
    assert_eq!(response.interpretations.iter().filter(|i| i.is_primary).count(), 1);
    assert_eq!(response.sql_results.len(), 2);
    assert_eq!(response.sql_results.iter().filter(|r| r.is_primary).count(), 1);

    let primary = &response.primary_interpretation;
    assert!(primary.rationale.starts_with("Clients"));
    let clients = &primary.entities["clients"];
    assert_eq!(clients.table_name, "customers");
    assert_eq!(clients.resolution_method, ResolutionMethod::AlternativeInterpretation);
    assert_eq!(clients.confidence, 0.7);
    assert!(primary
        .join_paths
        .contains_key(&JoinPath::key("orders", "customers")));

    let second = &response.interpretations[1];
    assert_eq!(second.concepts["big"].interpretation, "orders.total above 1000");
    assert_eq!(oracle.calls_matching(INTERPRETATIONS_PROMPT), 1);
}

#[tokio::test]
async fn test_attribute_table_is_joined_in_template_sql() {
    let mut oracle = MockOracle::default();
    oracle.add_response(
        PARSE_PROMPT,
        r#"{"primary_intent": "customer names with order totals",
            "main_entities": ["customers"], "attributes": ["name", "total"]}"#,
    );
    oracle.add_error(SQL_PROMPT, "model unavailable");
    let engine = engine(store(), oracle);

    let response = engine
        .process_query("Customer names and their order totals", "acme", None)
        .await
        .unwrap();

    let primary = &response.primary_interpretation;
    assert_eq!(primary.attributes["total"].table_name, "orders");
    assert_eq!(primary.join_paths.len(), 1);

    let sql = &response.sql_results[0].sql;
    assert!(sql.starts_with("SELECT customers.name, orders.total\nFROM customers\nJOIN orders ON"));
    assert!(!sql.contains("CROSS JOIN"));
    assert!(!response.sql_results[0]
        .assumptions
        .iter()
        .any(|a| a.contains("No join path")));
}

#[tokio::test]
async fn test_unresolved_filter_is_reported() {
    let mut oracle = MockOracle::default();
    oracle.add_response(
        PARSE_PROMPT,
        r#"{"primary_intent": "list gold customers", "main_entities": ["customers"],
            "filters": [{"field": "loyalty tier", "operator": "=", "value": "gold"}]}"#,
    );
    oracle.add_response("Identify the database column", r#"{"table": "", "column": ""}"#);
    let engine = engine(store(), oracle);

    let response = engine
        .process_query("Gold tier customers", "acme", None)
        .await
        .unwrap();

    assert_eq!(response.unresolved.len(), 1);
    let boundary = &response.unresolved[0];
    assert_eq!(boundary.component, "loyalty tier");
    assert!(!boundary.suggestions.is_empty());
}

#[tokio::test]
async fn test_dialect_and_hints_reach_the_oracle() {
    let mut oracle = MockOracle::default();
    oracle.add_response(
        PARSE_PROMPT,
        r#"{"primary_intent": "list customer names", "main_entities": ["customers"], "attributes": ["name"]}"#,
    );
    oracle.add_response(
        SQL_PROMPT,
        "```sql\nSELECT 1\n```\n```postgresql\nSELECT customers.name FROM customers\n```",
    );
    let engine = engine(store(), oracle.clone());
    let context = QueryContext {
        dialect: Some("postgresql".to_string()),
        hints: vec!["names are stored in title case".to_string()],
    };

    let response = engine
        .process_query("Customer names", "acme", Some(&context))
        .await
        .unwrap();

    assert_eq!(response.sql_results[0].sql, "SELECT customers.name FROM customers");
    assert!(oracle
        .prompts()
        .iter()
        .any(|p| p.contains(PARSE_PROMPT) && p.contains("- names are stored in title case")));
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let engine = engine(store(), MockOracle::default());

    assert!(matches!(
        engine.process_query("List customers", "  ", None).await,
        Err(PipelineError::InvalidTenant(_))
    ));
    assert!(matches!(
        engine.process_query("   ", "acme", None).await,
        Err(PipelineError::InvalidQuery(_))
    ));
    let long = "x".repeat(engine.config().max_query_length + 1);
    assert!(matches!(
        engine.process_query(&long, "acme", None).await,
        Err(PipelineError::QueryTooLong(_, _))
    ));
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = ResolverConfig {
        max_interpretations: 0,
        ..ResolverConfig::default()
    };
    let result = Text2SqlEngine::new(
        store(),
        Arc::new(MockOracle::default()),
        config,
        SynthesizerConfig::default(),
    );
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[tokio::test]
async fn test_oracle_timeout_degrades_instead_of_failing() {
    let oracle = MockOracle::new("{}").with_latency(Duration::from_secs(3));
    let config = ResolverConfig {
        oracle_timeout_secs: 1,
        ..inline_config()
    };
    let synthesizer = SynthesizerConfig {
        oracle_timeout_secs: 1,
        ..SynthesizerConfig::default()
    };
    let engine = Text2SqlEngine::new(store(), Arc::new(oracle), config, synthesizer).unwrap();

    let response = engine
        .process_query("Show me all customers", "acme", None)
        .await
        .unwrap();

    assert_eq!(response.interpreted_as, "unknown");
    assert_eq!(response.interpretations.len(), 1);
    assert_eq!(response.sql_results.len(), 1);
    assert!(!response.sql_results[0].assumptions.is_empty());
}

/// Store that rejects every tenant
struct RejectingStore;

#[async_trait]
impl SchemaContextProvider for RejectingStore {
    async fn get_tables(&self, tenant_id: &str) -> Result<Vec<TableInfo>, SchemaError> {
        Err(SchemaError::InvalidTenant(tenant_id.to_string()))
    }

    async fn get_columns(&self, _tenant_id: &str, _table: &str) -> Result<Vec<ColumnInfo>, SchemaError> {
        Ok(Vec::new())
    }

    async fn get_glossary_terms(&self, _tenant_id: &str) -> Result<Vec<GlossaryTerm>, SchemaError> {
        Ok(Vec::new())
    }

    async fn get_glossary_term_details(
        &self,
        _tenant_id: &str,
        _term: &str,
    ) -> Result<Option<GlossaryTermDetails>, SchemaError> {
        Ok(None)
    }

    async fn search_glossary_terms(
        &self,
        _tenant_id: &str,
        _keyword: &str,
    ) -> Result<Vec<GlossaryTerm>, SchemaError> {
        Ok(Vec::new())
    }

    async fn update_term_mapping_usage(
        &self,
        _tenant_id: &str,
        _term: &str,
        _table: &str,
    ) -> Result<(), SchemaError> {
        Ok(())
    }

    async fn find_join_path(
        &self,
        _tenant_id: &str,
        _source_table: &str,
        _target_table: &str,
        _min_confidence: f64,
    ) -> Result<Option<JoinPath>, SchemaError> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_rejected_tenant_is_fatal() {
    let oracle = MockOracle::default();
    let engine = Text2SqlEngine::new(
        Arc::new(RejectingStore),
        Arc::new(oracle.clone()),
        ResolverConfig::default(),
        SynthesizerConfig::default(),
    )
    .unwrap();

    let result = engine.process_query("List customers", "globex", None).await;
    assert_eq!(result.unwrap_err(), PipelineError::InvalidTenant("globex".to_string()));
    assert_eq!(oracle.call_count(), 0);
}
