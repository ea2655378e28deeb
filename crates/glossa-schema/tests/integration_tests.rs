//! Integration tests for glossa-schema
//!
//! These tests exercise the store through the `SchemaContextProvider` trait.

use glossa_domain::traits::SchemaContextProvider;
use glossa_domain::SchemaError;
use glossa_schema::{SchemaCatalog, SqliteSchemaStore};
use std::sync::Arc;

const CATALOG: &str = r#"
[[tables]]
name = "customers"
description = "Customer accounts"
columns = [
    { name = "id", data_type = "integer" },
    { name = "name", data_type = "text" },
    { name = "status", data_type = "text" },
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
mapped_columns = [{ table = "customers", column = "name" }]

[[glossary]]
name = "Revenue"
definition = "Sum of order totals"
weight = 1.2
mapped_columns = [{ table = "orders", column = "total" }]

[[relationships]]
source_table = "orders"
source_column = "customer_id"
target_table = "customers"
target_column = "id"
confidence = 0.95
"#;

fn loaded_store() -> SqliteSchemaStore {
    let store = SqliteSchemaStore::new(":memory:").unwrap();
    let catalog = SchemaCatalog::from_toml(CATALOG).unwrap();
    store.load_catalog("acme", &catalog).unwrap();
    store
}

#[tokio::test]
async fn test_tables_and_columns() {
    let store = loaded_store();

    let tables = store.get_tables("acme").await.unwrap();
    let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["customers", "orders"]);
    assert_eq!(tables[0].description, "Customer accounts");

    let columns = store.get_columns("acme", "orders").await.unwrap();
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[2].data_type, "numeric");

    assert!(store.get_columns("acme", "missing").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tenants_are_partitioned() {
    let store = loaded_store();
    assert!(store.get_tables("globex").await.unwrap().is_empty());
    assert!(store
        .get_glossary_term_details("globex", "Customer")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_empty_tenant_is_rejected() {
    let store = loaded_store();
    let result = store.get_tables(" ").await;
    assert!(matches!(result, Err(SchemaError::InvalidTenant(_))));
}

#[tokio::test]
async fn test_glossary_details_and_search() {
    let store = loaded_store();

    let terms = store.get_glossary_terms("acme").await.unwrap();
    assert_eq!(terms.len(), 2);

    let details = store
        .get_glossary_term_details("acme", "revenue")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(details.name, "Revenue");
    assert_eq!(details.weight, 1.2);
    assert_eq!(details.mapped_columns[0].qualified(), "orders.total");
    assert_eq!(details.usage_count, 0);

    let hits = store.search_glossary_terms("acme", "ORDER").await.unwrap();
    let hit_names: Vec<_> = hits.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(hit_names, vec!["Customer", "Revenue"]);
    assert!(store.search_glossary_terms("acme", "").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_usage_increments_are_not_lost() {
    let store = Arc::new(loaded_store());

    let mut handles = Vec::new();
    for _ in 0..25 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .update_term_mapping_usage("acme", "Customer", "customers")
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let details = store
        .get_glossary_term_details("acme", "Customer")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(details.usage_count, 25);
}

#[tokio::test]
async fn test_usage_survives_catalog_reload() {
    let store = loaded_store();
    store
        .update_term_mapping_usage("acme", "customer", "customers")
        .await
        .unwrap();

    let catalog = SchemaCatalog::from_toml(CATALOG).unwrap();
    store.load_catalog("acme", &catalog).unwrap();

    assert_eq!(store.usage_count("acme", "Customer").unwrap(), 1);
    assert_eq!(store.get_tables("acme").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_usage_for_unknown_term() {
    let store = loaded_store();
    let result = store
        .update_term_mapping_usage("acme", "Widget", "widgets")
        .await;
    assert!(matches!(result, Err(SchemaError::NotFound(_))));
}

#[tokio::test]
async fn test_find_join_path() {
    let store = loaded_store();

    let path = store
        .find_join_path("acme", "customers", "orders", 0.7)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(path.path, vec!["customers", "orders"]);
    assert_eq!(path.columns[0].condition(), "customers.id = orders.customer_id");

    let none = store
        .find_join_path("acme", "customers", "orders", 0.99)
        .await
        .unwrap();
    assert!(none.is_none());
}

#[test]
fn test_inconsistent_catalog_writes_nothing() {
    let store = SqliteSchemaStore::new(":memory:").unwrap();
    let mut catalog = SchemaCatalog::from_toml(CATALOG).unwrap();
    catalog.glossary[0].mapped_tables.push("clients".to_string());

    assert!(store.load_catalog("acme", &catalog).is_err());
    assert!(store.tables("acme").unwrap().is_empty());
}

#[test]
fn test_on_disk_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.db");

    {
        let store = SqliteSchemaStore::new(&path).unwrap();
        let catalog = SchemaCatalog::from_toml(CATALOG).unwrap();
        store.load_catalog("acme", &catalog).unwrap();
        store.record_usage("acme", "Revenue", "orders").unwrap();
    }

    let reopened = SqliteSchemaStore::new(&path).unwrap();
    assert_eq!(reopened.tables("acme").unwrap().len(), 2);
    assert_eq!(reopened.usage_count("acme", "revenue").unwrap(), 1);
}
