//! Join path discovery between the tables an interpretation touches

use glossa_domain::traits::SchemaContextProvider;
use glossa_domain::JoinPath;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Join paths found for a set of tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinDiscovery {
    /// `"{a}_to_{b}"` → path
    pub paths: BTreeMap<String, JoinPath>,
    /// Keys of pairs with no path above the threshold
    pub missing: Vec<String>,
}

impl JoinDiscovery {
    fn covers(&self, a: &str, b: &str) -> bool {
        let forward = JoinPath::key(a, b);
        let backward = JoinPath::key(b, a);
        self.paths.contains_key(&forward)
            || self.paths.contains_key(&backward)
            || self.missing.contains(&forward)
            || self.missing.contains(&backward)
    }
}

/// Deduplicate tables keeping first appearance
pub fn distinct_tables<'t>(tables: impl IntoIterator<Item = &'t String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for table in tables {
        if !out.contains(table) {
            out.push(table.clone());
        }
    }
    out
}

/// Look up a path for every unordered pair of `tables`
///
/// Pairs already covered by `known` (in either direction) are skipped. Store
/// errors are logged and the pair is reported missing.
pub async fn discover_joins(
    provider: &dyn SchemaContextProvider,
    tenant_id: &str,
    tables: &[String],
    min_confidence: f64,
    known: &JoinDiscovery,
) -> JoinDiscovery {
    let mut found = JoinDiscovery::default();

    for (i, a) in tables.iter().enumerate() {
        for b in &tables[i + 1..] {
            if a == b || known.covers(a, b) || found.covers(a, b) {
                continue;
            }
            let key = JoinPath::key(a, b);
            match provider.find_join_path(tenant_id, a, b, min_confidence).await {
                Ok(Some(path)) => {
                    debug!(tenant_id, %key, hops = path.path.len(), confidence = path.confidence, "join path");
                    found.paths.insert(key, path);
                }
                Ok(None) => {
                    debug!(tenant_id, %key, "no join path");
                    found.missing.push(key);
                }
                Err(e) => {
                    warn!(tenant_id, %key, error = %e, "join lookup failed");
                    found.missing.push(key);
                }
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_schema::{SchemaCatalog, SqliteSchemaStore};

    const CATALOG: &str = r#"
[[tables]]
name = "customers"
columns = [{ name = "id", data_type = "integer" }]

[[tables]]
name = "orders"
columns = [{ name = "customer_id", data_type = "integer" }]

[[tables]]
name = "warehouses"

[[relationships]]
source_table = "orders"
source_column = "customer_id"
target_table = "customers"
target_column = "id"
confidence = 0.95
"#;

    fn store() -> SqliteSchemaStore {
        let store = SqliteSchemaStore::new(":memory:").unwrap();
        store
            .load_catalog("acme", &SchemaCatalog::from_toml(CATALOG).unwrap())
            .unwrap();
        store
    }

    fn tables(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_pairs_keyed_in_first_appearance_order() {
        let store = store();
        let found = discover_joins(
            &store,
            "acme",
            &tables(&["customers", "orders", "warehouses"]),
            0.7,
            &JoinDiscovery::default(),
        )
        .await;

        assert!(found.paths.contains_key("customers_to_orders"));
        assert_eq!(
            found.missing,
            vec!["customers_to_warehouses", "orders_to_warehouses"]
        );
    }

    #[tokio::test]
    async fn test_known_pairs_are_skipped_in_either_direction() {
        let store = store();
        let known = discover_joins(&store, "acme", &tables(&["orders", "customers"]), 0.7, &JoinDiscovery::default()).await;
        assert!(known.paths.contains_key("orders_to_customers"));

        let again = discover_joins(&store, "acme", &tables(&["customers", "orders"]), 0.7, &known).await;
        assert!(again.paths.is_empty());
        assert!(again.missing.is_empty());
    }

    #[test]
    fn test_distinct_tables_keeps_order() {
        let list = tables(&["orders", "customers", "orders"]);
        assert_eq!(distinct_tables(&list), vec!["orders", "customers"]);
    }
}
