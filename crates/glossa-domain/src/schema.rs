//! Schema and glossary records supplied by the schema context provider

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A table known to the tenant schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Physical table name
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
}

/// A column of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Physical column name
    pub name: String,
    /// Declared data type (free-form, dialect specific)
    #[serde(default)]
    pub data_type: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
}

/// A business glossary term as listed by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    /// Term name (e.g. "Customer", "Active Customer")
    pub name: String,
    /// Business definition
    #[serde(default)]
    pub definition: String,
}

/// Reference to a column qualified by its table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Table name
    pub table: String,
    /// Column name
    pub column: String,
}

impl ColumnRef {
    /// Create a new column reference
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// `table.column` form used in SQL fragments
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

/// Full details of a glossary term, including its schema mappings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryTermDetails {
    /// Term name
    pub name: String,
    /// Business definition
    #[serde(default)]
    pub definition: String,
    /// Tables the term maps to
    #[serde(default)]
    pub mapped_tables: Vec<String>,
    /// Columns the term maps to
    #[serde(default)]
    pub mapped_columns: Vec<ColumnRef>,
    /// Number of recorded successful uses
    #[serde(default)]
    pub usage_count: u64,
    /// Curator-assigned weight, 1.0 is neutral
    #[serde(default = "default_term_weight")]
    pub weight: f64,
}

fn default_term_weight() -> f64 {
    1.0
}

impl GlossaryTermDetails {
    /// Whether the term is mapped to any table or column
    pub fn has_mappings(&self) -> bool {
        !self.mapped_tables.is_empty() || !self.mapped_columns.is_empty()
    }

    /// Tables this term touches, from table mappings first, then column mappings
    pub fn tables(&self) -> Vec<String> {
        let mut tables = self.mapped_tables.clone();
        for col in &self.mapped_columns {
            if !tables.contains(&col.table) {
                tables.push(col.table.clone());
            }
        }
        tables
    }
}

/// Per-query snapshot of the schema context used to resolve mentions
///
/// Loaded once at the start of resolution and carried in the
/// [`ResolvedQuery`](crate::interpretation::ResolvedQuery) so callers can see exactly
/// which facts produced an interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Tenant the snapshot belongs to
    pub tenant_id: String,
    /// Known tables, in provider order
    pub tables: Vec<TableInfo>,
    /// Columns per table
    pub columns: BTreeMap<String, Vec<ColumnInfo>>,
    /// Glossary terms with their details
    pub glossary: Vec<GlossaryTermDetails>,
}

impl SchemaSnapshot {
    /// Whether the table exists (case-sensitive)
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    /// Find a table by name ignoring case
    pub fn find_table_ignore_case(&self, name: &str) -> Option<&TableInfo> {
        let needle = name.trim().to_lowercase();
        self.tables.iter().find(|t| t.name.to_lowercase() == needle)
    }

    /// Whether the column exists on the table (case-sensitive)
    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.columns
            .get(table)
            .map(|cols| cols.iter().any(|c| c.name == column))
            .unwrap_or(false)
    }

    /// Columns of a table, empty when unknown
    pub fn columns_of(&self, table: &str) -> &[ColumnInfo] {
        self.columns.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a glossary term by name ignoring case
    pub fn glossary_term(&self, name: &str) -> Option<&GlossaryTermDetails> {
        let needle = name.trim().to_lowercase();
        self.glossary.iter().find(|g| g.name.to_lowercase() == needle)
    }

    /// All table names
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SchemaSnapshot {
        let mut columns = BTreeMap::new();
        columns.insert(
            "customers".to_string(),
            vec![ColumnInfo {
                name: "email".to_string(),
                data_type: "text".to_string(),
                description: String::new(),
            }],
        );
        SchemaSnapshot {
            tenant_id: "acme".to_string(),
            tables: vec![TableInfo {
                name: "customers".to_string(),
                description: String::new(),
            }],
            columns,
            glossary: vec![GlossaryTermDetails {
                name: "Customer".to_string(),
                definition: "A paying account".to_string(),
                mapped_tables: vec!["customers".to_string()],
                mapped_columns: vec![ColumnRef::new("accounts", "owner")],
                usage_count: 0,
                weight: 1.0,
            }],
        }
    }

    #[test]
    fn test_table_lookup() {
        let snap = snapshot();
        assert!(snap.has_table("customers"));
        assert!(!snap.has_table("Customers"));
        assert!(snap.find_table_ignore_case("CUSTOMERS").is_some());
    }

    #[test]
    fn test_column_lookup() {
        let snap = snapshot();
        assert!(snap.has_column("customers", "email"));
        assert!(!snap.has_column("customers", "phone"));
        assert!(snap.columns_of("orders").is_empty());
    }

    #[test]
    fn test_term_tables_merge_column_mappings() {
        let snap = snapshot();
        let term = snap.glossary_term("customer").unwrap();
        assert!(term.has_mappings());
        assert_eq!(term.tables(), vec!["customers", "accounts"]);
    }

    #[test]
    fn test_term_weight_defaults_to_one() {
        let details: GlossaryTermDetails =
            serde_json::from_str(r#"{"name": "Revenue"}"#).unwrap();
        assert_eq!(details.weight, 1.0);
        assert!(!details.has_mappings());
    }
}
