//! TOML schema catalogs
//!
//! A catalog describes one tenant's tables, columns, glossary terms and declared
//! relationships. It is the input format of [`SqliteSchemaStore::load_catalog`].
//!
//! ```toml
//! [[tables]]
//! name = "customers"
//! columns = [{ name = "id", data_type = "integer" }]
//!
//! [[glossary]]
//! name = "Customer"
//! definition = "A person or company that has placed an order"
//! mapped_tables = ["customers"]
//!
//! [[relationships]]
//! source_table = "orders"
//! source_column = "customer_id"
//! target_table = "customers"
//! target_column = "id"
//! confidence = 0.95
//! ```
//!
//! [`SqliteSchemaStore::load_catalog`]: crate::SqliteSchemaStore::load_catalog

use crate::StoreError;
use glossa_domain::{ColumnInfo, ColumnRef, GlossaryTermDetails, TableInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A declared foreign-key-like relationship between two columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Referencing table
    pub source_table: String,
    /// Referencing column
    pub source_column: String,
    /// Referenced table
    pub target_table: String,
    /// Referenced column
    pub target_column: String,
    /// Confidence that the relationship holds, in `[0, 1]`
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

fn default_weight() -> f64 {
    1.0
}

/// A table entry with its columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTable {
    /// Table name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Columns, in declaration order
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

impl CatalogTable {
    /// Table record without columns
    pub fn info(&self) -> TableInfo {
        TableInfo {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// A glossary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTerm {
    /// Term name
    pub name: String,
    /// Business definition
    #[serde(default)]
    pub definition: String,
    /// Curator weight, 1.0 is neutral
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Tables the term maps to
    #[serde(default)]
    pub mapped_tables: Vec<String>,
    /// Columns the term maps to
    #[serde(default)]
    pub mapped_columns: Vec<ColumnRef>,
}

impl CatalogTerm {
    /// Term details with no recorded usage
    pub fn details(&self) -> GlossaryTermDetails {
        GlossaryTermDetails {
            name: self.name.clone(),
            definition: self.definition.clone(),
            mapped_tables: self.mapped_tables.clone(),
            mapped_columns: self.mapped_columns.clone(),
            usage_count: 0,
            weight: self.weight,
        }
    }
}

/// One tenant's schema catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    /// Tables
    #[serde(default)]
    pub tables: Vec<CatalogTable>,
    /// Glossary terms
    #[serde(default)]
    pub glossary: Vec<CatalogTerm>,
    /// Declared relationships
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl SchemaCatalog {
    /// Parse a catalog from TOML text
    pub fn from_toml(text: &str) -> Result<Self, StoreError> {
        toml::from_str(text).map_err(|e| StoreError::Catalog(e.to_string()))
    }

    /// Read and parse a catalog file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Catalog(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, StoreError> {
        toml::to_string_pretty(self).map_err(|e| StoreError::Catalog(e.to_string()))
    }

    /// Every consistency problem, in catalog order
    ///
    /// Checks duplicate tables, columns and terms, mappings and relationships that
    /// reference unknown tables or columns, and out-of-range weights or confidences.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let mut table_names = HashSet::new();
        for table in &self.tables {
            if table.name.trim().is_empty() {
                issues.push("table with empty name".to_string());
            }
            if !table_names.insert(table.name.as_str()) {
                issues.push(format!("duplicate table '{}'", table.name));
            }
            let mut column_names = HashSet::new();
            for column in &table.columns {
                if !column_names.insert(column.name.as_str()) {
                    issues.push(format!("duplicate column '{}.{}'", table.name, column.name));
                }
            }
        }

        let mut term_names = HashSet::new();
        for term in &self.glossary {
            if !term_names.insert(term.name.to_lowercase()) {
                issues.push(format!("duplicate glossary term '{}'", term.name));
            }
            if !(0.0..=10.0).contains(&term.weight) {
                issues.push(format!(
                    "glossary term '{}' has weight {} outside [0, 10]",
                    term.name, term.weight
                ));
            }
            for table in &term.mapped_tables {
                if !self.has_table(table) {
                    issues.push(format!(
                        "glossary term '{}' maps to unknown table '{}'",
                        term.name, table
                    ));
                }
            }
            for column in &term.mapped_columns {
                if !self.has_column(&column.table, &column.column) {
                    issues.push(format!(
                        "glossary term '{}' maps to unknown column '{}'",
                        term.name,
                        column.qualified()
                    ));
                }
            }
        }

        for rel in &self.relationships {
            for (table, column) in [
                (&rel.source_table, &rel.source_column),
                (&rel.target_table, &rel.target_column),
            ] {
                if !self.has_column(table, column) {
                    issues.push(format!(
                        "relationship references unknown column '{}.{}'",
                        table, column
                    ));
                }
            }
            if !(0.0..=1.0).contains(&rel.confidence) {
                issues.push(format!(
                    "relationship {}.{} -> {}.{} has confidence {} outside [0, 1]",
                    rel.source_table,
                    rel.source_column,
                    rel.target_table,
                    rel.target_column,
                    rel.confidence
                ));
            }
        }

        issues
    }

    /// Fail with the first consistency problem, if any
    pub fn validate(&self) -> Result<(), StoreError> {
        match self.issues().into_iter().next() {
            Some(issue) => Err(StoreError::Catalog(issue)),
            None => Ok(()),
        }
    }

    fn has_table(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .iter()
            .any(|t| t.name == table && t.columns.iter().any(|c| c.name == column))
    }
}
