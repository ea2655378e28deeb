//! SQLite-backed schema context provider

use crate::catalog::{Relationship, SchemaCatalog};
use crate::join;
use crate::StoreError;
use async_trait::async_trait;
use glossa_domain::traits::SchemaContextProvider;
use glossa_domain::{
    ColumnInfo, ColumnRef, GlossaryTerm, GlossaryTermDetails, JoinPath, SchemaError, TableInfo,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// SQLite-based implementation of `SchemaContextProvider`
///
/// Holds one connection behind a mutex, so a single store can be shared across
/// concurrent queries. Usage increments are independent `INSERT`s and are never lost
/// under concurrency.
pub struct SqliteSchemaStore {
    conn: Mutex<Connection>,
}

impl SqliteSchemaStore {
    /// Open (or create) a store at the given path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace a tenant's schema with the catalog contents
    ///
    /// Usage events recorded for the tenant are kept. The catalog is validated first;
    /// nothing is written when it is inconsistent.
    pub fn load_catalog(&self, tenant_id: &str, catalog: &SchemaCatalog) -> Result<(), StoreError> {
        catalog.validate()?;

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for table in [
            "schema_tables",
            "schema_columns",
            "glossary_terms",
            "term_table_mappings",
            "term_column_mappings",
            "relationships",
        ] {
            tx.execute(&format!("DELETE FROM {} WHERE tenant_id = ?1", table), params![tenant_id])?;
        }

        for table in &catalog.tables {
            insert_table(&tx, tenant_id, &table.info())?;
            for column in &table.columns {
                insert_column(&tx, tenant_id, &table.name, column)?;
            }
        }
        for term in &catalog.glossary {
            insert_term(&tx, tenant_id, &term.details())?;
        }
        for rel in &catalog.relationships {
            insert_relationship(&tx, tenant_id, rel)?;
        }
        tx.commit()?;

        info!(
            tenant_id,
            tables = catalog.tables.len(),
            glossary_terms = catalog.glossary.len(),
            relationships = catalog.relationships.len(),
            "catalog loaded"
        );
        Ok(())
    }

    /// Add or replace a table
    pub fn add_table(&self, tenant_id: &str, table: &TableInfo) -> Result<(), StoreError> {
        insert_table(&self.conn(), tenant_id, table)
    }

    /// Add or replace a column
    pub fn add_column(&self, tenant_id: &str, table: &str, column: &ColumnInfo) -> Result<(), StoreError> {
        insert_column(&self.conn(), tenant_id, table, column)
    }

    /// Add or replace a glossary term with its mappings
    pub fn add_glossary_term(&self, tenant_id: &str, term: &GlossaryTermDetails) -> Result<(), StoreError> {
        insert_term(&self.conn(), tenant_id, term)
    }

    /// Declare a relationship
    pub fn add_relationship(&self, tenant_id: &str, relationship: &Relationship) -> Result<(), StoreError> {
        insert_relationship(&self.conn(), tenant_id, relationship)
    }

    /// Tables in insertion order
    pub fn tables(&self, tenant_id: &str) -> Result<Vec<TableInfo>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT name, description FROM schema_tables WHERE tenant_id = ?1 ORDER BY rowid",
        )?;
        let tables = stmt
            .query_map(params![tenant_id], |row| {
                Ok(TableInfo {
                    name: row.get(0)?,
                    description: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    /// Columns of a table in insertion order
    pub fn columns(&self, tenant_id: &str, table: &str) -> Result<Vec<ColumnInfo>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT name, data_type, description FROM schema_columns
             WHERE tenant_id = ?1 AND table_name = ?2 ORDER BY rowid",
        )?;
        let columns = stmt
            .query_map(params![tenant_id, table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                    description: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Glossary terms in insertion order
    pub fn glossary_terms(&self, tenant_id: &str) -> Result<Vec<GlossaryTerm>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT name, definition FROM glossary_terms WHERE tenant_id = ?1 ORDER BY rowid",
        )?;
        let terms = stmt
            .query_map(params![tenant_id], |row| {
                Ok(GlossaryTerm {
                    name: row.get(0)?,
                    definition: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(terms)
    }

    /// Terms whose name or definition contains the keyword, ignoring case
    pub fn search_terms(&self, tenant_id: &str, keyword: &str) -> Result<Vec<GlossaryTerm>, StoreError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", keyword.to_lowercase());
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT name, definition FROM glossary_terms
             WHERE tenant_id = ?1 AND (lower(name) LIKE ?2 OR lower(definition) LIKE ?2)
             ORDER BY rowid",
        )?;
        let terms = stmt
            .query_map(params![tenant_id, pattern], |row| {
                Ok(GlossaryTerm {
                    name: row.get(0)?,
                    definition: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(terms)
    }

    /// Full details of a term (matched ignoring case)
    pub fn term_details(&self, tenant_id: &str, term: &str) -> Result<Option<GlossaryTermDetails>, StoreError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT name, definition, weight FROM glossary_terms
                 WHERE tenant_id = ?1 AND lower(name) = lower(?2)",
                params![tenant_id, term.trim()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, f64>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((name, definition, weight)) = row else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT table_name FROM term_table_mappings
             WHERE tenant_id = ?1 AND term = ?2 ORDER BY rowid",
        )?;
        let mapped_tables = stmt
            .query_map(params![tenant_id, name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT table_name, column_name FROM term_column_mappings
             WHERE tenant_id = ?1 AND term = ?2 ORDER BY rowid",
        )?;
        let mapped_columns = stmt
            .query_map(params![tenant_id, name], |row| {
                Ok(ColumnRef::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let usage_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM usage_events WHERE tenant_id = ?1 AND term = ?2",
            params![tenant_id, name],
            |row| row.get(0),
        )?;

        Ok(Some(GlossaryTermDetails {
            name,
            definition,
            mapped_tables,
            mapped_columns,
            usage_count: usage_count.max(0) as u64,
            weight,
        }))
    }

    /// Append one usage event for a term
    pub fn record_usage(&self, tenant_id: &str, term: &str, table: &str) -> Result<(), StoreError> {
        let conn = self.conn();
        let name: Option<String> = conn
            .query_row(
                "SELECT name FROM glossary_terms WHERE tenant_id = ?1 AND lower(name) = lower(?2)",
                params![tenant_id, term.trim()],
                |row| row.get(0),
            )
            .optional()?;
        let name = name.ok_or_else(|| StoreError::NotFound(format!("glossary term '{}'", term)))?;

        conn.execute(
            "INSERT INTO usage_events (tenant_id, term, table_name) VALUES (?1, ?2, ?3)",
            params![tenant_id, name, table],
        )?;
        debug!(tenant_id, term = %name, table, "usage event recorded");
        Ok(())
    }

    /// Number of usage events recorded for a term
    pub fn usage_count(&self, tenant_id: &str, term: &str) -> Result<u64, StoreError> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM usage_events WHERE tenant_id = ?1 AND lower(term) = lower(?2)",
            params![tenant_id, term.trim()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Declared relationships in insertion order
    pub fn relationships(&self, tenant_id: &str) -> Result<Vec<Relationship>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT source_table, source_column, target_table, target_column, confidence
             FROM relationships WHERE tenant_id = ?1 ORDER BY rowid",
        )?;
        let relationships = stmt
            .query_map(params![tenant_id], |row| {
                Ok(Relationship {
                    source_table: row.get(0)?,
                    source_column: row.get(1)?,
                    target_table: row.get(2)?,
                    target_column: row.get(3)?,
                    confidence: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(relationships)
    }

    /// Best join path between two tables
    pub fn join_path(
        &self,
        tenant_id: &str,
        source: &str,
        target: &str,
        min_confidence: f64,
    ) -> Result<Option<JoinPath>, StoreError> {
        let relationships = self.relationships(tenant_id)?;
        Ok(join::find_path(&relationships, source, target, min_confidence))
    }
}

fn insert_table(conn: &Connection, tenant_id: &str, table: &TableInfo) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO schema_tables (tenant_id, name, description) VALUES (?1, ?2, ?3)
         ON CONFLICT(tenant_id, name) DO UPDATE SET description = excluded.description",
        params![tenant_id, table.name, table.description],
    )?;
    Ok(())
}

fn insert_column(
    conn: &Connection,
    tenant_id: &str,
    table: &str,
    column: &ColumnInfo,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO schema_columns (tenant_id, table_name, name, data_type, description)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(tenant_id, table_name, name) DO UPDATE SET
         data_type = excluded.data_type, description = excluded.description",
        params![tenant_id, table, column.name, column.data_type, column.description],
    )?;
    Ok(())
}

fn insert_term(conn: &Connection, tenant_id: &str, term: &GlossaryTermDetails) -> Result<(), StoreError> {
    if term.name.trim().is_empty() {
        return Err(StoreError::InvalidData("glossary term with empty name".to_string()));
    }
    conn.execute(
        "INSERT INTO glossary_terms (tenant_id, name, definition, weight) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(tenant_id, name) DO UPDATE SET
         definition = excluded.definition, weight = excluded.weight",
        params![tenant_id, term.name, term.definition, term.weight],
    )?;
    conn.execute(
        "DELETE FROM term_table_mappings WHERE tenant_id = ?1 AND term = ?2",
        params![tenant_id, term.name],
    )?;
    conn.execute(
        "DELETE FROM term_column_mappings WHERE tenant_id = ?1 AND term = ?2",
        params![tenant_id, term.name],
    )?;
    for table in &term.mapped_tables {
        conn.execute(
            "INSERT OR IGNORE INTO term_table_mappings (tenant_id, term, table_name) VALUES (?1, ?2, ?3)",
            params![tenant_id, term.name, table],
        )?;
    }
    for column in &term.mapped_columns {
        conn.execute(
            "INSERT OR IGNORE INTO term_column_mappings (tenant_id, term, table_name, column_name)
             VALUES (?1, ?2, ?3, ?4)",
            params![tenant_id, term.name, column.table, column.column],
        )?;
    }
    Ok(())
}

fn insert_relationship(
    conn: &Connection,
    tenant_id: &str,
    rel: &Relationship,
) -> Result<(), StoreError> {
    if !(0.0..=1.0).contains(&rel.confidence) {
        return Err(StoreError::InvalidData(format!(
            "relationship confidence {} outside [0, 1]",
            rel.confidence
        )));
    }
    conn.execute(
        "INSERT INTO relationships (tenant_id, source_table, source_column, target_table, target_column, confidence)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            tenant_id,
            rel.source_table,
            rel.source_column,
            rel.target_table,
            rel.target_column,
            rel.confidence,
        ],
    )?;
    Ok(())
}

fn check_tenant(tenant_id: &str) -> Result<(), SchemaError> {
    if tenant_id.trim().is_empty() {
        return Err(SchemaError::InvalidTenant("tenant id must not be empty".to_string()));
    }
    Ok(())
}

#[async_trait]
impl SchemaContextProvider for SqliteSchemaStore {
    async fn get_tables(&self, tenant_id: &str) -> Result<Vec<TableInfo>, SchemaError> {
        check_tenant(tenant_id)?;
        Ok(self.tables(tenant_id)?)
    }

    async fn get_columns(&self, tenant_id: &str, table: &str) -> Result<Vec<ColumnInfo>, SchemaError> {
        check_tenant(tenant_id)?;
        Ok(self.columns(tenant_id, table)?)
    }

    async fn get_glossary_terms(&self, tenant_id: &str) -> Result<Vec<GlossaryTerm>, SchemaError> {
        check_tenant(tenant_id)?;
        Ok(self.glossary_terms(tenant_id)?)
    }

    async fn get_glossary_term_details(
        &self,
        tenant_id: &str,
        term: &str,
    ) -> Result<Option<GlossaryTermDetails>, SchemaError> {
        check_tenant(tenant_id)?;
        Ok(self.term_details(tenant_id, term)?)
    }

    async fn search_glossary_terms(
        &self,
        tenant_id: &str,
        keyword: &str,
    ) -> Result<Vec<GlossaryTerm>, SchemaError> {
        check_tenant(tenant_id)?;
        Ok(self.search_terms(tenant_id, keyword)?)
    }

    async fn update_term_mapping_usage(
        &self,
        tenant_id: &str,
        term: &str,
        table: &str,
    ) -> Result<(), SchemaError> {
        check_tenant(tenant_id)?;
        Ok(self.record_usage(tenant_id, term, table)?)
    }

    async fn find_join_path(
        &self,
        tenant_id: &str,
        source_table: &str,
        target_table: &str,
        min_confidence: f64,
    ) -> Result<Option<JoinPath>, SchemaError> {
        check_tenant(tenant_id)?;
        Ok(self.join_path(tenant_id, source_table, target_table, min_confidence)?)
    }
}
