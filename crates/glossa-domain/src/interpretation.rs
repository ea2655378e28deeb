//! Interpretations: self-consistent readings of a whole query

use crate::boundary::KnowledgeBoundary;
use crate::query::StructuredQuery;
use crate::resolution::{JoinPath, ResolvedAttribute, ResolvedConcept, ResolvedEntity};
use crate::schema::SchemaSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rationale of the interpretation produced for a clear query
pub const SINGLE_INTERPRETATION_RATIONALE: &str = "single clear interpretation";

/// Rationale of the fallback interpretation for an ambiguous query
pub const DEFAULT_AMBIGUOUS_RATIONALE: &str = "default interpretation (ambiguous query)";

/// One complete assignment of mentions to schema constructs
///
/// Maps are keyed by mention, so each mention has at most one resolution per
/// interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryInterpretation {
    /// Entity mention → table
    pub entities: BTreeMap<String, ResolvedEntity>,
    /// Attribute mention → column
    pub attributes: BTreeMap<String, ResolvedAttribute>,
    /// Concept text → resolved concept
    pub concepts: BTreeMap<String, ResolvedConcept>,
    /// `"{source}_to_{target}"` → join path
    pub join_paths: BTreeMap<String, JoinPath>,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Whether this is the primary reading
    pub is_primary: bool,
    /// Why this reading was chosen
    pub rationale: String,
}

impl QueryInterpretation {
    /// Tables referenced by this interpretation's entities, deduplicated
    ///
    /// Entities are visited in map key order; callers that need query order should
    /// pass an explicit ordering to [`Self::tables_in_order`].
    pub fn tables(&self) -> Vec<String> {
        let mut tables = Vec::new();
        for entity in self.entities.values() {
            if !tables.contains(&entity.table_name) {
                tables.push(entity.table_name.clone());
            }
        }
        tables
    }

    /// Tables referenced by entities, ordered by the given mention order first
    pub fn tables_in_order(&self, mention_order: &[String]) -> Vec<String> {
        let mut tables = Vec::new();
        for mention in mention_order {
            if let Some(entity) = self.entities.get(mention) {
                if !tables.contains(&entity.table_name) {
                    tables.push(entity.table_name.clone());
                }
            }
        }
        for table in self.tables() {
            if !tables.contains(&table) {
                tables.push(table);
            }
        }
        tables
    }

    /// Every table the interpretation touches
    ///
    /// Entity tables in query mention order, then attribute tables in query mention
    /// order, then any remaining attribute tables, then tables used by concepts.
    /// Join discovery and SQL rendering both work over this set.
    pub fn referenced_tables(&self, query: &StructuredQuery) -> Vec<String> {
        let mut tables = self.tables_in_order(&query.main_entities);
        let ordered_attributes = query
            .attribute_mentions()
            .into_iter()
            .filter_map(|m| self.attributes.get(&m).map(|a| a.table_name.clone()))
            .collect::<Vec<_>>();
        let extra = ordered_attributes
            .iter()
            .chain(self.attributes.values().map(|a| &a.table_name))
            .chain(self.concepts.values().flat_map(|c| c.implementation.tables_involved.iter()));
        for table in extra {
            if !tables.contains(table) {
                tables.push(table.clone());
            }
        }
        tables
    }

    /// Join paths whose endpoints are both among [`Self::referenced_tables`]
    pub fn relevant_join_paths(&self, query: &StructuredQuery) -> Vec<&JoinPath> {
        let tables = self.referenced_tables(query);
        self.join_paths.values().filter(|p| p.within(&tables)).collect()
    }

    /// Entity mention → table name
    pub fn entity_tables(&self) -> BTreeMap<String, String> {
        self.entities
            .iter()
            .map(|(mention, entity)| (mention.clone(), entity.table_name.clone()))
            .collect()
    }
}

/// Everything the resolution stage produced for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedQuery {
    /// Parsed query
    pub structured: StructuredQuery,
    /// Resolved entities (base resolution)
    pub entities: BTreeMap<String, ResolvedEntity>,
    /// Resolved attributes (base resolution)
    pub attributes: BTreeMap<String, ResolvedAttribute>,
    /// Resolved concepts (base resolution)
    pub concepts: BTreeMap<String, ResolvedConcept>,
    /// Discovered join paths
    pub join_paths: BTreeMap<String, JoinPath>,
    /// Table pairs with no join path above threshold
    pub missing_join_paths: Vec<String>,
    /// Mentions that could not be resolved
    pub unresolved: Vec<KnowledgeBoundary>,
    /// Competing interpretations, primary first
    pub interpretations: Vec<QueryInterpretation>,
    /// Schema facts used to produce the above
    pub schema: SchemaSnapshot,
}

impl ResolvedQuery {
    /// The primary interpretation
    pub fn primary(&self) -> Option<&QueryInterpretation> {
        self.interpretations.iter().find(|i| i.is_primary)
    }

    /// Whether more than one interpretation was produced
    pub fn has_multiple_interpretations(&self) -> bool {
        self.interpretations.len() > 1
    }
}
