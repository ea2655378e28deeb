//! Concept resolution, including composite concepts built from several glossary terms

use crate::error::ResolverError;
use crate::oracle::{f64_field, str_field};
use crate::prompt::{concept_prompt, concept_schema};
use crate::strategy::{ResolutionContext, Resolutions};
use crate::usage::UsageEvent;
use futures::future::join_all;
use glossa_domain::scoring::{clamp_confidence, text_similarity};
use glossa_domain::{
    BoundaryType, ColumnRef, ConceptImplementation, GlossaryTermDetails, ImplementationKind,
    KnowledgeBoundary, ResolvedConcept, SchemaSnapshot,
};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Words that turn a composite concept into a filter
pub const COMPOSITE_MODIFIERS: &[&str] = &[
    "active", "new", "premium", "deleted", "archived", "top", "recent", "high", "low",
];

/// Placeholder used when a filter has no mapped column
pub const CONDITION_PLACEHOLDER: &str = "<condition>";

/// Glossary terms similar to `text`, best first (glossary order breaks ties)
pub fn glossary_matches<'s>(
    text: &str,
    schema: &'s SchemaSnapshot,
    floor: f64,
) -> Vec<(f64, &'s GlossaryTermDetails)> {
    let mut matches: Vec<(f64, &GlossaryTermDetails)> = schema
        .glossary
        .iter()
        .map(|term| (text_similarity(text, &term.name), term))
        .filter(|(similarity, _)| *similarity >= floor)
        .collect();
    matches.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    matches
}

/// Candidate composite strings: both word orders of every pair of single-word terms
///
/// ```
/// use glossa_resolver::concept::composite_candidates;
///
/// let terms = vec!["active".to_string(), "customers".to_string()];
/// assert_eq!(composite_candidates(&terms), vec!["active customers", "customers active"]);
/// ```
pub fn composite_candidates(terms: &[String]) -> Vec<String> {
    let words: Vec<&str> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && !t.contains(char::is_whitespace))
        .collect();

    let mut out = Vec::new();
    for (i, a) in words.iter().enumerate() {
        for b in &words[i + 1..] {
            if a.eq_ignore_ascii_case(b) {
                continue;
            }
            out.push(format!("{} {}", a, b));
            out.push(format!("{} {}", b, a));
        }
    }
    out
}

/// Modifiers present as whole words, in concept order
pub fn modifiers_in(concept: &str) -> Vec<&'static str> {
    let mut found = Vec::new();
    for word in concept.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if let Some(modifier) = COMPOSITE_MODIFIERS.iter().find(|m| **m == word) {
            if !found.contains(modifier) {
                found.push(*modifier);
            }
        }
    }
    found
}

fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|w| w.eq_ignore_ascii_case(word))
}

fn mapping_fragment(tables: &[String], columns: &[ColumnRef]) -> String {
    if columns.is_empty() {
        tables
            .iter()
            .map(|t| format!("{}.*", t))
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        columns
            .iter()
            .map(ColumnRef::qualified)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Single glossary match: the definition with a mapping fragment
fn single_concept(concept: &str, matches: &[(f64, &GlossaryTermDetails)]) -> Option<ResolvedConcept> {
    let (similarity, term) = matches.first()?;
    let tables = term.tables();
    Some(ResolvedConcept {
        concept: concept.to_string(),
        interpretation: if term.definition.trim().is_empty() {
            term.name.clone()
        } else {
            term.definition.clone()
        },
        implementation: ConceptImplementation {
            kind: ImplementationKind::Mapping,
            sql_fragment: mapping_fragment(&tables, &term.mapped_columns),
            columns_involved: term.mapped_columns.iter().map(ColumnRef::qualified).collect(),
            tables_involved: tables,
        },
        confidence: clamp_confidence(similarity * term.weight),
        alternatives: matches.iter().skip(1).map(|(_, t)| t.name.clone()).collect(),
        component_terms: vec![term.name.clone()],
        is_composite: false,
    })
}

/// Merge the mappings of several glossary terms into one concept
fn composite_concept(concept: &str, matches: &[(f64, &GlossaryTermDetails)]) -> ResolvedConcept {
    let mut tables: Vec<String> = Vec::new();
    let mut columns: Vec<ColumnRef> = Vec::new();
    for (_, term) in matches {
        for table in term.tables() {
            if !tables.contains(&table) {
                tables.push(table);
            }
        }
        for column in &term.mapped_columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }

    let modifiers = modifiers_in(concept);
    let (kind, sql_fragment) = if modifiers.is_empty() {
        let select = if columns.is_empty() {
            tables.iter().map(|t| format!("{}.*", t)).collect::<Vec<_>>().join(", ")
        } else {
            columns.iter().map(ColumnRef::qualified).collect::<Vec<_>>().join(", ")
        };
        (
            ImplementationKind::Selection,
            format!("SELECT {} FROM {}", select, tables.join(", ")),
        )
    } else {
        let mut clauses: Vec<String> = Vec::new();
        for modifier in &modifiers {
            // a column mapped by the term that names the modifier, else any mapped column
            let column = matches
                .iter()
                .find(|(_, t)| has_word(&t.name, modifier))
                .and_then(|(_, t)| t.mapped_columns.first())
                .or_else(|| columns.first());
            let clause = match column {
                Some(c) => format!("{} = '<{}>'", c.qualified(), modifier),
                None => CONDITION_PLACEHOLDER.to_string(),
            };
            if !clauses.contains(&clause) {
                clauses.push(clause);
            }
        }
        (
            ImplementationKind::Filter,
            format!("WHERE {}", clauses.join(" AND ")),
        )
    };

    let names: Vec<String> = matches.iter().map(|(_, t)| t.name.clone()).collect();
    let definitions: Vec<&str> = matches
        .iter()
        .map(|(_, t)| t.definition.trim())
        .filter(|d| !d.is_empty())
        .collect();
    let interpretation = if definitions.is_empty() {
        format!("Combination of {}", names.join(" and "))
    } else {
        format!("Combination of {}: {}", names.join(" and "), definitions.join("; "))
    };

    ResolvedConcept {
        concept: concept.to_string(),
        interpretation,
        implementation: ConceptImplementation {
            kind,
            sql_fragment,
            columns_involved: columns.iter().map(ColumnRef::qualified).collect(),
            tables_involved: tables,
        },
        confidence: matches
            .iter()
            .map(|(s, _)| *s)
            .fold(1.0, f64::min),
        alternatives: Vec::new(),
        component_terms: names,
        is_composite: true,
    }
}

fn usage_events(matches: &[(f64, &GlossaryTermDetails)], schema: &SchemaSnapshot) -> Vec<UsageEvent> {
    matches
        .iter()
        .filter_map(|(_, term)| {
            let table = term.tables().into_iter().find(|t| schema.has_table(t))?;
            Some(UsageEvent {
                term: term.name.clone(),
                table,
            })
        })
        .collect()
}

fn string_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Resolves the terms the parser flagged as ambiguous
pub struct ConceptResolver;

impl ConceptResolver {
    /// Resolve every term; glossary first, then composites, then the oracle
    pub async fn resolve_all(
        &self,
        terms: &[String],
        ctx: &ResolutionContext<'_>,
    ) -> Resolutions<ResolvedConcept> {
        let schema = ctx.schema;
        let floor = ctx.config.concept_similarity_floor;
        let mut out = Resolutions::default();
        let mut pending: Vec<String> = Vec::new();
        // Each glossary term counts once per query, however many concepts use it
        let mut counted: HashSet<String> = HashSet::new();

        for term in terms.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            let matches = glossary_matches(term, schema, floor);
            match single_concept(term, &matches) {
                Some(concept) => {
                    out.usage.extend(
                        usage_events(&matches[..1], schema)
                            .into_iter()
                            .filter(|e| counted.insert(e.term.to_lowercase())),
                    );
                    out.resolved.insert(term.to_string(), concept);
                }
                None => pending.push(term.to_string()),
            }
        }

        let mut seen: HashSet<BTreeSet<String>> = HashSet::new();
        for candidate in composite_candidates(terms) {
            let matches = glossary_matches(&candidate, schema, floor);
            if matches.len() < 2 {
                continue;
            }
            let components: BTreeSet<String> =
                matches.iter().map(|(_, t)| t.name.to_lowercase()).collect();
            if !seen.insert(components) || out.resolved.contains_key(&candidate) {
                continue;
            }
            debug!(concept = %candidate, components = matches.len(), "composite concept");
            out.usage.extend(
                usage_events(&matches, schema)
                    .into_iter()
                    .filter(|e| counted.insert(e.term.to_lowercase())),
            );
            out.resolved
                .insert(candidate.clone(), composite_concept(&candidate, &matches));
        }

        let answers = join_all(pending.iter().map(|term| self.ask_oracle(term, ctx))).await;
        for (term, answer) in pending.into_iter().zip(answers) {
            match answer {
                Ok(concept) => {
                    out.resolved.insert(term, concept);
                }
                Err(e) => {
                    warn!(concept = %term, error = %e, "concept left unresolved");
                    let known: Vec<String> = schema.glossary.iter().map(|g| g.name.clone()).collect();
                    out.unresolved.push(
                        KnowledgeBoundary::unresolved(BoundaryType::UnknownConcept, term, 0.0, &known)
                            .with_detail(e.to_string()),
                    );
                }
            }
        }

        info!(
            tenant_id = ctx.tenant_id,
            stage = "concepts",
            resolved = out.resolved.len(),
            unresolved = out.unresolved.len(),
            "concept resolution complete"
        );
        out
    }

    async fn ask_oracle(&self, term: &str, ctx: &ResolutionContext<'_>) -> Result<ResolvedConcept, ResolverError> {
        let prompt = concept_prompt(term, ctx.raw_query, ctx.schema);
        let answer = ctx.oracle.structured(&prompt, &concept_schema()).await?;

        let interpretation = str_field(&answer, "interpretation")
            .ok_or_else(|| ResolverError::NoCandidate("oracle gave no interpretation".to_string()))?;
        let empty = Map::new();
        let implementation = answer
            .get("implementation")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        Ok(ResolvedConcept {
            concept: term.to_string(),
            interpretation: interpretation.to_string(),
            implementation: ConceptImplementation {
                kind: ImplementationKind::parse_lenient(str_field(implementation, "type").unwrap_or("")),
                sql_fragment: str_field(implementation, "sql_fragment").unwrap_or("").to_string(),
                tables_involved: string_list(implementation, "tables_involved"),
                columns_involved: string_list(implementation, "columns_involved"),
            },
            confidence: f64_field(&answer, "confidence")
                .map(clamp_confidence)
                .unwrap_or(ctx.config.default_oracle_confidence),
            alternatives: string_list(&answer, "alternatives"),
            component_terms: Vec::new(),
            is_composite: false,
        })
    }
}
