//! Competing interpretations for ambiguous queries

use crate::joins::{discover_joins, JoinDiscovery};
use crate::oracle::{f64_field, str_field};
use crate::prompt::{interpretations_prompt, interpretations_schema};
use crate::strategy::ResolutionContext;
use glossa_domain::interpretation::{DEFAULT_AMBIGUOUS_RATIONALE, SINGLE_INTERPRETATION_RATIONALE};
use glossa_domain::scoring::clamp_confidence;
use glossa_domain::{
    ConceptImplementation, ImplementationKind, QueryInterpretation, ResolutionMethod,
    ResolvedConcept, ResolvedEntity, StructuredQuery,
};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// Confidence of the fallback interpretation of an ambiguous query
pub const DEFAULT_AMBIGUOUS_CONFIDENCE: f64 = 0.8;

/// Confidence assumed for an alternative that states none
pub const DEFAULT_ALTERNATIVE_CONFIDENCE: f64 = 0.5;

/// Rationale assumed for an alternative that states none
pub const DEFAULT_ALTERNATIVE_RATIONALE: &str = "alternative interpretation";

/// Interpretations plus the join paths discovered while building them
#[derive(Debug, Clone, PartialEq)]
pub struct InterpretationSet {
    /// Primary first
    pub interpretations: Vec<QueryInterpretation>,
    /// Paths found for table pairs introduced by reassignments
    pub joins: JoinDiscovery,
}

/// Builds the interpretation list from the base resolution
pub struct InterpretationGenerator;

impl InterpretationGenerator {
    /// Produce one interpretation for a clear query, or up to the configured maximum
    /// for an ambiguous one
    pub async fn generate(
        &self,
        query: &StructuredQuery,
        base: QueryInterpretation,
        known: &JoinDiscovery,
        ctx: &ResolutionContext<'_>,
    ) -> InterpretationSet {
        let score = query.ambiguity_assessment.score;
        if score < ctx.config.ambiguity_threshold {
            debug!(tenant_id = ctx.tenant_id, score, "query is clear");
            return InterpretationSet {
                interpretations: vec![QueryInterpretation {
                    confidence: 1.0,
                    is_primary: true,
                    rationale: SINGLE_INTERPRETATION_RATIONALE.to_string(),
                    ..base
                }],
                joins: JoinDiscovery::default(),
            };
        }

        let prompt = interpretations_prompt(
            &query.raw_query,
            &query.identified_ambiguities,
            &base.entities,
            &base.concepts,
            ctx.schema,
        );
        let items: Vec<Map<String, Value>> = match ctx.oracle.structured(&prompt, &interpretations_schema()).await {
            Ok(answer) => answer
                .get("interpretations")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_object).cloned().collect())
                .unwrap_or_default(),
            Err(e) => {
                warn!(tenant_id = ctx.tenant_id, error = %e, "interpretation request failed");
                Vec::new()
            }
        };

        if items.is_empty() {
            info!(tenant_id = ctx.tenant_id, score, "no alternatives, using default interpretation");
            return InterpretationSet {
                interpretations: vec![QueryInterpretation {
                    confidence: DEFAULT_AMBIGUOUS_CONFIDENCE,
                    is_primary: true,
                    rationale: DEFAULT_AMBIGUOUS_RATIONALE.to_string(),
                    ..base
                }],
                joins: JoinDiscovery::default(),
            };
        }

        let mut joins = JoinDiscovery::default();
        let mut interpretations = Vec::with_capacity(items.len());
        for item in &items {
            let mut interp = apply_alternative(item, &base, ctx);

            let tables = interp.referenced_tables(query);
            let mut seen = known.clone();
            seen.paths.extend(joins.paths.clone());
            seen.missing.extend(joins.missing.iter().cloned());
            let found = discover_joins(
                ctx.provider,
                ctx.tenant_id,
                &tables,
                ctx.config.join_min_confidence,
                &seen,
            )
            .await;
            seen.paths.extend(found.paths.clone());
            interp.join_paths = seen
                .paths
                .into_iter()
                .filter(|(_, path)| path.within(&tables))
                .collect();
            joins.paths.extend(found.paths);
            joins.missing.extend(found.missing);

            interpretations.push(interp);
        }

        let mut rest = interpretations.split_off(1);
        rest.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));
        interpretations.extend(rest);
        interpretations.truncate(ctx.config.max_interpretations);
        if let Some(primary) = interpretations.first_mut() {
            primary.is_primary = true;
        }

        info!(
            tenant_id = ctx.tenant_id,
            score,
            interpretations = interpretations.len(),
            "interpretations generated"
        );
        InterpretationSet {
            interpretations,
            joins,
        }
    }
}

/// Apply one oracle-proposed reading to a copy of the base resolution
fn apply_alternative(
    item: &Map<String, Value>,
    base: &QueryInterpretation,
    ctx: &ResolutionContext<'_>,
) -> QueryInterpretation {
    let confidence = f64_field(item, "confidence")
        .map(clamp_confidence)
        .unwrap_or(DEFAULT_ALTERNATIVE_CONFIDENCE);
    let rationale = str_field(item, "rationale").unwrap_or(DEFAULT_ALTERNATIVE_RATIONALE);

    let mut interp = base.clone();
    interp.confidence = confidence;
    interp.is_primary = false;
    interp.rationale = rationale.to_string();

    if let Some(reassignments) = item.get("entity_reassignments").and_then(Value::as_object) {
        for (mention, table) in reassignments {
            let Some(table) = table.as_str().map(str::trim).filter(|t| !t.is_empty()) else {
                continue;
            };
            let table_name = if ctx.schema.has_table(table) {
                table.to_string()
            } else if let Some(info) = ctx.schema.find_table_ignore_case(table) {
                info.name.clone()
            } else {
                warn!(mention = %mention, table, "reassignment to unknown table ignored");
                continue;
            };
            interp.entities.insert(
                mention.clone(),
                ResolvedEntity {
                    mention: mention.clone(),
                    table_name,
                    confidence,
                    resolution_method: ResolutionMethod::AlternativeInterpretation,
                    glossary_term: None,
                },
            );
        }
    }

    if let Some(reinterpretations) = item.get("concept_reinterpretations").and_then(Value::as_object) {
        for (concept, meaning) in reinterpretations {
            let Some(meaning) = meaning.as_str().map(str::trim).filter(|m| !m.is_empty()) else {
                continue;
            };
            match interp.concepts.get_mut(concept) {
                Some(existing) => existing.interpretation = meaning.to_string(),
                None => {
                    interp.concepts.insert(
                        concept.clone(),
                        ResolvedConcept {
                            concept: concept.clone(),
                            interpretation: meaning.to_string(),
                            implementation: ConceptImplementation {
                                kind: ImplementationKind::Mapping,
                                sql_fragment: String::new(),
                                tables_involved: Vec::new(),
                                columns_involved: Vec::new(),
                            },
                            confidence,
                            alternatives: Vec::new(),
                            component_terms: Vec::new(),
                            is_composite: false,
                        },
                    );
                }
            }
        }
    }

    interp
}
