//! The standard resolution strategies

use crate::error::ResolverError;
use crate::oracle::{f64_field, str_field};
use crate::prompt::{attribute_prompt, attribute_schema, entity_prompt, entity_schema};
use crate::strategy::{Candidate, Mention, MentionKind, ResolutionContext, ResolutionStrategy};
use async_trait::async_trait;
use glossa_domain::scoring::{clamp_confidence, text_similarity, textually_overlaps};
use glossa_domain::{GlossaryTerm, GlossaryTermDetails, ResolutionMethod, SchemaSnapshot};
use tracing::warn;

/// Exact table match
pub const EXACT_TABLE_CONFIDENCE: f64 = 1.0;
/// Exact column match
pub const EXACT_COLUMN_CONFIDENCE: f64 = 0.9;
/// Case-insensitive name match
pub const CASE_INSENSITIVE_CONFIDENCE: f64 = 0.9;
/// Exact glossary term with mappings
pub const GLOSSARY_TERM_CONFIDENCE: f64 = 0.85;
/// Similar glossary term with mappings
pub const FUZZY_GLOSSARY_CONFIDENCE: f64 = 0.75;

/// Split `table.column`
fn qualified(text: &str) -> Option<(&str, &str)> {
    let (table, column) = text.split_once('.')?;
    let (table, column) = (table.trim(), column.trim());
    (!table.is_empty() && !column.is_empty()).then_some((table, column))
}

fn column_ignore_case<'s>(schema: &'s SchemaSnapshot, table: &str, column: &str) -> Option<&'s str> {
    let needle = column.trim().to_lowercase();
    schema
        .columns_of(table)
        .iter()
        .find(|c| c.name.to_lowercase() == needle)
        .map(|c| c.name.as_str())
}

/// Stage 1: exact, case-sensitive schema names
pub struct ExactNameStrategy;

#[async_trait]
impl ResolutionStrategy for ExactNameStrategy {
    fn name(&self) -> &'static str {
        "exact_name"
    }

    async fn candidates(
        &self,
        mention: &Mention,
        ctx: &ResolutionContext<'_>,
    ) -> Result<Vec<Candidate>, ResolverError> {
        let text = mention.text.trim();
        let schema = ctx.schema;
        let method = ResolutionMethod::DirectMatch;

        let candidates: Vec<Candidate> = match mention.kind {
            MentionKind::Entity => schema
                .has_table(text)
                .then(|| Candidate::named(text, None, EXACT_TABLE_CONFIDENCE, method))
                .into_iter()
                .collect(),
            MentionKind::Attribute => {
                if let Some((table, column)) = qualified(text) {
                    schema
                        .has_column(table, column)
                        .then(|| Candidate::named(table, Some(column), EXACT_COLUMN_CONFIDENCE, method))
                        .into_iter()
                        .collect()
                } else {
                    ctx.table_scan_order()
                        .iter()
                        .filter(|table| schema.has_column(table, text))
                        .map(|table| Candidate::named(table, Some(text), EXACT_COLUMN_CONFIDENCE, method))
                        .collect()
                }
            }
        };
        Ok(candidates)
    }
}

/// Stage 2: schema names ignoring case
pub struct CaseInsensitiveStrategy;

#[async_trait]
impl ResolutionStrategy for CaseInsensitiveStrategy {
    fn name(&self) -> &'static str {
        "case_insensitive"
    }

    async fn candidates(
        &self,
        mention: &Mention,
        ctx: &ResolutionContext<'_>,
    ) -> Result<Vec<Candidate>, ResolverError> {
        let text = mention.text.trim();
        let schema = ctx.schema;
        let method = ResolutionMethod::CaseInsensitiveMatch;

        let candidates: Vec<Candidate> = match mention.kind {
            MentionKind::Entity => schema
                .find_table_ignore_case(text)
                .map(|t| Candidate::named(&t.name, None, CASE_INSENSITIVE_CONFIDENCE, method))
                .into_iter()
                .collect(),
            MentionKind::Attribute => {
                if let Some((table, column)) = qualified(text) {
                    schema
                        .find_table_ignore_case(table)
                        .and_then(|t| {
                            column_ignore_case(schema, &t.name, column).map(|c| {
                                Candidate::named(&t.name, Some(c), CASE_INSENSITIVE_CONFIDENCE, method)
                            })
                        })
                        .into_iter()
                        .collect()
                } else {
                    ctx.table_scan_order()
                        .iter()
                        .filter_map(|table| {
                            column_ignore_case(schema, table, text).map(|c| {
                                Candidate::named(table, Some(c), CASE_INSENSITIVE_CONFIDENCE, method)
                            })
                        })
                        .collect()
                }
            }
        };
        Ok(candidates)
    }
}

/// Candidates a glossary term maps to, preferred tables first
fn term_candidates(
    term: &GlossaryTermDetails,
    kind: MentionKind,
    ctx: &ResolutionContext<'_>,
    confidence: f64,
    similarity: f64,
    method: ResolutionMethod,
) -> Vec<Candidate> {
    let schema = ctx.schema;
    let build = |table: &str, column: Option<&str>| Candidate {
        table: table.to_string(),
        column: column.map(str::to_string),
        confidence,
        similarity,
        term_weight: term.weight,
        usage_count: term.usage_count,
        method,
        glossary_term: Some(term.name.clone()),
    };

    match kind {
        MentionKind::Entity => term
            .tables()
            .iter()
            .filter(|table| schema.has_table(table))
            .map(|table| build(table, None))
            .collect(),
        MentionKind::Attribute => {
            let order = ctx.table_scan_order();
            let rank = |table: &str| order.iter().position(|t| t == table).unwrap_or(usize::MAX);
            let mut columns: Vec<_> = term
                .mapped_columns
                .iter()
                .filter(|c| schema.has_column(&c.table, &c.column))
                .collect();
            columns.sort_by_key(|c| rank(&c.table));
            columns
                .into_iter()
                .map(|c| build(&c.table, Some(&c.column)))
                .collect()
        }
    }
}

/// Stage 3: a glossary term with exactly the mention's name
pub struct GlossaryTermStrategy;

#[async_trait]
impl ResolutionStrategy for GlossaryTermStrategy {
    fn name(&self) -> &'static str {
        "glossary_term"
    }

    async fn candidates(
        &self,
        mention: &Mention,
        ctx: &ResolutionContext<'_>,
    ) -> Result<Vec<Candidate>, ResolverError> {
        let Some(term) = ctx.schema.glossary_term(&mention.text).filter(|t| t.has_mappings()) else {
            return Ok(Vec::new());
        };
        Ok(term_candidates(
            term,
            mention.kind,
            ctx,
            GLOSSARY_TERM_CONFIDENCE,
            text_similarity(&mention.text, &term.name),
            ResolutionMethod::GlossaryTermMapping,
        ))
    }
}

/// Stage 4: glossary terms similar to the mention
pub struct FuzzyGlossaryStrategy;

#[async_trait]
impl ResolutionStrategy for FuzzyGlossaryStrategy {
    fn name(&self) -> &'static str {
        "fuzzy_glossary"
    }

    async fn candidates(
        &self,
        mention: &Mention,
        ctx: &ResolutionContext<'_>,
    ) -> Result<Vec<Candidate>, ResolverError> {
        let mut candidates = Vec::new();
        for term in ctx.schema.glossary.iter().filter(|t| t.has_mappings()) {
            let similarity = text_similarity(&mention.text, &term.name);
            if similarity < ctx.config.fuzzy_similarity_floor {
                continue;
            }
            candidates.extend(term_candidates(
                term,
                mention.kind,
                ctx,
                FUZZY_GLOSSARY_CONFIDENCE,
                similarity,
                ResolutionMethod::FuzzyGlossaryMatch,
            ));
        }
        Ok(candidates)
    }
}

/// Stage 5: ask the oracle, given the schema and related glossary terms
pub struct OracleStrategy;

impl OracleStrategy {
    async fn related_terms(mention: &str, ctx: &ResolutionContext<'_>) -> Vec<GlossaryTerm> {
        let mut terms = match ctx.provider.search_glossary_terms(ctx.tenant_id, mention).await {
            Ok(terms) => terms,
            Err(e) => {
                warn!(tenant_id = ctx.tenant_id, mention, error = %e, "glossary search failed");
                Vec::new()
            }
        };
        for term in &ctx.schema.glossary {
            if textually_overlaps(mention, &term.name) && !terms.iter().any(|t| t.name == term.name) {
                terms.push(GlossaryTerm {
                    name: term.name.clone(),
                    definition: term.definition.clone(),
                });
            }
        }
        terms
    }
}

fn is_empty_answer(text: &str) -> bool {
    matches!(text.to_lowercase().as_str(), "none" | "null" | "n/a" | "unknown")
}

#[async_trait]
impl ResolutionStrategy for OracleStrategy {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn is_fallback(&self) -> bool {
        true
    }

    async fn candidates(
        &self,
        mention: &Mention,
        ctx: &ResolutionContext<'_>,
    ) -> Result<Vec<Candidate>, ResolverError> {
        let text = mention.text.trim();
        let schema = ctx.schema;
        let terms = Self::related_terms(text, ctx).await;

        let answer = match mention.kind {
            MentionKind::Entity => {
                let prompt = entity_prompt(text, ctx.raw_query, schema, &terms);
                ctx.oracle.structured(&prompt, &entity_schema()).await?
            }
            MentionKind::Attribute => {
                let prompt = attribute_prompt(text, ctx.raw_query, schema, &ctx.table_scan_order(), &terms);
                ctx.oracle.structured(&prompt, &attribute_schema()).await?
            }
        };

        let confidence = f64_field(&answer, "confidence")
            .map(clamp_confidence)
            .unwrap_or(ctx.config.default_oracle_confidence);
        let named_table = str_field(&answer, "table").filter(|t| !is_empty_answer(t));
        let method = ResolutionMethod::LlmResolution;

        let candidate = match mention.kind {
            MentionKind::Entity => {
                let table = named_table
                    .ok_or_else(|| ResolverError::NoCandidate("oracle named no table".to_string()))?;
                let table = schema.find_table_ignore_case(table).ok_or_else(|| {
                    ResolverError::NoCandidate(format!("oracle named unknown table '{}'", table))
                })?;
                Candidate::named(&table.name, None, confidence, method)
            }
            MentionKind::Attribute => {
                let column = str_field(&answer, "column")
                    .filter(|c| !is_empty_answer(c))
                    .ok_or_else(|| ResolverError::NoCandidate("oracle named no column".to_string()))?;
                let (table, column) = match (named_table, qualified(column)) {
                    (_, Some((t, c))) => (Some(t), c),
                    (t, None) => (t, column),
                };
                let tables = match table {
                    Some(t) => schema
                        .find_table_ignore_case(t)
                        .map(|info| vec![info.name.clone()])
                        .unwrap_or_default(),
                    None => ctx.table_scan_order(),
                };
                tables
                    .iter()
                    .find_map(|t| {
                        column_ignore_case(schema, t, column)
                            .map(|c| Candidate::named(t, Some(c), confidence, method))
                    })
                    .ok_or_else(|| {
                        ResolverError::NoCandidate(format!("oracle named unknown column '{}'", column))
                    })?
            }
        };
        Ok(vec![candidate])
    }
}
