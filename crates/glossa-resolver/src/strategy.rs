//! Resolution strategies and the registry that orders them

use crate::config::ResolverConfig;
use crate::error::ResolverError;
use crate::oracle::OracleGateway;
use crate::strategies::{
    CaseInsensitiveStrategy, ExactNameStrategy, FuzzyGlossaryStrategy, GlossaryTermStrategy,
    OracleStrategy,
};
use crate::usage::UsageEvent;
use async_trait::async_trait;
use futures::future::join_all;
use glossa_domain::scoring::candidate_weight;
use glossa_domain::traits::SchemaContextProvider;
use glossa_domain::{BoundaryType, KnowledgeBoundary, ResolutionMethod, SchemaSnapshot};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Whether a mention should resolve to a table or to a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    /// Entity mention, resolves to a table
    Entity,
    /// Attribute mention, resolves to a table column
    Attribute,
}

/// A mention to resolve
#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    /// Text as written in the question
    pub text: String,
    /// Table or column
    pub kind: MentionKind,
    /// Whether the mention is a filter field
    pub is_filter: bool,
}

impl Mention {
    /// Entity mention
    pub fn entity(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MentionKind::Entity,
            is_filter: false,
        }
    }

    /// Attribute mention
    pub fn attribute(text: impl Into<String>, is_filter: bool) -> Self {
        Self {
            text: text.into(),
            kind: MentionKind::Attribute,
            is_filter,
        }
    }

    fn boundary_type(&self) -> BoundaryType {
        match (self.kind, self.is_filter) {
            (MentionKind::Entity, _) => BoundaryType::UnknownEntity,
            (MentionKind::Attribute, true) => BoundaryType::UnresolvedFilter,
            (MentionKind::Attribute, false) => BoundaryType::UnknownAttribute,
        }
    }
}

/// A proposed schema construct for a mention
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Table name
    pub table: String,
    /// Column name, for attribute mentions
    pub column: Option<String>,
    /// Stage confidence
    pub confidence: f64,
    /// Similarity between the mention and the matched term (1.0 for name matches)
    pub similarity: f64,
    /// Glossary term weight (1.0 when no term was involved)
    pub term_weight: f64,
    /// Recorded usage of the matched term
    pub usage_count: u64,
    /// Producing stage
    pub method: ResolutionMethod,
    /// Matched glossary term
    pub glossary_term: Option<String>,
}

impl Candidate {
    /// Candidate from a direct schema-name match
    pub fn named(table: &str, column: Option<&str>, confidence: f64, method: ResolutionMethod) -> Self {
        Self {
            table: table.to_string(),
            column: column.map(str::to_string),
            confidence,
            similarity: 1.0,
            term_weight: 1.0,
            usage_count: 0,
            method,
            glossary_term: None,
        }
    }

    /// `confidence × similarity × term_weight + usage_bonus`
    pub fn weight(&self) -> f64 {
        candidate_weight(self.confidence, self.similarity, self.term_weight, self.usage_count)
    }

    /// Usage event to emit once this candidate is chosen
    pub fn usage_event(&self) -> Option<UsageEvent> {
        self.glossary_term.as_ref().map(|term| UsageEvent {
            term: term.clone(),
            table: self.table.clone(),
        })
    }
}

/// Everything a strategy may consult, passed explicitly per query
pub struct ResolutionContext<'a> {
    /// Tenant partition key
    pub tenant_id: &'a str,
    /// Original question
    pub raw_query: &'a str,
    /// Schema facts loaded for this query
    pub schema: &'a SchemaSnapshot,
    /// Store for live lookups
    pub provider: &'a dyn SchemaContextProvider,
    /// Oracle access with timeout policy
    pub oracle: &'a OracleGateway,
    /// Thresholds
    pub config: &'a ResolverConfig,
    /// Tables already resolved for entities; their columns are scanned first
    pub preferred_tables: &'a [String],
}

impl ResolutionContext<'_> {
    /// Tables to scan for columns: preferred tables first, then the rest of the schema
    pub fn table_scan_order(&self) -> Vec<String> {
        let mut tables: Vec<String> = self
            .preferred_tables
            .iter()
            .filter(|t| self.schema.has_table(t))
            .cloned()
            .collect();
        for table in &self.schema.tables {
            if !tables.contains(&table.name) {
                tables.push(table.name.clone());
            }
        }
        tables
    }

    /// Names a mention of this kind is compared with, for boundary suggestions
    pub fn known_names(&self, kind: MentionKind) -> Vec<String> {
        match kind {
            MentionKind::Entity => self.schema.table_names(),
            MentionKind::Attribute => self
                .table_scan_order()
                .iter()
                .flat_map(|table| {
                    self.schema
                        .columns_of(table)
                        .iter()
                        .map(move |c| format!("{}.{}", table, c.name))
                })
                .collect(),
        }
    }
}

/// A single way of proposing candidates for a mention
#[async_trait]
pub trait ResolutionStrategy: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Fallback strategies run only when no earlier candidate is confident enough
    fn is_fallback(&self) -> bool {
        false
    }

    /// Candidates in preference order
    async fn candidates(
        &self,
        mention: &Mention,
        ctx: &ResolutionContext<'_>,
    ) -> Result<Vec<Candidate>, ResolverError>;
}

/// Ordered strategies, built once and shared by every resolver
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl StrategyRegistry {
    /// Registry with no strategies
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// The five standard stages: exact name, case-insensitive name, glossary term,
    /// fuzzy glossary term, oracle fallback
    pub fn standard() -> Self {
        Self::empty()
            .with(ExactNameStrategy)
            .with(CaseInsensitiveStrategy)
            .with(GlossaryTermStrategy)
            .with(FuzzyGlossaryStrategy)
            .with(OracleStrategy)
    }

    /// Append a strategy; later strategies lose ties
    pub fn with(mut self, strategy: impl ResolutionStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Strategy names in order
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolve one mention
    ///
    /// Keeps the maximum-weight candidate; ties go to the earlier candidate.
    /// Returns a knowledge boundary when nothing reaches the usable threshold.
    pub async fn resolve(
        &self,
        mention: &Mention,
        ctx: &ResolutionContext<'_>,
    ) -> Result<Candidate, KnowledgeBoundary> {
        let mut best: Option<Candidate> = None;
        let mut failure: Option<ResolverError> = None;

        for strategy in &self.strategies {
            if strategy.is_fallback() {
                let confident = best
                    .as_ref()
                    .map(|c| c.confidence >= ctx.config.oracle_fallback_below)
                    .unwrap_or(false);
                if confident {
                    continue;
                }
            }

            match strategy.candidates(mention, ctx).await {
                Ok(candidates) => {
                    for candidate in candidates {
                        debug!(
                            mention = %mention.text,
                            stage = strategy.name(),
                            table = %candidate.table,
                            column = ?candidate.column,
                            weight = candidate.weight(),
                            "candidate"
                        );
                        let better = best
                            .as_ref()
                            .map(|b| candidate.weight() > b.weight())
                            .unwrap_or(true);
                        if better {
                            best = Some(candidate);
                        }
                    }
                }
                Err(ResolverError::NoCandidate(reason)) => {
                    debug!(mention = %mention.text, stage = strategy.name(), %reason, "no candidate");
                }
                Err(e) => {
                    warn!(mention = %mention.text, stage = strategy.name(), error = %e, "strategy failed");
                    failure = Some(e);
                }
            }
        }

        match best {
            Some(candidate) if candidate.weight() >= ctx.config.min_usable_confidence => Ok(candidate),
            other => {
                let best_confidence = other.map(|c| c.confidence).unwrap_or(0.0);
                let boundary = KnowledgeBoundary::unresolved(
                    mention.boundary_type(),
                    &mention.text,
                    best_confidence,
                    &ctx.known_names(mention.kind),
                );
                Err(match failure {
                    Some(e) => boundary.with_detail(e.to_string()),
                    None => boundary,
                })
            }
        }
    }

    /// Resolve independent mentions concurrently, results in mention order
    pub async fn resolve_all(
        &self,
        mentions: &[Mention],
        ctx: &ResolutionContext<'_>,
    ) -> Vec<Result<Candidate, KnowledgeBoundary>> {
        join_all(mentions.iter().map(|mention| self.resolve(mention, ctx))).await
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Resolved mentions of one kind plus what could not be resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Resolutions<T> {
    /// Mention → resolution
    pub resolved: BTreeMap<String, T>,
    /// Unresolved mentions
    pub unresolved: Vec<KnowledgeBoundary>,
    /// Usage events for the chosen glossary-backed candidates
    pub usage: Vec<UsageEvent>,
}

impl<T> Default for Resolutions<T> {
    fn default() -> Self {
        Self {
            resolved: BTreeMap::new(),
            unresolved: Vec::new(),
            usage: Vec::new(),
        }
    }
}
