//! The end-to-end engine: parse, resolve, join, interpret, synthesize

use crate::attribute::AttributeResolver;
use crate::concept::ConceptResolver;
use crate::config::ResolverConfig;
use crate::entity::EntityResolver;
use crate::error::PipelineError;
use crate::interpretation::InterpretationGenerator;
use crate::joins::{discover_joins, distinct_tables, JoinDiscovery};
use crate::oracle::OracleGateway;
use crate::parser::QueryParser;
use crate::strategy::{ResolutionContext, StrategyRegistry};
use crate::usage::UsageRecorder;
use chrono::Utc;
use futures::future::join_all;
use glossa_domain::traits::{LanguageOracle, SchemaContextProvider};
use glossa_domain::{
    GlossaryTermDetails, QueryInterpretation, ResolvedQuery, ResponseMetadata, SchemaError,
    SchemaSnapshot, Text2SqlResponse,
};
use glossa_synthesizer::{SqlSynthesizer, SynthesizerConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-call options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    /// SQL dialect overriding the synthesizer default
    pub dialect: Option<String>,
    /// Extra lines appended to the parser prompt
    pub hints: Vec<String>,
}

impl QueryContext {
    /// Context with a dialect
    pub fn with_dialect(dialect: impl Into<String>) -> Self {
        Self {
            dialect: Some(dialect.into()),
            hints: Vec::new(),
        }
    }
}

/// Text-to-SQL engine
///
/// Holds no per-query state; one engine can serve concurrent queries for many
/// tenants.
pub struct Text2SqlEngine {
    provider: Arc<dyn SchemaContextProvider>,
    gateway: OracleGateway,
    parser: QueryParser,
    registry: StrategyRegistry,
    synthesizer: SqlSynthesizer,
    usage: UsageRecorder,
    config: ResolverConfig,
}

impl Text2SqlEngine {
    /// Create an engine with the standard strategy registry
    pub fn new(
        provider: Arc<dyn SchemaContextProvider>,
        oracle: Arc<dyn LanguageOracle>,
        config: ResolverConfig,
        synthesizer_config: SynthesizerConfig,
    ) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;
        synthesizer_config.validate().map_err(PipelineError::Config)?;

        let gateway = OracleGateway::new(Arc::clone(&oracle), config.oracle_timeout());
        Ok(Self {
            parser: QueryParser::new(gateway.clone()),
            usage: UsageRecorder::new(Arc::clone(&provider), config.usage_feedback),
            synthesizer: SqlSynthesizer::new(oracle, synthesizer_config),
            registry: StrategyRegistry::standard(),
            provider,
            gateway,
            config,
        })
    }

    /// Replace the strategy registry
    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Resolver configuration
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Strategy names in resolution order
    pub fn strategies(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    /// Answer a question with SQL
    ///
    /// Fails only on invalid input or an internal error; every resolver or oracle
    /// problem is reported inside the response.
    pub async fn process_query(
        &self,
        query: &str,
        tenant_id: &str,
        context: Option<&QueryContext>,
    ) -> Result<Text2SqlResponse, PipelineError> {
        let resolved = self.resolve(query, tenant_id, context).await?;

        let dialect = context.and_then(|c| c.dialect.as_deref());
        let sql_results = self.synthesizer.synthesize(&resolved, dialect).await;

        let primary = resolved
            .primary()
            .cloned()
            .ok_or_else(|| PipelineError::Internal("no primary interpretation".to_string()))?;

        let response = Text2SqlResponse {
            original_query: resolved.structured.raw_query.clone(),
            interpreted_as: resolved.structured.primary_intent.clone(),
            ambiguity_level: resolved.structured.ambiguity_assessment.score,
            sql_results,
            entities_resolved: primary.entity_tables(),
            primary_interpretation: primary,
            multiple_interpretations: resolved.has_multiple_interpretations(),
            interpretations: resolved.interpretations,
            unresolved: resolved.unresolved,
            metadata: ResponseMetadata {
                timestamp: Utc::now(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                query_id: Uuid::now_v7().to_string(),
                tenant_id: tenant_id.trim().to_string(),
            },
        };

        info!(
            tenant_id = %response.metadata.tenant_id,
            query_id = %response.metadata.query_id,
            results = response.sql_results.len(),
            unresolved = response.unresolved.len(),
            "query processed"
        );
        Ok(response)
    }

    /// Run every stage up to, but not including, SQL synthesis
    pub async fn resolve(
        &self,
        query: &str,
        tenant_id: &str,
        context: Option<&QueryContext>,
    ) -> Result<ResolvedQuery, PipelineError> {
        let (query, tenant_id) = self.validate(query, tenant_id)?;
        let schema = self.load_snapshot(tenant_id).await?;

        let hints = context.map(|c| c.hints.as_slice()).unwrap_or(&[]);
        let structured = self.parser.parse(query, tenant_id, hints).await;

        let ctx = ResolutionContext {
            tenant_id,
            raw_query: query,
            schema: &schema,
            provider: self.provider.as_ref(),
            oracle: &self.gateway,
            config: &self.config,
            preferred_tables: &[],
        };

        let entities = EntityResolver::new(&self.registry)
            .resolve_all(&structured.main_entities, &ctx)
            .await;
        let preferred = distinct_tables(
            structured
                .main_entities
                .iter()
                .filter_map(|m| entities.resolved.get(m.trim()))
                .map(|e| &e.table_name),
        );
        let attribute_ctx = ResolutionContext {
            preferred_tables: &preferred,
            ..ctx
        };

        let attribute_resolver = AttributeResolver::new(&self.registry);
        let (attributes, concepts) = tokio::join!(
            attribute_resolver.resolve_all(&structured, &attribute_ctx),
            ConceptResolver.resolve_all(&structured.identified_ambiguities, &ctx),
        );

        let mut base = QueryInterpretation {
            entities: entities.resolved.clone(),
            attributes: attributes.resolved.clone(),
            concepts: concepts.resolved.clone(),
            join_paths: BTreeMap::new(),
            confidence: 1.0,
            is_primary: true,
            rationale: String::new(),
        };
        let tables = base.referenced_tables(&structured);
        let joins = discover_joins(
            ctx.provider,
            tenant_id,
            &tables,
            self.config.join_min_confidence,
            &JoinDiscovery::default(),
        )
        .await;
        base.join_paths = joins.paths.clone();

        let set = InterpretationGenerator
            .generate(&structured, base, &joins, &ctx)
            .await;

        let mut join_paths = joins.paths;
        join_paths.extend(set.joins.paths);
        let mut missing_join_paths = joins.missing;
        missing_join_paths.extend(set.joins.missing);

        let mut usage = entities.usage;
        usage.extend(attributes.usage);
        usage.extend(concepts.usage);
        let _ = self.usage.record(tenant_id, usage).await;

        let mut unresolved = entities.unresolved;
        unresolved.extend(attributes.unresolved);
        unresolved.extend(concepts.unresolved);

        info!(
            tenant_id,
            stage = "resolve",
            entities = entities.resolved.len(),
            attributes = attributes.resolved.len(),
            concepts = concepts.resolved.len(),
            joins = join_paths.len(),
            unresolved = unresolved.len(),
            interpretations = set.interpretations.len(),
            "resolution complete"
        );

        Ok(ResolvedQuery {
            structured,
            entities: entities.resolved,
            attributes: attributes.resolved,
            concepts: concepts.resolved,
            join_paths,
            missing_join_paths,
            unresolved,
            interpretations: set.interpretations,
            schema,
        })
    }

    fn validate<'q>(&self, query: &'q str, tenant_id: &'q str) -> Result<(&'q str, &'q str), PipelineError> {
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(PipelineError::InvalidTenant("tenant id is empty".to_string()));
        }
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::InvalidQuery("query is empty".to_string()));
        }
        let length = query.chars().count();
        if length > self.config.max_query_length {
            return Err(PipelineError::QueryTooLong(length, self.config.max_query_length));
        }
        Ok((query, tenant_id))
    }

    /// Load the tenant's tables, columns and glossary
    ///
    /// A rejected tenant is fatal; any other store failure leaves that part of
    /// the snapshot empty.
    async fn load_snapshot(&self, tenant_id: &str) -> Result<SchemaSnapshot, PipelineError> {
        let provider = self.provider.as_ref();

        let tables = match provider.get_tables(tenant_id).await {
            Ok(tables) => tables,
            Err(SchemaError::InvalidTenant(msg)) => return Err(PipelineError::InvalidTenant(msg)),
            Err(e) => {
                warn!(tenant_id, error = %e, "table listing failed");
                Vec::new()
            }
        };

        let column_lists = join_all(
            tables
                .iter()
                .map(|table| provider.get_columns(tenant_id, &table.name)),
        )
        .await;
        let mut columns = BTreeMap::new();
        for (table, listed) in tables.iter().zip(column_lists) {
            let listed = listed.unwrap_or_else(|e| {
                warn!(tenant_id, table = %table.name, error = %e, "column listing failed");
                Vec::new()
            });
            columns.insert(table.name.clone(), listed);
        }

        let terms = match provider.get_glossary_terms(tenant_id).await {
            Ok(terms) => terms,
            Err(e) => {
                warn!(tenant_id, error = %e, "glossary listing failed");
                Vec::new()
            }
        };
        let details = join_all(
            terms
                .iter()
                .map(|term| provider.get_glossary_term_details(tenant_id, &term.name)),
        )
        .await;
        let glossary: Vec<GlossaryTermDetails> = terms
            .into_iter()
            .zip(details)
            .map(|(term, details)| match details {
                Ok(Some(details)) => details,
                Ok(None) => unmapped(term.name, term.definition),
                Err(e) => {
                    warn!(tenant_id, term = %term.name, error = %e, "glossary details failed");
                    unmapped(term.name, term.definition)
                }
            })
            .collect();

        debug!(
            tenant_id,
            tables = tables.len(),
            glossary = glossary.len(),
            "schema snapshot loaded"
        );
        Ok(SchemaSnapshot {
            tenant_id: tenant_id.to_string(),
            tables,
            columns,
            glossary,
        })
    }
}

fn unmapped(name: String, definition: String) -> GlossaryTermDetails {
    GlossaryTermDetails {
        name,
        definition,
        mapped_tables: Vec::new(),
        mapped_columns: Vec::new(),
        usage_count: 0,
        weight: 1.0,
    }
}
