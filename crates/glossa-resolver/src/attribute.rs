//! Attribute resolution: field mentions to columns

use crate::strategy::{Mention, ResolutionContext, Resolutions, StrategyRegistry};
use glossa_domain::{ResolvedAttribute, StructuredQuery};
use tracing::{info, warn};

/// Resolves attribute, filter, grouping, sorting and aggregation fields
pub struct AttributeResolver<'r> {
    registry: &'r StrategyRegistry,
}

impl<'r> AttributeResolver<'r> {
    /// Create a resolver over a registry
    pub fn new(registry: &'r StrategyRegistry) -> Self {
        Self { registry }
    }

    /// Resolve every field mention of the query
    ///
    /// Columns of `ctx.preferred_tables` win ties. Filter fields that cannot be
    /// resolved are reported as `UnresolvedFilter` boundaries.
    pub async fn resolve_all(
        &self,
        query: &StructuredQuery,
        ctx: &ResolutionContext<'_>,
    ) -> Resolutions<ResolvedAttribute> {
        let mentions: Vec<Mention> = query
            .attribute_mentions()
            .into_iter()
            .map(|m| {
                let is_filter = query.is_filter_field(&m);
                Mention::attribute(m, is_filter)
            })
            .collect();
        let outcomes = self.registry.resolve_all(&mentions, ctx).await;

        let mut out = Resolutions::default();
        for (mention, outcome) in mentions.into_iter().zip(outcomes) {
            let candidate = match outcome {
                Ok(candidate) => candidate,
                Err(boundary) => {
                    out.unresolved.push(boundary);
                    continue;
                }
            };
            let Some(column) = candidate.column.clone() else {
                warn!(mention = %mention.text, "candidate without column ignored");
                continue;
            };
            out.usage.extend(candidate.usage_event());
            out.resolved.insert(
                mention.text.clone(),
                ResolvedAttribute {
                    mention: mention.text,
                    table_name: candidate.table,
                    column_name: column,
                    confidence: candidate.confidence,
                    resolution_method: candidate.method,
                    glossary_term: candidate.glossary_term,
                },
            );
        }

        info!(
            tenant_id = ctx.tenant_id,
            stage = "attributes",
            resolved = out.resolved.len(),
            unresolved = out.unresolved.len(),
            "attribute resolution complete"
        );
        out
    }
}
