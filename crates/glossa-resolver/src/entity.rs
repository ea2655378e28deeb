//! Entity resolution: mentions to tables

use crate::strategy::{Mention, ResolutionContext, Resolutions, StrategyRegistry};
use glossa_domain::ResolvedEntity;
use tracing::info;

/// Resolves entity mentions through the strategy registry
pub struct EntityResolver<'r> {
    registry: &'r StrategyRegistry,
}

impl<'r> EntityResolver<'r> {
    /// Create a resolver over a registry
    pub fn new(registry: &'r StrategyRegistry) -> Self {
        Self { registry }
    }

    /// Resolve every mention; unresolved ones become knowledge boundaries
    pub async fn resolve_all(
        &self,
        mentions: &[String],
        ctx: &ResolutionContext<'_>,
    ) -> Resolutions<ResolvedEntity> {
        let mentions: Vec<Mention> = mentions.iter().map(|m| Mention::entity(m.trim())).collect();
        let outcomes = self.registry.resolve_all(&mentions, ctx).await;

        let mut out = Resolutions::default();
        for (mention, outcome) in mentions.into_iter().zip(outcomes) {
            match outcome {
                Ok(candidate) => {
                    out.usage.extend(candidate.usage_event());
                    out.resolved.insert(
                        mention.text.clone(),
                        ResolvedEntity {
                            mention: mention.text,
                            table_name: candidate.table,
                            confidence: candidate.confidence,
                            resolution_method: candidate.method,
                            glossary_term: candidate.glossary_term,
                        },
                    );
                }
                Err(boundary) => out.unresolved.push(boundary),
            }
        }

        info!(
            tenant_id = ctx.tenant_id,
            stage = "entities",
            resolved = out.resolved.len(),
            unresolved = out.unresolved.len(),
            "entity resolution complete"
        );
        out
    }
}
