//! Usage-counter feedback to the schema store

use crate::config::UsageFeedback;
use glossa_domain::traits::SchemaContextProvider;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A glossary term was used to resolve a mention to a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
    /// Glossary term name
    pub term: String,
    /// Table the mention resolved to
    pub table: String,
}

/// Applies usage events once resolution is final
///
/// Each event becomes exactly one append at the store; nothing is retried.
#[derive(Clone)]
pub struct UsageRecorder {
    provider: Arc<dyn SchemaContextProvider>,
    mode: UsageFeedback,
}

impl UsageRecorder {
    /// Create a recorder
    pub fn new(provider: Arc<dyn SchemaContextProvider>, mode: UsageFeedback) -> Self {
        Self { provider, mode }
    }

    /// Feedback mode
    pub fn mode(&self) -> UsageFeedback {
        self.mode
    }

    /// Emit events for a tenant
    ///
    /// In `Background` mode a single detached task applies them in order and its
    /// handle is returned; callers may drop it.
    pub async fn record(&self, tenant_id: &str, events: Vec<UsageEvent>) -> Option<JoinHandle<()>> {
        if events.is_empty() {
            return None;
        }
        match self.mode {
            UsageFeedback::Disabled => {
                debug!(tenant_id, events = events.len(), "usage feedback disabled");
                None
            }
            UsageFeedback::Inline => {
                apply(self.provider.as_ref(), tenant_id, &events).await;
                None
            }
            UsageFeedback::Background => {
                let provider = Arc::clone(&self.provider);
                let tenant_id = tenant_id.to_string();
                Some(tokio::spawn(async move {
                    apply(provider.as_ref(), &tenant_id, &events).await;
                }))
            }
        }
    }
}

async fn apply(provider: &dyn SchemaContextProvider, tenant_id: &str, events: &[UsageEvent]) {
    for event in events {
        if let Err(e) = provider
            .update_term_mapping_usage(tenant_id, &event.term, &event.table)
            .await
        {
            warn!(tenant_id, term = %event.term, error = %e, "usage update failed");
        }
    }
    debug!(tenant_id, events = events.len(), "usage feedback applied");
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_schema::{SchemaCatalog, SqliteSchemaStore};

    const CATALOG: &str = r#"
[[tables]]
name = "customers"

[[glossary]]
name = "Customer"
mapped_tables = ["customers"]
"#;

    fn store() -> Arc<SqliteSchemaStore> {
        let store = SqliteSchemaStore::new(":memory:").unwrap();
        store
            .load_catalog("acme", &SchemaCatalog::from_toml(CATALOG).unwrap())
            .unwrap();
        Arc::new(store)
    }

    fn event() -> UsageEvent {
        UsageEvent {
            term: "Customer".to_string(),
            table: "customers".to_string(),
        }
    }

    #[tokio::test]
    async fn test_inline_applies_before_returning() {
        let store = store();
        let recorder = UsageRecorder::new(store.clone(), UsageFeedback::Inline);
        assert!(recorder.record("acme", vec![event(), event()]).await.is_none());
        assert_eq!(store.usage_count("acme", "Customer").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_background_task_applies_events() {
        let store = store();
        let recorder = UsageRecorder::new(store.clone(), UsageFeedback::Background);
        let handle = recorder.record("acme", vec![event()]).await.unwrap();
        handle.await.unwrap();
        assert_eq!(store.usage_count("acme", "Customer").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_disabled_and_failures_are_silent() {
        let store = store();
        let recorder = UsageRecorder::new(store.clone(), UsageFeedback::Disabled);
        recorder.record("acme", vec![event()]).await;
        assert_eq!(store.usage_count("acme", "Customer").unwrap(), 0);

        // unknown term: logged, not fatal
        let recorder = UsageRecorder::new(store.clone(), UsageFeedback::Inline);
        let unknown = UsageEvent {
            term: "Nope".to_string(),
            table: "customers".to_string(),
        };
        recorder.record("acme", vec![unknown, event()]).await;
        assert_eq!(store.usage_count("acme", "Customer").unwrap(), 1);
    }
}
