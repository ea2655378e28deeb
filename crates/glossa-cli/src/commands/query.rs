//! Query command implementation.

use crate::cli::QueryArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use glossa_domain::traits::{LanguageOracle, SchemaContextProvider};
use glossa_domain::Text2SqlResponse;
use glossa_llm::OllamaOracle;
use glossa_resolver::{QueryContext, Text2SqlEngine, UsageFeedback};
use glossa_schema::{SchemaCatalog, SqliteSchemaStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Execute the query command.
pub async fn execute_query(args: QueryArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let store = open_store(args.store.as_deref(), args.catalog.as_deref(), &args.tenant)?;

    let endpoint = args.endpoint.as_deref().unwrap_or(&config.oracle.endpoint);
    let model = args.model.as_deref().unwrap_or(&config.oracle.model);
    info!(endpoint, model, "using Ollama oracle");
    let oracle = OllamaOracle::new(endpoint, model).with_max_retries(config.oracle.max_retries);

    let engine = build_engine(Arc::new(store), Arc::new(oracle), config)?;
    let response = run_query(&engine, &args).await?;

    println!("{}", formatter.format_response(&response, args.all)?);
    Ok(())
}

/// Open the schema store and load the catalog into it for `tenant`.
///
/// Without `--store` the store lives in memory, so a catalog is required.
pub fn open_store(store: Option<&Path>, catalog: Option<&Path>, tenant: &str) -> Result<SqliteSchemaStore> {
    if store.is_none() && catalog.is_none() {
        return Err(CliError::InvalidInput(
            "either --catalog or --store is required".to_string(),
        ));
    }

    let schema_store = match store {
        Some(path) => SqliteSchemaStore::new(path)?,
        None => SqliteSchemaStore::new(":memory:")?,
    };

    if let Some(path) = catalog {
        let tenant = tenant.trim();
        if tenant.is_empty() {
            return Err(CliError::InvalidInput("tenant must not be empty".to_string()));
        }
        let catalog = SchemaCatalog::from_file(path)?;
        schema_store.load_catalog(tenant, &catalog)?;
        debug!(path = %path.display(), tenant, "catalog loaded into store");
    }

    Ok(schema_store)
}

/// Build the engine from the configured sections.
///
/// Background usage feedback would be cut short when the process exits, so it is
/// applied inline instead.
pub fn build_engine(
    provider: Arc<dyn SchemaContextProvider>,
    oracle: Arc<dyn LanguageOracle>,
    config: &Config,
) -> Result<Text2SqlEngine> {
    let mut resolver = config.resolver.clone();
    if resolver.usage_feedback == UsageFeedback::Background {
        resolver.usage_feedback = UsageFeedback::Inline;
    }

    Ok(Text2SqlEngine::new(
        provider,
        oracle,
        resolver,
        config.synthesizer.clone(),
    )?)
}

/// Run one question through the engine.
pub async fn run_query(engine: &Text2SqlEngine, args: &QueryArgs) -> Result<Text2SqlResponse> {
    let context = QueryContext {
        dialect: args.dialect.clone(),
        hints: args.hints.clone(),
    };
    Ok(engine
        .process_query(&args.text, &args.tenant, Some(&context))
        .await?)
}
