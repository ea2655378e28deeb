//! Core SQL synthesizer implementation

use crate::approach::{approach_label, classify};
use crate::config::SynthesizerConfig;
use crate::error::SynthesisError;
use crate::extract::{extract_assumptions, extract_sql};
use crate::prompt::{explanation_prompt, SqlPromptBuilder};
use crate::template;
use glossa_domain::traits::{is_oracle_error_text, LanguageOracle};
use glossa_domain::{QueryInterpretation, ResolvedQuery, SchemaSnapshot, SqlResult, StructuredQuery};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Turns interpretations into SQL, explanations and assumptions
pub struct SqlSynthesizer {
    oracle: Arc<dyn LanguageOracle>,
    config: SynthesizerConfig,
}

impl SqlSynthesizer {
    /// Create a new synthesizer
    pub fn new(oracle: Arc<dyn LanguageOracle>, config: SynthesizerConfig) -> Self {
        Self { oracle, config }
    }

    /// Active configuration
    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    /// One SQL result per interpretation, in interpretation order
    ///
    /// `dialect` overrides the configured dialect for this call. Never fails: oracle
    /// problems fall back to template SQL and a locally composed explanation.
    pub async fn synthesize(&self, resolved: &ResolvedQuery, dialect: Option<&str>) -> Vec<SqlResult> {
        let dialect = dialect
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.config.dialect);

        let mut results = Vec::with_capacity(resolved.interpretations.len());
        for (index, interpretation) in resolved.interpretations.iter().enumerate() {
            let result = self
                .synthesize_one(
                    index,
                    interpretation,
                    &resolved.structured,
                    &resolved.schema,
                    dialect,
                )
                .await;
            results.push(result);
        }

        info!(
            interpretations = results.len(),
            dialect, "SQL synthesis complete"
        );
        results
    }

    /// SQL result for a single interpretation
    pub async fn synthesize_one(
        &self,
        index: usize,
        interpretation: &QueryInterpretation,
        query: &StructuredQuery,
        schema: &SchemaSnapshot,
        dialect: &str,
    ) -> SqlResult {
        let prompt = SqlPromptBuilder::new(interpretation, query, schema)
            .with_dialect(dialect)
            .with_max_columns(self.config.max_columns_per_table)
            .build();
        debug!(index, prompt_len = prompt.len(), "SQL prompt built");

        let mut assumptions = Vec::new();
        let (sql, from_oracle) = match self.generate_sql(&prompt, dialect).await {
            Ok(sql) => (sql, true),
            Err(e) => {
                warn!(index, error = %e, "SQL generation failed, rendering template");
                let rendered = template::render(interpretation, query);
                assumptions.extend(rendered.assumptions);
                (rendered.sql, false)
            }
        };

        let explanation = if from_oracle {
            match self
                .explain(&query.raw_query, &sql, &interpretation.rationale)
                .await
            {
                Ok(text) => {
                    assumptions.extend(extract_assumptions(&text));
                    text
                }
                Err(e) => {
                    warn!(index, error = %e, "explanation failed, composing locally");
                    local_explanation(interpretation, query)
                }
            }
        } else {
            local_explanation(interpretation, query)
        };

        let approach_kind = classify(&sql);
        SqlResult {
            approach: approach_label(approach_kind, &interpretation.rationale),
            approach_kind,
            sql,
            explanation,
            assumptions,
            interpretation_index: index,
            interpretation_rationale: interpretation.rationale.clone(),
            is_primary: interpretation.is_primary,
        }
    }

    async fn call_oracle(&self, prompt: &str) -> Result<String, SynthesisError> {
        let text = timeout(
            self.config.oracle_timeout(),
            self.oracle.generate(prompt, self.config.temperature),
        )
        .await
        .map_err(|_| SynthesisError::Timeout(self.config.oracle_timeout_secs))?;

        if is_oracle_error_text(&text) {
            return Err(SynthesisError::Oracle(text));
        }
        Ok(text)
    }

    async fn generate_sql(&self, prompt: &str, dialect: &str) -> Result<String, SynthesisError> {
        let response = self.call_oracle(prompt).await?;
        debug!(response_len = response.len(), "SQL response received");
        let sql = extract_sql(&response, dialect);
        if sql.is_empty() {
            return Err(SynthesisError::EmptySql);
        }
        Ok(sql)
    }

    async fn explain(&self, question: &str, sql: &str, rationale: &str) -> Result<String, SynthesisError> {
        let text = self
            .call_oracle(&explanation_prompt(question, sql, rationale))
            .await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SynthesisError::Oracle("empty explanation".to_string()));
        }
        Ok(text.to_string())
    }
}

/// One-line explanation naming the tables
pub fn local_explanation(interpretation: &QueryInterpretation, query: &StructuredQuery) -> String {
    let tables = interpretation.referenced_tables(query);
    if tables.is_empty() {
        return format!(
            "Answers \"{}\" ({}); no tables could be identified.",
            query.raw_query, interpretation.rationale
        );
    }
    format!(
        "Answers \"{}\" using {} ({}).",
        query.raw_query,
        tables.join(", "),
        interpretation.rationale
    )
}
