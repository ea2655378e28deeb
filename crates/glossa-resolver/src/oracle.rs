//! Timeout and error policy around the language oracle

use crate::error::ResolverError;
use glossa_domain::traits::{is_oracle_error_object, is_oracle_error_text, LanguageOracle};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Typed access to the oracle for pipeline stages
///
/// The oracle itself never fails; the gateway turns its error strings, sentinel
/// objects and slow answers into [`ResolverError`] values.
#[derive(Clone)]
pub struct OracleGateway {
    oracle: Arc<dyn LanguageOracle>,
    timeout: Duration,
    temperature: f32,
}

impl OracleGateway {
    /// Wrap an oracle with a per-call timeout
    pub fn new(oracle: Arc<dyn LanguageOracle>, timeout: Duration) -> Self {
        Self {
            oracle,
            timeout,
            temperature: 0.0,
        }
    }

    /// Shared handle to the wrapped oracle
    pub fn oracle(&self) -> Arc<dyn LanguageOracle> {
        Arc::clone(&self.oracle)
    }

    /// Name of the underlying model
    pub fn model_name(&self) -> &str {
        self.oracle.model_name()
    }

    /// Free-text generation
    pub async fn generate(&self, prompt: &str) -> Result<String, ResolverError> {
        let text = timeout(self.timeout, self.oracle.generate(prompt, self.temperature))
            .await
            .map_err(|_| ResolverError::Timeout(self.timeout.as_secs()))?;
        if is_oracle_error_text(&text) {
            return Err(ResolverError::Oracle(text));
        }
        Ok(text)
    }

    /// Structured generation; the answer must be a JSON object
    pub async fn structured(
        &self,
        prompt: &str,
        json_schema: &Value,
    ) -> Result<Map<String, Value>, ResolverError> {
        debug!(prompt_len = prompt.len(), "structured oracle call");
        let value = timeout(
            self.timeout,
            self.oracle
                .generate_structured(prompt, json_schema, self.temperature),
        )
        .await
        .map_err(|_| ResolverError::Timeout(self.timeout.as_secs()))?;

        if is_oracle_error_object(&value) {
            let reason = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown oracle error");
            return Err(ResolverError::Oracle(reason.to_string()));
        }
        match value {
            Value::Object(map) => Ok(map),
            other => Err(ResolverError::Oracle(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Trimmed, non-empty string field
pub(crate) fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Numeric field, accepting numeric strings
pub(crate) fn f64_field(map: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match map.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}
