//! Ollama Oracle Implementation
//!
//! Provides integration with Ollama's local generation API.
//!
//! # Features
//!
//! - Async HTTP communication with the Ollama API
//! - Configurable endpoint and model
//! - Retry logic with exponential backoff
//! - JSON mode for structured generation
//!
//! # Examples
//!
//! ```no_run
//! use glossa_llm::OllamaOracle;
//!
//! let oracle = OllamaOracle::new("http://localhost:11434", "llama3").with_max_retries(2);
//! ```

use crate::json::{structured_from_text, ERROR_PREFIX};
use crate::LlmError;
use async_trait::async_trait;
use glossa_domain::traits::LanguageOracle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for a single HTTP request (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of attempts per generation
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Language oracle backed by a local Ollama instance
pub struct OllamaOracle {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
}

/// Request body for the Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Response from the Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl OllamaOracle {
    /// Create a new Ollama oracle
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create an oracle talking to `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of attempts (at least one attempt is always made)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Configured endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call the generate API, retrying transient failures
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Ollama is not running
    /// - The model is not available
    /// - The response body cannot be decoded
    pub async fn request(
        &self,
        prompt: &str,
        temperature: f32,
        format: Option<Value>,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format,
            options: OllamaOptions { temperature },
        };

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self.client.post(&url).json(&body).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<OllamaGenerateResponse>()
                            .await
                            .map(|r| r.response)
                            .map_err(|e| {
                                LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                            });
                    }
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(LlmError::ModelNotAvailable(self.model.clone()));
                    }
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(LlmError::RateLimitExceeded);
                    } else {
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        last_error = Some(LlmError::Communication(format!(
                            "HTTP {}: {}",
                            status, error_text
                        )));
                    }
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                // 1s, 2s, 4s, ...
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                debug!(attempt = attempts, delay_secs = delay.as_secs(), "retrying ollama request");
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

fn error_text(error: &LlmError) -> String {
    format!("{}{}", ERROR_PREFIX, error)
}

#[async_trait]
impl LanguageOracle for OllamaOracle {
    async fn generate(&self, prompt: &str, temperature: f32) -> String {
        match self.request(prompt, temperature, None).await {
            Ok(text) => text,
            Err(e) => {
                warn!(model = %self.model, error = %e, "ollama generation failed");
                error_text(&e)
            }
        }
    }

    async fn generate_structured(&self, prompt: &str, json_schema: &Value, temperature: f32) -> Value {
        // Ollama accepts either "json" or a JSON schema object as the format
        let format = match json_schema.as_object() {
            Some(schema) if !schema.is_empty() => json_schema.clone(),
            _ => Value::String("json".to_string()),
        };

        let text = match self.request(prompt, temperature, Some(format)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(model = %self.model, error = %e, "ollama structured generation failed");
                error_text(&e)
            }
        };
        structured_from_text(&text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
