//! Glossa Language Oracle Layer
//!
//! Implementations of the `LanguageOracle` trait from `glossa-domain`.
//!
//! # Oracles
//!
//! - `MockOracle`: deterministic, scripted oracle for testing
//! - `OllamaOracle`: local Ollama API integration
//!
//! Both honour the oracle contract: `generate` never fails (transport failures come
//! back as `"Error: ..."` text) and `generate_structured` decodes the first balanced
//! JSON object of the response, returning a sentinel error object otherwise.
//!
//! # Examples
//!
//! ```
//! use glossa_llm::MockOracle;
//! use glossa_domain::traits::LanguageOracle;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut oracle = MockOracle::new("Hello from the oracle!");
//! oracle.add_response("entities", r#"{"main_entities": ["orders"]}"#);
//!
//! assert_eq!(oracle.generate("anything", 0.0).await, "Hello from the oracle!");
//! let value = oracle
//!     .generate_structured("extract entities", &serde_json::json!({}), 0.0)
//!     .await;
//! assert_eq!(value["main_entities"][0], "orders");
//! # }
//! ```

#![warn(missing_docs)]

pub mod json;
pub mod ollama;

use async_trait::async_trait;
use glossa_domain::traits::LanguageOracle;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

pub use ollama::OllamaOracle;

/// Errors that can occur while talking to a language model
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the model
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error(String),
}

#[derive(Debug, Default)]
struct MockState {
    rules: Vec<(String, MockReply)>,
    prompts: Vec<String>,
}

/// Scripted oracle for deterministic testing
///
/// Responses are selected by prompt substring: the first rule whose pattern occurs in
/// the prompt wins, otherwise the default response is returned. Every prompt is
/// recorded. Clones share rules, recorded prompts and the call count.
///
/// ```
/// use glossa_llm::MockOracle;
///
/// let mut oracle = MockOracle::default();
/// oracle.add_response("interpretations", "{}");
/// oracle.add_error("SQL", "model crashed");
/// assert_eq!(oracle.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockOracle {
    default_response: String,
    state: Arc<Mutex<MockState>>,
    latency: Option<Duration>,
}

impl MockOracle {
    /// Create a new MockOracle with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            state: Arc::new(Mutex::new(MockState::default())),
            latency: None,
        }
    }

    /// Delay every call, to exercise caller timeouts
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Respond with `response` to prompts containing `pattern`
    pub fn add_response(&mut self, pattern: impl Into<String>, response: impl Into<String>) {
        self.lock()
            .rules
            .push((pattern.into(), MockReply::Text(response.into())));
    }

    /// Fail prompts containing `pattern` with a transport error
    pub fn add_error(&mut self, pattern: impl Into<String>, message: impl Into<String>) {
        self.lock()
            .rules
            .push((pattern.into(), MockReply::Error(message.into())));
    }

    /// Number of generation calls made so far
    pub fn call_count(&self) -> usize {
        self.lock().prompts.len()
    }

    /// Number of recorded prompts containing `pattern`
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.lock()
            .prompts
            .iter()
            .filter(|p| p.contains(pattern))
            .count()
    }

    /// Every prompt received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    /// Forget recorded prompts
    pub fn reset_call_count(&self) {
        self.lock().prompts.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn reply_for(&self, prompt: &str) -> String {
        let mut state = self.lock();
        state.prompts.push(prompt.to_string());
        let reply = state
            .rules
            .iter()
            .find(|(pattern, _)| prompt.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(MockReply::Text(text)) => text,
            Some(MockReply::Error(message)) => format!("{}{}", json::ERROR_PREFIX, message),
            None => self.default_response.clone(),
        }
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LanguageOracle for MockOracle {
    async fn generate(&self, prompt: &str, _temperature: f32) -> String {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.reply_for(prompt)
    }

    async fn generate_structured(&self, prompt: &str, _json_schema: &Value, temperature: f32) -> Value {
        let text = self.generate(prompt, temperature).await;
        json::structured_from_text(&text)
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
