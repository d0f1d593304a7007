//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait for structured (JSON) output generation.
//! Agents only see this trait; concrete providers are picked from config.

mod ollama;
mod openai;
#[cfg(test)]
pub(crate) mod testing;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::types::{InsightsError, Result};

// =============================================================================
// LLM Response
// =============================================================================

/// Parsed LLM reply with usage metrics
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated content (structured JSON)
    pub content: Value,
    pub usage: TokenUsage,
    /// Wall-clock time of the call in milliseconds
    pub elapsed_ms: u64,
    pub model: String,
}

impl LlmResponse {
    /// Response with content only (usage unknown)
    pub fn content_only(content: Value) -> Self {
        Self {
            content,
            usage: TokenUsage::default(),
            elapsed_ms: 0,
            model: String::new(),
        }
    }

    pub fn with_metrics(content: Value, usage: TokenUsage, elapsed: Duration, model: &str) -> Self {
        Self {
            content,
            usage,
            elapsed_ms: elapsed.as_millis() as u64,
            model: model.to_string(),
        }
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Shared LLM provider, safe to use from concurrent runs
pub type SharedProvider = Arc<dyn LlmProvider>;

// =============================================================================
// LLM Provider Trait
// =============================================================================

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a JSON value, guided by `schema` when it is not null
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;
}

pub const SUPPORTED_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Create a shared provider from configuration
pub fn create_provider(config: &LlmConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        other => Err(InsightsError::config(format!(
            "Unknown LLM provider: {}. Supported: {}",
            other,
            SUPPORTED_PROVIDERS.join(", ")
        ))),
    }
}

/// Append schema instructions to a prompt for providers without a system role
pub(crate) fn schema_prompt(prompt: &str, schema: &Value) -> String {
    if schema.is_null() {
        return prompt.to_string();
    }

    let schema_str = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "{}\n\n---\n\nRespond with valid JSON matching this schema:\n```json\n{}\n```\n\nRespond ONLY with valid JSON, no explanation.",
        prompt, schema_str
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_token_usage_accumulates() {
        let mut usage = TokenUsage::new(100, 50);
        usage += TokenUsage::new(10, 5);
        assert_eq!(usage.total(), 165);
    }

    #[test]
    fn test_unknown_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..LlmConfig::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("openai, ollama"));
    }

    #[test]
    fn test_schema_prompt() {
        assert_eq!(schema_prompt("Summarize", &Value::Null), "Summarize");

        let schema = json!({"type": "object"});
        let prompt = schema_prompt("Summarize", &schema);
        assert!(prompt.starts_with("Summarize"));
        assert!(prompt.contains("\"type\": \"object\""));
    }
}
