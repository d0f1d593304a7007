//! Configuration Types
//!
//! All configuration structures with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{network, pipeline, retry, trello};
use crate::types::{InsightsError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Trello API access
    pub trello: TrelloConfig,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Pipeline execution limits
    pub pipeline: PipelineConfig,

    /// Stage definition sources
    pub stages: StageSourceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            trello: TrelloConfig::default(),
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
            stages: StageSourceConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        if url::Url::parse(&self.trello.base_url).is_err() {
            return Err(InsightsError::config(format!(
                "trello.base_url is not a valid URL: {}",
                self.trello.base_url
            )));
        }

        if self.trello.timeout_secs == 0 {
            return Err(InsightsError::config(
                "trello.timeout_secs must be greater than 0",
            ));
        }

        if self.trello.page_size == 0 || self.trello.page_size > trello::MAX_PAGE_SIZE {
            return Err(InsightsError::config(format!(
                "trello.page_size must be between 1 and {}, got {}",
                trello::MAX_PAGE_SIZE,
                self.trello.page_size
            )));
        }

        if self.trello.max_pages == 0 {
            return Err(InsightsError::config(
                "trello.max_pages must be greater than 0",
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(InsightsError::config(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(InsightsError::config(
                "llm.timeout_secs must be greater than 0",
            ));
        }

        if self.pipeline.stage_timeout_secs == 0 {
            return Err(InsightsError::config(
                "pipeline.stage_timeout_secs must be greater than 0",
            ));
        }

        if self.pipeline.max_agent_steps == 0 {
            return Err(InsightsError::config(
                "pipeline.max_agent_steps must be greater than 0",
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Trello Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrelloConfig {
    /// API host, without the `/1` version prefix
    pub base_url: String,

    /// Total request timeout in seconds
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Retries after the first attempt for retryable failures
    pub max_retries: usize,

    /// First backoff delay in milliseconds
    pub retry_base_delay_ms: u64,

    /// Backoff ceiling in seconds
    pub retry_max_delay_secs: u64,

    /// Cards requested per page
    pub page_size: usize,

    /// Card pages followed before giving up on a board
    pub max_pages: usize,
}

impl Default for TrelloConfig {
    fn default() -> Self {
        Self {
            base_url: trello::DEFAULT_BASE_URL.to_string(),
            timeout_secs: network::FETCH_TIMEOUT_SECS,
            connect_timeout_secs: network::CONNECTION_TIMEOUT_SECS,
            max_retries: retry::DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: retry::BASE_DELAY_MS,
            retry_max_delay_secs: retry::MAX_DELAY_SECS,
            page_size: trello::MAX_PAGE_SIZE,
            max_pages: trello::MAX_PAGES,
        }
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,

    /// Custom endpoint for OpenAI-compatible servers
    pub api_base: Option<String>,

    /// Never serialized; falls back to OPENAI_API_KEY
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for LLM generation (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// Maximum tokens to generate per call
    pub max_tokens: usize,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            api_key: None,
            timeout_secs: network::LLM_TIMEOUT_SECS,
            temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on one stage in seconds
    pub stage_timeout_secs: u64,

    /// Decision steps an agent may take within one stage
    pub max_agent_steps: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: pipeline::STAGE_TIMEOUT_SECS,
            max_agent_steps: pipeline::MAX_AGENT_STEPS,
        }
    }
}

// =============================================================================
// Stage Sources
// =============================================================================

/// Optional overrides for the built-in agent and task definitions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSourceConfig {
    pub agents_file: Option<PathBuf>,
    pub tasks_file: Option<PathBuf>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.trello.base_url, "https://api.trello.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_oversized_page() {
        let mut config = Config::default();
        config.trello.page_size = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_page_limit() {
        let mut config = Config::default();
        config.trello.max_pages = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("trello.max_pages"));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut config = Config::default();
        config.trello.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_llm_debug_redacts_key() {
        let llm = LlmConfig {
            api_key: Some("sk-live-123".to_string()),
            ..LlmConfig::default()
        };
        assert!(!format!("{:?}", llm).contains("sk-live-123"));
    }
}
