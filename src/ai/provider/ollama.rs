//! Ollama Local LLM Provider
//!
//! Runs the pipeline against a locally-running Ollama model, for boards whose
//! content should not leave the machine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{LlmProvider, LlmResponse, TokenUsage, schema_prompt};
use crate::ai::response::extract_json;
use crate::config::LlmConfig;
use crate::constants::llm;
use crate::types::{ErrorCategory, InsightsError, LlmError, Result};

const PROVIDER: &str = "ollama";

/// Ollama Local LLM Provider
#[derive(Debug)]
pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| llm::OLLAMA_API_BASE.to_string());
        let api_base = Self::validate_endpoint(&api_base)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InsightsError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            model: config.model.clone(),
            temperature: config.temperature,
            client,
        })
    }

    /// Only http/https endpoints; non-local hosts are allowed but logged
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            InsightsError::config(format!("Invalid Ollama endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(InsightsError::config(format!(
                "Ollama endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "[::1]")
        {
            warn!(host, "Ollama endpoint is not local, board content will leave this machine");
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    fn build_request(&self, prompt: &str, schema: &Value) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            prompt: schema_prompt(prompt, schema),
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
            format: "json".to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        info!(
            model = %self.model,
            temperature = self.temperature,
            "Generating with Ollama"
        );

        let start_time = Instant::now();
        let request = self.build_request(prompt, schema);
        let url = format!("{}/api/generate", self.api_base);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_connect() {
                    format!(
                        "Failed to connect to Ollama at {}. Is Ollama running? Start with: ollama serve",
                        self.api_base
                    )
                } else {
                    format!("Ollama request failed: {}", e.without_url())
                };
                LlmError::new(ErrorCategory::Network, message).provider(PROVIDER)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.trim().chars().take(llm::ERROR_BODY_PREVIEW).collect();
            return Err(LlmError::from_status(
                status.as_u16(),
                format!("Ollama API error ({}): {}", status, preview),
                PROVIDER,
            )
            .into());
        }

        let response_body: OllamaResponse = response.json().await.map_err(|e| {
            LlmError::new(
                ErrorCategory::ParseError,
                format!("Failed to parse Ollama response: {}", e.without_url()),
            )
            .provider(PROVIDER)
        })?;

        let usage = TokenUsage::new(
            response_body.prompt_eval_count.unwrap_or(0),
            response_body.eval_count.unwrap_or(0),
        );

        debug!(tokens = usage.total(), "Received response from Ollama");
        let content = extract_json(&response_body.response)?;

        Ok(LlmResponse::with_metrics(
            content,
            usage,
            start_time.elapsed(),
            &self.model,
        ))
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.api_base);

        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let Ok(tags) = resp.json::<OllamaTagsResponse>().await else {
                    info!("Ollama is available");
                    return Ok(true);
                };
                let base_name = self.model.trim_end_matches(":latest");
                if tags.models.iter().any(|m| m.name == self.model || m.name.starts_with(base_name)) {
                    info!(model = %self.model, "Ollama is available");
                    Ok(true)
                } else {
                    warn!(
                        "Ollama is running but model '{}' not found. Pull with: ollama pull {}",
                        self.model, self.model
                    );
                    Ok(false)
                }
            }
            Ok(resp) => {
                warn!(status = resp.status().as_u16(), "Ollama API check failed");
                Ok(false)
            }
            Err(e) => {
                warn!("Ollama not available: {}. Start with: ollama serve", e.without_url());
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
    format: String,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}
