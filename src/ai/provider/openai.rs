//! OpenAI API Provider
//!
//! LLM provider using the Chat Completions API of OpenAI or any compatible
//! server (`llm.api_base`). Rate limits and server errors are retried with
//! backoff; everything else is surfaced as a categorized [`LlmError`].

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{LlmProvider, LlmResponse, TokenUsage};
use crate::ai::response::extract_json;
use crate::config::LlmConfig;
use crate::constants::{llm, retry};
use crate::types::{ErrorCategory, InsightsError, LlmError, Result};

const PROVIDER: &str = "openai";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    /// Never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
    backoff: ExponentialBuilder,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                InsightsError::config(
                    "OpenAI API key not found. Set OPENAI_API_KEY or llm.api_key",
                )
            })?;

        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| llm::OPENAI_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InsightsError::config(format!("Failed to create HTTP client: {}", e)))?;

        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(retry::BASE_DELAY_MS))
            .with_max_delay(Duration::from_secs(retry::MAX_DELAY_SECS))
            .with_max_times(llm::MAX_RETRIES)
            .with_jitter();

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
            backoff,
        })
    }

    fn build_request(&self, prompt: &str, schema: &Value) -> ChatCompletionRequest {
        let system_content = if schema.is_null() {
            "You are a project management assistant. Always respond with valid JSON.".to_string()
        } else {
            let schema_str =
                serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
            format!(
                "You are a project management assistant. Always respond with valid JSON matching this schema:\n\n```json\n{}\n```\n\nRespond ONLY with valid JSON, no explanation.",
                schema_str
            )
        };

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_content,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            response_format: Some(ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }

    async fn send(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.without_url().to_string()
                };
                LlmError::new(
                    ErrorCategory::Network,
                    format!("OpenAI request failed: {}", reason),
                )
                .provider(PROVIDER)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.trim().chars().take(llm::ERROR_BODY_PREVIEW).collect();
            return Err(LlmError::from_status(
                status.as_u16(),
                format!("OpenAI API error ({}): {}", status, preview),
                PROVIDER,
            )
            .into());
        }

        response.json::<ChatCompletionResponse>().await.map_err(|e| {
            LlmError::new(
                ErrorCategory::ParseError,
                format!("Failed to parse OpenAI response: {}", e.without_url()),
            )
            .provider(PROVIDER)
            .into()
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        info!(
            model = %self.model,
            temperature = self.temperature,
            "Generating with OpenAI"
        );

        let start_time = Instant::now();
        let request = self.build_request(prompt, schema);

        let response_body = (|| self.send(&request))
            .retry(self.backoff)
            .when(|e: &InsightsError| e.is_retryable())
            .notify(|e: &InsightsError, delay: Duration| {
                warn!(
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "OpenAI request failed, retrying"
                );
            })
            .await?;

        let usage = response_body
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let content_str = response_body
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| {
                LlmError::new(ErrorCategory::ParseError, "No content in OpenAI response")
                    .provider(PROVIDER)
            })?;

        debug!(tokens = usage.total(), "Received response from OpenAI");
        let content = extract_json(content_str)?;

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
        let url = format!("{}/models", self.api_base);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI API is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!(status = resp.status().as_u16(), "OpenAI API check failed");
                Ok(false)
            }
            Err(e) => {
                warn!("OpenAI API check failed: {}", e.without_url());
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}
