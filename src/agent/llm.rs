//! LLM-driven Agent
//!
//! Runs a bounded decision loop: each step the model either calls a granted
//! tool or gives its final answer. Tool results, including explicit failures,
//! are replayed to the model on the next step.
//!
//! Fatal fetch failures (bad credentials, missing board, malformed request)
//! end the stage with the fetch error. Other failures are left for the model
//! to work around.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::prompt::{TranscriptEntry, build_prompt, decision_schema};
use super::{Agent, StageInput};
use crate::ai::{SharedProvider, TokenUsage, with_timeout};
use crate::capability::{ToolBelt, ToolOutcome};
use crate::config::StageConfig;
use crate::types::{InsightsError, Result, StageOutput, StageResult};

/// One step's choice, as returned by the model
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentDecision {
    UseTool {
        tool: String,
        #[serde(default)]
        arguments: Value,
    },
    FinalAnswer {
        output: Value,
    },
}

impl AgentDecision {
    pub fn from_value(value: Value) -> std::result::Result<Self, String> {
        serde_json::from_value(value).map_err(|e| e.to_string())
    }
}

/// Agent backed by an [`LlmProvider`](crate::ai::LlmProvider)
pub struct LlmAgent {
    provider: SharedProvider,
    max_steps: usize,
    llm_timeout: Duration,
}

impl LlmAgent {
    pub fn new(provider: SharedProvider, max_steps: usize, llm_timeout: Duration) -> Self {
        Self {
            provider,
            max_steps: max_steps.max(1),
            llm_timeout,
        }
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        "llm"
    }

    async fn execute(
        &self,
        stage: &StageConfig,
        input: StageInput,
        tools: &mut ToolBelt,
    ) -> Result<StageResult> {
        let stage_name = stage.stage.as_str();
        let schema = decision_schema(tools.granted());
        let mut transcript: Vec<TranscriptEntry> = Vec::new();
        let mut usage = TokenUsage::default();

        debug!(
            stage = stage_name,
            agent = %stage.agent,
            provider = self.provider.name(),
            capabilities = %tools.granted(),
            "Agent starting"
        );

        for step in 1..=self.max_steps {
            let prompt = build_prompt(
                stage,
                &input,
                tools.granted(),
                &transcript,
                self.max_steps - step + 1,
            );

            let response = with_timeout(
                self.llm_timeout,
                self.provider.generate(&prompt, &schema),
                "LLM request",
            )
            .await?;
            usage += response.usage;

            let decision = AgentDecision::from_value(response.content).map_err(|e| {
                InsightsError::stage(stage_name, format!("malformed decision at step {}: {}", step, e))
            })?;

            match decision {
                AgentDecision::UseTool { tool, arguments } => {
                    debug!(stage = stage_name, step, tool = %tool, "Agent calling tool");
                    match tools.invoke(&tool, &arguments).await {
                        ToolOutcome::Failure(failure) if failure.is_fatal() => {
                            return Err(failure.into_error(stage_name));
                        }
                        outcome => transcript.push(TranscriptEntry {
                            step,
                            tool,
                            arguments,
                            observation: outcome.observation(),
                        }),
                    }
                }
                AgentDecision::FinalAnswer { output } => {
                    let output = StageOutput::from_value(output);
                    if output.is_empty() {
                        return Err(InsightsError::stage(stage_name, "final answer was empty"));
                    }

                    info!(
                        stage = stage_name,
                        steps = step,
                        tool_calls = transcript.len(),
                        tokens = usage.total(),
                        "Agent finished"
                    );
                    return Ok(StageResult::new(
                        stage.stage,
                        stage.agent.clone(),
                        tools.granted().clone(),
                        tools.take_invocations(),
                        output,
                    ));
                }
            }
        }

        Err(InsightsError::stage(
            stage_name,
            format!("no final answer after {} steps", self.max_steps),
        ))
    }
}
