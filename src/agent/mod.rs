//! Stage Agents
//!
//! An [`Agent`] executes one stage: it reads the stage's instructions and the
//! previous stage's result, may call the tools it was granted, and returns a
//! [`StageResult`]. Agents hold no per-run state; everything a stage may see
//! arrives through its arguments.

mod llm;
pub mod prompt;

pub use llm::{AgentDecision, LlmAgent};

use std::sync::Arc;

use async_trait::async_trait;

use crate::capability::ToolBelt;
use crate::config::StageConfig;
use crate::types::{Result, StageOutput, StageResult};

/// Input handed to a stage
#[derive(Debug, Clone)]
pub struct StageInput {
    pub board_id: String,
    /// Result of the preceding stage, `None` for the first stage
    pub previous: Option<StageResult>,
}

impl StageInput {
    pub fn initial(board_id: impl Into<String>) -> Self {
        Self {
            board_id: board_id.into(),
            previous: None,
        }
    }

    pub fn after(board_id: impl Into<String>, previous: StageResult) -> Self {
        Self {
            board_id: board_id.into(),
            previous: Some(previous),
        }
    }

    pub fn previous_output(&self) -> Option<&StageOutput> {
        self.previous.as_ref().map(|p| &p.output)
    }
}

/// Executes a single pipeline stage
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent implementation name for logging
    fn name(&self) -> &str;

    async fn execute(
        &self,
        stage: &StageConfig,
        input: StageInput,
        tools: &mut ToolBelt,
    ) -> Result<StageResult>;
}

pub type SharedAgent = Arc<dyn Agent>;
