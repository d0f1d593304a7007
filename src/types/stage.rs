//! Stage Artifacts
//!
//! Typed outputs handed from one pipeline stage to the next, with provenance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::{CapabilitySet, ToolInvocation};

/// The three stages of a report run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    DataCollection,
    DataAnalysis,
    ReportGeneration,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [
        StageKind::DataCollection,
        StageKind::DataAnalysis,
        StageKind::ReportGeneration,
    ];

    /// Name used in stage configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataCollection => "data_collection",
            Self::DataAnalysis => "data_analysis",
            Self::ReportGeneration => "report_generation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// 1-based position in the pipeline
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::DataCollection => 1,
            Self::DataAnalysis => 2,
            Self::ReportGeneration => 3,
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload produced by a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StageOutput {
    Text(String),
    Structured(Value),
}

impl StageOutput {
    /// Build from an LLM answer: strings stay text, anything else is structured
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }

    /// Raw text form handed to the next stage or returned to the caller
    pub fn raw(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Structured(v) => serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Structured(Value::Null) => true,
            Self::Structured(Value::Object(map)) => map.is_empty(),
            Self::Structured(Value::Array(items)) => items.is_empty(),
            Self::Structured(_) => false,
        }
    }
}

/// Which stage produced a result, by which agent, with which capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub stage: StageKind,
    pub agent: String,
    pub capabilities: CapabilitySet,
    pub tool_calls: Vec<ToolInvocation>,
    pub completed_at: DateTime<Utc>,
}

/// Stage/agent/capability triple, comparable across runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageBinding {
    pub stage: StageKind,
    pub agent: String,
    pub capabilities: CapabilitySet,
}

impl Provenance {
    pub fn binding(&self) -> StageBinding {
        StageBinding {
            stage: self.stage,
            agent: self.agent.clone(),
            capabilities: self.capabilities.clone(),
        }
    }
}

/// Output of one stage. Moved into the next stage and consumed there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub provenance: Provenance,
    pub output: StageOutput,
}

impl StageResult {
    pub fn new(
        stage: StageKind,
        agent: impl Into<String>,
        capabilities: CapabilitySet,
        tool_calls: Vec<ToolInvocation>,
        output: StageOutput,
    ) -> Self {
        Self {
            provenance: Provenance {
                stage,
                agent: agent.into(),
                capabilities,
                tool_calls,
                completed_at: Utc::now(),
            },
            output,
        }
    }

    pub fn stage(&self) -> StageKind {
        self.provenance.stage
    }
}
