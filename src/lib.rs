//! board-insights - AI-Driven Sprint Reports from Trello Boards
//!
//! Turns the cards of a Trello board into a sprint report through a
//! three-stage agent pipeline: data collection, analysis, report generation.
//!
//! ## Core Features
//!
//! - **Staged Pipeline**: stages run strictly in order, each fed the previous result
//! - **Capability Isolation**: only the collection stage can reach Trello
//! - **Typed Failures**: a failed fetch is an error, never data
//! - **Configurable Personas**: agent and task definitions loaded from YAML
//!
//! ## Quick Start
//!
//! ```ignore
//! use board_insights::{ConfigLoader, ReportGenerator};
//!
//! let config = ConfigLoader::load()?;
//! let generator = ReportGenerator::from_config(&config)?;
//! let report = generator.generate_report(&api_key, &api_token, &board_id).await?;
//! ```
//!
//! ## Modules
//!
//! - [`trello`]: paginated board and card fetchers
//! - [`capability`]: tool grants and the per-stage tool belt
//! - [`agent`]: LLM-driven stage agents and their prompts
//! - [`ai`]: LLM provider abstraction, JSON extraction, timeouts
//! - [`pipeline`]: stage orchestration and the report entry point
//! - [`config`]: settings and stage definitions

pub mod agent;
pub mod ai;
pub mod capability;
pub mod cli;
pub mod config;
pub mod constants;
pub mod pipeline;
pub mod trello;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, StageCatalog, StageConfig};

// Error Types
pub use types::error::{ErrorCategory, ErrorKind, InsightsError, Result};

// Domain
pub use types::{BoardSnapshot, Card, Credentials, StageKind, StageOutput, StageResult};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{Pipeline, PipelineRun, PipelineState, Report, ReportGenerator};

pub use agent::{Agent, LlmAgent, SharedAgent, StageInput};
pub use capability::{BoardSource, Capability, CapabilitySet, ToolBelt};
pub use trello::TrelloClient;

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{LlmProvider, LlmResponse, SharedProvider, create_provider, with_timeout};
