//! Report Pipeline
//!
//! Runs the three stages strictly in order:
//!
//! ```text
//! Idle → Collecting → Analyzing → Reporting → Done
//!   └────────┴───────────┴────────────┴──→ Failed
//! ```
//!
//! The collection stage is the only one granted fetch capabilities. Each stage
//! receives the previous stage's result, is bounded by a timeout and can be
//! cancelled. The first unrecovered error ends the run in `Failed` with a
//! single [`InsightsError::StageFailed`]; no partial report is produced.

mod generator;

pub use generator::ReportGenerator;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use crate::agent::{SharedAgent, StageInput};
use crate::ai::with_timeout;
use crate::capability::{CapabilitySet, SharedBoardSource, ToolBelt};
use crate::config::{PipelineConfig, StageCatalog};
use crate::types::{
    Credentials, InsightsError, Result, StageBinding, StageKind, StageResult,
};

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Collecting,
    Analyzing,
    Reporting,
    Done,
    Failed,
}

impl PipelineState {
    /// State while `stage` is executing
    pub fn for_stage(stage: StageKind) -> Self {
        match stage {
            StageKind::DataCollection => Self::Collecting,
            StageKind::DataAnalysis => Self::Analyzing,
            StageKind::ReportGeneration => Self::Reporting,
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Collecting => write!(f, "collecting"),
            Self::Analyzing => write!(f, "analyzing"),
            Self::Reporting => write!(f, "reporting"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Final output of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub run_id: Uuid,
    pub board_id: String,
    /// Raw output of the report generation stage
    pub text: String,
    /// Stage/agent/capability chain, in execution order
    pub stages: Vec<StageBinding>,
    pub duration_ms: u64,
}

/// Capabilities granted to a stage. Only collection may reach Trello.
pub fn stage_capabilities(stage: StageKind) -> CapabilitySet {
    match stage {
        StageKind::DataCollection => CapabilitySet::fetch_all(),
        StageKind::DataAnalysis | StageKind::ReportGeneration => CapabilitySet::none(),
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Stage wiring shared by every run. Immutable once built.
pub struct Pipeline {
    catalog: Arc<StageCatalog>,
    source: SharedBoardSource,
    collector: SharedAgent,
    analyst: SharedAgent,
    stage_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        catalog: StageCatalog,
        source: SharedBoardSource,
        collector: SharedAgent,
        analyst: SharedAgent,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            source,
            collector,
            analyst,
            stage_timeout: Duration::from_secs(config.stage_timeout_secs),
        }
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    /// Agent and capabilities bound to a stage
    fn binding(&self, stage: StageKind) -> (&SharedAgent, CapabilitySet) {
        let agent = match stage {
            StageKind::DataCollection => &self.collector,
            StageKind::DataAnalysis | StageKind::ReportGeneration => &self.analyst,
        };
        (agent, stage_capabilities(stage))
    }

    /// Create a new run in the `Idle` state
    pub fn start(&self, credentials: Credentials) -> PipelineRun<'_> {
        PipelineRun {
            pipeline: self,
            run_id: Uuid::new_v4(),
            credentials,
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
        }
    }

    /// Run all stages to completion
    pub async fn generate_report(&self, credentials: Credentials) -> Result<Report> {
        self.start(credentials)
            .execute(&CancellationToken::new())
            .await
    }
}

// =============================================================================
// Run
// =============================================================================

/// One report run. Owns its own state; runs never share stage results.
pub struct PipelineRun<'a> {
    pipeline: &'a Pipeline,
    run_id: Uuid,
    credentials: Credentials,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl PipelineRun<'_> {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state the run has been in, starting with `Idle`
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Execute the stages in order. A run can be executed once.
    pub async fn execute(&mut self, cancel: &CancellationToken) -> Result<Report> {
        if self.state != PipelineState::Idle {
            return Err(InsightsError::stage(
                "pipeline",
                format!("run {} was already executed (state: {})", self.run_id, self.state),
            ));
        }

        let span = info_span!(
            "pipeline_run",
            run_id = %self.run_id,
            board_id = %self.credentials.board_id()
        );
        self.run_stages(cancel).instrument(span).await
    }

    async fn run_stages(&mut self, cancel: &CancellationToken) -> Result<Report> {
        let started = Instant::now();
        let mut previous: Option<StageResult> = None;
        let mut stages = Vec::with_capacity(StageKind::ALL.len());

        info!("Pipeline started");

        for kind in StageKind::ALL {
            if cancel.is_cancelled() {
                return Err(self.fail(
                    kind,
                    InsightsError::Cancelled {
                        stage: kind.to_string(),
                    },
                ));
            }

            self.transition(PipelineState::for_stage(kind));
            match self.run_stage(kind, previous.take(), cancel).await {
                Ok(result) => {
                    stages.push(result.provenance.binding());
                    previous = Some(result);
                }
                Err(e) => return Err(self.fail(kind, e)),
            }
        }

        let Some(last) = previous else {
            return Err(self.fail(
                StageKind::ReportGeneration,
                InsightsError::stage(StageKind::ReportGeneration.as_str(), "no result"),
            ));
        };

        self.transition(PipelineState::Done);
        let duration_ms = started.elapsed().as_millis() as u64;
        info!(duration_ms, "Pipeline finished");

        Ok(Report {
            run_id: self.run_id,
            board_id: self.credentials.board_id().to_string(),
            text: last.output.raw(),
            stages,
            duration_ms,
        })
    }

    async fn run_stage(
        &self,
        kind: StageKind,
        previous: Option<StageResult>,
        cancel: &CancellationToken,
    ) -> Result<StageResult> {
        let pipeline = self.pipeline;
        let stage = pipeline.catalog.get(kind);
        let (agent, granted) = pipeline.binding(kind);
        let board_id = self.credentials.board_id();

        // A belt without grants drops the source entirely
        let mut tools =
            ToolBelt::new(pipeline.source.clone(), self.credentials.clone(), granted.clone());
        let input = match previous {
            Some(result) => StageInput::after(board_id, result),
            None => StageInput::initial(board_id),
        };

        debug!(
            stage = kind.as_str(),
            agent = %stage.agent,
            executor = agent.name(),
            capabilities = %granted,
            "Stage starting"
        );

        let started = Instant::now();
        let operation = format!("stage '{}'", kind);
        let execution = with_timeout(
            pipeline.stage_timeout,
            agent.execute(stage, input, &mut tools),
            &operation,
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(InsightsError::Cancelled { stage: kind.to_string() });
            }
            result = execution => result?,
        };

        validate_result(kind, &granted, &result)?;

        info!(
            stage = kind.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            tool_calls = result.provenance.tool_calls.len(),
            "Stage complete"
        );
        Ok(result)
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
        self.history.push(next);
    }

    fn fail(&mut self, stage: StageKind, source: InsightsError) -> InsightsError {
        self.transition(PipelineState::Failed);
        error!(stage = stage.as_str(), kind = %source.kind(), "Pipeline failed: {}", source);
        InsightsError::StageFailed {
            stage: stage.to_string(),
            source: Box::new(source),
        }
    }
}

/// A stage result must belong to the requested stage, report the
/// capabilities it was actually given, and carry output
fn validate_result(kind: StageKind, granted: &CapabilitySet, result: &StageResult) -> Result<()> {
    if result.stage() != kind {
        return Err(InsightsError::stage(
            kind.as_str(),
            format!("agent returned a result for stage '{}'", result.stage()),
        ));
    }
    if &result.provenance.capabilities != granted {
        return Err(InsightsError::stage(
            kind.as_str(),
            format!(
                "result claims capabilities [{}] but stage was granted [{}]",
                result.provenance.capabilities, granted
            ),
        ));
    }
    if result.output.is_empty() {
        return Err(InsightsError::stage(kind.as_str(), "empty output"));
    }
    Ok(())
}
