//! Stage Catalog
//!
//! Agent personas (`agents.yaml`) and stage tasks (`tasks.yaml`) merged into
//! one immutable [`StageConfig`] per pipeline stage.
//!
//! Both documents are parsed strictly: unknown keys, unknown stage names,
//! blank fields, missing stages and references to undefined agents are all
//! rejected at load time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use super::types::StageSourceConfig;
use crate::types::{InsightsError, Result, StageKind};

const BUILTIN_AGENTS: &str = include_str!("../../config/agents.yaml");
const BUILTIN_TASKS: &str = include_str!("../../config/tasks.yaml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgentDefinition {
    role: String,
    goal: String,
    backstory: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskDefinition {
    description: String,
    expected_output: String,
    agent: String,
}

/// Instructions for one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageConfig {
    pub stage: StageKind,
    /// Persona name from `agents.yaml`
    pub agent: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub description: String,
    pub expected_output: String,
}

/// Validated stage configs, one per [`StageKind`], in pipeline order
#[derive(Debug, Clone)]
pub struct StageCatalog {
    stages: Vec<StageConfig>,
}

impl StageCatalog {
    /// Definitions embedded in the binary
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_AGENTS, BUILTIN_TASKS)
    }

    /// Built-in definitions, with either document replaced by a file
    pub fn from_sources(sources: &StageSourceConfig) -> Result<Self> {
        let agents = match &sources.agents_file {
            Some(path) => read_definition(path)?,
            None => BUILTIN_AGENTS.to_string(),
        };
        let tasks = match &sources.tasks_file {
            Some(path) => read_definition(path)?,
            None => BUILTIN_TASKS.to_string(),
        };
        Self::from_yaml(&agents, &tasks)
    }

    pub fn from_yaml(agents_yaml: &str, tasks_yaml: &str) -> Result<Self> {
        let agents: BTreeMap<String, AgentDefinition> = serde_yaml::from_str(agents_yaml)
            .map_err(|e| InsightsError::config(format!("Invalid agent definitions: {}", e)))?;
        let mut tasks: BTreeMap<String, TaskDefinition> = serde_yaml::from_str(tasks_yaml)
            .map_err(|e| InsightsError::config(format!("Invalid task definitions: {}", e)))?;

        if let Some(unknown) = tasks.keys().find(|name| StageKind::from_name(name).is_none()) {
            return Err(InsightsError::config(format!(
                "Unknown stage '{}' in task definitions (expected: {})",
                unknown,
                stage_names()
            )));
        }

        let mut stages = Vec::with_capacity(StageKind::ALL.len());
        for kind in StageKind::ALL {
            let task = tasks.remove(kind.as_str()).ok_or_else(|| {
                InsightsError::config(format!("Missing task definition for stage '{}'", kind))
            })?;
            let agent = agents.get(&task.agent).ok_or_else(|| {
                InsightsError::config(format!(
                    "Stage '{}' references undefined agent '{}'",
                    kind, task.agent
                ))
            })?;

            stages.push(StageConfig {
                stage: kind,
                agent: task.agent.clone(),
                role: required(kind, "role", &agent.role)?,
                goal: required(kind, "goal", &agent.goal)?,
                backstory: required(kind, "backstory", &agent.backstory)?,
                description: required(kind, "description", &task.description)?,
                expected_output: required(kind, "expected_output", &task.expected_output)?,
            });
        }

        debug!(stages = stages.len(), agents = agents.len(), "Stage catalog loaded");
        Ok(Self { stages })
    }

    pub fn get(&self, kind: StageKind) -> &StageConfig {
        // Construction guarantees one entry per kind in pipeline order
        &self.stages[usize::from(kind.ordinal() - 1)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageConfig> {
        self.stages.iter()
    }
}

fn read_definition(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        InsightsError::config(format!(
            "Cannot read stage definitions {}: {}",
            path.display(),
            e
        ))
    })
}

fn required(stage: StageKind, field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InsightsError::config(format!(
            "Stage '{}' has an empty '{}'",
            stage, field
        )));
    }
    Ok(trimmed.to_string())
}

fn stage_names() -> String {
    StageKind::ALL
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    const AGENTS: &str = r#"
collector:
  role: Collector
  goal: Collect
  backstory: Careful
analyst:
  role: Analyst
  goal: Analyze
  backstory: Experienced
"#;

    fn tasks_with(extra: &str) -> String {
        format!(
            r#"
data_collection:
  description: Fetch the board
  expected_output: Card list
  agent: collector
data_analysis:
  description: Analyze
  expected_output: Findings
  agent: analyst
report_generation:
  description: Report
  expected_output: Markdown report
  agent: analyst
{}"#,
            extra
        )
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = StageCatalog::builtin().unwrap();
        let kinds: Vec<StageKind> = catalog.iter().map(|s| s.stage).collect();
        assert_eq!(kinds, StageKind::ALL.to_vec());
        assert_eq!(
            catalog.get(StageKind::DataCollection).agent,
            "data_collection_agent"
        );
        assert_eq!(catalog.get(StageKind::ReportGeneration).agent, "analysis_agent");
    }

    #[test]
    fn test_fields_are_trimmed() {
        let catalog = StageCatalog::builtin().unwrap();
        let stage = catalog.get(StageKind::DataAnalysis);
        assert!(!stage.role.ends_with('\n'));
        assert!(!stage.expected_output.is_empty());
    }

    #[test]
    fn test_rejects_unknown_field() {
        let tasks = tasks_with("").replace("agent: collector", "agent: collector\n  tools: [x]");
        let err = StageCatalog::from_yaml(AGENTS, &tasks).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_rejects_unknown_stage() {
        let tasks = tasks_with("deployment:\n  description: d\n  expected_output: e\n  agent: analyst\n");
        let err = StageCatalog::from_yaml(AGENTS, &tasks).unwrap_err();
        assert!(err.to_string().contains("deployment"));
    }

    #[test]
    fn test_rejects_missing_stage() {
        let tasks = r#"
data_collection:
  description: Fetch
  expected_output: Cards
  agent: collector
"#;
        let err = StageCatalog::from_yaml(AGENTS, tasks).unwrap_err();
        assert!(err.to_string().contains("data_analysis"));
    }

    #[test]
    fn test_rejects_undefined_agent() {
        let tasks = tasks_with("").replace("agent: collector", "agent: ghost");
        let err = StageCatalog::from_yaml(AGENTS, &tasks).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_rejects_blank_field() {
        let agents = AGENTS.replace("goal: Analyze", "goal: \"  \"");
        let err = StageCatalog::from_yaml(&agents, &tasks_with("")).unwrap_err();
        assert!(err.to_string().contains("goal"));
    }

    #[test]
    fn test_from_sources_reads_override_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let tasks_path = dir.path().join("tasks.yaml");
        fs::write(&tasks_path, tasks_with("")).unwrap();
        let agents_path = dir.path().join("agents.yaml");
        fs::write(&agents_path, AGENTS).unwrap();

        let catalog = StageCatalog::from_sources(&StageSourceConfig {
            agents_file: Some(agents_path),
            tasks_file: Some(tasks_path),
        })
        .unwrap();
        assert_eq!(catalog.get(StageKind::DataCollection).agent, "collector");
    }

    #[test]
    fn test_from_sources_missing_file() {
        let err = StageCatalog::from_sources(&StageSourceConfig {
            agents_file: Some("/nonexistent/agents.yaml".into()),
            tasks_file: None,
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
