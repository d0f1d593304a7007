//! Stages Command
//!
//! Validates the agent and task definitions and prints the resulting catalog.

use std::path::PathBuf;

use crate::cli::ui::Output;
use crate::config::{StageCatalog, StageSourceConfig};
use crate::pipeline::stage_capabilities;
use crate::types::Result;

pub fn run(agents_file: Option<PathBuf>, tasks_file: Option<PathBuf>) -> Result<()> {
    let catalog = StageCatalog::from_sources(&StageSourceConfig {
        agents_file,
        tasks_file,
    })?;
    let out = Output::new();

    for stage in catalog.iter() {
        out.section(&format!("{}. {}", stage.stage.ordinal(), stage.stage));
        out.field("Agent", &stage.agent);
        out.field("Role", &stage.role);
        out.field("Tools", stage_capabilities(stage.stage));
        out.field("Task", first_line(&stage.description));
        out.field("Expected", first_line(&stage.expected_output));
    }

    out.success("Stage definitions are valid");
    Ok(())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}
