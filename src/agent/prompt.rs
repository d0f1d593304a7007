//! Stage Prompts
//!
//! Renders a stage's persona, task, input and tool results into one prompt,
//! and the JSON schema every agent decision must follow.

use serde_json::{Value, json};

use super::StageInput;
use crate::capability::CapabilitySet;
use crate::config::StageConfig;

/// One tool call and what it returned, replayed to the model on later steps
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub step: usize,
    pub tool: String,
    pub arguments: Value,
    pub observation: Value,
}

/// Build the prompt for one decision step
pub fn build_prompt(
    stage: &StageConfig,
    input: &StageInput,
    granted: &CapabilitySet,
    transcript: &[TranscriptEntry],
    steps_left: usize,
) -> String {
    let mut prompt = format!(
        r#"<ROLE>
You are the {}.
Goal: {}
{}
</ROLE>

<TASK>
{}
</TASK>

<EXPECTED_OUTPUT>
{}
</EXPECTED_OUTPUT>

## Board
Board id: {}

"#,
        stage.role,
        stage.goal,
        stage.backstory,
        stage.description,
        stage.expected_output,
        input.board_id
    );

    if let Some(previous) = &input.previous {
        prompt.push_str(&format!(
            "## Input from stage '{}'\n\n{}\n\n",
            previous.stage(),
            previous.output.raw()
        ));
    }

    prompt.push_str(&tools_section(granted));

    if !transcript.is_empty() {
        prompt.push_str("## Tool Results\n\n");
        for entry in transcript {
            let observation = serde_json::to_string_pretty(&entry.observation)
                .unwrap_or_else(|_| entry.observation.to_string());
            prompt.push_str(&format!(
                "### Step {}: {} {}\n```json\n{}\n```\n\n",
                entry.step, entry.tool, entry.arguments, observation
            ));
        }
    }

    prompt.push_str(&response_section(granted, steps_left));
    prompt
}

fn tools_section(granted: &CapabilitySet) -> String {
    if granted.is_empty() {
        return "<TOOLS>\nNo tools are available for this stage. Work only from the input above.\n</TOOLS>\n\n"
            .to_string();
    }

    let mut section = String::from("<TOOLS>\n");
    for capability in granted.iter() {
        section.push_str(&format!(
            "- {}: {}\n  arguments: {}\n",
            capability.tool_name(),
            capability.description(),
            capability.parameters()
        ));
    }
    section.push_str("</TOOLS>\n\n");
    section
}

fn response_section(granted: &CapabilitySet, steps_left: usize) -> String {
    let mut section = String::from("<RESPONSE_FORMAT>\nReply with exactly one JSON decision.\n");
    if !granted.is_empty() {
        section.push_str(
            "- To call a tool: {\"action\": \"use_tool\", \"tool\": \"<name>\", \"arguments\": {...}}\n",
        );
    }
    section.push_str(
        "- To finish: {\"action\": \"final_answer\", \"output\": <the expected output, as markdown text or JSON>}\n",
    );
    section.push_str(&format!("Decisions left: {}\n", steps_left));
    if steps_left == 1 {
        section.push_str("This is your last decision. Give your final answer now.\n");
    }
    section.push_str("</RESPONSE_FORMAT>\n\n");

    if !granted.is_empty() {
        section.push_str(
            r#"<FOCUS>
- A tool result with "status": "error" is NOT data. Never invent cards, dates or comments to fill the gap.
- If data could not be fetched, say so explicitly in your answer.
- Do NOT call the same tool with the same arguments twice.
</FOCUS>
"#,
        );
    }

    section.trim_end().to_string()
}

/// JSON schema for a decision, restricted to the granted tools
pub fn decision_schema(granted: &CapabilitySet) -> Value {
    if granted.is_empty() {
        return json!({
            "type": "object",
            "required": ["action", "output"],
            "properties": {
                "action": {"type": "string", "enum": ["final_answer"]},
                "output": {"description": "Stage result as markdown text or a JSON value"}
            }
        });
    }

    let tools: Vec<&str> = granted.iter().map(|c| c.tool_name()).collect();
    json!({
        "type": "object",
        "required": ["action"],
        "properties": {
            "action": {"type": "string", "enum": ["use_tool", "final_answer"]},
            "tool": {"type": "string", "enum": tools},
            "arguments": {"type": "object"},
            "output": {"description": "Stage result as markdown text or a JSON value"}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ToolInvocation;
    use crate::config::StageCatalog;
    use crate::types::{StageKind, StageOutput, StageResult};

    fn input_with_previous() -> StageInput {
        StageInput {
            board_id: "board-1".to_string(),
            previous: Some(StageResult::new(
                StageKind::DataCollection,
                "data_collection_agent",
                CapabilitySet::fetch_all(),
                Vec::<ToolInvocation>::new(),
                StageOutput::Text("3 cards, 1 overdue".to_string()),
            )),
        }
    }

    #[test]
    fn test_prompt_contains_stage_and_input() {
        let catalog = StageCatalog::builtin().unwrap();
        let stage = catalog.get(StageKind::DataAnalysis);
        let prompt = build_prompt(stage, &input_with_previous(), &CapabilitySet::none(), &[], 8);

        assert!(prompt.contains("<ROLE>"));
        assert!(prompt.contains(&stage.description));
        assert!(prompt.contains(&stage.expected_output));
        assert!(prompt.contains("Input from stage 'data_collection'"));
        assert!(prompt.contains("3 cards, 1 overdue"));
        assert!(prompt.contains("No tools are available"));
        assert!(!prompt.contains("use_tool"));
    }

    #[test]
    fn test_prompt_lists_tools_and_results() {
        let catalog = StageCatalog::builtin().unwrap();
        let stage = catalog.get(StageKind::DataCollection);
        let input = StageInput {
            board_id: "board-1".to_string(),
            previous: None,
        };
        let transcript = vec![TranscriptEntry {
            step: 1,
            tool: "board_fetch".to_string(),
            arguments: json!({}),
            observation: json!({"status": "error", "http_status": 503}),
        }];
        let prompt = build_prompt(stage, &input, &CapabilitySet::fetch_all(), &transcript, 1);

        assert!(prompt.contains("- board_fetch:"));
        assert!(prompt.contains("- card_fetch:"));
        assert!(prompt.contains("### Step 1: board_fetch"));
        assert!(prompt.contains("\"http_status\": 503"));
        assert!(prompt.contains("last decision"));
    }

    #[test]
    fn test_schema_restricts_tools() {
        let schema = decision_schema(&CapabilitySet::none());
        assert_eq!(schema["properties"]["action"]["enum"], json!(["final_answer"]));
        assert!(schema["properties"].get("tool").is_none());

        let schema = decision_schema(&CapabilitySet::fetch_all());
        assert_eq!(
            schema["properties"]["tool"]["enum"],
            json!(["board_fetch", "card_fetch"])
        );
    }
}
