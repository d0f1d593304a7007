//! LLM Response Parsing
//!
//! Models wrap JSON in code fences, add a sentence before it, or leave a
//! trailing comma. [`extract_json`] tolerates all of that and fails with a
//! `ParseError` category when nothing usable remains.

use serde_json::Value;
use tracing::debug;

use crate::types::{ErrorCategory, LlmError, Result};

const PREVIEW_CHARS: usize = 200;

/// Extract and parse JSON from an LLM reply
pub fn extract_json(raw: &str) -> Result<Value> {
    let cleaned = preprocess(raw);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    let repaired = balance_brackets(&strip_trailing_commas(&cleaned));
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        debug!("JSON repaired");
        return Ok(value);
    }

    if let Some(embedded) = first_json_block(&cleaned) {
        let embedded = strip_trailing_commas(embedded);
        if let Ok(value) = serde_json::from_str::<Value>(&embedded) {
            debug!("JSON extracted from mixed content");
            return Ok(value);
        }
    }

    Err(LlmError::new(
        ErrorCategory::ParseError,
        format!(
            "Response is not valid JSON: {}",
            cleaned.chars().take(PREVIEW_CHARS).collect::<String>()
        ),
    )
    .into())
}

fn preprocess(raw: &str) -> String {
    let mut s = raw.trim().trim_start_matches('\u{feff}');

    if s.starts_with("```")
        && let Some(first_newline) = s.find('\n')
    {
        s = &s[first_newline + 1..];
    }
    if let Some(stripped) = s.trim_end().strip_suffix("```") {
        s = stripped;
    }

    s.trim().to_string()
}

/// Drop commas directly before `]` or `}` outside strings
fn strip_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escape {
            escape = false;
            out.push(ch);
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if matches!(next, Some(']') | Some('}')) {
                    continue;
                }
            }
            _ => {}
        }
        out.push(ch);
    }

    out
}

/// Close an unterminated string and any open brackets, innermost first
fn balance_brackets(s: &str) -> String {
    let mut open: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for ch in s.chars() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => open.push('}'),
            '[' if !in_string => open.push(']'),
            '}' | ']' if !in_string => {
                open.pop();
            }
            _ => {}
        }
    }

    let mut out = s.to_string();
    if in_string {
        out.push('"');
    }
    while let Some(closer) = open.pop() {
        out.push(closer);
    }
    out
}

/// First balanced `{...}` or `[...]` in mixed text
fn first_json_block(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (offset, ch) in s[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorKind, InsightsError};

    #[test]
    fn test_plain_json() {
        let value = extract_json(r#"{"action": "final_answer"}"#).unwrap();
        assert_eq!(value["action"], "final_answer");
    }

    #[test]
    fn test_code_fences() {
        let value = extract_json("```json\n{\"key\": \"value\"}\n```").unwrap();
        assert_eq!(value["key"], "value");
    }

    #[test]
    fn test_trailing_comma() {
        let value = extract_json(r#"{"cards": [{"id": "a"},], "note": "x, }"}"#).unwrap();
        assert!(value["cards"].is_array());
        assert_eq!(value["note"], "x, }");
    }

    #[test]
    fn test_truncated_object() {
        let value = extract_json(r#"{"findings": [{"card": "a"}"#).unwrap();
        assert_eq!(value["findings"][0]["card"], "a");
    }

    #[test]
    fn test_embedded_in_prose() {
        let input = "Here is my decision:\n{\"action\": \"use_tool\", \"tool\": \"board_fetch\"}\nThanks!";
        let value = extract_json(input).unwrap();
        assert_eq!(value["tool"], "board_fetch");
    }

    #[test]
    fn test_prose_only_is_parse_error() {
        let err = extract_json("I could not find anything.").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StageExecution);
        assert!(matches!(
            err,
            InsightsError::Llm(LlmError {
                category: ErrorCategory::ParseError,
                ..
            })
        ));
    }
}
