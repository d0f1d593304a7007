//! Agent Capabilities
//!
//! Tools are granted per stage and bound at construction: a [`ToolBelt`]
//! built with an empty [`CapabilitySet`] holds no [`BoardSource`] at all, so
//! a capability-free stage cannot reach Trello no matter what it asks for.
//!
//! Tool calls never fail silently. Every call yields a [`ToolOutcome`] that is
//! either a payload or an explicit [`ToolFailure`], and every call is recorded
//! for the stage's provenance.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::types::{BoardSnapshot, Card, Credentials, ErrorCategory, InsightsError, Result};

// =============================================================================
// Capabilities
// =============================================================================

/// A single tool an agent may be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    BoardFetch,
    CardFetch,
}

impl Capability {
    pub const ALL: [Capability; 2] = [Capability::BoardFetch, Capability::CardFetch];

    /// Name the model uses to call the tool
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::BoardFetch => "board_fetch",
            Self::CardFetch => "card_fetch",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tool_name() == name.trim())
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::BoardFetch => {
                "Fetch every card on the board with list, due date, last activity, labels, attachments and comments"
            }
            Self::CardFetch => "Fetch one card by id with labels, attachments and comments",
        }
    }

    /// JSON Schema for the tool's arguments
    pub fn parameters(&self) -> Value {
        match self {
            Self::BoardFetch => json!({
                "type": "object",
                "properties": {}
            }),
            Self::CardFetch => json!({
                "type": "object",
                "properties": {
                    "card_id": {"type": "string", "description": "Trello card id"}
                },
                "required": ["card_id"]
            }),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// Ordered, duplicate-free set of capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Capability>", into = "Vec<Capability>")]
pub struct CapabilitySet(Vec<Capability>);

impl CapabilitySet {
    pub fn new(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        let mut items: Vec<Capability> = capabilities.into_iter().collect();
        items.sort();
        items.dedup();
        Self(items)
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Both fetch capabilities
    pub fn fetch_all() -> Self {
        Self::new(Capability::ALL)
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<Capability>> for CapabilitySet {
    fn from(items: Vec<Capability>) -> Self {
        Self::new(items)
    }
}

impl From<CapabilitySet> for Vec<Capability> {
    fn from(set: CapabilitySet) -> Self {
        set.0
    }
}

impl std::fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.0.iter().map(|c| c.tool_name()).collect();
        f.write_str(&names.join(", "))
    }
}

// =============================================================================
// Board Source
// =============================================================================

/// Read access to board data behind the fetch capabilities
#[async_trait]
pub trait BoardSource: Send + Sync {
    async fn fetch_board(&self, credentials: &Credentials) -> Result<BoardSnapshot>;

    async fn fetch_card(&self, card_id: &str, credentials: &Credentials) -> Result<Card>;
}

pub type SharedBoardSource = Arc<dyn BoardSource>;

// =============================================================================
// Tool Outcomes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolFailureKind {
    /// The stage was not granted this capability
    NotGranted,
    UnknownTool,
    InvalidArguments,
    /// The fetcher returned an error
    Fetch,
}

impl std::fmt::Display for ToolFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotGranted => write!(f, "not_granted"),
            Self::UnknownTool => write!(f, "unknown_tool"),
            Self::InvalidArguments => write!(f, "invalid_arguments"),
            Self::Fetch => write!(f, "fetch_failed"),
        }
    }
}

/// Explicit failure of a tool call
#[derive(Debug)]
pub struct ToolFailure {
    pub tool: String,
    pub kind: ToolFailureKind,
    pub message: String,
    /// Capability that was called, present for [`ToolFailureKind::Fetch`]
    pub capability: Option<Capability>,
    /// Underlying fetch error, present for [`ToolFailureKind::Fetch`]
    pub source: Option<InsightsError>,
}

impl ToolFailure {
    fn new(tool: &str, kind: ToolFailureKind, message: impl Into<String>) -> Self {
        Self {
            tool: tool.to_string(),
            kind,
            message: message.into(),
            capability: None,
            source: None,
        }
    }

    fn fetch(capability: Capability, error: InsightsError) -> Self {
        Self {
            tool: capability.tool_name().to_string(),
            kind: ToolFailureKind::Fetch,
            message: error.to_string(),
            capability: Some(capability),
            source: Some(error),
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        self.source.as_ref().and_then(|e| e.http_status())
    }

    /// A fetch failure that no amount of retrying or rephrasing can fix.
    /// A missing or malformed card id only loses that card, so it is not.
    pub fn is_fatal(&self) -> bool {
        let Some(error) = &self.source else {
            return false;
        };
        match (self.capability, error.category()) {
            (
                Some(Capability::CardFetch),
                Some(ErrorCategory::NotFound | ErrorCategory::BadRequest),
            ) => false,
            _ => error.is_fatal(),
        }
    }

    /// Error to surface when the failure ends the stage
    pub fn into_error(self, stage: &str) -> InsightsError {
        match self.source {
            Some(error) => error,
            None => InsightsError::stage(
                stage,
                format!("tool '{}' failed ({}): {}", self.tool, self.kind, self.message),
            ),
        }
    }
}

/// Result of a single tool call
#[derive(Debug)]
pub enum ToolOutcome {
    Success { capability: Capability, payload: Value },
    Failure(ToolFailure),
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// JSON shown to the model after the call
    pub fn observation(&self) -> Value {
        match self {
            Self::Success {
                capability,
                payload,
            } => json!({
                "tool": capability.tool_name(),
                "status": "ok",
                "result": payload,
            }),
            Self::Failure(failure) => json!({
                "tool": failure.tool,
                "status": "error",
                "error_kind": failure.kind.to_string(),
                "http_status": failure.http_status(),
                "message": failure.message,
            }),
        }
    }
}

/// Record of one tool call, kept in stage provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool: String,
    pub succeeded: bool,
}

// =============================================================================
// Tool Belt
// =============================================================================

/// Tools granted to one stage, bound to one run's credentials
pub struct ToolBelt {
    source: Option<SharedBoardSource>,
    credentials: Credentials,
    granted: CapabilitySet,
    invocations: Vec<ToolInvocation>,
}

impl std::fmt::Debug for ToolBelt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBelt")
            .field("granted", &self.granted)
            .field("board_id", &self.credentials.board_id())
            .field("invocations", &self.invocations.len())
            .finish()
    }
}

impl ToolBelt {
    pub fn new(source: SharedBoardSource, credentials: Credentials, granted: CapabilitySet) -> Self {
        let source = (!granted.is_empty()).then_some(source);
        Self {
            source,
            credentials,
            granted,
            invocations: Vec::new(),
        }
    }

    /// Tool belt with no capabilities and no data source
    pub fn none(credentials: Credentials) -> Self {
        Self {
            source: None,
            credentials,
            granted: CapabilitySet::none(),
            invocations: Vec::new(),
        }
    }

    pub fn granted(&self) -> &CapabilitySet {
        &self.granted
    }

    pub fn board_id(&self) -> &str {
        self.credentials.board_id()
    }

    pub fn invocations(&self) -> &[ToolInvocation] {
        &self.invocations
    }

    /// Drain the recorded calls
    pub fn take_invocations(&mut self) -> Vec<ToolInvocation> {
        std::mem::take(&mut self.invocations)
    }

    /// Call a tool by name
    pub async fn invoke(&mut self, tool: &str, arguments: &Value) -> ToolOutcome {
        let outcome = self.dispatch(tool, arguments).await;

        match &outcome {
            ToolOutcome::Success { capability, .. } => {
                debug!(tool = capability.tool_name(), "Tool call succeeded");
            }
            ToolOutcome::Failure(failure) => {
                warn!(
                    tool = %failure.tool,
                    kind = %failure.kind,
                    status = failure.http_status(),
                    "Tool call failed: {}",
                    failure.message
                );
            }
        }

        self.invocations.push(ToolInvocation {
            tool: tool.to_string(),
            succeeded: outcome.is_success(),
        });
        outcome
    }

    async fn dispatch(&self, tool: &str, arguments: &Value) -> ToolOutcome {
        let Some(capability) = Capability::from_tool_name(tool) else {
            return ToolOutcome::Failure(ToolFailure::new(
                tool,
                ToolFailureKind::UnknownTool,
                format!("no tool named '{}'", tool),
            ));
        };

        let source = match &self.source {
            Some(source) if self.granted.contains(capability) => source,
            _ => {
                return ToolOutcome::Failure(ToolFailure::new(
                    tool,
                    ToolFailureKind::NotGranted,
                    format!("capability '{}' is not granted to this stage", capability),
                ));
            }
        };

        if !(arguments.is_object() || arguments.is_null()) {
            return ToolOutcome::Failure(ToolFailure::new(
                tool,
                ToolFailureKind::InvalidArguments,
                "arguments must be a JSON object",
            ));
        }

        let fetched = match capability {
            Capability::BoardFetch => source
                .fetch_board(&self.credentials)
                .await
                .and_then(|snapshot| Ok(serde_json::to_value(snapshot)?)),
            Capability::CardFetch => {
                let card_id = arguments
                    .get("card_id")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|id| !id.is_empty());
                let Some(card_id) = card_id else {
                    return ToolOutcome::Failure(ToolFailure::new(
                        tool,
                        ToolFailureKind::InvalidArguments,
                        "'card_id' must be a non-empty string",
                    ));
                };
                source
                    .fetch_card(card_id, &self.credentials)
                    .await
                    .and_then(|card| Ok(serde_json::to_value(card)?))
            }
        };

        match fetched {
            Ok(payload) => ToolOutcome::Success {
                capability,
                payload,
            },
            Err(error) => ToolOutcome::Failure(ToolFailure::fetch(capability, error)),
        }
    }
}
