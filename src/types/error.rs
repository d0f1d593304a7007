//! Unified Error Type System
//!
//! Centralized error types for the whole crate.
//!
//! ## Error Kinds
//!
//! Callers see exactly one error per failed run, described by [`ErrorKind`]:
//!
//! - **Configuration**: missing/invalid credentials or stage config (fatal, no retry)
//! - **FetchFailed**: Trello returned a non-success status or was unreachable
//! - **StageExecution**: an agent could not produce a usable result
//! - **Timeout** / **Cancelled**: the run was bounded or aborted
//!
//! ## Error Categories
//!
//! [`ErrorCategory`] classifies transport failures and drives retry decisions
//! at the fetcher boundary and abort decisions inside agents.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Transport-level categories used for retry and abort decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Key/token rejected - fail fast
    Auth,
    /// Board or card does not exist (or is not visible to the token)
    NotFound,
    /// Request rejected as malformed - fail fast
    BadRequest,
    /// Connectivity issues or timeouts - retry with backoff
    Network,
    /// Temporary server issues - retry with backoff
    Transient,
    /// Response body could not be decoded
    ParseError,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Network => write!(f, "NETWORK"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimit,
            401 | 403 => Self::Auth,
            404 => Self::NotFound,
            400 | 405..=428 | 430..=499 => Self::BadRequest,
            500..=599 => Self::Transient,
            _ => Self::Unknown,
        }
    }

    /// Check if the same request may succeed when repeated
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Network | Self::Transient)
    }

    /// Check if repeating the request can never help
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth | Self::NotFound | Self::BadRequest)
    }

}

// =============================================================================
// Error Kind (caller-facing)
// =============================================================================

/// The single structured kind a caller receives for a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    FetchFailed,
    StageExecution,
    Timeout,
    Cancelled,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::FetchFailed => write!(f, "FETCH_FAILED"),
            Self::StageExecution => write!(f, "STAGE_EXECUTION"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// LLM provider error with category and retry hints
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Error category for routing decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    /// Add provider context to existing error
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Classify an HTTP status returned by an LLM endpoint
    pub fn from_status(status: u16, message: impl Into<String>, provider: &str) -> Self {
        Self::new(ErrorCategory::from_status(status), message).provider(provider)
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum InsightsError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Boundary Errors
    // -------------------------------------------------------------------------
    /// Missing or invalid credentials, settings or stage definitions
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Trello did not return usable data
    #[error("Fetch failed ({}): {reason}", status_label(.status))]
    FetchFailed {
        status: Option<u16>,
        category: ErrorCategory,
        reason: String,
    },

    #[error("LLM error: {0}")]
    Llm(LlmError),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    /// An agent could not produce a usable result for a stage
    #[error("Stage '{stage}' produced no usable result: {message}")]
    StageExecution { stage: String, message: String },

    /// Aggregated error surfaced when a pipeline run ends in `Failed`
    #[error("Pipeline failed during stage '{stage}': {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Box<InsightsError>,
    },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Pipeline cancelled before completing stage '{stage}'")]
    Cancelled { stage: String },
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}", code),
        None => "no response".to_string(),
    }
}

impl From<LlmError> for InsightsError {
    fn from(err: LlmError) -> Self {
        InsightsError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, InsightsError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl InsightsError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Fetch failure for a non-success HTTP status
    pub fn fetch_status(status: u16, reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            status: Some(status),
            category: ErrorCategory::from_status(status),
            reason: reason.into(),
        }
    }

    /// Fetch failure without an HTTP response (connect error, timeout, decode error)
    pub fn fetch_transport(category: ErrorCategory, reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            status: None,
            category,
            reason: reason.into(),
        }
    }

    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageExecution {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Caller-facing kind. Aggregated stage failures report their root cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::Yaml(_) => ErrorKind::Configuration,
            Self::FetchFailed { .. } => ErrorKind::FetchFailed,
            Self::StageExecution { .. } | Self::Llm(_) | Self::Json(_) => {
                ErrorKind::StageExecution
            }
            Self::StageFailed { source, .. } => source.kind(),
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Innermost error, unwrapping `StageFailed`
    pub fn root(&self) -> &InsightsError {
        match self {
            Self::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if repeating the failed request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::FetchFailed { category, .. } => category.is_retryable(),
            Self::Llm(e) => e.is_retryable(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Check if an agent must abort instead of working around the failure
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::FetchFailed { category, .. } => category.is_fatal(),
            Self::Configuration(_) => true,
            _ => false,
        }
    }

    /// Transport category of a fetch or LLM failure
    pub fn category(&self) -> Option<ErrorCategory> {
        match self.root() {
            Self::FetchFailed { category, .. } => Some(*category),
            Self::Llm(e) => Some(e.category),
            _ => None,
        }
    }

    /// HTTP status carried by a fetch failure, if any
    pub fn http_status(&self) -> Option<u16> {
        match self.root() {
            Self::FetchFailed { status, .. } => *status,
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
