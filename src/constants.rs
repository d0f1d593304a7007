//! Global Constants
//!
//! Centralized constants for configuration and tuning.

/// Trello API constants
pub mod trello {
    /// Public Trello API host
    pub const DEFAULT_BASE_URL: &str = "https://api.trello.com";

    /// Card fields requested for every card
    pub const CARD_FIELDS: &str = "name,idList,due,dateLastActivity,labels";

    /// Only comment actions are requested alongside cards
    pub const COMMENT_ACTION: &str = "commentCard";

    /// Largest page Trello serves for board cards
    pub const MAX_PAGE_SIZE: usize = 1000;

    /// Upper bound on followed continuation cursors
    pub const MAX_PAGES: usize = 50;

    /// Characters of an error body kept in error messages
    pub const ERROR_BODY_PREVIEW: usize = 200;
}

/// Retry constants for Trello requests
pub mod retry {
    /// Retries after the first attempt
    pub const DEFAULT_MAX_RETRIES: usize = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 10;
}

/// HTTP/Network constants
pub mod network {
    /// Trello request timeout (seconds)
    pub const FETCH_TIMEOUT_SECS: u64 = 30;

    /// LLM request timeout (seconds)
    pub const LLM_TIMEOUT_SECS: u64 = 180;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;
}

/// Pipeline constants
pub mod pipeline {
    /// Upper bound on a single stage (seconds)
    pub const STAGE_TIMEOUT_SECS: u64 = 600;

    /// Decision steps an agent may take within one stage
    pub const MAX_AGENT_STEPS: usize = 8;
}

/// LLM provider constants
pub mod llm {
    /// OpenAI-compatible API base
    pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

    /// Local Ollama server
    pub const OLLAMA_API_BASE: &str = "http://localhost:11434";

    /// Retries after the first attempt for rate limits and server errors
    pub const MAX_RETRIES: usize = 2;

    /// Characters of an error body kept in error messages
    pub const ERROR_BODY_PREVIEW: usize = 300;
}
