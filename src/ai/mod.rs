//! AI Integration Layer
//!
//! LLM providers, tolerant JSON parsing of replies, and call timeouts.

pub mod provider;
pub mod response;
pub mod timeout;

pub use provider::{
    LlmProvider, LlmResponse, OllamaProvider, OpenAiProvider, SharedProvider, TokenUsage,
    create_provider,
};
pub use response::extract_json;
pub use timeout::with_timeout;
