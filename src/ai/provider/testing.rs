//! Scripted provider for agent and pipeline tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{LlmProvider, LlmResponse};
use crate::types::Result;

/// Replays queued decisions and records every prompt it receives.
/// Once the queue is empty it keeps asking for `board_fetch`.
pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<Value>>,
    prompts: Mutex<Vec<String>>,
    healthy: AtomicBool,
}

impl ScriptedProvider {
    pub(crate) fn new(replies: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
            healthy: AtomicBool::new(true),
        })
    }

    pub(crate) fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, prompt: &str, _schema: &Value) -> Result<LlmResponse> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| json!({"action": "use_tool", "tool": "board_fetch"}));
        Ok(LlmResponse::content_only(reply))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.healthy.load(Ordering::SeqCst))
    }
}
