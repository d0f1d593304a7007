//! Report Generator
//!
//! Entry point for callers: wires Trello, the LLM provider and the stage
//! catalog into a [`Pipeline`] and turns raw credentials into a report.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{Pipeline, Report};
use crate::agent::{LlmAgent, SharedAgent};
use crate::ai::{SharedProvider, create_provider};
use crate::config::{Config, StageCatalog};
use crate::trello::TrelloClient;
use crate::types::{Credentials, InsightsError, Result};

pub struct ReportGenerator {
    pipeline: Pipeline,
    /// Provider behind the agents, kept for the preflight check
    provider: Option<SharedProvider>,
}

impl ReportGenerator {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            provider: None,
        }
    }

    pub fn with_provider(mut self, provider: SharedProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Build the full stack from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = StageCatalog::from_sources(&config.stages)?;
        let trello = TrelloClient::new(&config.trello)?;
        let provider = create_provider(&config.llm)?;

        info!(
            provider = provider.name(),
            model = provider.model(),
            "Report generator ready"
        );

        let agent: SharedAgent = Arc::new(LlmAgent::new(
            provider.clone(),
            config.pipeline.max_agent_steps,
            Duration::from_secs(config.llm.timeout_secs),
        ));

        let pipeline = Pipeline::new(
            catalog,
            Arc::new(trello),
            agent.clone(),
            agent,
            &config.pipeline,
        );
        Ok(Self::new(pipeline).with_provider(provider))
    }

    /// Check the LLM provider is reachable before any board data is fetched
    pub async fn preflight(&self) -> Result<()> {
        let Some(provider) = &self.provider else {
            return Ok(());
        };

        if provider.health_check().await? {
            Ok(())
        } else {
            Err(InsightsError::config(format!(
                "LLM provider '{}' (model {}) is not available",
                provider.name(),
                provider.model()
            )))
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Generate the report text for one board
    pub async fn generate_report(
        &self,
        api_key: &str,
        api_token: &str,
        board_id: &str,
    ) -> Result<String> {
        let report = self
            .generate_report_with_cancel(api_key, api_token, board_id, &CancellationToken::new())
            .await?;
        Ok(report.text)
    }

    /// Generate a report that stops at the next stage boundary, or mid-stage,
    /// once `cancel` fires
    pub async fn generate_report_with_cancel(
        &self,
        api_key: &str,
        api_token: &str,
        board_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Report> {
        let credentials = Credentials::new(api_key, api_token, board_id)?;
        self.pipeline.start(credentials).execute(cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::testing::ScriptedProvider;
    use crate::config::{PipelineConfig, TrelloConfig};
    use crate::types::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::any;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn generator_for(server: &MockServer, replies: Vec<serde_json::Value>) -> ReportGenerator {
        let trello = TrelloClient::new(&TrelloConfig {
            base_url: server.uri(),
            max_retries: 0,
            ..TrelloConfig::default()
        })
        .unwrap();
        let agent: SharedAgent = Arc::new(LlmAgent::new(
            ScriptedProvider::new(replies),
            4,
            Duration::from_secs(5),
        ));
        ReportGenerator::new(Pipeline::new(
            StageCatalog::builtin().unwrap(),
            Arc::new(trello),
            agent.clone(),
            agent,
            &PipelineConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_missing_board_id_fails_before_network() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let generator = generator_for(&server, vec![]).await;
        let err = generator.generate_report("key", "token", "").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("board_id"));
    }

    #[tokio::test]
    async fn test_empty_board_still_reports() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let generator = generator_for(
            &server,
            vec![
                json!({"action": "use_tool", "tool": "board_fetch"}),
                json!({"action": "final_answer", "output": "The board has no cards."}),
                json!({"action": "final_answer", "output": "No work items to analyze."}),
                json!({"action": "final_answer", "output": "# Sprint Report\n\nThe board is empty."}),
            ],
        )
        .await;

        let text = generator.generate_report("key", "token", "board-1").await.unwrap();
        assert!(text.contains("The board is empty"));
    }

    #[tokio::test]
    async fn test_preflight_reports_unavailable_provider() {
        let server = MockServer::start().await;
        let generator = generator_for(&server, vec![]).await;
        assert!(generator.preflight().await.is_ok());

        let offline = ScriptedProvider::new(vec![]);
        offline.set_healthy(false);
        let err = generator.with_provider(offline).preflight().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("scripted"));
    }

    #[test]
    fn test_from_config_rejects_unknown_provider() {
        let mut config = Config::default();
        config.llm.provider = "telegraph".to_string();
        let err = ReportGenerator::from_config(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
