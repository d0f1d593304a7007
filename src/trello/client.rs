//! Trello REST Client
//!
//! Read-only access to board cards and single cards.
//!
//! - Key and token travel as query parameters and are never logged: request
//!   logging uses the URL path only, transport errors are stripped of their
//!   URL, and error bodies are scrubbed before they reach an error message.
//! - Retryable failures (429, 5xx, network) are retried with exponential
//!   backoff and jitter; every other non-success status fails immediately.
//! - Board cards are paged with `limit`/`before` until a short page.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use super::wire::WireCard;
use crate::capability::BoardSource;
use crate::config::TrelloConfig;
use crate::constants::trello::{
    CARD_FIELDS, COMMENT_ACTION, ERROR_BODY_PREVIEW,
};
use crate::types::{BoardSnapshot, Card, Credentials, ErrorCategory, InsightsError, Result};

/// Trello API client shared by all runs
#[derive(Debug, Clone)]
pub struct TrelloClient {
    base_url: Url,
    client: reqwest::Client,
    page_size: usize,
    max_pages: usize,
    backoff: ExponentialBuilder,
}

impl TrelloClient {
    pub fn new(config: &TrelloConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            InsightsError::config(format!("Invalid Trello base URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(InsightsError::config(format!(
                "Invalid Trello base URL: {}",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| InsightsError::config(format!("Failed to create HTTP client: {}", e)))?;

        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(config.retry_base_delay_ms))
            .with_max_delay(Duration::from_secs(config.retry_max_delay_secs))
            .with_max_times(config.max_retries)
            .with_jitter();

        Ok(Self {
            base_url,
            client,
            page_size: config.page_size,
            max_pages: config.max_pages.max(1),
            backoff,
        })
    }

    /// Fetch every card on the credentials' board, following page cursors
    pub async fn fetch_board(&self, credentials: &Credentials) -> Result<BoardSnapshot> {
        let board_id = credentials.board_id();
        let mut cards: Vec<Card> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut before: Option<String> = None;

        for page in 1..=self.max_pages {
            let mut params = card_query();
            params.push(("limit", self.page_size.to_string()));
            if let Some(cursor) = &before {
                params.push(("before", cursor.clone()));
            }
            let url = self.endpoint(&["boards", board_id, "cards"], credentials, &params);

            let batch: Vec<WireCard> = self.get_json(&url, credentials).await?;
            let received = batch.len();
            // Trello ids are fixed-width hex, so the smallest id is the oldest card
            let cursor = batch.iter().map(|c| c.id.as_str()).min().map(str::to_string);

            let mut added = 0usize;
            for wire in batch {
                if seen.insert(wire.id.clone()) {
                    cards.push(wire.into());
                    added += 1;
                }
            }

            debug!(board_id, page, received, added, "Fetched card page");

            if received < self.page_size || added == 0 {
                info!(board_id, cards = cards.len(), pages = page, "Board fetched");
                return Ok(BoardSnapshot::new(board_id, cards));
            }
            before = cursor;
        }

        warn!(
            board_id,
            max_pages = self.max_pages,
            cards = cards.len(),
            "Stopped following card pages at the page limit"
        );
        Ok(BoardSnapshot::new(board_id, cards))
    }

    /// Fetch one card with labels, attachments and comments
    pub async fn fetch_card(&self, card_id: &str, credentials: &Credentials) -> Result<Card> {
        let card_id = card_id.trim();
        if card_id.is_empty() {
            return Err(InsightsError::config("Card id is required"));
        }

        let url = self.endpoint(&["cards", card_id], credentials, &card_query());
        let wire: WireCard = self.get_json(&url, credentials).await?;
        debug!(card_id, "Card fetched");
        Ok(wire.into())
    }

    fn endpoint(&self, segments: &[&str], credentials: &Credentials, params: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("1").extend(segments);
        }
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("key", credentials.api_key())
                .append_pair("token", credentials.api_token());
            for (name, value) in params {
                query.append_pair(name, value);
            }
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url, credentials: &Credentials) -> Result<T> {
        let attempt = || self.get_once::<T>(url, credentials);

        attempt
            .retry(self.backoff)
            .when(|e: &InsightsError| e.is_retryable())
            .notify(|e: &InsightsError, delay: Duration| {
                warn!(
                    path = url.path(),
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Trello request failed, retrying"
                );
            })
            .await
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &Url, credentials: &Credentials) -> Result<T> {
        let path = url.path();

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!(path, status = status.as_u16(), "Trello response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = format!(
                "{} {}",
                status.canonical_reason().unwrap_or("Unexpected status"),
                scrub(&body, credentials)
            );
            return Err(InsightsError::fetch_status(status.as_u16(), reason.trim()));
        }

        response.json::<T>().await.map_err(|e| {
            InsightsError::fetch_transport(
                ErrorCategory::ParseError,
                format!("Unexpected response body from {}: {}", path, e.without_url()),
            )
        })
    }
}

#[async_trait]
impl BoardSource for TrelloClient {
    async fn fetch_board(&self, credentials: &Credentials) -> Result<BoardSnapshot> {
        TrelloClient::fetch_board(self, credentials).await
    }

    async fn fetch_card(&self, card_id: &str, credentials: &Credentials) -> Result<Card> {
        TrelloClient::fetch_card(self, card_id, credentials).await
    }
}

fn card_query() -> Vec<(&'static str, String)> {
    vec![
        ("fields", CARD_FIELDS.to_string()),
        ("attachments", "true".to_string()),
        ("actions", COMMENT_ACTION.to_string()),
    ]
}

fn transport_error(err: reqwest::Error) -> InsightsError {
    let category = if err.is_decode() {
        ErrorCategory::ParseError
    } else {
        ErrorCategory::Network
    };
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.without_url().to_string()
    };
    InsightsError::fetch_transport(category, reason)
}

/// Redact echoed credentials, then cut the body to the preview length
fn scrub(body: &str, credentials: &Credentials) -> String {
    let redacted = body
        .trim()
        .replace(credentials.api_key(), "[REDACTED]")
        .replace(credentials.api_token(), "[REDACTED]");
    redacted.chars().take(ERROR_BODY_PREVIEW).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn config_for(server: &MockServer) -> TrelloConfig {
        TrelloConfig {
            base_url: server.uri(),
            max_retries: 2,
            retry_base_delay_ms: 1,
            retry_max_delay_secs: 1,
            ..TrelloConfig::default()
        }
    }

    fn credentials() -> Credentials {
        Credentials::new("test-key", "test-token", "board-1").unwrap()
    }

    fn wire_card(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "idList": "list-todo",
            "due": "2024-06-01T12:00:00.000Z",
            "dateLastActivity": "2024-05-20T08:30:00.000Z",
            "labels": [{"id": "lbl", "name": "backend", "color": "blue"}],
            "attachments": [],
            "actions": [{
                "id": format!("act-{}", id),
                "type": "commentCard",
                "date": "2024-05-19T08:30:00.000Z",
                "memberCreator": {"fullName": "Ada Lovelace", "username": "ada"},
                "data": {"text": "Waiting on API review"}
            }]
        })
    }

    #[tokio::test]
    async fn test_fetch_board_returns_every_card() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/boards/board-1/cards"))
            .and(query_param("key", "test-key"))
            .and(query_param("token", "test-token"))
            .and(query_param("fields", "name,idList,due,dateLastActivity,labels"))
            .and(query_param("attachments", "true"))
            .and(query_param("actions", "commentCard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                wire_card("0003", "Login page"),
                wire_card("0002", "Payment flow"),
                wire_card("0001", "Release notes"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = TrelloClient::new(&config_for(&server)).unwrap();
        let snapshot = client.fetch_board(&credentials()).await.unwrap();

        assert_eq!(snapshot.board_id, "board-1");
        assert_eq!(snapshot.len(), 3);
        let names: Vec<&str> = snapshot.cards.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Login page", "Payment flow", "Release notes"]);
        for card in &snapshot.cards {
            assert_eq!(card.list_id, "list-todo");
            assert!(card.due.is_some());
            assert_eq!(card.labels.len(), 1);
            assert_eq!(card.attachments, Some(vec![]));
            assert_eq!(card.comments[0].author, "Ada Lovelace");
        }
    }

    #[tokio::test]
    async fn test_fetch_board_follows_page_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/boards/board-1/cards"))
            .and(query_param_is_missing("before"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                wire_card("0004", "Fourth"),
                wire_card("0003", "Third"),
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1/boards/board-1/cards"))
            .and(query_param("before", "0003"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                wire_card("0002", "Second"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let config = TrelloConfig {
            page_size: 2,
            ..config_for(&server)
        };
        let client = TrelloClient::new(&config).unwrap();
        let snapshot = client.fetch_board(&credentials()).await.unwrap();

        let ids: Vec<&str> = snapshot.cards.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["0004", "0003", "0002"]);
    }

    #[tokio::test]
    async fn test_fetch_board_stops_when_page_repeats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/boards/board-1/cards"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                wire_card("0002", "Second"),
                wire_card("0001", "First"),
            ])))
            .expect(2)
            .mount(&server)
            .await;

        let config = TrelloConfig {
            page_size: 2,
            ..config_for(&server)
        };
        let client = TrelloClient::new(&config).unwrap();
        let snapshot = client.fetch_board(&credentials()).await.unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_is_fetch_failed_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/boards/board-1/cards"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token test-token"))
            .expect(1)
            .mount(&server)
            .await;

        let client = TrelloClient::new(&config_for(&server)).unwrap();
        let err = client.fetch_board(&credentials()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FetchFailed);
        assert_eq!(err.http_status(), Some(401));
        assert!(err.is_fatal());
        assert!(!err.to_string().contains("test-token"));
        assert!(!err.to_string().contains("test-key"));
    }

    #[tokio::test]
    async fn test_credential_at_preview_boundary_is_redacted() {
        let token = format!("TOKSECRET{}", "0123456789abcdef".repeat(4))[..64].to_string();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(format!("{}{}", "x".repeat(180), token)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let credentials = Credentials::new("test-key", token.as_str(), "board-1").unwrap();
        let client = TrelloClient::new(&config_for(&server)).unwrap();
        let message = client.fetch_board(&credentials).await.unwrap_err().to_string();

        assert!(!message.contains("TOKSECRET"));
        assert!(message.ends_with("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_non_success_statuses_never_return_data() {
        for status in [400u16, 403, 404, 409, 422] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status).set_body_json(json!([])))
                .mount(&server)
                .await;

            let client = TrelloClient::new(&config_for(&server)).unwrap();
            let board = client.fetch_board(&credentials()).await;
            let card = client.fetch_card("0001", &credentials()).await;

            assert_eq!(board.unwrap_err().http_status(), Some(status));
            assert_eq!(card.unwrap_err().http_status(), Some(status));
        }
    }

    #[tokio::test]
    async fn test_server_error_is_retried_then_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/boards/board-1/cards"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = TrelloClient::new(&config_for(&server)).unwrap();
        let err = client.fetch_board(&credentials()).await.unwrap_err();

        assert_eq!(err.http_status(), Some(503));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/boards/board-1/cards"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1/boards/board-1/cards"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([wire_card("0001", "Only")])),
            )
            .mount(&server)
            .await;

        let client = TrelloClient::new(&config_for(&server)).unwrap();
        let snapshot = client.fetch_board(&credentials()).await.unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"error\": \"nope\"}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = TrelloClient::new(&config_for(&server)).unwrap();
        let err = client.fetch_board(&credentials()).await.unwrap_err();
        assert!(matches!(
            err,
            InsightsError::FetchFailed {
                status: None,
                category: ErrorCategory::ParseError,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_card() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/cards/0007"))
            .and(query_param("actions", "commentCard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(wire_card("0007", "Detail")))
            .expect(1)
            .mount(&server)
            .await;

        let client = TrelloClient::new(&config_for(&server)).unwrap();
        let card = client.fetch_card("0007", &credentials()).await.unwrap();
        assert_eq!(card.name, "Detail");
        assert_eq!(card.comments[0].text, "Waiting on API review");
    }

    #[tokio::test]
    async fn test_blank_card_id_never_reaches_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = TrelloClient::new(&config_for(&server)).unwrap();
        let err = client.fetch_card("  ", &credentials()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = TrelloConfig {
            timeout_secs: 1,
            max_retries: 0,
            ..config_for(&server)
        };
        let client = TrelloClient::new(&config).unwrap();
        let err = client.fetch_board(&credentials()).await.unwrap_err();
        assert!(matches!(
            err,
            InsightsError::FetchFailed {
                status: None,
                category: ErrorCategory::Network,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_board_stops_at_page_limit() {
        let served = Arc::new(AtomicUsize::new(0));
        let counter = served.clone();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/boards/board-1/cards"))
            .respond_with(move |_: &Request| {
                // Every page is full and older than the last
                let page = counter.fetch_add(1, Ordering::SeqCst);
                let newest = 9000 - page * 2;
                ResponseTemplate::new(200).set_body_json(json!([
                    wire_card(&format!("{:04}", newest), "Newer"),
                    wire_card(&format!("{:04}", newest - 1), "Older"),
                ]))
            })
            .expect(3)
            .mount(&server)
            .await;

        let config = TrelloConfig {
            page_size: 2,
            max_pages: 3,
            ..config_for(&server)
        };
        let client = TrelloClient::new(&config).unwrap();
        let snapshot = client.fetch_board(&credentials()).await.unwrap();

        assert_eq!(served.load(Ordering::SeqCst), 3);
        assert_eq!(snapshot.len(), 6);
        assert_eq!(snapshot.cards.last().map(|c| c.id.as_str()), Some("8995"));
    }
}
