//! Fetch Command
//!
//! Runs only the Trello fetchers. Useful to check credentials and see exactly
//! what the collection stage will be working from.
//!
//! Usage:
//!   board-insights fetch --board-id <ID> [--card <CARD_ID>] [-f json]

use std::path::PathBuf;

use chrono::Utc;
use tokio::runtime::Runtime;

use crate::capability::BoardSource;
use crate::cli::ui::Output;
use crate::cli::{ConfigOverrides, CredentialArgs, load_config};
use crate::trello::TrelloClient;
use crate::types::{BoardSnapshot, Card, InsightsError, Result};

pub fn run(
    config_path: Option<PathBuf>,
    credentials: CredentialArgs,
    card_id: Option<String>,
    format: &str,
) -> Result<()> {
    let json_output = match format {
        "json" => true,
        "text" => false,
        other => {
            return Err(InsightsError::config(format!(
                "Invalid format '{}'. Valid values: text, json",
                other
            )));
        }
    };

    let credentials = credentials.resolve()?;
    let config = load_config(config_path.as_deref(), ConfigOverrides::default())?;
    let client = TrelloClient::new(&config.trello)?;
    let rt = Runtime::new()?;
    let out = Output::new();

    match card_id {
        Some(card_id) => {
            let card = rt.block_on(client.fetch_card(&card_id, &credentials))?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&card)?);
            } else {
                print_card(&out, &card);
            }
        }
        None => {
            let snapshot = rt.block_on(client.fetch_board(&credentials))?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_board(&out, &snapshot);
            }
        }
    }
    Ok(())
}

fn print_board(out: &Output, snapshot: &BoardSnapshot) {
    let now = Utc::now();
    let overdue = snapshot.cards.iter().filter(|c| c.is_overdue(now)).count();

    out.header(&format!("Board {}", snapshot.board_id));
    out.field("Cards", snapshot.len());
    out.field("Overdue", overdue);
    out.field("Comments", snapshot.comment_count());
    out.field("Fetched", snapshot.fetched_at.to_rfc3339());

    if snapshot.is_empty() {
        println!("\n  No cards on this board.");
        return;
    }

    out.section("Cards");
    for card in &snapshot.cards {
        let marker = if card.is_overdue(now) { " (overdue)" } else { "" };
        println!("  {}  {} [{}]{}", card.id, card.name, card.list_id, marker);
    }
}

fn print_card(out: &Output, card: &Card) {
    out.header(&card.name);
    out.field("Id", &card.id);
    out.field("List", &card.list_id);
    out.field(
        "Due",
        card.due.map_or_else(|| "-".to_string(), |d| d.to_rfc3339()),
    );
    out.field("Last activity", card.last_activity.to_rfc3339());

    let labels: Vec<&str> = card.labels.iter().map(|l| l.name.as_str()).collect();
    out.field(
        "Labels",
        if labels.is_empty() { "-".to_string() } else { labels.join(", ") },
    );
    if let Some(attachments) = &card.attachments {
        out.field("Attachments", attachments.len());
    }

    if !card.comments.is_empty() {
        out.section("Comments");
        for comment in &card.comments {
            println!(
                "  {} {}: {}",
                comment.timestamp.format("%Y-%m-%d %H:%M"),
                comment.author,
                comment.text
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn test_rejects_unknown_format() {
        let err = run(None, CredentialArgs::default(), None, "xml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("text, json"));
    }
}
