//! Board Snapshot Types
//!
//! Immutable views of Trello cards as returned by one fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label attached to a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
}

/// File or link attached to a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub mime_type: Option<String>,
}

/// Comment left on a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A single work item on a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// External Trello card id
    pub id: String,
    pub name: String,
    /// Workflow column the card sits in
    pub list_id: String,
    pub due: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
    pub labels: Vec<Label>,
    /// `None` when attachments were not requested
    pub attachments: Option<Vec<Attachment>>,
    /// Oldest first
    pub comments: Vec<Comment>,
}

impl Card {
    /// Whether the card is past its due date at `now`
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due.is_some_and(|due| due < now)
    }
}

/// All cards of one board, captured for one report run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub board_id: String,
    pub cards: Vec<Card>,
    pub fetched_at: DateTime<Utc>,
}

impl BoardSnapshot {
    pub fn new(board_id: impl Into<String>, cards: Vec<Card>) -> Self {
        Self {
            board_id: board_id.into(),
            cards,
            fetched_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Number of comments across all cards
    pub fn comment_count(&self) -> usize {
        self.cards.iter().map(|c| c.comments.len()).sum()
    }
}
