//! Trello REST payloads
//!
//! Deserialization targets for `/1/boards/{id}/cards` and `/1/cards/{id}`,
//! converted into the crate's [`Card`] model.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::constants::trello::COMMENT_ACTION;
use crate::types::{Attachment, Card, Comment, Label};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCard {
    pub id: String,
    pub name: String,
    pub id_list: String,
    #[serde(default)]
    pub due: Option<DateTime<Utc>>,
    pub date_last_activity: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<WireLabel>,
    #[serde(default)]
    pub attachments: Option<Vec<WireAttachment>>,
    #[serde(default)]
    pub actions: Vec<WireAction>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLabel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAttachment {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub member_creator: Option<WireMember>,
    #[serde(default)]
    pub data: WireActionData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireMember {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireActionData {
    #[serde(default)]
    pub text: Option<String>,
}

impl WireMember {
    fn display_name(&self) -> Option<String> {
        self.full_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.username.clone())
    }
}

impl From<WireCard> for Card {
    fn from(wire: WireCard) -> Self {
        let mut comments: Vec<Comment> = wire
            .actions
            .into_iter()
            .filter(|a| a.action_type == COMMENT_ACTION)
            .map(|a| Comment {
                author: a
                    .member_creator
                    .and_then(|m| m.display_name())
                    .unwrap_or_else(|| "unknown".to_string()),
                text: a.data.text.unwrap_or_default(),
                timestamp: a.date,
            })
            .collect();
        // Trello lists actions newest first
        comments.sort_by_key(|c| c.timestamp);

        Card {
            id: wire.id,
            name: wire.name,
            list_id: wire.id_list,
            due: wire.due,
            last_activity: wire.date_last_activity,
            labels: wire
                .labels
                .into_iter()
                .map(|l| Label {
                    id: l.id,
                    name: l.name,
                    color: l.color,
                })
                .collect(),
            attachments: wire.attachments.map(|items| {
                items
                    .into_iter()
                    .map(|a| Attachment {
                        id: a.id,
                        name: a.name,
                        url: a.url,
                        date: a.date,
                        mime_type: a.mime_type,
                    })
                    .collect()
            }),
            comments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_card_conversion() {
        let payload = json!({
            "id": "5f1a",
            "name": "Write release notes",
            "idList": "list-doing",
            "due": null,
            "dateLastActivity": "2024-05-03T10:00:00.000Z",
            "labels": [{"id": "l1", "idBoard": "b1", "name": "docs", "color": "green"}],
            "attachments": [],
            "actions": [
                {
                    "id": "a2",
                    "type": "commentCard",
                    "date": "2024-05-02T10:00:00.000Z",
                    "memberCreator": {"fullName": "Grace Hopper", "username": "grace"},
                    "data": {"text": "second"}
                },
                {
                    "id": "a1",
                    "type": "commentCard",
                    "date": "2024-05-01T10:00:00.000Z",
                    "memberCreator": {"fullName": "", "username": "alan"},
                    "data": {"text": "first"}
                },
                {
                    "id": "a0",
                    "type": "updateCard",
                    "date": "2024-04-30T10:00:00.000Z",
                    "data": {}
                }
            ]
        });

        let card: Card = serde_json::from_value::<WireCard>(payload).unwrap().into();
        assert_eq!(card.list_id, "list-doing");
        assert_eq!(card.due, None);
        assert_eq!(card.labels[0].name, "docs");
        assert_eq!(card.attachments, Some(vec![]));
        assert_eq!(card.comments.len(), 2);
        assert_eq!(card.comments[0].text, "first");
        assert_eq!(card.comments[0].author, "alan");
        assert_eq!(card.comments[1].author, "Grace Hopper");
    }

    #[test]
    fn test_missing_optional_sections() {
        let payload = json!({
            "id": "c1",
            "name": "Bare card",
            "idList": "l1",
            "dateLastActivity": "2024-05-03T10:00:00Z"
        });
        let card: Card = serde_json::from_value::<WireCard>(payload).unwrap().into();
        assert!(card.labels.is_empty());
        assert!(card.attachments.is_none());
        assert!(card.comments.is_empty());
    }
}
