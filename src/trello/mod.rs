//! Trello Data Access
//!
//! Read-only fetchers for board cards and single cards. These are the only
//! network operations in the crate that touch Trello.

mod client;
mod wire;

pub use client::TrelloClient;
