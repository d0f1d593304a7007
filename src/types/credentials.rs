//! Trello Credentials
//!
//! Key and token are held as secrets and redacted from `Debug` output.
//! A `Credentials` value only exists once every field has been validated,
//! so downstream code never has to re-check for blanks.

use secrecy::{ExposeSecret, SecretString};

use super::error::{InsightsError, Result};

/// Credentials for a single pipeline run
#[derive(Clone)]
pub struct Credentials {
    api_key: SecretString,
    api_token: SecretString,
    board_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("api_token", &"[REDACTED]")
            .field("board_id", &self.board_id)
            .finish()
    }
}

impl Credentials {
    /// Validate and wrap credentials. Blank fields are configuration errors.
    pub fn new(
        api_key: impl Into<String>,
        api_token: impl Into<String>,
        board_id: impl Into<String>,
    ) -> Result<Self> {
        let api_key = require("api_key", api_key.into())?;
        let api_token = require("api_token", api_token.into())?;
        let board_id = require("board_id", board_id.into())?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_token: SecretString::from(api_token),
            board_id,
        })
    }

    /// Build from optional parts, reporting every missing field at once
    pub fn from_parts(
        api_key: Option<String>,
        api_token: Option<String>,
        board_id: Option<String>,
    ) -> Result<Self> {
        let missing: Vec<&str> = [
            ("api_key", &api_key),
            ("api_token", &api_token),
            ("board_id", &board_id),
        ]
        .iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(InsightsError::config(format!(
                "Missing Trello credentials: {}",
                missing.join(", ")
            )));
        }

        Self::new(
            api_key.unwrap_or_default(),
            api_token.unwrap_or_default(),
            board_id.unwrap_or_default(),
        )
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub(crate) fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub(crate) fn api_token(&self) -> &str {
        self.api_token.expose_secret()
    }
}

fn require(field: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InsightsError::config(format!(
            "Trello {} is required",
            field
        )));
    }
    Ok(trimmed.to_string())
}
