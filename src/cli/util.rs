//! CLI Common Utilities
//!
//! Shared config loading and credential resolution for command handlers.

use std::path::{Path, PathBuf};

use crate::config::{Config, ConfigLoader};
use crate::types::{Credentials, Result};

/// Trello credentials as given on the command line or via environment
#[derive(Clone, Default)]
pub struct CredentialArgs {
    pub api_key: Option<String>,
    pub api_token: Option<String>,
    pub board_id: Option<String>,
}

impl CredentialArgs {
    /// Validate into [`Credentials`], naming every missing field at once
    pub fn resolve(self) -> Result<Credentials> {
        Credentials::from_parts(self.api_key, self.api_token, self.board_id)
    }
}

/// Per-invocation overrides applied on top of the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub agents_file: Option<PathBuf>,
    pub tasks_file: Option<PathBuf>,
    pub model: Option<String>,
}

/// Load configuration from an explicit file or the normal resolution chain,
/// then apply CLI overrides (highest priority)
pub fn load_config(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Config> {
    let mut config = match path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    if let Some(agents) = overrides.agents_file {
        config.stages.agents_file = Some(agents);
    }
    if let Some(tasks) = overrides.tasks_file {
        config.stages.tasks_file = Some(tasks);
    }
    if let Some(model) = overrides.model {
        config.llm.model = model;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_reports_all_missing_fields() {
        let args = CredentialArgs {
            api_key: Some("key".to_string()),
            api_token: None,
            board_id: Some("  ".to_string()),
        };
        let err = args.resolve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("api_token, board_id"));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[llm]\nmodel = \"gpt-4o\"\n").unwrap();

        let config = load_config(
            Some(&path),
            ConfigOverrides {
                model: Some("llama3.1".to_string()),
                tasks_file: Some(PathBuf::from("custom/tasks.yaml")),
                ..ConfigOverrides::default()
            },
        )
        .unwrap();

        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.stages.tasks_file, Some(PathBuf::from("custom/tasks.yaml")));
        assert_eq!(config.stages.agents_file, None);
    }
}
