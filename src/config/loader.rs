//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (platform config dir, `config.toml`)
//! 3. Project config (.board-insights/config.toml)
//! 4. Environment variables (BOARD_INSIGHTS_* prefix, `__` separates sections)
//! 5. `TRELLO_BASE_URL` for the API host

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{InsightsError, Result};

const ENV_PREFIX: &str = "BOARD_INSIGHTS_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        let config = Self::extract(Self::with_env(figment))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file (plus env overrides)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path));

        let config = Self::extract(Self::with_env(figment))?;
        config.validate()?;
        Ok(config)
    }

    fn with_env(figment: Figment) -> Figment {
        // e.g. BOARD_INSIGHTS_LLM__MODEL -> llm.model
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
            .merge(
                Env::raw()
                    .only(&["TRELLO_BASE_URL"])
                    .map(|_| "trello.base_url".into()),
            )
    }

    fn extract(figment: Figment) -> Result<Config> {
        figment
            .extract()
            .map_err(|e| InsightsError::config(format!("Configuration error: {}", e)))
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Platform config directory (e.g. ~/.config/board-insights/)
    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "board-insights").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".board-insights/config.toml")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render the effective configuration
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| InsightsError::config(e.to_string()))
        }
    }

    /// Write a default global config file
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            InsightsError::config("Cannot determine global config directory")
        })?;
        Self::write_default(&global_dir.join("config.toml"), force)
    }

    /// Write a default project config file
    pub fn init_project(force: bool) -> Result<PathBuf> {
        Self::write_default(&Self::project_config_path(), force)
    }

    fn write_default(path: &Path, force: bool) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if !path.exists() || force {
            fs::write(path, Self::default_config())?;
            info!("Created config: {}", path.display());
        } else {
            info!("Config exists: {}", path.display());
        }

        Ok(path.to_path_buf())
    }

    /// Default config content (TOML)
    fn default_config() -> String {
        r#"# board-insights configuration
# Credentials are never stored here; pass them per run or via
# TRELLO_API_KEY / TRELLO_API_TOKEN / TRELLO_BOARD_ID.

version = "1.0"

[trello]
base_url = "https://api.trello.com"
timeout_secs = 30
max_retries = 3

[llm]
provider = "openai"
model = "gpt-4o-mini"
timeout_secs = 180

[pipeline]
stage_timeout_secs = 600
max_agent_steps = 8

# [stages]
# agents_file = "config/agents.yaml"
# tasks_file = "config/tasks.yaml"
"#
        .to_string()
    }
}
