//! Config Command
//!
//! Manage board-insights configuration.
//!
//! Usage:
//!   board-insights config show [-f json]
//!   board-insights config path
//!   board-insights config init [-g] [--force]

use std::path::PathBuf;

use crate::cli::ui::Output;
use crate::cli::{ConfigOverrides, load_config};
use crate::config::ConfigLoader;
use crate::types::{InsightsError, Result};

/// Show the effective configuration (merged from all sources)
pub fn show(config_path: Option<PathBuf>, format: &str) -> Result<()> {
    let as_json = match format {
        "json" => true,
        "toml" | "text" => false,
        other => {
            return Err(InsightsError::config(format!(
                "Invalid format '{}'. Valid values: toml, json",
                other
            )));
        }
    };

    let config = load_config(config_path.as_deref(), ConfigOverrides::default())?;
    println!("{}", ConfigLoader::render(&config, as_json)?);
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a default config file, globally or for the current project
pub fn init(global: bool, force: bool) -> Result<()> {
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };

    let out = Output::new();
    out.success(&format!(
        "Initialized {} configuration",
        if global { "global" } else { "project" }
    ));
    out.field("Config", path.display());
    Ok(())
}
