//! Configuration Management
//!
//! Application settings with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config file
//! 3. Project config (.board-insights/config.toml)
//! 4. Environment variables (BOARD_INSIGHTS_*)
//! 5. CLI arguments (highest priority)
//!
//! Stage instructions live separately in the [`StageCatalog`].

mod loader;
mod stages;
mod types;

pub use loader::ConfigLoader;
pub use stages::{StageCatalog, StageConfig};
pub use types::*;
