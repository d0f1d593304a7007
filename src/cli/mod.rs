pub mod commands;
pub mod ui;
mod util;

pub use util::{ConfigOverrides, CredentialArgs, load_config};
