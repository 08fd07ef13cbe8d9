//! Layered configuration: a TOML file, then `GLBFORGE_*` environment overrides.

mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str, ENV_PREFIX};
pub use types::*;
pub use validate::validate_config;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file {0} does not exist")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    ParseError(String),

    #[error("Configuration rejected: {0}")]
    ValidationError(String),
}
