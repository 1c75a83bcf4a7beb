//! Panel configuration
//!
//! This module handles:
//! - Creating `config.json` with defaults on first run
//! - Loading and validating it on later runs
//! - Falling back to defaults whenever the file is unusable

mod loader;

pub use loader::{load, validate, AppConfig, ConfigError, DEFAULT_CONFIG_PATH};
