//! Config file bootstrap and validation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Errors that can occur while reading or writing the config file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Panel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port the panel listens on for input clients
    pub server_port: u16,
    /// Camera backend host
    pub backend_server: String,
    /// Camera backend port
    pub backend_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            backend_server: "localhost".into(),
            backend_port: 8888,
        }
    }
}

impl AppConfig {
    /// Keys a valid config file must contain, and nothing else
    pub fn keys() -> Vec<String> {
        match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

/// True iff `config` is an object whose key set equals the default key set.
/// Values are not inspected.
pub fn validate(config: &Value) -> bool {
    let Some(map) = config.as_object() else {
        return false;
    };
    let default_keys = AppConfig::keys();

    default_keys.iter().all(|key| map.contains_key(key))
        && map.keys().all(|key| default_keys.contains(key))
}

fn read_config(path: &Path) -> Result<Value, ConfigError> {
    let raw = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_slice(&raw)?)
}

fn write_default(path: &Path) -> Result<(), ConfigError> {
    let raw = serde_json::to_vec(&AppConfig::default())?;
    fs::write(path, raw).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Load the config at `path`, creating it with defaults if it does not exist.
///
/// Never fails: unreadable, unwritable, malformed or invalid files all yield
/// the default configuration.
pub fn load(path: &Path) -> AppConfig {
    let value = if path.exists() {
        info!("[CONFIG] Reading config file from {}", path.display());
        match read_config(path) {
            Ok(value) => value,
            Err(e) => {
                error!(
                    "[CONFIG] Config file could not be read from {}, using default: {}",
                    path.display(),
                    e
                );
                return AppConfig::default();
            }
        }
    } else {
        match write_default(path) {
            Ok(()) => info!("[CONFIG] Created default config file at {}", path.display()),
            Err(e) => error!(
                "[CONFIG] Could not write default config file at {}, using default: {}",
                path.display(),
                e
            ),
        }
        return AppConfig::default();
    };

    if !validate(&value) {
        warn!("[CONFIG] The config file is invalid, loading default");
        return AppConfig::default();
    }

    match serde_json::from_value::<AppConfig>(value) {
        Ok(config) => {
            info!("[CONFIG] Config has been loaded successfully");
            config
        }
        Err(e) => {
            warn!("[CONFIG] The config file has bad values ({}), loading default", e);
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_keys() {
        let mut keys = AppConfig::keys();
        keys.sort();
        assert_eq!(keys, vec!["backend_port", "backend_server", "server_port"]);
    }

    #[test]
    fn test_validate_missing_key() {
        assert!(!validate(&json!({"server_port": 1, "backend_server": "x"})));
    }

    #[test]
    fn test_validate_extra_key() {
        let config = json!({
            "server_port": 3000,
            "backend_server": "localhost",
            "backend_port": 8888,
            "debug": true
        });
        assert!(!validate(&config));
    }

    #[test]
    fn test_validate_ignores_values() {
        let config = json!({
            "server_port": "not a port",
            "backend_server": null,
            "backend_port": [1, 2]
        });
        assert!(validate(&config));
    }

    #[test]
    fn test_validate_non_object() {
        assert!(!validate(&json!([1, 2, 3])));
        assert!(!validate(&json!("config")));
    }

    #[test]
    fn test_first_run_creates_file() {
        let dir = tempfile::tempdir().expect("create temp directory");
        let path = dir.path().join("config.json");

        assert_eq!(load(&path), AppConfig::default());
        assert!(path.exists());

        let written: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert!(validate(&written));
    }

    #[test]
    fn test_loads_valid_file() {
        let dir = tempfile::tempdir().expect("create temp directory");
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"server_port": 4000, "backend_server": "cams.local", "backend_port": 9000}"#,
        )
        .unwrap();

        let config = load(&path);
        assert_eq!(config.server_port, 4000);
        assert_eq!(config.backend_server, "cams.local");
        assert_eq!(config.backend_port, 9000);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().expect("create temp directory");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"server_port": 4000}"#).unwrap();

        assert_eq!(load(&path), AppConfig::default());
    }

    #[test]
    fn test_garbage_file_falls_back() {
        let dir = tempfile::tempdir().expect("create temp directory");
        let path = dir.path().join("config.json");
        fs::write(&path, "server_port=4000").unwrap();

        assert_eq!(load(&path), AppConfig::default());
    }

    #[test]
    fn test_bad_value_types_fall_back() {
        let dir = tempfile::tempdir().expect("create temp directory");
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"server_port": "x", "backend_server": "cams", "backend_port": 9000}"#,
        )
        .unwrap();

        assert_eq!(load(&path), AppConfig::default());
    }

    #[test]
    fn test_unwritable_location_uses_default() {
        let dir = tempfile::tempdir().expect("create temp directory");
        let path = dir.path().join("missing-dir").join("config.json");

        assert_eq!(load(&path), AppConfig::default());
        assert!(!path.exists());
    }
}
