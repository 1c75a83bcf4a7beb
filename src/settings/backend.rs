//! Persistence backends for sensitivity settings

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Flat key/value storage for settings
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    /// Load every stored value
    async fn load(&self) -> Result<BTreeMap<String, f64>>;

    /// Replace the stored values
    async fn save(&self, values: &BTreeMap<String, f64>) -> Result<()>;

    /// Human-readable name for this backend
    fn name(&self) -> &'static str;
}

/// Volatile storage, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: RwLock<BTreeMap<String, f64>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsBackend for MemoryBackend {
    async fn load(&self) -> Result<BTreeMap<String, f64>> {
        Ok(self.values.read().await.clone())
    }

    async fn save(&self, values: &BTreeMap<String, f64>) -> Result<()> {
        *self.values.write().await = values.clone();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Settings kept as a flat JSON object in a file
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsBackend for JsonFileBackend {
    async fn load(&self) -> Result<BTreeMap<String, f64>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(BTreeMap::new());
        }

        let raw = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        let values: BTreeMap<String, serde_json::Value> = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing {}", self.path.display()))?;

        // Entries that are not numbers (e.g. `null`) are dropped on their own
        Ok(values
            .into_iter()
            .filter_map(|(key, value)| value.as_f64().map(|value| (key, value)))
            .collect())
    }

    async fn save(&self, values: &BTreeMap<String, f64>) -> Result<()> {
        let raw = serde_json::to_vec_pretty(values)?;
        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json-file"
    }
}
