//! Sensitivity settings store

use super::backend::{MemoryBackend, SettingsBackend};
use ptz_shared::{ChannelId, SettingKey};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Errors that can occur while changing a setting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("Sensitivity for {key} must be a finite number, got {value}")]
    NonFinite { key: SettingKey, value: f64 },
}

/// Sensitivity multipliers, cached in memory and written through to a backend
///
/// When nothing is stored, reading any key through [`SettingsStore::get`]
/// first writes the full default set (`zoom=5, iris=5, focus=5, joystick=7`).
/// Persistence failures are logged and the in-memory values stay
/// authoritative. The cache is never locked across a backend write.
pub struct SettingsStore {
    backend: Box<dyn SettingsBackend>,
    values: RwLock<HashMap<SettingKey, f64>>,
    /// Serializes backend writes so they land in the order they were made
    io: Mutex<()>,
}

impl SettingsStore {
    /// Open a store, loading whatever the backend already holds
    pub async fn open(backend: impl SettingsBackend + 'static) -> Self {
        let values = match backend.load().await {
            Ok(raw) => parse_values(raw),
            Err(e) => {
                error!(
                    "[SETTINGS] Could not load settings from {} backend: {:#}",
                    backend.name(),
                    e
                );
                HashMap::new()
            }
        };

        info!(
            "[SETTINGS] Opened {} backend with {} stored values",
            backend.name(),
            values.len()
        );

        Self {
            backend: Box::new(backend),
            values: RwLock::new(values),
            io: Mutex::new(()),
        }
    }

    /// Empty store that keeps nothing across restarts
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
            values: RwLock::new(HashMap::new()),
            io: Mutex::new(()),
        }
    }

    /// Read a setting, applying defaults if the store is empty
    pub async fn get(&self, key: SettingKey) -> f64 {
        {
            let values = self.values.read().await;
            if !values.is_empty() {
                return values.get(&key).copied().unwrap_or(key.default_value());
            }
        }

        self.apply_defaults().await;
        key.default_value()
    }

    pub async fn get_sensitivity(&self, channel: ChannelId) -> f64 {
        self.get(channel.sensitivity_key()).await
    }

    /// Cached sensitivity for a channel, falling back to the default.
    /// Never touches the backend.
    pub async fn cached_sensitivity(&self, channel: ChannelId) -> f64 {
        let key = channel.sensitivity_key();
        let values = self.values.read().await;
        values.get(&key).copied().unwrap_or(key.default_value())
    }

    pub async fn set(&self, key: SettingKey, value: f64) -> Result<(), SettingsError> {
        if !value.is_finite() {
            warn!("[SETTINGS] Refusing {} = {}", key, value);
            return Err(SettingsError::NonFinite { key, value });
        }

        let _io = self.io.lock().await;
        let raw = {
            let mut values = self.values.write().await;
            values.insert(key, value);
            to_raw(&values)
        };
        info!("[SETTINGS] {} = {}", key, value);
        self.persist(&raw).await;
        Ok(())
    }

    pub async fn set_sensitivity(
        &self,
        channel: ChannelId,
        value: f64,
    ) -> Result<(), SettingsError> {
        self.set(channel.sensitivity_key(), value).await
    }

    /// Remove every stored key; defaults come back on the next read
    pub async fn clear(&self) {
        let _io = self.io.lock().await;
        self.values.write().await.clear();
        info!("[SETTINGS] Cleared, defaults apply on next read");
        self.persist(&BTreeMap::new()).await;
    }

    /// All four settings, in display order
    pub async fn snapshot(&self) -> Vec<(SettingKey, f64)> {
        let mut out = Vec::with_capacity(SettingKey::ALL.len());
        for key in SettingKey::ALL {
            out.push((key, self.get(key).await));
        }
        out
    }

    async fn apply_defaults(&self) {
        let _io = self.io.lock().await;
        let raw = {
            let mut values = self.values.write().await;
            if !values.is_empty() {
                return;
            }
            for key in SettingKey::ALL {
                values.insert(key, key.default_value());
            }
            to_raw(&values)
        };
        debug!("[SETTINGS] Applied defaults");
        self.persist(&raw).await;
    }

    async fn persist(&self, raw: &BTreeMap<String, f64>) {
        if let Err(e) = self.backend.save(raw).await {
            error!(
                "[SETTINGS] Could not persist settings to {} backend: {:#}",
                self.backend.name(),
                e
            );
        }
    }
}

fn to_raw(values: &HashMap<SettingKey, f64>) -> BTreeMap<String, f64> {
    values
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), *value))
        .collect()
}

fn parse_values(raw: BTreeMap<String, f64>) -> HashMap<SettingKey, f64> {
    raw.into_iter()
        .filter_map(|(name, value)| match SettingKey::from_name(&name) {
            Some(key) if value.is_finite() => Some((key, value)),
            _ => {
                debug!("[SETTINGS] Ignoring stored key {:?}", name);
                None
            }
        })
        .collect()
}
