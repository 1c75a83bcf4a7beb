//! Sensitivity settings
//!
//! This module handles:
//! - Per-axis sensitivity multipliers with defaults
//! - Pluggable persistence (in-memory or JSON file)

mod backend;
mod store;

pub use backend::{JsonFileBackend, MemoryBackend, SettingsBackend};
pub use store::{SettingsError, SettingsStore};
