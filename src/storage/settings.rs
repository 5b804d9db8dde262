//! `settings.json`: UI, collection and HTTP preferences

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_AUTO_SAVE_INTERVAL, MAX_AUTO_SAVE_INTERVAL, MIN_AUTO_SAVE_INTERVAL};
use crate::error::{CoreError, Result};
use crate::storage::layout::{read_file, write_atomic};

pub fn clamp_auto_save_interval(seconds: u64) -> u64 {
    seconds.clamp(MIN_AUTO_SAVE_INTERVAL, MAX_AUTO_SAVE_INTERVAL)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub theme: String,
    pub active_tab: u32,
}

impl Default for UiSettings {
    fn default() -> Self {
        UiSettings {
            theme: "dark".to_string(),
            active_tab: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    pub auto_save_enabled: bool,
    /// Seconds, kept within 30..=3600
    pub auto_save_interval: u64,
    /// Id of the collection active at last shutdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active_collection: Option<String>,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        CollectionSettings {
            auto_save_enabled: true,
            auto_save_interval: DEFAULT_AUTO_SAVE_INTERVAL,
            last_active_collection: None,
        }
    }
}

/// Transport behaviour
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub ssl_verify_enabled: bool,
    /// Seconds
    pub timeout: u64,
    pub follow_redirects: bool,
    pub max_redirects: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            ssl_verify_enabled: true,
            timeout: 30,
            follow_redirects: true,
            max_redirects: 10,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ui: UiSettings,
    pub collections: CollectionSettings,
    pub http: HttpSettings,
}

impl Settings {
    /// Read settings, falling back to defaults on any failure.
    pub fn load(path: &Path) -> Settings {
        match Self::try_load(path) {
            Ok(settings) => settings,
            Err(CoreError::FileNotFound(_)) => Settings::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Using default settings");
                Settings::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Settings> {
        let bytes = read_file(path)?;
        let mut settings: Settings =
            serde_json::from_slice(&bytes).map_err(|e| CoreError::InvalidJson {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        settings.normalize();
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self).map_err(|e| CoreError::InvalidJson {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        write_atomic(path, &bytes)
    }

    pub fn set_auto_save_interval(&mut self, seconds: u64) {
        self.collections.auto_save_interval = clamp_auto_save_interval(seconds);
    }

    fn normalize(&mut self) {
        self.collections.auto_save_interval =
            clamp_auto_save_interval(self.collections.auto_save_interval);
        if self
            .collections
            .last_active_collection
            .as_deref()
            .is_some_and(str::is_empty)
        {
            self.collections.last_active_collection = None;
        }
    }
}
