use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;
use crate::decode::InversionMode;

pub const API_URL_ENV: &str = "INVENTORY_API_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScannerSettings {
    /// Inventory service root. `None` means the built-in default.
    pub api_base_url: Option<String>,
    pub inversion: InversionMode,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ScannerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                ScannerSettings::default()
            })
        } else {
            ScannerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> ScannerSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, settings: ScannerSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    /// Environment override, then the saved value, then the default.
    pub fn api_base_url(&self) -> String {
        resolve_base_url(
            std::env::var(API_URL_ENV).ok(),
            self.settings().api_base_url.as_deref(),
        )
    }

    fn persist(&self, data: &ScannerSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

fn resolve_base_url(env: Option<String>, saved: Option<&str>) -> String {
    env.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            saved
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("inventory-scanner-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = SettingsStore::new(temp_path("settings.json")).unwrap();
        assert_eq!(store.settings(), ScannerSettings::default());
    }

    #[test]
    fn update_persists_across_reload() {
        let path = temp_path("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();
        let settings = ScannerSettings {
            api_base_url: Some("https://inventory.example.org/api".into()),
            inversion: InversionMode::AttemptBoth,
        };
        store.update(settings.clone()).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.settings(), settings);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let path = temp_path("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.settings(), ScannerSettings::default());
    }

    #[test]
    fn base_url_precedence() {
        assert_eq!(
            resolve_base_url(Some("http://env:1".into()), Some("http://saved:2")),
            "http://env:1"
        );
        assert_eq!(
            resolve_base_url(Some("  ".into()), Some("http://saved:2")),
            "http://saved:2"
        );
        assert_eq!(resolve_base_url(None, None), DEFAULT_BASE_URL);
        assert_eq!(resolve_base_url(None, Some("")), DEFAULT_BASE_URL);
    }
}
