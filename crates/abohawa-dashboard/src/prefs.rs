//! Best-effort preference persistence.
//!
//! One JSON file in the config directory. Read and write failures are
//! logged and swallowed by `load`/`save`; the `try_*` variants expose them.

use std::fs;
use std::path::{Path, PathBuf};

use abohawa_core::AppError;
use abohawa_weather::TemperatureUnit;
use serde::{Deserialize, Serialize};

pub const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub unit: Option<TemperatureUnit>,

    /// Last location that loaded successfully
    #[serde(default)]
    pub last_location: Option<SavedLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(PREFERENCES_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored preferences, or defaults if missing or unreadable.
    pub fn load(&self) -> Preferences {
        match self.try_load() {
            Ok(prefs) => prefs,
            Err(e) => {
                tracing::warn!("Ignoring unreadable preferences at {:?}: {}", self.path, e);
                Preferences::default()
            }
        }
    }

    pub fn try_load(&self) -> Result<Preferences, AppError> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let json = fs::read_to_string(&self.path)?;
        serde_json::from_str(&json)
            .map_err(|e| AppError::Storage(format!("Failed to parse preferences: {}", e)))
    }

    pub fn save(&self, prefs: &Preferences) {
        if let Err(e) = self.try_save(prefs) {
            tracing::warn!("Failed to save preferences to {:?}: {}", self.path, e);
        }
    }

    /// Write through a temp file so a crash never leaves half a document.
    pub fn try_save(&self, prefs: &Preferences) -> Result<(), AppError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| AppError::Storage("preference path has no parent".to_string()))?;
        fs::create_dir_all(parent)?;

        let json = serde_json::to_string_pretty(prefs)
            .map_err(|e| AppError::Storage(format!("Failed to serialize preferences: {}", e)))?;
        let tmp_path = self.path.with_extension(format!("{}.tmp", std::process::id()));
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!("Saved preferences to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path());
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("nested"));
        let prefs = Preferences {
            unit: Some(TemperatureUnit::Fahrenheit),
            last_location: Some(SavedLocation {
                name: "Sylhet".to_string(),
                latitude: 24.8949,
                longitude: 91.8687,
            }),
        };

        store.try_save(&prefs).unwrap();
        assert_eq!(store.try_load().unwrap(), prefs);
    }

    #[test]
    fn test_corrupt_file_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path());
        fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(store.try_load(), Err(AppError::Storage(_))));
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn test_unwritable_location_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        // Parent is a regular file, so the directory cannot be created.
        let store = PreferenceStore::new(blocker.join("sub"));

        assert!(store.try_save(&Preferences::default()).is_err());
        store.save(&Preferences::default());
    }
}
