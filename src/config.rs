//! Runtime settings
//!
//! Read from `settings.ron` in the platform config directory. A missing
//! file yields the defaults; every field is optional in the file.

use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::CATALOG_FILE;
use crate::inventory::GROUND_SIZE;

pub const SETTINGS_FILE: &str = "settings.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Catalog file, relative paths resolve against the working directory
    pub catalog_path: PathBuf,
    pub ground_size: (u8, u8),
    pub spoils_size: (u8, u8),
    pub spoils_boxes: usize,
    /// Entities rolled per spoils box (inclusive)
    pub loot_count: (usize, usize),
    /// Fixed loot seed; random when unset
    pub seed: Option<u64>,
    /// Loot must be searched before it can be picked up
    pub need_search: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(CATALOG_FILE),
            ground_size: GROUND_SIZE,
            spoils_size: (7, 8),
            spoils_boxes: 3,
            loot_count: (4, 12),
            seed: None,
            need_search: false,
        }
    }
}

impl Settings {
    /// Get the platform config directory
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stashgrid", "Stashgrid").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Load settings from the platform config directory
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_dir() {
            Some(dir) => Self::load_from(&dir.join(SETTINGS_FILE)),
            None => {
                log::warn!("No config directory, using default settings");
                Ok(Self::default())
            }
        }
    }

    /// Load settings from a file (RON, or JSON by extension)
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let settings: Settings = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => ron::from_str(&content)?,
        };
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [("ground_size", self.ground_size), ("spoils_size", self.spoils_size)];
        if let Some((name, _)) = sizes.iter().find(|(_, (w, h))| *w == 0 || *h == 0) {
            return Err(ConfigError::Invalid(format!("{} must be non-zero", name)));
        }
        if self.loot_count.0 > self.loot_count.1 {
            return Err(ConfigError::Invalid(format!(
                "loot_count range {}..={} is empty",
                self.loot_count.0, self.loot_count.1
            )));
        }
        Ok(())
    }

    pub fn loot_range(&self) -> RangeInclusive<usize> {
        self.loot_count.0..=self.loot_count.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("stashgrid-config-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        dir
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = make_test_dir("missing");
        let settings = Settings::load_from(&dir.join("nope.ron")).expect("defaults");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.ground_size, (15, 8));
    }

    #[test]
    fn test_partial_ron_file() {
        let dir = make_test_dir("partial");
        let path = dir.join(SETTINGS_FILE);
        fs::write(&path, "(seed: Some(99), spoils_boxes: 1)").expect("write");

        let settings = Settings::load_from(&path).expect("settings");
        assert_eq!(settings.seed, Some(99));
        assert_eq!(settings.spoils_boxes, 1);
        assert_eq!(settings.catalog_path, PathBuf::from(CATALOG_FILE));
        assert!(!settings.need_search);

        fs::write(&path, "(need_search: true)").expect("write");
        let settings = Settings::load_from(&path).expect("settings");
        assert!(settings.need_search);
        assert_eq!(settings.spoils_boxes, Settings::default().spoils_boxes);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = make_test_dir("invalid");
        let path = dir.join(SETTINGS_FILE);
        fs::write(&path, "(loot_count: (9, 2))").expect("write");
        assert!(matches!(Settings::load_from(&path), Err(ConfigError::Invalid(_))));

        fs::write(&path, "(ground_size: (0, 8))").expect("write");
        assert!(matches!(Settings::load_from(&path), Err(ConfigError::Invalid(_))));

        fs::write(&path, "(ground_size: ").expect("write");
        assert!(matches!(Settings::load_from(&path), Err(ConfigError::Ron(_))));
        let _ = fs::remove_dir_all(dir);
    }
}
