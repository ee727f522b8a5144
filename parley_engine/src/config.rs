//! Runtime configuration loaded from `parley.toml`.
//!
//! Every field is optional. A missing or unreadable file falls back to the
//! defaults, so the driver always has something to run with.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::data_paths::data_path;

pub const CONFIG_FILE: &str = "parley.toml";

/// Complete driver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    /// Compiled dialogue file. Relative paths resolve against the data directory.
    pub dialogue: PathBuf,
    /// Directory holding flag save files.
    pub save_dir: PathBuf,
    /// Keep REPL input history between runs.
    pub history: bool,
    pub localization: LocalizationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    pub enabled: bool,
    /// Directory of `<table>.toml` files. Relative paths resolve against the data directory.
    pub tables_dir: PathBuf,
}

impl Default for ParleyConfig {
    fn default() -> Self {
        Self {
            dialogue: PathBuf::from("dialogue.ron"),
            save_dir: PathBuf::from("saved_flags"),
            history: true,
            localization: LocalizationConfig::default(),
        }
    }
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tables_dir: PathBuf::from("tables"),
        }
    }
}

impl ParleyConfig {
    /// Path of the dialogue file, resolved against the data directory if relative.
    pub fn dialogue_path(&self) -> PathBuf {
        resolve(&self.dialogue)
    }

    /// Path of the localization tables directory, resolved against the data directory if relative.
    pub fn tables_path(&self) -> PathBuf {
        resolve(&self.localization.tables_dir)
    }
}

fn resolve(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_path(path)
    }
}

/// Loads configuration from a TOML file, falling back to defaults on error.
///
/// This function never fails. Problems are logged with `warn!`.
pub fn load_config(toml_path: &Path) -> ParleyConfig {
    match try_load_config(toml_path) {
        Ok(config) => {
            info!("configuration loaded from '{}'", toml_path.display());
            config
        },
        Err(e) => {
            warn!(
                "Could not load configuration from '{}': {:#}. Using defaults.",
                toml_path.display(),
                e
            );
            ParleyConfig::default()
        },
    }
}

/// Attempts to load configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
fn try_load_config(toml_path: &Path) -> Result<ParleyConfig> {
    let raw = fs::read_to_string(toml_path)
        .with_context(|| format!("reading configuration from '{}'", toml_path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing configuration from '{}'", toml_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "history = false\n\n[localization]\nenabled = true\n").expect("write config");

        let config = load_config(&path);
        assert!(!config.history);
        assert!(config.localization.enabled);
        assert_eq!(config.localization.tables_dir, PathBuf::from("tables"));
        assert_eq!(config.dialogue, PathBuf::from("dialogue.ron"));
    }

    #[test]
    fn missing_or_broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(load_config(&dir.path().join("absent.toml")), ParleyConfig::default());

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "history = \"maybe").expect("write config");
        assert_eq!(load_config(&broken), ParleyConfig::default());
    }

    #[test]
    fn absolute_paths_are_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ParleyConfig {
            dialogue: dir.path().join("custom.ron"),
            ..ParleyConfig::default()
        };
        assert_eq!(config.dialogue_path(), dir.path().join("custom.ron"));
    }

    #[test]
    fn config_serializes_with_expected_keys() {
        let value = serde_json::to_value(ParleyConfig::default()).expect("serialize config");
        assert_eq!(value["history"], serde_json::Value::Bool(true));
        assert_eq!(value["localization"]["enabled"], serde_json::Value::Bool(false));
    }
}
