//! Settings persistence for the terminal front end.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use shared::settings::AppSettings;
use std::fs;
use std::path::{Path, PathBuf};

pub fn settings_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "uigenius", "uigenius")
        .map(|dirs| dirs.config_dir().join("settings.json"))
}

/// Missing file means first run: defaults, not an error.
pub fn load_settings_from(path: &Path) -> Result<AppSettings> {
    if !path.exists() {
        return Ok(AppSettings::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings at {}", path.display()))
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let raw = serde_json::to_string_pretty(settings)?;
    fs::write(path, raw)
        .with_context(|| format!("failed to write settings to {}", path.display()))
}

/// Best-effort load for startup: a broken settings file falls back to
/// defaults with a warning rather than aborting the app.
pub fn load_settings() -> AppSettings {
    let Some(path) = settings_path() else {
        tracing::warn!("no config directory available; using default settings");
        return AppSettings::default();
    };
    match load_settings_from(&path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings; using defaults");
            AppSettings::default()
        }
    }
}
