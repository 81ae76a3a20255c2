use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{IntakeError, Result};
use crate::models::EntityId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub business_id: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            business_id: None,
            owner_id: None,
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("intake.db")
    }

    /// The configured business, validated. Missing or malformed ids are an
    /// error; there is no fallback business.
    pub fn business(&self) -> Result<EntityId> {
        match self.business_id.as_deref() {
            Some(raw) => EntityId::parse(raw),
            None => Err(IntakeError::Settings(
                "no business configured; run `intake init --business <uuid>`".to_string(),
            )),
        }
    }

    pub fn owner(&self) -> Result<EntityId> {
        match self.owner_id.as_deref() {
            Some(raw) => EntityId::parse(raw),
            None => Err(IntakeError::Settings(
                "no owner configured; run `intake init --owner <uuid>`".to_string(),
            )),
        }
    }
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// `~/.config/intake`: settings and the recent-file memory live here.
pub fn config_dir() -> PathBuf {
    home().join(".config").join("intake")
}

fn default_data_dir() -> PathBuf {
    home().join("Documents").join("intake")
}

pub fn load_settings() -> Settings {
    load_settings_from(&config_dir().join("settings.json"))
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&config_dir().join("settings.json"), settings)
}

/// Read settings from `path`. A missing file gives defaults; an unreadable
/// or malformed one is logged and also gives defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    let parsed = std::fs::read_to_string(path)
        .map_err(IntakeError::from)
        .and_then(|content| serde_json::from_str::<Settings>(&content).map_err(IntakeError::from));
    parsed.unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "ignoring settings file, using defaults");
        Settings::default()
    })
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

/// Expand a leading `~` and make the data dir absolute when it exists.
pub fn expand_data_dir(raw: &str) -> String {
    let expanded = match raw.strip_prefix('~') {
        Some(rest) => format!("{}{rest}", home().display()),
        None => raw.to_string(),
    };
    std::fs::canonicalize(&expanded)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or(expanded)
}
