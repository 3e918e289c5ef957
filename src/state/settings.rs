/// User settings, stored as JSON next to the other per-user config.
///
/// Every field has a default so a partial (or missing) file is fine.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::Result;

/// How raw sidecar filenames are matched against an image's base name
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SidecarCase {
    /// Only the configured extension, exactly as written (e.g. `.ARW`)
    #[default]
    Exact,
    /// Any casing of the configured extension (`.ARW`, `.arw`, `.Arw`, ...)
    Any,
}

/// Which records a discard run consumes
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscardScope {
    /// Only the folder currently open
    #[default]
    Folder,
    /// Every folder ever opened
    All,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Number of files per listing page
    pub page_size: usize,
    /// Image extensions picked up from a folder (matched case-insensitively)
    pub image_extensions: Vec<String>,
    /// Extensions of raw sidecars deleted alongside an image
    pub raw_extensions: Vec<String>,
    pub sidecar_case: SidecarCase,
    pub discard_scope: DiscardScope,
    /// Lockout after each rotation step, in milliseconds
    pub rotation_settle_ms: u64,
    /// Height the picture is scaled to for display
    pub preview_height: u32,
    /// Override for the database file location
    pub database: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: 25,
            image_extensions: vec!["jpg".to_string(), "jpeg".to_string()],
            raw_extensions: vec!["ARW".to_string()],
            sidecar_case: SidecarCase::Exact,
            discard_scope: DiscardScope::Folder,
            rotation_settle_ms: 200,
            preview_height: 720,
            database: None,
        }
    }
}

impl Settings {
    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.page_size = settings.page_size.max(1);
        Ok(settings)
    }

    /// Load settings from `path`, falling back to defaults when the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => {
                let settings = Self::from_json(&json)?;
                info!("⚙️  Loaded settings from {}", path.display());
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load from the user's config directory:
    /// - Linux: ~/.config/photo-triage/settings.json
    /// - macOS: ~/Library/Application Support/photo-triage/settings.json
    /// - Windows: %APPDATA%\photo-triage\settings.json
    pub fn load() -> Result<Self> {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    fn settings_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("photo-triage");
        path.push("settings.json");
        Some(path)
    }

    /// Where the annotation database lives unless `database` overrides it
    pub fn database_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.database {
            return Some(path.clone());
        }

        let mut path = dirs::data_dir().or_else(dirs::home_dir)?;
        path.push("photo-triage");
        path.push("triage.db");
        Some(path)
    }

    pub fn rotation_settle(&self) -> Duration {
        Duration::from_millis(self.rotation_settle_ms)
    }
}
