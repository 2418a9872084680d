//! Overlay settings and their persistence.
//!
//! The core reads a single value from the settings, the update rate, when an
//! overlay is initialized and when it is enabled. The remaining fields carry
//! the plugin metadata so that a settings file identifies the overlay that
//! wrote it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Result;

/// Update rate used when none is configured: 60 updates per second.
pub const DEFAULT_UPDATE_RATE_MILLIS: u64 = 1000 / 60;

/// Persisted overlay settings.
///
/// Missing fields deserialize to their defaults, so older files keep
/// loading after fields are added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// Minimum time between two ticks, in milliseconds. Zero selects
    /// [`DEFAULT_UPDATE_RATE_MILLIS`].
    pub update_rate_millis: u64,
    /// Present frames in sync with the display refresh.
    pub limit_fps: bool,
    /// Plugin identifier.
    pub identifier: String,
    /// Plugin author.
    pub author: String,
    /// Plugin name.
    pub name: String,
    /// Plugin version.
    pub version: String,
    /// Plugin description.
    pub description: String,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            update_rate_millis: DEFAULT_UPDATE_RATE_MILLIS,
            limit_fps: false,
            identifier: String::new(),
            author: String::new(),
            name: String::new(),
            version: String::new(),
            description: String::new(),
        }
    }
}

impl OverlaySettings {
    /// The tick interval.
    pub fn update_interval(&self) -> Duration {
        match self.update_rate_millis {
            0 => Duration::from_millis(DEFAULT_UPDATE_RATE_MILLIS),
            millis => Duration::from_millis(millis),
        }
    }
}

/// Load/save access to an [`OverlaySettings`] value.
pub trait SettingsStore {
    /// The settings as last loaded or modified.
    fn current(&self) -> &OverlaySettings;

    /// Mutable access to the in-memory settings. Changes are persisted by
    /// [`save`](Self::save).
    fn current_mut(&mut self) -> &mut OverlaySettings;

    /// Replace the in-memory settings with the persisted ones. If nothing has
    /// been persisted yet, the current settings are saved first.
    fn load(&mut self) -> Result<()>;

    /// Persist the in-memory settings.
    fn save(&mut self) -> Result<()>;
}

/// Settings persisted as pretty-printed JSON.
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
    backup_on_save: bool,
    settings: OverlaySettings,
}

impl JsonSettingsStore {
    /// Store backed by the file at `path`, holding defaults until loaded.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), backup_on_save: true, settings: OverlaySettings::default() }
    }

    /// Whether [`save`](SettingsStore::save) copies the existing file to a
    /// timestamped backup before overwriting it. Enabled by default.
    pub fn with_backup_on_save(mut self, backup_on_save: bool) -> Self {
        self.backup_on_save = backup_on_save;
        self
    }

    /// Path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path the backup of the current file would be written to now.
    ///
    /// The backup sits next to the settings file and carries the local time
    /// in its name, e.g. `overlay-2024-03-01-18-30-00.json`.
    pub fn backup_path(&self) -> PathBuf {
        let stem = self.path.file_stem().and_then(|s| s.to_str()).unwrap_or("settings");
        let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
        let file_name = match self.path.extension().and_then(|e| e.to_str()) {
            Some(extension) => format!("{stem}-{timestamp}.{extension}"),
            None => format!("{stem}-{timestamp}"),
        };
        self.path.with_file_name(file_name)
    }
}

impl SettingsStore for JsonSettingsStore {
    fn current(&self) -> &OverlaySettings {
        &self.settings
    }

    fn current_mut(&mut self) -> &mut OverlaySettings {
        &mut self.settings
    }

    fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            info!("No settings at {}, saving defaults", self.path.display());
            self.save()?;
        }

        let json = fs::read_to_string(&self.path)?;
        self.settings = serde_json::from_str(&json)?;
        debug!("Loaded settings from {}", self.path.display());
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        if self.backup_on_save && self.path.exists() {
            let backup = self.backup_path();
            fs::copy(&self.path, &backup)?;
            debug!("Backed up settings to {}", backup.display());
        }

        fs::write(&self.path, serde_json::to_string_pretty(&self.settings)?)?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// Settings kept in memory, for hosts that persist them elsewhere.
#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStore {
    settings: OverlaySettings,
    saved: Option<OverlaySettings>,
}

impl MemorySettingsStore {
    /// Store holding `settings`, with nothing saved yet.
    pub fn new(settings: OverlaySettings) -> Self {
        Self { settings, saved: None }
    }

    /// The last saved settings.
    pub fn saved(&self) -> Option<&OverlaySettings> {
        self.saved.as_ref()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn current(&self) -> &OverlaySettings {
        &self.settings
    }

    fn current_mut(&mut self) -> &mut OverlaySettings {
        &mut self.settings
    }

    fn load(&mut self) -> Result<()> {
        match &self.saved {
            Some(saved) => self.settings = saved.clone(),
            None => self.save()?,
        }
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        self.saved = Some(self.settings.clone());
        Ok(())
    }
}
