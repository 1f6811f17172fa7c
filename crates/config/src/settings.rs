// Filter popup settings
// Loaded from ~/.config/gridfilter/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Which surface the autofilter button opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupStyle {
    /// Multi-select list of checkboxes plus sort/filter actions
    #[default]
    Checklist,
    /// Single-select list: Top 10, Standard Filter, Empty, Not Empty, values
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Query
    #[serde(rename = "query.maxEntries")]
    pub max_entries: usize,

    #[serde(rename = "query.caseSensitive")]
    pub case_sensitive: bool,

    // Popup
    #[serde(rename = "popup.style")]
    pub popup_style: PopupStyle,

    #[serde(rename = "popup.busyThreshold")]
    pub busy_threshold: usize,

    #[serde(rename = "popup.topCount")]
    pub top_count: usize,

    #[serde(rename = "popup.allowEmptySet")]
    pub allow_empty_set: bool,

    // Grid geometry (pixels)
    #[serde(rename = "grid.defaultColumnWidth")]
    pub default_column_width: i32,

    #[serde(rename = "grid.rowHeight")]
    pub row_height: i32,

    #[serde(rename = "grid.autoFilterButtonSize")]
    pub autofilter_button_size: i32,

    #[serde(rename = "grid.fillHandleSize")]
    pub fill_handle_size: i32,

    #[serde(rename = "grid.hitTolerance")]
    pub hit_tolerance: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Query
            max_entries: 8,
            case_sensitive: false,
            // Popup
            popup_style: PopupStyle::Checklist,
            busy_threshold: 100,
            top_count: 10,
            allow_empty_set: false,
            // Grid
            default_column_width: 80,
            row_height: 24,
            autofilter_button_size: 16,
            fill_handle_size: 6,
            hit_tolerance: 2,
        }
    }
}

/// Drop `//` comment lines so the file can carry explanations.
fn strip_comments(contents: &str) -> String {
    contents
        .lines()
        .filter(|line| !line.trim().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

const DEFAULT_CONFIG: &str = r#"{
    // Query model: number of filter conditions per range
    "query.maxEntries": 8,
    "query.caseSensitive": false,

    // Autofilter popup ("checklist" or "list")
    "popup.style": "checklist",
    "popup.busyThreshold": 100,
    "popup.topCount": 10,
    "popup.allowEmptySet": false,

    // Grid geometry in pixels
    "grid.defaultColumnWidth": 80,
    "grid.rowHeight": 24,
    "grid.autoFilterButtonSize": 16,
    "grid.fillHandleSize": 6,
    "grid.hitTolerance": 2
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridfilter")
            .join("settings.json")
    }

    /// Load settings from the default path, falling back to defaults.
    /// A missing file is created with commented defaults.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            if let Err(e) = Self::create_default_file(&path) {
                log::warn!("could not write default settings to {}: {}", path.display(), e);
            }
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }

    /// Strict load: read and parse `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let settings: Settings =
            serde_json::from_str(&strip_comments(&contents)).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(settings.sanitized())
    }

    /// Save current settings to the default path
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    fn create_default_file(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG)?;
        Ok(())
    }

    /// Clamp values that would make the popup unusable.
    fn sanitized(mut self) -> Self {
        if self.max_entries == 0 {
            log::warn!("query.maxEntries must be at least 1; using 1");
            self.max_entries = 1;
        }
        if self.top_count == 0 {
            self.top_count = Settings::default().top_count;
        }
        self
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}
