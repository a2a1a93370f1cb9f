// Engine settings
// Loaded from ~/.config/cubesheet/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use cubesheet_core::Shape;
use cubesheet_engine::attributes::default_attributes;
use cubesheet_engine::options::DEFAULT_MAX_RECURSION_DEPTH;
use cubesheet_engine::unredo::DEFAULT_MAX_UNREDO;
use cubesheet_engine::GridOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Grid
    /// Shape of a new grid as [rows, cols, tables]
    #[serde(rename = "grid.defaultShape")]
    pub default_shape: [usize; 3],

    // Undo
    #[serde(rename = "undo.maxEntries")]
    pub max_undo_entries: usize,

    // Evaluation
    #[serde(rename = "eval.maxRecursionDepth")]
    pub max_recursion_depth: usize,

    #[serde(rename = "eval.safeMode")]
    pub safe_mode: bool,

    // Cells
    #[serde(rename = "cells.defaultFont")]
    pub default_font: String,

    #[serde(rename = "cells.defaultPointSize")]
    pub default_point_size: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_shape: [1000, 100, 3],
            max_undo_entries: DEFAULT_MAX_UNREDO,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            safe_mode: false,
            default_font: "Sans".to_string(),
            default_point_size: 10,
        }
    }
}

const DEFAULT_FILE: &str = r#"{
    // Shape of a new grid: [rows, cols, tables]
    "grid.defaultShape": [1000, 100, 3],

    // Undo history is dropped once it grows past this many entries
    "undo.maxEntries": 5000,

    // Evaluation
    "eval.maxRecursionDepth": 200,
    "eval.safeMode": false,

    // Cell defaults
    "cells.defaultFont": "Sans",
    "cells.defaultPointSize": 10
}
"#;

/// Drop `//` comment lines so the rest parses as JSON.
fn strip_comments(contents: &str) -> String {
    contents
        .lines()
        .filter(|line| !line.trim().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cubesheet");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            Self::create_default_file(&path);
            return Self::default();
        }

        Self::load_from(&path)
    }

    /// Load settings from `path`. Unreadable or invalid files give defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&strip_comments(&contents)) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Create default settings file with comments
    fn create_default_file(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }

        if let Err(e) = fs::write(path, DEFAULT_FILE) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }

    pub fn default_shape(&self) -> Shape {
        Shape::from(self.default_shape)
    }

    /// Engine options for a new grid.
    pub fn grid_options(&self) -> GridOptions {
        GridOptions {
            max_unredo: self.max_undo_entries,
            max_recursion_depth: self.max_recursion_depth,
            safe_mode: self.safe_mode,
            default_attributes: default_attributes(&self.default_font, self.default_point_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubesheet_engine::AttrValue;

    #[test]
    fn test_default_file_matches_defaults() {
        let parsed: Settings = serde_json::from_str(&strip_comments(DEFAULT_FILE)).unwrap();
        assert_eq!(parsed, Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{\n  // tighter limits\n  \"undo.maxEntries\": 50,\n  \"eval.safeMode\": true\n}").unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.max_undo_entries, 50);
        assert!(settings.safe_mode);
        assert_eq!(settings.default_shape, [1000, 100, 3]);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
        assert_eq!(Settings::load_from(&dir.path().join("missing.json")), Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            default_shape: [10, 5, 1],
            default_font: "Mono".to_string(),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_grid_options() {
        let settings = Settings {
            max_recursion_depth: 30,
            default_point_size: 14,
            ..Settings::default()
        };
        let options = settings.grid_options();
        assert_eq!(options.max_recursion_depth, 30);
        assert_eq!(options.max_unredo, DEFAULT_MAX_UNREDO);
        assert_eq!(options.default_attributes.get("pointsize"), Some(&AttrValue::Int(14)));
        assert_eq!(settings.default_shape(), Shape::new(1000, 100, 3));
    }
}
