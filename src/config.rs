//! User configuration.
//!
//! Read from `scribblepad.toml` in the working directory, falling back to the
//! platform config directory. A missing or malformed file yields defaults so
//! the app always starts. Unknown keys are ignored. There is no key for the
//! gutter width; it is fixed.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

use crate::util::{config_dir, data_dir};

pub const CONFIG_FILE: &str = "scribblepad.toml";

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct StorageConfig {
    /// Overrides `<data_dir>/notes.db`.
    #[serde(default)]
    pub database: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EditorConfig {
    #[serde(default = "EditorConfig::default_font_family")]
    pub font_family: String,
    #[serde(default = "EditorConfig::default_font_size")]
    pub font_size: f32,
    #[serde(default = "EditorConfig::default_line_height")]
    pub line_height: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            font_family: Self::default_font_family(),
            font_size: Self::default_font_size(),
            line_height: Self::default_line_height(),
        }
    }
}

impl EditorConfig {
    fn default_font_family() -> String {
        "Menlo".to_string()
    }
    const fn default_font_size() -> f32 {
        14.0
    }
    const fn default_line_height() -> f32 {
        20.0
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct WindowConfig {
    #[serde(default = "WindowConfig::default_width")]
    pub width: f32,
    #[serde(default = "WindowConfig::default_height")]
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
        }
    }
}

impl WindowConfig {
    pub const MIN_WIDTH: f32 = 700.0;
    pub const MIN_HEIGHT: f32 = 500.0;

    const fn default_width() -> f32 {
        1000.0
    }
    const fn default_height() -> f32 {
        710.0
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LogConfig {
    #[serde(default = "LogConfig::default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
        }
    }
}

impl LogConfig {
    fn default_filter() -> String {
        "info".to_string()
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database
            .clone()
            .unwrap_or_else(|| data_dir().join("notes.db"))
    }

    /// Clamps values that would make the editor unusable.
    fn sanitized(mut self) -> Self {
        if !(6.0..=72.0).contains(&self.editor.font_size) {
            warn!(target: "config", font_size = self.editor.font_size, "font_size_out_of_range");
            self.editor.font_size = EditorConfig::default_font_size();
        }
        if self.editor.line_height < self.editor.font_size {
            self.editor.line_height = (self.editor.font_size * 1.4).round();
        }
        self.window.width = self.window.width.max(WindowConfig::MIN_WIDTH);
        self.window.height = self.window.height.max(WindowConfig::MIN_HEIGHT);
        self
    }
}

/// Local `scribblepad.toml` first, then the platform config directory.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    config_dir().join(CONFIG_FILE)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<Config>(&content) {
        Ok(config) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(config.sanitized())
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed");
            Ok(Config::default())
        }
    }
}
