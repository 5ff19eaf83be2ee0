use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use facecam_core::shared::constants::APP_DIR_NAME;

const MIN_FONT_SCALE: f32 = 0.5;
const MAX_FONT_SCALE: f32 = 2.0;

/// Appearance preferences. Read at startup, never written.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub high_contrast: bool,
    pub font_scale: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            high_contrast: false,
            font_scale: 1.0,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing or malformed files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        let settings: Self = fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();
        settings.sanitized()
    }

    fn sanitized(mut self) -> Self {
        self.font_scale = if self.font_scale.is_finite() {
            self.font_scale.clamp(MIN_FONT_SCALE, MAX_FONT_SCALE)
        } else {
            1.0
        };
        self
    }
}
