/// Application configuration: load, save, and sanitize.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Color modes accepted by `default_color_mode`.
pub const COLOR_MODES: [&str; 3] = ["rgb", "grayscale", "indexed"];

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Whether edits are recorded in the undo history.
    pub undo_enabled: bool,
    /// Undo history size in megabytes before the oldest steps are dropped (1..=1024).
    pub undo_size_limit_mb: u32,
    pub default_sprite_width: u32,
    pub default_sprite_height: u32,
    /// One of `"rgb"`, `"grayscale"` or `"indexed"`.
    pub default_color_mode: String,
    /// Duration of new frames in milliseconds (1..=65535).
    pub default_frame_duration_ms: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            undo_enabled: true,
            undo_size_limit_mb: 8,
            default_sprite_width: 32,
            default_sprite_height: 32,
            default_color_mode: "rgb".to_string(),
            default_frame_duration_ms: 100,
        }
    }
}

impl AppConfig {
    /// Returns the config file path: exe directory + `pixpad.json`.
    pub fn config_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join("pixpad.json")))
            .unwrap_or_else(|| PathBuf::from("pixpad.json"))
    }

    /// Loads config from `path`, creating a default file if it doesn't exist.
    /// Returns defaults on any error (missing file, parse error, etc.).
    pub fn load_or_create(path: &std::path::Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                    Ok(mut config) => {
                        config.sanitize();
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {}: {e}", path.display());
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {}: {e}", path.display());
                }
            }
            // Broken files are left in place.
            Self::default()
        } else {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!("Failed to create default config at {}: {e}", path.display());
            }
            config
        }
    }

    /// Saves config to `path` as pretty-printed JSON.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Undo retention limit in bytes.
    pub fn undo_size_limit_bytes(&self) -> usize {
        self.undo_size_limit_mb as usize * 1024 * 1024
    }

    /// Clamps values to valid ranges and resets invalid fields.
    pub fn sanitize(&mut self) {
        self.undo_size_limit_mb = self.undo_size_limit_mb.clamp(1, 1024);
        self.default_sprite_width = self.default_sprite_width.clamp(1, 4096);
        self.default_sprite_height = self.default_sprite_height.clamp(1, 4096);
        self.default_frame_duration_ms = self.default_frame_duration_ms.clamp(1, 65535);

        let mode = self.default_color_mode.to_ascii_lowercase();
        if COLOR_MODES.contains(&mode.as_str()) {
            self.default_color_mode = mode;
        } else {
            self.default_color_mode = "rgb".to_string();
        }
    }
}
