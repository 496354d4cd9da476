//! Settings management

use brisk_core::math::Vec2;
use brisk_core::WorldConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub title: String,
    #[serde(default)]
    pub window: WindowSettings,
    /// Relative paths resolve against the settings file's directory.
    #[serde(default = "default_resource_root")]
    pub resource_root: PathBuf,
    /// Scene loaded at startup, by name.
    pub entry_scene: String,
    /// Script evaluated at startup, relative to the resource root.
    #[serde(default)]
    pub entry_script: Option<PathBuf>,
    #[serde(default)]
    pub physics: PhysicsSettings,
    /// Stop after this many ticks. Unbounded when absent.
    #[serde(default)]
    pub max_ticks: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    /// Resolution the game is authored at; scaled to the window.
    pub virtual_width: u32,
    pub virtual_height: u32,
    #[serde(default)]
    pub fullscreen: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsSettings {
    pub cell_size: f32,
    pub id_reuse_threshold: usize,
}

fn default_resource_root() -> PathBuf {
    PathBuf::from("res")
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            virtual_width: 320,
            virtual_height: 180,
            fullscreen: false,
        }
    }
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        let world = WorldConfig::default();
        Self {
            cell_size: world.cell_size,
            id_reuse_threshold: world.id_reuse_threshold,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            title: "brisk".to_string(),
            window: WindowSettings::default(),
            resource_root: default_resource_root(),
            entry_scene: "main".to_string(),
            entry_script: None,
            physics: PhysicsSettings::default(),
            max_ticks: None,
        }
    }
}

impl Settings {
    /// Read, parse and validate a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Settings =
            serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if settings.resource_root.is_relative() {
            if let Some(dir) = path.parent() {
                settings.resource_root = dir.join(&settings.resource_root);
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let window = &self.window;
        if window.width == 0 || window.height == 0 {
            return Err(SettingsError::Invalid(format!(
                "window size {}x{} must be non-zero",
                window.width, window.height
            )));
        }
        if window.virtual_width == 0 || window.virtual_height == 0 {
            return Err(SettingsError::Invalid(format!(
                "virtual resolution {}x{} must be non-zero",
                window.virtual_width, window.virtual_height
            )));
        }
        let cell_size = self.physics.cell_size;
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(SettingsError::Invalid(format!(
                "physics cell size {} must be positive and finite",
                self.physics.cell_size
            )));
        }
        if self.entry_scene.trim().is_empty() {
            return Err(SettingsError::Invalid("entry scene is empty".to_string()));
        }
        Ok(())
    }

    /// Entry script resolved against the resource root.
    pub fn entry_script_path(&self) -> Option<PathBuf> {
        self.entry_script
            .as_ref()
            .map(|script| self.resource_root.join(script))
    }

    /// Values the core needs, as plain data.
    pub fn world_config(&self) -> WorldConfig {
        WorldConfig {
            cell_size: self.physics.cell_size,
            id_reuse_threshold: self.physics.id_reuse_threshold,
            viewport: Vec2::new(
                self.window.virtual_width as f32,
                self.window.virtual_height as f32,
            ),
        }
    }
}
