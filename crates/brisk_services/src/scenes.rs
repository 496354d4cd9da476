//! Scene definitions on disk

use brisk_core::scene::SceneDefinition;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Subdirectory of the resource root holding `<name>.json` scene files.
pub const SCENE_DIR: &str = "scenes";

#[derive(Debug, Error)]
pub enum SceneLibraryError {
    #[error("scene '{name}' not found at {}", path.display())]
    NotFound { name: String, path: PathBuf },

    #[error("invalid scene name '{0}'")]
    InvalidName(String),

    #[error("failed to read scene '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scene '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Resolves scene names to definitions under `<resource_root>/scenes`.
#[derive(Debug, Clone)]
pub struct SceneLibrary {
    root: PathBuf,
}

impl SceneLibrary {
    pub fn new(resource_root: impl AsRef<Path>) -> Self {
        Self {
            root: resource_root.as_ref().join(SCENE_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a scene name maps to. Names are plain identifiers, never paths.
    pub fn path(&self, name: &str) -> Result<PathBuf, SceneLibraryError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
        if !valid {
            return Err(SceneLibraryError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(format!("{name}.json")))
    }

    pub fn load(&self, name: &str) -> Result<SceneDefinition, SceneLibraryError> {
        let path = self.path(name)?;
        let text = fs::read_to_string(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => SceneLibraryError::NotFound {
                name: name.to_string(),
                path: path.clone(),
            },
            _ => SceneLibraryError::Io {
                name: name.to_string(),
                source,
            },
        })?;
        let definition = serde_json::from_str(&text).map_err(|source| SceneLibraryError::Parse {
            name: name.to_string(),
            source,
        })?;
        tracing::debug!(name, path = %path.display(), "scene definition read");
        Ok(definition)
    }
}
