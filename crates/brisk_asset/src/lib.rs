//! Brisk Asset Pipeline
//!
//! Named assets loaded once and shared through reference-counted handles.
//! A cache entry lives as long as someone outside the cache holds its
//! handle; [`AssetCache::sweep_unreferenced`] drops the rest.

mod cache;
mod texture;

pub use cache::{AssetCache, AssetLoader};
pub use texture::{FileTextureLoader, Texture, TEXTURE_DIR};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid asset name '{0}': must be a relative path without '..'")]
    InvalidName(String),

    #[error("failed to read asset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
