//! Textures decoded on the CPU. Uploading them anywhere is the render
//! backend's business.

use crate::{AssetError, AssetLoader};
use brisk_core::math::Vec2;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Subdirectory of the resource root that texture names resolve against.
pub const TEXTURE_DIR: &str = "textures";

/// RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Texture {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

pub struct FileTextureLoader {
    root: PathBuf,
}

impl FileTextureLoader {
    /// Load from `<resource_root>/textures`.
    pub fn new(resource_root: impl AsRef<Path>) -> Self {
        Self {
            root: resource_root.as_ref().join(TEXTURE_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `name` lives. Names are relative paths that stay under the
    /// texture directory.
    pub fn path(&self, name: &str) -> Result<PathBuf, AssetError> {
        let valid = !name.is_empty()
            && Path::new(name)
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !valid {
            return Err(AssetError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

impl AssetLoader<Texture> for FileTextureLoader {
    fn load(&self, name: &str) -> Result<Texture, AssetError> {
        let path = self.path(name)?;
        let bytes = fs::read(&path).map_err(|source| AssetError::Io {
            path: path.clone(),
            source,
        })?;
        let rgba = image::load_from_memory(&bytes)
            .map_err(|source| AssetError::Decode { path, source })?
            .to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Texture {
            name: name.to_string(),
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AssetCache;

    fn write_png(root: &Path, name: &str, width: u32, height: u32) {
        let dir = root.join(TEXTURE_DIR);
        fs::create_dir_all(&dir).unwrap();
        image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_loads_png_from_texture_dir() {
        let root = tempfile::tempdir().unwrap();
        write_png(root.path(), "hero.png", 3, 2);

        let texture = FileTextureLoader::new(root.path()).load("hero.png").unwrap();
        assert_eq!((texture.width, texture.height), (3, 2));
        assert_eq!(texture.pixels.len(), 3 * 2 * 4);
        assert_eq!(&texture.pixels[..4], &[255, 0, 0, 255]);
        assert_eq!(texture.size(), Vec2::new(3.0, 2.0));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let root = tempfile::tempdir().unwrap();
        let err = FileTextureLoader::new(root.path())
            .load("nope.png")
            .unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
        assert!(err.to_string().contains("nope.png"));
    }

    #[test]
    fn test_names_stay_under_texture_dir() {
        let root = tempfile::tempdir().unwrap();
        write_png(root.path(), "secret.png", 1, 1);
        let loader = FileTextureLoader::new(root.path().join("nested"));

        for name in ["", "../textures/secret.png", "ui/../../secret.png", "/etc/passwd"] {
            let err = loader.load(name).unwrap_err();
            assert!(matches!(err, AssetError::InvalidName(_)), "{name}: {err}");
        }
        assert_eq!(
            loader.path("ui/button.png").unwrap(),
            loader.root().join("ui/button.png")
        );
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(TEXTURE_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bad.png"), b"not a png").unwrap();

        let err = FileTextureLoader::new(root.path())
            .load("bad.png")
            .unwrap_err();
        assert!(matches!(err, AssetError::Decode { .. }));
    }

    #[test]
    fn test_cache_over_files() {
        let root = tempfile::tempdir().unwrap();
        write_png(root.path(), "tiles.png", 8, 8);

        let mut cache = AssetCache::new(FileTextureLoader::new(root.path()));
        let tiles = cache.get_or_load("tiles.png").unwrap();
        assert_eq!(tiles.width, 8);
        assert_eq!(cache.sweep_unreferenced(), 0);
        drop(tiles);
        assert_eq!(cache.sweep_unreferenced(), 1);
    }
}
