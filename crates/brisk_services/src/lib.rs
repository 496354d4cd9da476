//! Brisk Services Layer
//!
//! Startup configuration, scene files and shared asset caches, bundled into
//! one [`Services`] value the runtime passes to whoever needs them.

pub mod scenes;
pub mod settings;

pub use scenes::{SceneLibrary, SceneLibraryError};
pub use settings::{Settings, SettingsError};

use brisk_asset::{AssetCache, FileTextureLoader, Texture};

/// Everything outside the core that the frame loop reaches for.
pub struct Services {
    pub settings: Settings,
    pub scenes: SceneLibrary,
    pub textures: AssetCache<Texture>,
}

impl Services {
    pub fn new(settings: Settings) -> Self {
        let scenes = SceneLibrary::new(&settings.resource_root);
        let textures = AssetCache::new(FileTextureLoader::new(&settings.resource_root));
        tracing::info!(
            title = %settings.title,
            resource_root = %settings.resource_root.display(),
            "services initialized"
        );
        Self {
            settings,
            scenes,
            textures,
        }
    }
}
