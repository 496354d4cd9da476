use crate::AssetError;
use std::collections::HashMap;
use std::rc::Rc;

/// Produces an asset from its name.
pub trait AssetLoader<T> {
    fn load(&self, name: &str) -> Result<T, AssetError>;
}

/// Name-keyed cache of shared assets of one kind.
///
/// Handles are `Rc` because the frame loop is single-threaded; the cache's
/// own entry counts as one reference.
pub struct AssetCache<T> {
    loader: Box<dyn AssetLoader<T>>,
    entries: HashMap<String, Rc<T>>,
}

impl<T> AssetCache<T> {
    pub fn new(loader: impl AssetLoader<T> + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            entries: HashMap::new(),
        }
    }

    /// Shared handle to `name`, loading it on first request.
    pub fn get_or_load(&mut self, name: &str) -> Result<Rc<T>, AssetError> {
        if let Some(asset) = self.entries.get(name) {
            return Ok(Rc::clone(asset));
        }
        let asset = Rc::new(self.loader.load(name)?);
        tracing::debug!(name, "asset loaded");
        self.entries.insert(name.to_string(), Rc::clone(&asset));
        Ok(asset)
    }

    /// Cached handle without loading.
    pub fn get(&self, name: &str) -> Option<Rc<T>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry nobody outside the cache holds. Returns how many
    /// were freed.
    pub fn sweep_unreferenced(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, asset| Rc::strong_count(asset) > 1);
        let freed = before - self.entries.len();
        if freed > 0 {
            tracing::debug!(freed, kept = self.entries.len(), "unreferenced assets freed");
        }
        freed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
