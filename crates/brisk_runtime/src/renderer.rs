//! Headless render collaborator
//!
//! Stands in for a GPU backend: holds a texture handle per drawable entity
//! plus one for the scene's tilemap, and counts what it would have drawn. Holding the handles is what keeps
//! textures alive in the cache between scene transitions.

use brisk_asset::Texture;
use brisk_core::render::{DrawCommand, RenderSink};
use brisk_core::EntityId;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: usize,
    /// Commands whose texture was never bound (failed load, stale binding).
    pub missing: usize,
}

#[derive(Default)]
pub struct HeadlessRenderer {
    bound: HashMap<EntityId, Rc<Texture>>,
    tileset: Option<Rc<Texture>>,
    stats: FrameStats,
    frames: u64,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, entity: EntityId, texture: Rc<Texture>) {
        self.bound.insert(entity, texture);
    }

    pub fn unbind(&mut self, entity: EntityId) -> bool {
        self.bound.remove(&entity).is_some()
    }

    pub fn bind_tileset(&mut self, texture: Rc<Texture>) {
        self.tileset = Some(texture);
    }

    /// Release every handle.
    pub fn clear(&mut self) {
        self.bound.clear();
        self.tileset = None;
    }

    pub fn bound_len(&self) -> usize {
        self.bound.len()
    }

    pub fn begin_frame(&mut self) {
        self.stats = FrameStats::default();
        self.frames += 1;
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl RenderSink for HeadlessRenderer {
    fn draw(&mut self, command: &DrawCommand<'_>) {
        let texture = match command.entity {
            Some(entity) => self.bound.get(&entity),
            None => self.tileset.as_ref(),
        };
        match texture {
            Some(texture) if texture.name == command.texture => self.stats.draws += 1,
            _ => {
                self.stats.missing += 1;
                tracing::trace!(entity = ?command.entity, texture = command.texture, "draw skipped");
            }
        }
    }
}
