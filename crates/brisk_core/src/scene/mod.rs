//! Entity store
//!
//! The scene owns every entity. Spawn and destroy requests are buffered and
//! only applied at [`Scene::synchronize`], the single point per frame where
//! the live table changes shape. Nothing iterating the live table can
//! observe an entity appearing or vanishing mid-iteration.

mod camera;
mod component;
mod definition;
mod entity;
mod tilemap;

pub use camera::Camera;
pub use component::{
    Animation, Animator, Collider, Component, ComponentSet, Flip, Sprite, Velocity,
};
pub use definition::{EntityDefinition, SceneDefinition};
pub use entity::{Entity, EntityId};
pub use tilemap::{Tile, TileLayer, Tilemap};

use crate::event::{Event, EventQueue};
use crate::id::{IdAllocator, IdError};
use crate::math::Aabb;
use std::mem;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("cannot allocate entity '{name}': {source}")]
    Allocation {
        name: String,
        #[source]
        source: IdError,
    },
}

/// Hooks run at the synchronization point while the entity is still in the
/// live table.
pub trait LifecycleObserver {
    fn on_spawned(&mut self, _entity: &Entity) {}
    fn on_destroyed(&mut self, _entity: &Entity) {}
}

impl LifecycleObserver for () {}

/// Counts of lifecycle changes applied by one [`Scene::synchronize`] call.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub spawned: usize,
    pub destroyed: usize,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.spawned == 0 && self.destroyed == 0
    }
}

pub struct Scene {
    ids: IdAllocator,
    /// Dense slot table indexed by `EntityId::index`.
    live: Vec<Option<Entity>>,
    live_count: usize,
    to_spawn: Vec<Entity>,
    to_destroy: Vec<EntityId>,
    camera: Camera,
    tilemap: Tilemap,
    ended: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self::with_allocator(IdAllocator::new())
    }

    pub fn with_allocator(ids: IdAllocator) -> Self {
        Self {
            ids,
            live: Vec::new(),
            live_count: 0,
            to_spawn: Vec::new(),
            to_destroy: Vec::new(),
            camera: Camera::default(),
            tilemap: Tilemap::default(),
            ended: false,
        }
    }

    /// Empty scene that continues this scene's identifier history. Every
    /// handle issued here, live or pending, is retired first, so none of
    /// them resolves in the successor even when its slot is reused.
    pub fn successor(&self) -> Scene {
        let mut ids = self.ids.clone();
        for entity in self.iter().chain(&self.to_spawn) {
            ids.remove(entity.id().slot());
        }
        Scene::with_allocator(ids)
    }

    /// Allocate an entity. The handle is usable immediately (its entity can
    /// be configured through [`lookup_mut`](Self::lookup_mut)) but the entity
    /// only joins the live table at the next [`synchronize`](Self::synchronize).
    ///
    /// An ended scene still hands out a handle so in-flight script calls keep
    /// working, but that handle never resolves.
    pub fn spawn(&mut self, name: &str) -> Result<EntityId, SceneError> {
        let slot = self.ids.create().map_err(|source| SceneError::Allocation {
            name: name.to_string(),
            source,
        })?;
        let id = EntityId::from_slot(slot);

        if self.ended {
            tracing::debug!(%id, name, "spawn on ended scene, handle is orphaned");
            return Ok(id);
        }

        tracing::trace!(%id, name, "entity queued for spawn");
        self.to_spawn.push(Entity::new(id, name));
        Ok(id)
    }

    /// Queue a live entity for destruction. False when the handle does not
    /// resolve to a live entity. Repeating the request within one cycle is
    /// harmless.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if !self.to_destroy.contains(&id) {
            tracing::trace!(%id, "entity queued for destroy");
            self.to_destroy.push(id);
        }
        true
    }

    /// First entity with this name, pending spawns included.
    ///
    /// Linear in the number of entities; scenes are small.
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.to_spawn
            .iter()
            .chain(self.iter())
            .find(|entity| entity.name() == name)
            .map(Entity::id)
    }

    /// Apply buffered lifecycle changes.
    ///
    /// Spawns go first, in request order, each followed by an
    /// `EntitySpawned` event. Destroys follow, one at a time: the observer
    /// sees the entity while it is still live, then it is erased, its
    /// identifier retired, and `EntityDestroyed` pushed.
    pub fn synchronize(
        &mut self,
        events: &mut EventQueue,
        observer: &mut dyn LifecycleObserver,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        for entity in mem::take(&mut self.to_spawn) {
            let id = entity.id();
            let index = id.index() as usize;
            if self.live.len() <= index {
                self.live.resize_with(index + 1, || None);
            }
            let slot = &mut self.live[index];
            debug_assert!(slot.is_none(), "slot {index} reused while occupied");
            observer.on_spawned(slot.insert(entity));
            self.live_count += 1;
            events.push(Event::EntitySpawned { entity: id });
            report.spawned += 1;
        }

        for id in mem::take(&mut self.to_destroy) {
            let index = id.index() as usize;
            let Some(slot) = self.live.get_mut(index) else {
                continue;
            };
            if !slot.as_ref().is_some_and(|entity| entity.id() == id) {
                continue;
            }
            if let Some(entity) = slot.as_ref() {
                observer.on_destroyed(entity);
            }
            *slot = None;
            self.live_count -= 1;
            self.ids.remove(id.slot());
            events.push(Event::EntityDestroyed { entity: id });
            report.destroyed += 1;
        }

        if !report.is_empty() {
            tracing::debug!(
                spawned = report.spawned,
                destroyed = report.destroyed,
                live = self.live_count,
                "scene synchronized"
            );
        }
        report
    }

    /// Live entity behind a handle.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.live
            .get(id.index() as usize)?
            .as_ref()
            .filter(|entity| entity.id() == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.live
            .get_mut(id.index() as usize)?
            .as_mut()
            .filter(|entity| entity.id() == id)
    }

    /// Live or pending entity behind a handle.
    pub fn lookup(&self, id: EntityId) -> Option<&Entity> {
        self.get(id)
            .or_else(|| self.to_spawn.iter().find(|entity| entity.id() == id))
    }

    pub fn lookup_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if self.contains(id) {
            return self.get_mut(id);
        }
        self.to_spawn.iter_mut().find(|entity| entity.id() == id)
    }

    /// True when the handle resolves to a live entity.
    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Live entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.live.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.live.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.live_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    pub fn pending_spawn_count(&self) -> usize {
        self.to_spawn.len()
    }

    pub fn pending_destroy_count(&self) -> usize {
        self.to_destroy.len()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn tilemap(&self) -> &Tilemap {
        &self.tilemap
    }

    pub fn set_tilemap(&mut self, tilemap: Tilemap) {
        self.tilemap = tilemap;
    }

    /// Playable area, as laid out by the tilemap.
    pub fn bounds(&self) -> Aabb {
        self.tilemap.bounds()
    }

    /// Stop accepting spawns. Pending spawns are discarded.
    pub fn end(&mut self) {
        self.ended = true;
        self.to_spawn.clear();
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
