//! World facade
//!
//! Bundles the active scene, the physics step and the event queue behind the
//! operations scripts and the runtime loop are allowed to call. One frame is:
//!
//! 1. [`World::begin_frame`] flips the queue and hands back last frame's events
//! 2. scripts react and tick (outside the core)
//! 3. [`World::advance`] synchronizes lifecycle, steps physics, animates sprites
//! 4. [`World::render`] hands draw commands to the sink
//!
//! Scene transitions are only requested during a frame and applied between
//! frames with [`World::load_scene`].

use crate::event::{Event, EventQueue};
use crate::id::{IdAllocator, DEFAULT_REUSE_THRESHOLD};
use crate::math::{Aabb, Vec2};
use crate::physics::{Physics, StepReport};
use crate::render::{self, DrawCommand, RenderSink};
use crate::scene::{
    Animator, Camera, Entity, EntityDefinition, EntityId, Scene, SceneDefinition, SceneError, Sprite,
    SyncReport,
};
use crate::spatial::DEFAULT_CELL_SIZE;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    /// Broad-phase grid cell edge in world units.
    pub cell_size: f32,
    /// Freed ids are recycled only once more than this many are waiting.
    pub id_reuse_threshold: usize,
    /// Virtual resolution the camera frames.
    pub viewport: Vec2,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            id_reuse_threshold: DEFAULT_REUSE_THRESHOLD,
            viewport: Vec2::new(320.0, 180.0),
        }
    }
}

/// Everything one simulation tick changed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub sync: SyncReport,
    pub step: StepReport,
    pub animated: usize,
}

pub struct World {
    config: WorldConfig,
    scene: Scene,
    scene_name: String,
    physics: Physics,
    events: EventQueue,
    requested_scene: Option<String>,
    quit_requested: bool,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            scene: Self::fresh_scene(&config),
            scene_name: String::new(),
            physics: Physics::new(config.cell_size),
            events: EventQueue::new(),
            requested_scene: None,
            quit_requested: false,
            config,
        }
    }

    fn fresh_scene(config: &WorldConfig) -> Scene {
        Scene::with_allocator(IdAllocator::with_reuse_threshold(
            config.id_reuse_threshold,
        ))
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Name of the active scene, empty before the first load.
    pub fn scene_name(&self) -> &str {
        &self.scene_name
    }

    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    pub fn camera(&self) -> &Camera {
        self.scene.camera()
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        self.scene.camera_mut()
    }

    pub fn set_camera_position(&mut self, position: Vec2) {
        self.scene.camera_mut().position = position;
    }

    pub fn bounds(&self) -> Aabb {
        self.scene.bounds()
    }

    /// Replace the active scene with a fresh one built from `definition`.
    ///
    /// The old scene is ended and dropped along with its grid and any unread
    /// events, which would only name entities that no longer exist. Its
    /// handles are retired, so ids kept by scripts never resolve to an
    /// entity of the new scene. The new entities are pending until the next
    /// [`advance`](Self::advance). On error the active scene is left
    /// untouched.
    pub fn load_scene(&mut self, name: &str, definition: &SceneDefinition) -> Result<(), SceneError> {
        let mut scene = self.scene.successor();
        scene.camera_mut().position = definition.camera;
        scene.set_tilemap(definition.tilemap.clone());
        for entity in &definition.entities {
            let id = scene.spawn(&entity.name)?;
            if let Some(spawned) = scene.lookup_mut(id) {
                entity.apply(spawned);
            }
        }

        self.scene.end();
        self.scene = scene;
        self.scene_name = name.to_string();
        self.physics.clear();
        self.events.clear();
        self.events.push(Event::SceneChanged {
            scene: name.to_string(),
        });

        tracing::info!(
            scene = name,
            entities = definition.entities.len(),
            "scene loaded"
        );
        Ok(())
    }

    /// Make last frame's events readable and take them.
    pub fn begin_frame(&mut self) -> Vec<Event> {
        self.events.flip();
        self.events.drain().collect()
    }

    /// Apply pending lifecycle changes, keeping the grid in step.
    pub fn synchronize(&mut self) -> SyncReport {
        self.scene.synchronize(&mut self.events, &mut self.physics)
    }

    pub fn step_physics(&mut self) -> StepReport {
        self.physics.step(&mut self.scene, &mut self.events)
    }

    /// Advance every animator one tick and copy its frame onto the sprite.
    pub fn animate(&mut self) -> usize {
        let mut animated = 0;
        for entity in self.scene.iter_mut() {
            let Some(frame) = entity.get_mut::<Animator>().and_then(Animator::advance) else {
                continue;
            };
            if let Some(sprite) = entity.get_mut::<Sprite>() {
                sprite.source = frame;
                animated += 1;
            }
        }
        animated
    }

    /// Synchronize, step physics, animate.
    pub fn advance(&mut self) -> TickReport {
        let sync = self.synchronize();
        let step = self.step_physics();
        let animated = self.animate();
        TickReport {
            sync,
            step,
            animated,
        }
    }

    pub fn draws(&self) -> impl Iterator<Item = DrawCommand<'_>> {
        render::extract_draws(&self.scene, self.config.viewport)
    }

    pub fn render(&self, sink: &mut dyn RenderSink) -> usize {
        render::render(&self.scene, self.config.viewport, sink)
    }

    // Scripting surface. Handles that do not resolve are ignored so stale ids
    // held by scripts never fault.

    pub fn entity_name(&self, id: EntityId) -> Option<&str> {
        self.scene.lookup(id).map(|entity| entity.name())
    }

    pub fn entity_position(&self, id: EntityId) -> Option<Vec2> {
        self.scene.lookup(id).map(|entity| entity.position())
    }

    pub fn move_entity(&mut self, id: EntityId, delta: Vec2) -> bool {
        self.reposition(id, |entity| entity.move_by(delta))
    }

    pub fn set_entity_position(&mut self, id: EntityId, position: Vec2) -> bool {
        self.reposition(id, |entity| entity.set_position(position))
    }

    /// Live colliders are re-indexed right away so scripts querying the grid
    /// later in the same frame see the new box.
    fn reposition(&mut self, id: EntityId, f: impl FnOnce(&mut Entity)) -> bool {
        let Some(entity) = self.scene.lookup_mut(id) else {
            return false;
        };
        f(entity);
        if let Some(entity) = self.scene.get(id) {
            self.physics.track(entity);
        }
        true
    }

    pub fn flip_x(&mut self, id: EntityId) -> bool {
        self.with_sprite(id, Sprite::flip_x)
    }

    pub fn flip_y(&mut self, id: EntityId) -> bool {
        self.with_sprite(id, Sprite::flip_y)
    }

    fn with_sprite(&mut self, id: EntityId, f: impl FnOnce(&mut Sprite)) -> bool {
        match self
            .scene
            .lookup_mut(id)
            .and_then(|entity| entity.get_mut::<Sprite>())
        {
            Some(sprite) => {
                f(sprite);
                true
            }
            None => false,
        }
    }

    pub fn set_animation(&mut self, id: EntityId, animation: &str) -> bool {
        self.scene
            .lookup_mut(id)
            .and_then(|entity| entity.get_mut::<Animator>())
            .is_some_and(|animator| animator.set_animation(animation))
    }

    /// Queue a new entity built from `definition`.
    pub fn spawn(&mut self, definition: &EntityDefinition) -> Result<EntityId, SceneError> {
        let id = self.scene.spawn(&definition.name)?;
        if let Some(entity) = self.scene.lookup_mut(id) {
            definition.apply(entity);
        }
        Ok(id)
    }

    pub fn destroy(&mut self, id: EntityId) -> bool {
        self.scene.destroy(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.scene.find_by_name(name)
    }

    /// Ask for a scene change at the end of the frame. The last request wins.
    pub fn request_scene(&mut self, name: impl Into<String>) {
        self.requested_scene = Some(name.into());
    }

    pub fn take_scene_request(&mut self) -> Option<String> {
        self.requested_scene.take()
    }

    pub fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Rect;
    use crate::scene::{Animation, Collider, Tile, TileLayer, Tilemap};
    use std::collections::HashMap;

    fn level() -> SceneDefinition {
        let mut walk = HashMap::new();
        walk.insert(
            "walk".to_string(),
            Animation {
                frames: vec![Rect::new(0, 0, 8, 8), Rect::new(8, 0, 8, 8)],
                ticks_per_frame: 1,
            },
        );
        SceneDefinition {
            camera: Vec2::new(160.0, 90.0),
            entities: vec![
                EntityDefinition {
                    position: Vec2::new(0.0, 10.0),
                    velocity: Some(Vec2::new(0.0, 1.0)),
                    collider: Some(Collider::new(Vec2::new(10.0, 1.0))),
                    sprite: Some(Sprite::new("hero.png", Rect::new(0, 0, 8, 8))),
                    animations: walk,
                    animation: Some("walk".to_string()),
                    ..EntityDefinition::new("hero")
                },
                EntityDefinition {
                    position: Vec2::new(0.0, 11.0),
                    collider: Some(Collider::new(Vec2::new(10.0, 9.0))),
                    ..EntityDefinition::new("ground")
                },
            ],
            tilemap: Tilemap {
                texture: "tiles.png".to_string(),
                size: Vec2::new(320.0, 180.0),
                layers: vec![TileLayer {
                    tiles: vec![Tile {
                        position: Vec2::new(0.0, 20.0),
                        source: Rect::new(0, 0, 16, 16),
                    }],
                }],
            },
        }
    }

    #[test]
    fn test_load_scene_then_tick() {
        let mut world = World::default();
        world.load_scene("level1", &level()).unwrap();
        assert_eq!(world.scene_name(), "level1");
        assert_eq!(world.camera().position, Vec2::new(160.0, 90.0));
        assert_eq!(
            world.begin_frame(),
            vec![Event::SceneChanged {
                scene: "level1".to_string()
            }]
        );

        let hero = world.find_by_name("hero").unwrap();
        let ground = world.find_by_name("ground").unwrap();
        let report = world.advance();
        assert_eq!(report.sync.spawned, 2);
        assert_eq!(report.step.collisions, 1);
        assert_eq!(report.animated, 1);
        assert_eq!(world.entity_position(hero), Some(Vec2::new(0.0, 10.0)));

        assert_eq!(
            world.begin_frame(),
            vec![
                Event::EntitySpawned { entity: hero },
                Event::EntitySpawned { entity: ground },
                Event::CollisionDetected {
                    entity: hero,
                    other: ground
                },
            ]
        );
    }

    #[test]
    fn test_load_scene_replaces_previous() {
        let mut world = World::default();
        world.load_scene("level1", &level()).unwrap();
        world.advance();
        let old_hero = world.find_by_name("hero").unwrap();

        world.load_scene("empty", &SceneDefinition::default()).unwrap();
        assert!(world.find_by_name("hero").is_none());
        assert!(world.physics().grid().is_empty());
        assert!(!world.destroy(old_hero));
        assert_eq!(
            world.begin_frame(),
            vec![Event::SceneChanged {
                scene: "empty".to_string()
            }]
        );
    }

    #[test]
    fn test_old_scene_handles_never_resolve_after_load() {
        let mut world = World::new(WorldConfig {
            id_reuse_threshold: 0,
            ..WorldConfig::default()
        });
        world.load_scene("a", &level()).unwrap();
        world.advance();
        let old_hero = world.find_by_name("hero").unwrap();

        let b = SceneDefinition {
            entities: vec![EntityDefinition::new("ghost")],
            ..SceneDefinition::default()
        };
        world.load_scene("b", &b).unwrap();
        world.advance();
        let ghost = world.find_by_name("ghost").unwrap();

        assert_eq!(ghost.index(), old_hero.index());
        assert_ne!(ghost, old_hero);
        assert!(world.entity_name(old_hero).is_none());
        assert!(!world.move_entity(old_hero, Vec2::ONE));
        assert!(!world.destroy(old_hero));
        assert_eq!(world.entity_position(ghost), Some(Vec2::ZERO));
    }

    #[test]
    fn test_scripting_surface_ignores_stale_handles() {
        let mut world = World::default();
        let stale = EntityId::from_bits(0x0005_0003);
        assert!(world.entity_name(stale).is_none());
        assert!(!world.move_entity(stale, Vec2::ONE));
        assert!(!world.flip_x(stale));
        assert!(!world.set_animation(stale, "walk"));
        assert!(!world.destroy(stale));
    }

    #[test]
    fn test_spawn_and_move_before_sync() {
        let mut world = World::default();
        let id = world
            .spawn(&EntityDefinition {
                position: Vec2::new(5.0, 5.0),
                ..EntityDefinition::new("coin")
            })
            .unwrap();
        assert_eq!(world.entity_name(id), Some("coin"));
        assert!(world.move_entity(id, Vec2::new(1.0, 0.0)));
        world.advance();
        assert_eq!(world.entity_position(id), Some(Vec2::new(6.0, 5.0)));
    }

    #[test]
    fn test_move_updates_grid_immediately() {
        let mut world = World::default();
        world.load_scene("level1", &level()).unwrap();
        world.advance();
        let ground = world.find_by_name("ground").unwrap();
        assert!(world.set_entity_position(ground, Vec2::new(500.0, 500.0)));
        assert_eq!(
            world.physics().grid().bounding_box(ground).map(|b| b.min),
            Some(Vec2::new(500.0, 500.0))
        );
    }

    #[test]
    fn test_camera_and_bounds_follow_scene() {
        let mut world = World::default();
        world.load_scene("level1", &level()).unwrap();
        assert_eq!(
            world.bounds(),
            Aabb::new(Vec2::ZERO, Vec2::new(320.0, 180.0))
        );
        world.set_camera_position(Vec2::new(200.0, 100.0));
        assert_eq!(world.camera().position, Vec2::new(200.0, 100.0));

        world.load_scene("empty", &SceneDefinition::default()).unwrap();
        assert_eq!(world.bounds(), Aabb::new(Vec2::ZERO, Vec2::ZERO));
        assert_eq!(world.camera().position, Vec2::ZERO);
        assert_eq!(world.draws().count(), 0);
    }

    #[test]
    fn test_requests_persist_until_taken() {
        let mut world = World::default();
        assert!(world.take_scene_request().is_none());
        world.request_scene("a");
        world.request_scene("b");
        assert_eq!(world.take_scene_request().as_deref(), Some("b"));
        assert!(world.take_scene_request().is_none());

        assert!(!world.quit_requested());
        world.request_quit();
        assert!(world.quit_requested());
    }

    #[test]
    fn test_flip_toggles_sprite() {
        let mut world = World::default();
        world.load_scene("level1", &level()).unwrap();
        let hero = world.find_by_name("hero").unwrap();
        assert!(world.flip_x(hero));
        world.advance();
        let draw = world.draws().find(|draw| draw.entity == Some(hero)).unwrap();
        assert!(draw.flip.horizontal);
        assert!(!draw.flip.vertical);
    }
}
