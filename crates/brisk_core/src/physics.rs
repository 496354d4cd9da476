//! Physics step
//!
//! Euler integration plus axis-separated overlap resolution. For every moving
//! entity with a collider: move by velocity, query the grid, and for each
//! contact first try undoing the Y move. If the boxes still overlap the hit
//! came from the side, so X is undone instead and Y keeps its new value.
//!
//! Every reported contact gets the Y-revert, even one an earlier
//! correction already cleared. Y is always tried first. A diagonal move into a corner therefore settles
//! on the X-revert only when the Y-revert alone cannot separate the boxes.
//! Changing that order changes where bodies come to rest.

use crate::event::{Event, EventQueue};
use crate::math::Vec2;
use crate::scene::{Collider, Entity, EntityId, LifecycleObserver, Scene, Velocity};
use crate::spatial::SpatialGrid;

/// What a single [`Physics::step`] did.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Entities integrated this step.
    pub moved: usize,
    /// Collision events emitted.
    pub collisions: usize,
}

/// Owns the broad-phase grid. Mirrors scene lifecycle through
/// [`LifecycleObserver`] so grid membership always matches the live table.
pub struct Physics {
    grid: SpatialGrid,
}

impl Physics {
    pub fn new(cell_size: f32) -> Self {
        Self {
            grid: SpatialGrid::new(cell_size),
        }
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Make one entity's grid membership match its current collider box.
    /// Adds it when it gained a collider, removes it when it lost one.
    pub fn track(&mut self, entity: &Entity) {
        match entity.bounding_box() {
            Some(bbox) if self.grid.contains(entity.id()) => {
                self.grid.update_membership(entity.id(), bbox);
            }
            Some(bbox) => self.grid.add(entity.id(), bbox),
            None => {
                self.grid.remove(entity.id());
            }
        }
    }

    /// Re-sync every live collider with the grid. Covers positions changed
    /// outside the physics step.
    pub fn refresh(&mut self, scene: &Scene) {
        for entity in scene.iter() {
            self.track(entity);
        }
    }

    /// Advance one fixed tick.
    pub fn step(&mut self, scene: &mut Scene, events: &mut EventQueue) -> StepReport {
        self.refresh(scene);

        let movers: Vec<EntityId> = scene
            .iter()
            .filter(|entity| entity.get::<Velocity>().is_some_and(|v| !v.is_zero()))
            .map(Entity::id)
            .collect();

        let mut report = StepReport::default();
        for id in movers {
            let Some(entity) = scene.get_mut(id) else {
                continue;
            };
            report.collisions += self.move_entity(entity, events);
            report.moved += 1;
        }
        report
    }

    /// Integrate and resolve one entity. Returns the number of contacts.
    fn move_entity(&mut self, entity: &mut Entity, events: &mut EventQueue) -> usize {
        let id = entity.id();
        let Some(velocity) = entity.get::<Velocity>().copied() else {
            return 0;
        };
        let before = entity.position();
        entity.move_by(velocity.0);

        let Some(collider) = entity.get::<Collider>().copied() else {
            return 0;
        };
        let mut bbox = collider.bounding_box(entity.position());
        self.grid.update_membership(id, bbox);

        let contacts = self.grid.get_collisions(id);
        for contact in &contacts {
            events.push(Event::CollisionDetected {
                entity: id,
                other: contact.other,
            });

            let moved = entity.position();
            entity.set_position(Vec2::new(moved.x, before.y));
            bbox = collider.bounding_box(entity.position());

            if bbox.overlaps(&contact.other_box) {
                entity.set_position(Vec2::new(before.x, moved.y));
                bbox = collider.bounding_box(entity.position());
                tracing::trace!(%id, other = %contact.other, "resolved on x axis");
            } else {
                tracing::trace!(%id, other = %contact.other, "resolved on y axis");
            }
        }

        self.grid.update_membership(id, bbox);
        contacts.len()
    }

    /// Forget every collider (scene teardown).
    pub fn clear(&mut self) {
        self.grid.clear();
    }
}

impl LifecycleObserver for Physics {
    fn on_spawned(&mut self, entity: &Entity) {
        if let Some(bbox) = entity.bounding_box() {
            self.grid.add(entity.id(), bbox);
        }
    }

    fn on_destroyed(&mut self, entity: &Entity) {
        self.grid.remove(entity.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Aabb;

    struct Fixture {
        scene: Scene,
        physics: Physics,
        events: EventQueue,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                scene: Scene::new(),
                physics: Physics::new(16.0),
                events: EventQueue::new(),
            }
        }

        fn spawn(&mut self, name: &str, position: Vec2, size: Option<Vec2>, velocity: Vec2) -> EntityId {
            let id = self.scene.spawn(name).unwrap();
            let entity = self.scene.lookup_mut(id).unwrap();
            entity.set_position(position);
            if let Some(size) = size {
                entity.insert(Collider::new(size));
            }
            if velocity != Vec2::ZERO {
                entity.insert(Velocity(velocity));
            }
            id
        }

        fn sync(&mut self) {
            self.scene.synchronize(&mut self.events, &mut self.physics);
            self.events.flip();
            self.events.drain().for_each(drop);
        }

        fn step(&mut self) -> Vec<Event> {
            self.physics.step(&mut self.scene, &mut self.events);
            self.events.flip();
            self.events.drain().collect()
        }

        fn position(&self, id: EntityId) -> Vec2 {
            self.scene.get(id).unwrap().position()
        }
    }

    #[test]
    fn test_integrates_without_collider() {
        let mut f = Fixture::new();
        let ghost = f.spawn("ghost", Vec2::new(1.0, 1.0), None, Vec2::new(2.0, -1.0));
        f.sync();
        assert!(f.step().is_empty());
        assert_eq!(f.position(ghost), Vec2::new(3.0, 0.0));
    }

    #[test]
    fn test_landing_reverts_y_only() {
        let mut f = Fixture::new();
        let p = f.spawn("p", Vec2::new(0.0, 10.0), Some(Vec2::new(10.0, 1.0)), Vec2::new(0.0, 1.0));
        let q = f.spawn("q", Vec2::new(0.0, 11.0), Some(Vec2::new(10.0, 9.0)), Vec2::ZERO);
        f.sync();

        let events = f.step();
        assert_eq!(f.position(p), Vec2::new(0.0, 10.0));
        assert_eq!(events, vec![Event::CollisionDetected { entity: p, other: q }]);
        assert_eq!(f.position(q), Vec2::new(0.0, 11.0));
    }

    #[test]
    fn test_wall_hit_reverts_x_and_keeps_fall() {
        let mut f = Fixture::new();
        let p = f.spawn("p", Vec2::new(0.0, 0.0), Some(Vec2::new(4.0, 4.0)), Vec2::new(2.0, 1.0));
        let wall = f.spawn("wall", Vec2::new(5.0, -20.0), Some(Vec2::new(4.0, 40.0)), Vec2::ZERO);
        f.sync();

        let events = f.step();
        assert_eq!(events, vec![Event::CollisionDetected { entity: p, other: wall }]);
        assert_eq!(f.position(p), Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_every_contact_reverts_y() {
        let mut f = Fixture::new();
        let p = f.spawn("p", Vec2::new(0.0, 0.0), Some(Vec2::new(4.0, 4.0)), Vec2::new(2.0, 1.0));
        let tall = f.spawn("tall", Vec2::new(5.0, -20.0), Some(Vec2::new(4.0, 40.0)), Vec2::ZERO);
        let short = f.spawn("short", Vec2::new(5.0, 3.0), Some(Vec2::new(4.0, 7.0)), Vec2::ZERO);
        f.sync();

        // The tall wall forces an X-revert. The short wall no longer overlaps
        // after that, but its contact still undoes the fall.
        let events = f.step();
        assert_eq!(
            events,
            vec![
                Event::CollisionDetected { entity: p, other: tall },
                Event::CollisionDetected { entity: p, other: short },
            ]
        );
        assert_eq!(f.position(p), Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_pending_collider_joins_grid_at_sync() {
        let mut f = Fixture::new();
        let a = f.spawn("a", Vec2::ZERO, Some(Vec2::new(4.0, 4.0)), Vec2::ZERO);
        f.sync();

        let b = f.spawn("b", Vec2::new(1.0, 1.0), Some(Vec2::new(4.0, 4.0)), Vec2::ZERO);
        assert!(!f.physics.grid().contains(b));
        assert!(f.physics.grid().get_collisions(a).is_empty());

        f.sync();
        assert!(f.physics.grid().contains(b));
        let hits = f.physics.grid().get_collisions(a);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].other, b);
    }

    #[test]
    fn test_diagonal_corner_prefers_y_revert() {
        let mut f = Fixture::new();
        // Moving down-right into a block whose corner is hit diagonally:
        // undoing Y alone separates the boxes, so X keeps its new value.
        let p = f.spawn("p", Vec2::new(0.0, 0.0), Some(Vec2::new(4.0, 4.0)), Vec2::new(2.0, 2.0));
        f.spawn("block", Vec2::new(5.0, 5.0), Some(Vec2::new(4.0, 4.0)), Vec2::ZERO);
        f.sync();

        f.step();
        assert_eq!(f.position(p), Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_zero_velocity_is_skipped() {
        let mut f = Fixture::new();
        let a = f.spawn("a", Vec2::ZERO, Some(Vec2::new(4.0, 4.0)), Vec2::ZERO);
        f.spawn("b", Vec2::new(1.0, 1.0), Some(Vec2::new(4.0, 4.0)), Vec2::ZERO);
        f.sync();
        let report = f.physics.step(&mut f.scene, &mut f.events);
        assert_eq!(report, StepReport::default());
        assert_eq!(f.position(a), Vec2::ZERO);
    }

    #[test]
    fn test_grid_follows_resolved_position() {
        let mut f = Fixture::new();
        let p = f.spawn("p", Vec2::new(0.0, 0.0), Some(Vec2::new(4.0, 4.0)), Vec2::new(40.0, 0.0));
        f.sync();
        f.step();
        assert_eq!(
            f.physics.grid().bounding_box(p),
            Some(Aabb::new(Vec2::new(40.0, 0.0), Vec2::new(44.0, 4.0)))
        );
    }

    #[test]
    fn test_refresh_picks_up_external_moves() {
        let mut f = Fixture::new();
        let a = f.spawn("a", Vec2::ZERO, Some(Vec2::new(4.0, 4.0)), Vec2::ZERO);
        let b = f.spawn("b", Vec2::new(100.0, 0.0), Some(Vec2::new(4.0, 4.0)), Vec2::ZERO);
        f.sync();

        f.scene.get_mut(b).unwrap().set_position(Vec2::new(2.0, 2.0));
        f.physics.refresh(&f.scene);
        assert_eq!(f.physics.grid().get_collisions(a)[0].other, b);
    }

    #[test]
    fn test_destroyed_collider_leaves_grid() {
        let mut f = Fixture::new();
        let a = f.spawn("a", Vec2::ZERO, Some(Vec2::new(4.0, 4.0)), Vec2::ZERO);
        let b = f.spawn("b", Vec2::new(1.0, 1.0), Some(Vec2::new(4.0, 4.0)), Vec2::ZERO);
        f.sync();
        assert_eq!(f.physics.grid().len(), 2);

        f.scene.destroy(b);
        f.sync();
        assert!(!f.physics.grid().contains(b));
        assert!(f.physics.grid().get_collisions(a).is_empty());
    }
}
