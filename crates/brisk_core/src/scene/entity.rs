//! Entity handle and entity record

use super::component::{Collider, Component, ComponentSet};
use crate::id::SlotId;
use crate::math::{Aabb, Vec2};
use std::fmt;

/// Entity handle (generation-indexed for safety)
///
/// A handle stays cheap to copy and never owns the entity. Once the entity is
/// destroyed the handle stops resolving, even after its slot is reused.
///
/// Example:
/// ```ignore
/// let entity = scene.spawn("player")?;
/// scene.synchronize(&mut events, &mut ());
/// scene.destroy(entity);
/// scene.synchronize(&mut events, &mut ());
/// assert!(scene.get(entity).is_none());
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(SlotId);

impl EntityId {
    pub(crate) const fn from_slot(slot: SlotId) -> Self {
        Self(slot)
    }

    pub fn slot(&self) -> SlotId {
        self.0
    }

    pub fn index(&self) -> u16 {
        self.0.index()
    }

    pub fn generation(&self) -> u16 {
        self.0.generation()
    }

    /// Serialize to a 32-bit integer (for scripts)
    pub fn to_bits(&self) -> u32 {
        self.0.to_bits()
    }

    /// Deserialize from a 32-bit integer
    pub fn from_bits(bits: u32) -> Self {
        Self(SlotId::from_bits(bits))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// A named thing in the scene with a position and a set of optional capabilities.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    name: String,
    position: Vec2,
    components: ComponentSet,
}

impl Entity {
    pub(crate) fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            position: Vec2::ZERO,
            components: ComponentSet::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn move_by(&mut self, delta: Vec2) {
        self.position += delta;
    }

    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentSet {
        &mut self.components
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        self.components.get::<T>()
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components.get_mut::<T>()
    }

    pub fn has<T: Component>(&self) -> bool {
        self.components.contains::<T>()
    }

    /// Attach or replace a capability.
    pub fn insert<T: Component>(&mut self, component: T) -> &mut Self {
        self.components.insert(component);
        self
    }

    /// Collider box at the current position, if the entity has a collider.
    pub fn bounding_box(&self) -> Option<Aabb> {
        self.get::<Collider>()
            .map(|collider| collider.bounding_box(self.position))
    }
}
