//! Entity capabilities
//!
//! Components are looked up by type, never by inheritance. An entity either
//! has a capability or it doesn't; absence is ordinary control flow.

use crate::math::{Aabb, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Marker for types that can be attached to an entity.
pub trait Component: Any {}

/// Type-keyed bag of components owned by one entity.
#[derive(Default)]
pub struct ComponentSet {
    components: HashMap<TypeId, Box<dyn Any>>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a component, returning the one it replaced.
    pub fn insert<T: Component>(&mut self, component: T) -> Option<T> {
        self.components
            .insert(TypeId::of::<T>(), Box::new(component))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        self.components
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut::<T>())
    }

    pub fn remove<T: Component>(&mut self) -> Option<T> {
        self.components
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    pub fn contains<T: Component>(&self) -> bool {
        self.components.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl fmt::Debug for ComponentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSet")
            .field("len", &self.components.len())
            .finish()
    }
}

/// Per-tick displacement in world units.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity(pub Vec2);

impl Velocity {
    pub fn is_zero(&self) -> bool {
        self.0 == Vec2::ZERO
    }
}

impl Component for Velocity {}

/// Axis-aligned box relative to the owner's position.
///
/// The collider only knows its shape. The owner is whoever carries it, and the
/// grid indexes colliders by the owner's [`EntityId`](super::EntityId).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    #[serde(default)]
    pub offset: Vec2,
    pub size: Vec2,
}

impl Collider {
    pub fn new(size: Vec2) -> Self {
        Self {
            offset: Vec2::ZERO,
            size,
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn bounding_box(&self, position: Vec2) -> Aabb {
        Aabb::from_position_size(position + self.offset, self.size)
    }
}

impl Component for Collider {}

/// Horizontal/vertical mirroring applied when drawing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flip {
    #[serde(default)]
    pub horizontal: bool,
    #[serde(default)]
    pub vertical: bool,
}

/// Something the render collaborator draws. Textures are referenced by name;
/// loading and caching happen outside the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub texture: String,
    pub source: Rect,
    #[serde(default)]
    pub flip: Flip,
}

impl Sprite {
    pub fn new(texture: impl Into<String>, source: Rect) -> Self {
        Self {
            texture: texture.into(),
            source,
            flip: Flip::default(),
        }
    }

    pub fn flip_x(&mut self) {
        self.flip.horizontal = !self.flip.horizontal;
    }

    pub fn flip_y(&mut self) {
        self.flip.vertical = !self.flip.vertical;
    }

    /// On-screen box for an owner at `position`.
    pub fn destination(&self, position: Vec2) -> Aabb {
        Aabb::from_position_size(position, self.source.size())
    }
}

impl Component for Sprite {}

/// A named sequence of source rectangles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    pub frames: Vec<Rect>,
    #[serde(default = "default_ticks_per_frame")]
    pub ticks_per_frame: u32,
}

fn default_ticks_per_frame() -> u32 {
    6
}

/// Steps a sprite's source rectangle through the selected animation.
#[derive(Debug, Clone, Default)]
pub struct Animator {
    animations: HashMap<String, Animation>,
    current: Option<String>,
    frame: usize,
    ticks: u32,
}

impl Animator {
    pub fn new(animations: HashMap<String, Animation>) -> Self {
        Self {
            animations,
            ..Self::default()
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Select an animation by name. Re-selecting the running one keeps its
    /// frame; unknown names are ignored and return false.
    pub fn set_animation(&mut self, name: &str) -> bool {
        if !self.animations.contains_key(name) {
            return false;
        }
        if self.current.as_deref() != Some(name) {
            self.current = Some(name.to_string());
            self.frame = 0;
            self.ticks = 0;
        }
        true
    }

    /// Advance one tick and return the source rectangle to display.
    pub fn advance(&mut self) -> Option<Rect> {
        let animation = self.animations.get(self.current.as_deref()?)?;
        if animation.frames.is_empty() {
            return None;
        }
        self.ticks += 1;
        if self.ticks >= animation.ticks_per_frame.max(1) {
            self.ticks = 0;
            self.frame = (self.frame + 1) % animation.frames.len();
        }
        animation.frames.get(self.frame).copied()
    }
}

impl Component for Animator {}
