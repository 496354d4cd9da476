//! Serializable scene blueprints
//!
//! A definition lists the entities a scene starts with. Loading the file is
//! the services layer's job; the core only knows how to apply one.

use super::component::{Animation, Animator, Collider, Sprite, Velocity};
use super::entity::Entity;
use super::tilemap::Tilemap;
use crate::math::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDefinition {
    /// Initial camera centre.
    #[serde(default)]
    pub camera: Vec2,
    #[serde(default)]
    pub entities: Vec<EntityDefinition>,
    #[serde(default)]
    pub tilemap: Tilemap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    #[serde(default)]
    pub position: Vec2,
    #[serde(default)]
    pub velocity: Option<Vec2>,
    #[serde(default)]
    pub collider: Option<Collider>,
    #[serde(default)]
    pub sprite: Option<Sprite>,
    #[serde(default)]
    pub animations: HashMap<String, Animation>,
    /// Animation selected at spawn.
    #[serde(default)]
    pub animation: Option<String>,
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vec2::ZERO,
            velocity: None,
            collider: None,
            sprite: None,
            animations: HashMap::new(),
            animation: None,
        }
    }

    /// Copy position and capabilities onto a freshly spawned entity.
    pub fn apply(&self, entity: &mut Entity) {
        entity.set_position(self.position);
        if let Some(velocity) = self.velocity {
            entity.insert(Velocity(velocity));
        }
        if let Some(collider) = self.collider {
            entity.insert(collider);
        }
        if let Some(sprite) = &self.sprite {
            entity.insert(sprite.clone());
        }
        if !self.animations.is_empty() {
            let mut animator = Animator::new(self.animations.clone());
            if let Some(name) = &self.animation {
                animator.set_animation(name);
            }
            entity.insert(animator);
        }
    }
}
