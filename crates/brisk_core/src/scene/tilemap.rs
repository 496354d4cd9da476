//! Static tile layers
//!
//! A scene's tilemap is drawn beneath its sprites, layer by layer, and
//! defines the scene's bounds. Tiles have no entities behind them and never
//! collide.

use crate::math::{Aabb, Rect, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tilemap {
    /// Texture every tile samples from.
    #[serde(default)]
    pub texture: String,
    /// Extent of the map in world units, measured from the origin.
    #[serde(default)]
    pub size: Vec2,
    #[serde(default)]
    pub layers: Vec<TileLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    #[serde(default)]
    pub tiles: Vec<Tile>,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// World position of the tile's top-left corner.
    pub position: Vec2,
    pub source: Rect,
}

impl Tile {
    pub fn destination(&self) -> Aabb {
        Aabb::new(self.position, self.position + self.source.size())
    }
}

impl Tilemap {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(Vec2::ZERO, self.size)
    }

    /// Every tile, bottom layer first.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.layers.iter().flat_map(|layer| &layer.tiles)
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|layer| layer.tiles.is_empty())
    }
}
