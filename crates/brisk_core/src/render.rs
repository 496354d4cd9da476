//! Draw extraction
//!
//! The core never touches a GPU. It turns the live scene into a list of
//! camera-relative draw commands and hands them to whatever implements
//! [`RenderSink`].

use crate::math::{Aabb, Rect, Vec2};
use crate::scene::{EntityId, Flip, Scene, Sprite};

/// One sprite or tile to draw this frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawCommand<'a> {
    /// Owner of the sprite. `None` for tilemap tiles.
    pub entity: Option<EntityId>,
    /// Texture name, resolved by the sink.
    pub texture: &'a str,
    pub source: Rect,
    /// Screen-space destination box.
    pub destination: Aabb,
    pub flip: Flip,
}

/// Receives draw commands: tiles layer by layer, then sprites in slot order.
pub trait RenderSink {
    fn draw(&mut self, command: &DrawCommand<'_>);
}

/// Tilemap tiles and visible sprites of the live scene, relative to the
/// camera.
pub fn extract_draws(scene: &Scene, viewport: Vec2) -> impl Iterator<Item = DrawCommand<'_>> {
    let offset = scene.camera().offset(viewport);
    let tilemap = scene.tilemap();
    let tiles = tilemap.tiles().map(move |tile| DrawCommand {
        entity: None,
        texture: &tilemap.texture,
        source: tile.source,
        destination: tile.destination().translated(-offset),
        flip: Flip::default(),
    });
    let sprites = scene.iter().filter_map(move |entity| {
        let sprite = entity.get::<Sprite>()?;
        Some(DrawCommand {
            entity: Some(entity.id()),
            texture: &sprite.texture,
            source: sprite.source,
            destination: sprite.destination(entity.position()).translated(-offset),
            flip: sprite.flip,
        })
    });
    tiles.chain(sprites)
}

/// Feed every draw command to `sink`. Returns how many were issued.
pub fn render(scene: &Scene, viewport: Vec2, sink: &mut dyn RenderSink) -> usize {
    let mut count = 0;
    for command in extract_draws(scene, viewport) {
        sink.draw(&command);
        count += 1;
    }
    count
}
