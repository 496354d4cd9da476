use crate::math::Vec2;

/// Scene camera. `position` is the world point shown at the viewport centre.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Camera {
    pub position: Vec2,
}

impl Camera {
    pub fn new(position: Vec2) -> Self {
        Self { position }
    }

    /// World-space offset of the viewport's top-left corner.
    pub fn offset(&self, viewport: Vec2) -> Vec2 {
        self.position - viewport * 0.5
    }
}
