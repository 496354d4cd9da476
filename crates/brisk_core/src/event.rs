//! Frame-buffered event queue
//!
//! Producers (lifecycle sync, physics, scripts) push events during a frame.
//! Nothing they push is readable until the queue is flipped at the start of
//! the next processing phase, so a consumer can never re-read an event it
//! produced itself in the same pass.

use crate::scene::EntityId;
use std::collections::VecDeque;

/// Everything the core reports to its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Entity moved from the pending list into the live table.
    EntitySpawned { entity: EntityId },
    /// Entity removed from the live table. The id no longer resolves.
    EntityDestroyed { entity: EntityId },
    /// The active scene was replaced.
    SceneChanged { scene: String },
    /// `entity` moved into `other` during the physics step.
    CollisionDetected { entity: EntityId, other: EntityId },
}

/// Single-drain FIFO with a write side and a read side.
#[derive(Debug, Default)]
pub struct EventQueue {
    incoming: Vec<Event>,
    readable: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. It becomes readable after the next [`flip`](Self::flip).
    pub fn push(&mut self, event: Event) {
        self.incoming.push(event);
    }

    /// Start a processing phase: everything pushed since the last flip is
    /// appended behind any events still unread.
    pub fn flip(&mut self) {
        self.readable.extend(self.incoming.drain(..));
    }

    /// Pop the oldest readable event.
    pub fn poll(&mut self) -> Option<Event> {
        self.readable.pop_front()
    }

    /// Poll until the readable side is empty.
    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        std::iter::from_fn(move || self.poll())
    }

    /// Events ready to be polled.
    pub fn len(&self) -> usize {
        self.readable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readable.is_empty()
    }

    /// Events pushed since the last flip.
    pub fn pending_len(&self) -> usize {
        self.incoming.len()
    }

    /// Drop everything, readable or not.
    pub fn clear(&mut self) {
        self.incoming.clear();
        self.readable.clear();
    }
}
