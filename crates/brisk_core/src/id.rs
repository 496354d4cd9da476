//! Generational slot identifiers
//!
//! Identifiers are lightweight handles (4 bytes) that reference a slot in a
//! dense table. The generation counter prevents use-after-free bugs: once a
//! slot is recycled every identifier issued for the previous occupant stops
//! validating, even though the index itself is handed out again.
//!
//! The allocator knows nothing about entities. Anything that needs a
//! versioned slot (entities, scene nodes, ...) wraps a [`SlotId`].

use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Number of low bits holding the slot index.
pub const INDEX_BITS: u32 = 16;
/// Number of high bits holding the slot generation.
pub const GENERATION_BITS: u32 = 16;

const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: u32 = (1 << GENERATION_BITS) - 1;

/// Highest number of slots the table can address.
pub const MAX_SLOTS: usize = 1 << INDEX_BITS;

/// Freed slots that must be queued before the oldest one is reused.
pub const DEFAULT_REUSE_THRESHOLD: usize = 1024;

/// Packed slot identifier.
///
/// Format: [16-bit generation | 16-bit index]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

impl SlotId {
    pub(crate) const fn new(index: u16, generation: u16) -> Self {
        Self((index as u32) | ((generation as u32) << INDEX_BITS))
    }

    #[inline]
    pub fn index(&self) -> u16 {
        (self.0 & INDEX_MASK) as u16
    }

    #[inline]
    pub fn generation(&self) -> u16 {
        ((self.0 >> INDEX_BITS) & GENERATION_MASK) as u16
    }

    /// Raw packed value (for scripts and save files).
    pub fn to_bits(&self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("slot table exhausted: all {max} slots are in use")]
    Exhausted { max: usize },
}

/// Hands out [`SlotId`]s and tracks the current generation of every slot.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    generations: Vec<u16>,
    alive: Vec<bool>,
    free_indices: VecDeque<u16>,
    reuse_threshold: usize,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::with_reuse_threshold(DEFAULT_REUSE_THRESHOLD)
    }

    /// Freed indices are only reused once more than `threshold` of them are
    /// queued. A wrapped generation can then only alias an identifier that
    /// survived `threshold` other recycles of the table.
    pub fn with_reuse_threshold(threshold: usize) -> Self {
        Self {
            generations: Vec::new(),
            alive: Vec::new(),
            free_indices: VecDeque::new(),
            reuse_threshold: threshold,
        }
    }

    /// Allocate a fresh identifier.
    pub fn create(&mut self) -> Result<SlotId, IdError> {
        if self.free_indices.len() > self.reuse_threshold {
            if let Some(index) = self.free_indices.pop_front() {
                return Ok(self.revive(index));
            }
        }

        if self.generations.len() < MAX_SLOTS {
            let index = self.generations.len() as u16;
            self.generations.push(0);
            self.alive.push(true);
            return Ok(SlotId::new(index, 0));
        }

        // Table is full: fall back to any recycled slot, ignoring the delay.
        match self.free_indices.pop_front() {
            Some(index) => Ok(self.revive(index)),
            None => Err(IdError::Exhausted { max: MAX_SLOTS }),
        }
    }

    fn revive(&mut self, index: u16) -> SlotId {
        self.alive[index as usize] = true;
        SlotId::new(index, self.generations[index as usize])
    }

    /// Retire an identifier. Returns false for stale or unknown identifiers
    /// so a double free never queues the same slot twice.
    pub fn remove(&mut self, id: SlotId) -> bool {
        if !self.valid(id) {
            return false;
        }
        let index = id.index();
        let generation = &mut self.generations[index as usize];
        *generation = generation.wrapping_add(1);
        self.alive[index as usize] = false;
        self.free_indices.push_back(index);
        true
    }

    pub fn valid(&self, id: SlotId) -> bool {
        let index = id.index() as usize;
        self.alive.get(index).copied().unwrap_or(false)
            && self.generations[index] == id.generation()
    }

    /// Slots ever allocated (live and free).
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_indices.len()
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
