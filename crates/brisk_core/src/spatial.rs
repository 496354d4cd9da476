//! Uniform grid broad-phase for axis-aligned boxes.
//!
//! Every collider is bucketed into each cell its box touches. A collision
//! query only narrow-phase tests colliders sharing a cell, which keeps
//! sparse scenes close to linear instead of testing every pair.
//!
//! Colliders are identified by their owner's [`EntityId`]. The grid keeps a
//! copy of each box, so callers must report every move through
//! [`SpatialGrid::update_membership`] before trusting a query.

use crate::math::{Aabb, Vec2};
use crate::scene::EntityId;
use std::collections::HashMap;

/// Cell size used when nothing else is configured, in world units.
pub const DEFAULT_CELL_SIZE: f32 = 64.0;

/// Boxes covering more cells than this are kept out of the buckets and
/// tested against every query instead.
const MAX_BUCKETED_CELLS: i64 = 4096;

/// Grid cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Inclusive rectangle of cells covered by one box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    min: CellCoord,
    max: CellCoord,
}

impl CellRange {
    fn area(self) -> i64 {
        let width = i64::from(self.max.x) - i64::from(self.min.x) + 1;
        let height = i64::from(self.max.y) - i64::from(self.min.y) + 1;
        width * height
    }

    fn is_bucketed(self) -> bool {
        self.area() <= MAX_BUCKETED_CELLS
    }

    fn cells(self) -> impl Iterator<Item = CellCoord> {
        (self.min.y..=self.max.y)
            .flat_map(move |y| (self.min.x..=self.max.x).map(move |x| CellCoord::new(x, y)))
    }
}

#[derive(Debug, Clone, Copy)]
struct Member {
    bbox: Aabb,
    cells: CellRange,
}

/// Which side of the queried collider touches the other one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

/// One true overlap reported by [`SpatialGrid::get_collisions`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub other: EntityId,
    /// The other collider's box at query time.
    pub other_box: Aabb,
    pub side: Side,
    /// Intersection rectangle (penetration depth on both axes).
    pub overlap: Aabb,
}

pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<CellCoord, Vec<EntityId>>,
    members: HashMap<EntityId, Member>,
    /// Colliders too large to bucket.
    oversized: Vec<EntityId>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        assert!(
            cell_size.is_finite() && cell_size > 0.0,
            "grid cell size must be positive, got {cell_size}"
        );
        Self {
            cell_size,
            cells: HashMap::new(),
            members: HashMap::new(),
            oversized: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Insert a collider into every cell its box overlaps. Re-adding an
    /// existing collider updates its membership.
    pub fn add(&mut self, id: EntityId, bbox: Aabb) {
        if self.members.contains_key(&id) {
            self.update_membership(id, bbox);
            return;
        }
        let cells = self.cell_range(&bbox);
        self.link(id, cells);
        self.members.insert(id, Member { bbox, cells });
    }

    /// Erase a collider from every cell. False if it was never added.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(member) = self.members.remove(&id) else {
            return false;
        };
        self.unlink(id, member.cells);
        true
    }

    /// Record a collider's new box, moving it between cells when needed.
    /// False if the collider is not in the grid.
    pub fn update_membership(&mut self, id: EntityId, bbox: Aabb) -> bool {
        let cells = self.cell_range(&bbox);
        let Some(member) = self.members.get_mut(&id) else {
            return false;
        };
        member.bbox = bbox;
        let previous = member.cells;
        if previous == cells {
            return true;
        }
        member.cells = cells;
        self.unlink(id, previous);
        self.link(id, cells);
        true
    }

    /// Every collider whose box truly overlaps `id`'s box, in slot order.
    /// Empty for colliders that are not in the grid.
    pub fn get_collisions(&self, id: EntityId) -> Vec<Contact> {
        let Some(member) = self.members.get(&id) else {
            return Vec::new();
        };
        let bbox = member.bbox;

        self.candidates(member.cells)
            .into_iter()
            .filter(|&other| other != id)
            .filter_map(|other| {
                let other_box = self.members.get(&other)?.bbox;
                let overlap = bbox.intersection(&other_box)?;
                Some(Contact {
                    other,
                    other_box,
                    side: contact_side(&bbox, &other_box, &overlap),
                    overlap,
                })
            })
            .collect()
    }

    /// Colliders overlapping an arbitrary area, in slot order.
    pub fn query(&self, area: Aabb) -> Vec<EntityId> {
        self.candidates(self.cell_range(&area))
            .into_iter()
            .filter(|other| {
                self.members
                    .get(other)
                    .is_some_and(|member| member.bbox.overlaps(&area))
            })
            .collect()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains_key(&id)
    }

    /// The box the grid currently holds for a collider.
    pub fn bounding_box(&self, id: EntityId) -> Option<Aabb> {
        self.members.get(&id).map(|member| member.bbox)
    }

    /// Number of colliders in the grid.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of non-empty cells. Oversized colliders occupy none.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Empty all cells.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.members.clear();
        self.oversized.clear();
    }

    /// Deduplicated colliders sharing any cell of `range`, plus every
    /// oversized collider. A range too large to walk yields every collider.
    fn candidates(&self, range: CellRange) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = if range.is_bucketed() {
            range
                .cells()
                .filter_map(|cell| self.cells.get(&cell))
                .flatten()
                .chain(&self.oversized)
                .copied()
                .collect()
        } else {
            self.members.keys().copied().collect()
        };
        found.sort_unstable_by_key(|id| id.index());
        found.dedup();
        found
    }

    fn link(&mut self, id: EntityId, range: CellRange) {
        if !range.is_bucketed() {
            self.oversized.push(id);
            return;
        }
        for cell in range.cells() {
            self.cells.entry(cell).or_default().push(id);
        }
    }

    fn unlink(&mut self, id: EntityId, range: CellRange) {
        if !range.is_bucketed() {
            self.oversized.retain(|&other| other != id);
            return;
        }
        for cell in range.cells() {
            if let Some(bucket) = self.cells.get_mut(&cell) {
                bucket.retain(|&other| other != id);
                if bucket.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }

    /// Convert a position to a cell coordinate. Far-off positions saturate
    /// at the edge of the `i32` cell space.
    fn pos_to_cell(&self, position: Vec2) -> CellCoord {
        CellCoord::new(
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }

    fn cell_range(&self, bbox: &Aabb) -> CellRange {
        let min = self.pos_to_cell(bbox.min);
        // `max` is exclusive: a box ending exactly on a cell edge stays out of the next cell.
        let end = CellCoord::new(
            ((bbox.max.x / self.cell_size).ceil() as i32).saturating_sub(1),
            ((bbox.max.y / self.cell_size).ceil() as i32).saturating_sub(1),
        );
        CellRange {
            min,
            max: CellCoord::new(end.x.max(min.x), end.y.max(min.y)),
        }
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

/// Shallowest penetration axis wins; ties go to the vertical axis.
fn contact_side(bbox: &Aabb, other: &Aabb, overlap: &Aabb) -> Side {
    let depth = overlap.size();
    let delta = other.center() - bbox.center();
    if depth.x < depth.y {
        if delta.x >= 0.0 {
            Side::Right
        } else {
            Side::Left
        }
    } else if delta.y >= 0.0 {
        Side::Bottom
    } else {
        Side::Top
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdAllocator;

    fn ids(count: usize) -> Vec<EntityId> {
        let mut alloc = IdAllocator::new();
        (0..count)
            .map(|_| EntityId::from_slot(alloc.create().unwrap()))
            .collect()
    }

    fn aabb(x0: f32, y0: f32, x1: f32, y1: f32) -> Aabb {
        Aabb::new(Vec2::new(x0, y0), Vec2::new(x1, y1))
    }

    #[test]
    fn test_overlapping_boxes_collide() {
        let e = ids(2);
        let mut grid = SpatialGrid::new(16.0);
        grid.add(e[0], aabb(0.0, 0.0, 10.0, 10.0));
        grid.add(e[1], aabb(5.0, 5.0, 15.0, 15.0));

        let hits = grid.get_collisions(e[0]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].other, e[1]);
        assert_eq!(hits[0].overlap, aabb(5.0, 5.0, 10.0, 10.0));

        let back = grid.get_collisions(e[1]);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].other, e[0]);
    }

    #[test]
    fn test_disjoint_boxes_in_same_cell_do_not_collide() {
        let e = ids(2);
        let mut grid = SpatialGrid::new(100.0);
        grid.add(e[0], aabb(0.0, 0.0, 10.0, 10.0));
        grid.add(e[1], aabb(20.0, 20.0, 30.0, 30.0));
        assert!(grid.get_collisions(e[0]).is_empty());
        assert!(grid.get_collisions(e[1]).is_empty());
    }

    #[test]
    fn test_touching_edges_do_not_collide() {
        let e = ids(2);
        let mut grid = SpatialGrid::new(8.0);
        grid.add(e[0], aabb(0.0, 0.0, 10.0, 11.0));
        grid.add(e[1], aabb(0.0, 11.0, 10.0, 20.0));
        assert!(grid.get_collisions(e[0]).is_empty());
    }

    #[test]
    fn test_large_box_spanning_cells_reported_once() {
        let e = ids(2);
        let mut grid = SpatialGrid::new(4.0);
        grid.add(e[0], aabb(0.0, 0.0, 40.0, 40.0));
        grid.add(e[1], aabb(2.0, 2.0, 30.0, 30.0));
        assert_eq!(grid.get_collisions(e[0]).len(), 1);
    }

    #[test]
    fn test_negative_coordinates() {
        let e = ids(2);
        let mut grid = SpatialGrid::new(16.0);
        grid.add(e[0], aabb(-20.0, -20.0, -10.0, -10.0));
        grid.add(e[1], aabb(-12.0, -12.0, 4.0, 4.0));
        assert_eq!(grid.get_collisions(e[0])[0].other, e[1]);
    }

    #[test]
    fn test_update_membership_moves_collider() {
        let e = ids(2);
        let mut grid = SpatialGrid::new(16.0);
        grid.add(e[0], aabb(0.0, 0.0, 8.0, 8.0));
        grid.add(e[1], aabb(100.0, 100.0, 108.0, 108.0));
        assert!(grid.get_collisions(e[0]).is_empty());

        assert!(grid.update_membership(e[0], aabb(98.0, 98.0, 106.0, 106.0)));
        assert_eq!(grid.get_collisions(e[0])[0].other, e[1]);
        assert!(grid.query(aabb(0.0, 0.0, 16.0, 16.0)).is_empty());
    }

    #[test]
    fn test_removed_collider_is_never_reported() {
        let e = ids(2);
        let mut grid = SpatialGrid::new(16.0);
        grid.add(e[0], aabb(0.0, 0.0, 10.0, 10.0));
        grid.add(e[1], aabb(5.0, 5.0, 15.0, 15.0));
        assert!(grid.remove(e[1]));
        assert!(!grid.remove(e[1]));
        assert!(grid.get_collisions(e[0]).is_empty());
        assert_eq!(grid.occupied_cells(), 1);
    }

    #[test]
    fn test_unknown_collider_is_ignored() {
        let e = ids(1);
        let mut grid = SpatialGrid::default();
        assert!(grid.get_collisions(e[0]).is_empty());
        assert!(!grid.update_membership(e[0], aabb(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn test_contact_side() {
        let e = ids(4);
        let mut grid = SpatialGrid::new(32.0);
        grid.add(e[0], aabb(10.0, 10.0, 20.0, 20.0));
        grid.add(e[1], aabb(10.0, 19.0, 20.0, 30.0)); // below
        grid.add(e[2], aabb(18.0, 11.0, 30.0, 18.0)); // right
        grid.add(e[3], aabb(11.0, 0.0, 19.0, 11.0)); // above

        let sides: Vec<_> = grid
            .get_collisions(e[0])
            .iter()
            .map(|contact| (contact.other, contact.side))
            .collect();
        assert_eq!(
            sides,
            vec![(e[1], Side::Bottom), (e[2], Side::Right), (e[3], Side::Top)]
        );
    }

    #[test]
    fn test_far_off_boxes_saturate() {
        let e = ids(3);
        let mut grid = SpatialGrid::new(64.0);
        grid.add(e[0], aabb(-1e12, 0.0, -1e12 + 1e6, 4.0));
        grid.add(e[1], aabb(-1e12, 0.0, -9e11, 4.0));
        grid.add(e[2], aabb(1e12, 0.0, 2e12, 4.0));
        assert_eq!(grid.occupied_cells(), 2);
        assert_eq!(grid.get_collisions(e[1])[0].other, e[0]);
        assert!(grid.get_collisions(e[2]).is_empty());
        assert!(grid.remove(e[0]));
    }

    #[test]
    fn test_oversized_box_still_collides() {
        let e = ids(3);
        let mut grid = SpatialGrid::new(1.0);
        grid.add(e[0], aabb(0.0, 0.0, 1000.0, 1000.0));
        grid.add(e[1], aabb(500.0, 500.0, 501.0, 501.0));
        grid.add(e[2], aabb(2000.0, 2000.0, 2001.0, 2001.0));
        assert_eq!(grid.occupied_cells(), 2);

        assert_eq!(grid.get_collisions(e[1])[0].other, e[0]);
        let hits: Vec<_> = grid.get_collisions(e[0]).iter().map(|c| c.other).collect();
        assert_eq!(hits, vec![e[1]]);
        assert_eq!(grid.query(aabb(-5e5, -5e5, 5e5, 5e5)), vec![e[0], e[1], e[2]]);

        // Shrinking it moves it into the buckets.
        assert!(grid.update_membership(e[0], aabb(0.0, 0.0, 2.0, 2.0)));
        assert!(grid.get_collisions(e[1]).is_empty());
        assert_eq!(grid.occupied_cells(), 6);
        assert!(grid.remove(e[0]));
        assert_eq!(grid.occupied_cells(), 2);
    }

    #[test]
    fn test_clear() {
        let e = ids(2);
        let mut grid = SpatialGrid::new(16.0);
        grid.add(e[0], aabb(0.0, 0.0, 10.0, 10.0));
        grid.add(e[1], aabb(5.0, 5.0, 15.0, 15.0));
        grid.clear();
        assert!(grid.is_empty());
        assert_eq!(grid.occupied_cells(), 0);
        assert!(grid.get_collisions(e[0]).is_empty());
    }
}
