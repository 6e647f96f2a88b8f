use bevy::prelude::*;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StashError {
    #[error("grid dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("item footprint must be at least 1x1, got {width}x{height}")]
    InvalidFootprint { width: i32, height: i32 },
    #[error("footprint at {origin} extends outside the grid")]
    OutOfBounds { origin: IVec2 },
    #[error("footprint at {origin} overlaps a blocked or occupied cell")]
    Overlap { origin: IVec2 },
    #[error("a drag session is already active")]
    AlreadyDragging,
    #[error("no drag session is active")]
    NoActiveDrag,
    #[error("cannot block {requested} cells, only {free} are free")]
    BlockedCapacityExceeded { requested: usize, free: usize },
}

/// One cell of the inventory. A blocked cell is permanently unavailable and is
/// never also occupied by an item.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub occupied_by: Option<Entity>,
    pub blocked: bool,
}

/// Row-major slot matrix. Dimensions and cell size are fixed after
/// construction; only occupancy and blocked flags mutate.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct SlotGrid {
    w: i32,
    h: i32,
    cell_size: f32,
    slots: Vec<Slot>,
}

impl SlotGrid {
    pub fn new(width: i32, height: i32, cell_size: f32) -> Result<Self, StashError> {
        if width <= 0 || height <= 0 || cell_size <= 0.0 {
            return Err(StashError::InvalidDimensions { width, height });
        }
        Ok(Self {
            w: width,
            h: height,
            cell_size,
            slots: vec![Slot::default(); (width * height) as usize],
        })
    }

    pub const fn width(&self) -> i32 {
        self.w
    }

    pub const fn height(&self) -> i32 {
        self.h
    }

    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn local_size(&self) -> Vec2 {
        Vec2::new(self.w as f32, self.h as f32) * self.cell_size
    }

    const fn index(&self, pos: IVec2) -> usize {
        (pos.x + pos.y * self.w) as usize
    }

    const fn pos_of(&self, index: usize) -> IVec2 {
        IVec2::new(index as i32 % self.w, index as i32 / self.w)
    }

    pub fn get(&self, pos: IVec2) -> Option<&Slot> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.w || pos.y >= self.h {
            return None;
        }
        self.slots.get(self.index(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = (IVec2, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (self.pos_of(i), slot))
    }

    /// True iff the whole footprint rectangle starting at `origin` lies within
    /// the grid.
    pub const fn in_bounds(&self, origin: IVec2, footprint: IVec2) -> bool {
        footprint.x >= 1
            && footprint.y >= 1
            && origin.x >= 0
            && origin.y >= 0
            && origin.x + footprint.x <= self.w
            && origin.y + footprint.y <= self.h
    }

    pub fn cells_of(origin: IVec2, footprint: IVec2) -> Vec<IVec2> {
        let mut cells = Vec::with_capacity((footprint.x * footprint.y).max(0) as usize);
        for y in 0..footprint.y {
            for x in 0..footprint.x {
                cells.push(origin + IVec2::new(x, y));
            }
        }
        cells
    }

    /// True iff every cell is in bounds, unblocked, and either free or owned by
    /// `excluding`. Self-exclusion is what lets an item re-place onto cells it
    /// already occupies.
    pub fn is_available(&self, cells: &[IVec2], excluding: Option<Entity>) -> bool {
        cells.iter().all(|&pos| {
            self.get(pos).is_some_and(|slot| {
                !slot.blocked && (slot.occupied_by.is_none() || slot.occupied_by == excluding)
            })
        })
    }

    pub fn mark_occupied(&mut self, cells: &[IVec2], item: Entity) {
        for &pos in cells {
            let index = self.index(pos);
            if let Some(slot) = self.slots.get_mut(index) {
                slot.occupied_by = Some(item);
            }
        }
    }

    /// Clears only cells currently owned by `item`; blocked flags are never
    /// touched.
    pub fn mark_free(&mut self, cells: &[IVec2], item: Entity) {
        for &pos in cells {
            let index = self.index(pos);
            if let Some(slot) = self.slots.get_mut(index) {
                if slot.occupied_by == Some(item) {
                    slot.occupied_by = None;
                }
            }
        }
    }

    pub fn free_cell_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !slot.blocked && slot.occupied_by.is_none())
            .count()
    }

    /// Blocks `count` distinct free cells chosen uniformly without replacement
    /// from the supplied rng. Mutates nothing on capacity failure.
    pub fn block_random(
        &mut self,
        count: usize,
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<IVec2>, StashError> {
        let mut eligible: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.blocked && slot.occupied_by.is_none())
            .map(|(i, _)| i)
            .collect();
        if count > eligible.len() {
            return Err(StashError::BlockedCapacityExceeded {
                requested: count,
                free: eligible.len(),
            });
        }
        let mut blocked = Vec::with_capacity(count);
        for _ in 0..count {
            let picked = eligible.swap_remove(rng.usize(0..eligible.len()));
            if let Some(slot) = self.slots.get_mut(picked) {
                slot.blocked = true;
            }
            blocked.push(self.pos_of(picked));
        }
        Ok(blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_dimensions() {
        assert_eq!(
            SlotGrid::new(0, 5, 100.0),
            Err(StashError::InvalidDimensions {
                width: 0,
                height: 5
            })
        );
        assert_eq!(
            SlotGrid::new(5, -1, 100.0),
            Err(StashError::InvalidDimensions {
                width: 5,
                height: -1
            })
        );
        assert!(SlotGrid::new(1, 1, 100.0).is_ok());
    }

    #[test]
    fn bounds_cover_the_whole_footprint() {
        let grid = SlotGrid::new(5, 5, 100.0).expect("valid grid");
        assert!(grid.in_bounds(IVec2::new(0, 0), IVec2::new(5, 5)));
        assert!(grid.in_bounds(IVec2::new(3, 4), IVec2::new(2, 1)));
        assert!(!grid.in_bounds(IVec2::new(4, 4), IVec2::new(2, 2)));
        assert!(!grid.in_bounds(IVec2::new(-1, 0), IVec2::new(1, 1)));
        assert!(!grid.in_bounds(IVec2::new(0, 0), IVec2::new(0, 1)));
    }

    #[test]
    fn cells_of_enumerates_the_rectangle() {
        let cells = SlotGrid::cells_of(IVec2::new(2, 2), IVec2::new(2, 2));
        assert_eq!(
            cells,
            vec![
                IVec2::new(2, 2),
                IVec2::new(3, 2),
                IVec2::new(2, 3),
                IVec2::new(3, 3)
            ]
        );
    }

    #[test]
    fn availability_respects_blocking_and_self_exclusion() {
        let mut grid = SlotGrid::new(3, 3, 10.0).expect("valid grid");
        let me = Entity::from_raw(1);
        let other = Entity::from_raw(2);
        let cells = SlotGrid::cells_of(IVec2::ZERO, IVec2::new(2, 1));

        assert!(grid.is_available(&cells, None));
        grid.mark_occupied(&cells, me);
        assert!(grid.is_available(&cells, Some(me)));
        assert!(!grid.is_available(&cells, Some(other)));
        assert!(!grid.is_available(&cells, None));
    }

    #[test]
    fn mark_free_only_clears_the_owner() {
        let mut grid = SlotGrid::new(3, 3, 10.0).expect("valid grid");
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        let cell = vec![IVec2::new(1, 1)];

        grid.mark_occupied(&cell, a);
        grid.mark_free(&cell, b);
        assert_eq!(
            grid.get(IVec2::new(1, 1)).and_then(|s| s.occupied_by),
            Some(a)
        );
        grid.mark_free(&cell, a);
        assert_eq!(grid.get(IVec2::new(1, 1)).and_then(|s| s.occupied_by), None);
    }

    #[test]
    fn block_random_blocks_exactly_n_free_cells() {
        let mut grid = SlotGrid::new(5, 5, 10.0).expect("valid grid");
        let mut rng = fastrand::Rng::with_seed(7);
        let blocked = grid.block_random(3, &mut rng).expect("capacity is fine");

        assert_eq!(blocked.len(), 3);
        let mut distinct = blocked.clone();
        distinct.sort_by_key(|p| (p.y, p.x));
        distinct.dedup();
        assert_eq!(distinct.len(), 3, "blocked cells must be distinct");
        assert_eq!(grid.free_cell_count(), 22);
        for pos in blocked {
            assert!(grid.get(pos).is_some_and(|s| s.blocked));
            assert!(grid.get(pos).is_some_and(|s| s.occupied_by.is_none()));
        }
    }

    #[test]
    fn block_random_is_reproducible_for_a_seed() {
        let mut a = SlotGrid::new(4, 4, 10.0).expect("valid grid");
        let mut b = SlotGrid::new(4, 4, 10.0).expect("valid grid");
        let picked_a = a
            .block_random(5, &mut fastrand::Rng::with_seed(42))
            .expect("capacity is fine");
        let picked_b = b
            .block_random(5, &mut fastrand::Rng::with_seed(42))
            .expect("capacity is fine");
        assert_eq!(picked_a, picked_b);
        assert_eq!(a, b);
    }

    #[test]
    fn block_random_over_capacity_mutates_nothing() {
        let mut grid = SlotGrid::new(2, 2, 10.0).expect("valid grid");
        grid.mark_occupied(&[IVec2::ZERO], Entity::from_raw(1));
        let snapshot = grid.clone();

        let mut rng = fastrand::Rng::with_seed(0);
        assert_eq!(
            grid.block_random(4, &mut rng),
            Err(StashError::BlockedCapacityExceeded {
                requested: 4,
                free: 3
            })
        );
        assert_eq!(grid, snapshot);
    }
}
