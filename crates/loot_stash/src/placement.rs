use bevy::prelude::*;

use crate::grid::{SlotGrid, StashError};
use crate::layout::{self, LocalRect};

/// An inventory item. `position` and `origin` only mutate through [`place`];
/// `origin` is the rollback target of an interactive move.
#[derive(Component, Debug, Clone)]
pub struct StashItem {
    pub footprint: IVec2,
    pub pivot: Vec2,
    pub position: Option<IVec2>,
    pub origin: IVec2,
    /// Cleared for the duration of a drag; the host's hit testing must honor
    /// it so the dragged item never occludes the drop target.
    pub hit_testable: bool,
}

impl StashItem {
    pub const fn new(footprint: IVec2, pivot: Vec2) -> Self {
        Self {
            footprint,
            pivot,
            position: None,
            origin: IVec2::ZERO,
            hit_testable: true,
        }
    }
}

/// Result of a committed placement, with the cells that changed occupancy and
/// the item's new local transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub position: IVec2,
    pub transform: LocalRect,
    pub changed_cells: Vec<IVec2>,
}

/// Pure feasibility check. An item's own cells count as available so that
/// move-in-place and re-drags succeed without vacating first.
pub fn can_place(grid: &SlotGrid, item: &StashItem, id: Entity, target: IVec2) -> bool {
    if item.footprint.x < 1 || item.footprint.y < 1 {
        return false;
    }
    if !grid.in_bounds(target, item.footprint) {
        return false;
    }
    grid.is_available(&SlotGrid::cells_of(target, item.footprint), Some(id))
}

/// Commits `item` at `target`. Re-validates internally rather than trusting
/// the caller, and on any failure leaves the slot matrix untouched; freeing
/// the old cells and marking the new ones happen only after the full target
/// set has passed validation.
pub fn place(
    grid: &mut SlotGrid,
    item: &mut StashItem,
    id: Entity,
    target: IVec2,
    parent_pivot_offset: Vec2,
) -> Result<Placement, StashError> {
    if item.footprint.x < 1 || item.footprint.y < 1 {
        return Err(StashError::InvalidFootprint {
            width: item.footprint.x,
            height: item.footprint.y,
        });
    }
    if !grid.in_bounds(target, item.footprint) {
        return Err(StashError::OutOfBounds { origin: target });
    }
    let new_cells = SlotGrid::cells_of(target, item.footprint);
    if !grid.is_available(&new_cells, Some(id)) {
        return Err(StashError::Overlap { origin: target });
    }

    let mut changed_cells = new_cells.clone();
    if let Some(previous) = item.position {
        let old_cells = SlotGrid::cells_of(previous, item.footprint);
        changed_cells.extend(
            old_cells
                .iter()
                .copied()
                .filter(|cell| !new_cells.contains(cell)),
        );
        grid.mark_free(&old_cells, id);
    }
    grid.mark_occupied(&new_cells, id);
    item.position = Some(target);
    item.origin = target;

    Ok(Placement {
        position: target,
        transform: layout::cell_to_local(
            target,
            item.footprint,
            item.pivot,
            grid.cell_size(),
            parent_pivot_offset,
        ),
        changed_cells,
    })
}
