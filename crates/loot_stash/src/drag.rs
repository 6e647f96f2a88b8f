use bevy::prelude::*;

use crate::grid::{SlotGrid, StashError};
use crate::layout::{self, LocalRect};
use crate::placement::{self, Placement, StashItem};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging,
    Resolving,
}

/// How a drag ended: either the item committed to a new slot, or it snapped
/// back to the transform of its pre-drag origin. An invalid drop is never an
/// error the host has to handle.
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    Placed(Placement),
    ReturnedToOrigin { transform: LocalRect },
}

/// One interactive move between pointer-down and pointer-up. Only a single
/// session can be active; `begin` rejects a concurrent start instead of
/// queueing it. Resolution in `end` is fully synchronous, so the session
/// always leaves `Idle` again within the same call.
#[derive(Resource, Debug, Default)]
pub struct DragSession {
    phase: DragPhase,
    item: Option<Entity>,
    origin: IVec2,
    offset: Vec2,
}

impl DragSession {
    pub const fn phase(&self) -> DragPhase {
        self.phase
    }

    pub const fn dragged_item(&self) -> Option<Entity> {
        self.item
    }

    pub const fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Starts a session for a placed item, recording its committed position as
    /// the rollback origin and making it transiently non-hit-testable.
    /// Dragging an unplaced item is host misuse, same as calling out of order.
    pub fn begin(&mut self, id: Entity, item: &mut StashItem) -> Result<(), StashError> {
        if self.phase != DragPhase::Idle {
            return Err(StashError::AlreadyDragging);
        }
        let Some(current) = item.position else {
            return Err(StashError::NoActiveDrag);
        };
        item.hit_testable = false;
        self.phase = DragPhase::Dragging;
        self.item = Some(id);
        self.origin = current;
        self.offset = Vec2::ZERO;
        Ok(())
    }

    /// Accumulates the transient display offset. No occupancy changes and no
    /// change to the item's committed position.
    pub fn update(&mut self, delta: Vec2) -> Result<Vec2, StashError> {
        if self.phase != DragPhase::Dragging {
            return Err(StashError::NoActiveDrag);
        }
        self.offset += delta;
        Ok(self.offset)
    }

    /// Resolves the drop and terminates the session unconditionally. The
    /// first hovered entry that is a real slot gets one placement attempt;
    /// anything else, including a pointer outside the grid rectangle, rolls
    /// back. `pointer_local` is measured from the grid's bottom-left corner.
    pub fn end(
        &mut self,
        grid: &mut SlotGrid,
        id: Entity,
        item: &mut StashItem,
        pointer_local: Vec2,
        hovered: &[IVec2],
        parent_pivot_offset: Vec2,
    ) -> Result<DragOutcome, StashError> {
        if self.phase != DragPhase::Dragging {
            return Err(StashError::NoActiveDrag);
        }
        self.phase = DragPhase::Resolving;
        let outcome = self.resolve(grid, id, item, pointer_local, hovered, parent_pivot_offset);
        item.hit_testable = true;
        self.phase = DragPhase::Idle;
        self.item = None;
        self.offset = Vec2::ZERO;
        Ok(outcome)
    }

    fn resolve(
        &self,
        grid: &mut SlotGrid,
        id: Entity,
        item: &mut StashItem,
        pointer_local: Vec2,
        hovered: &[IVec2],
        parent_pivot_offset: Vec2,
    ) -> DragOutcome {
        let size = grid.local_size();
        let inside = pointer_local.x >= 0.0
            && pointer_local.y >= 0.0
            && pointer_local.x <= size.x
            && pointer_local.y <= size.y;

        if inside {
            // Topmost-hit-first ordering is the host's contract; the first
            // entry that is a real slot gets the single placement attempt.
            let target = hovered.iter().find(|&&pos| grid.get(pos).is_some());
            if let Some(&target) = target {
                if let Ok(placement) =
                    placement::place(grid, item, id, target, parent_pivot_offset)
                {
                    return DragOutcome::Placed(placement);
                }
            }
        }

        // Rollback. Occupancy was never touched for the failed move, so only
        // the visual transform needs restoring.
        DragOutcome::ReturnedToOrigin {
            transform: layout::cell_to_local(
                self.origin,
                item.footprint,
                item.pivot,
                grid.cell_size(),
                parent_pivot_offset,
            ),
        }
    }
}
