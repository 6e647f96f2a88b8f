//! Pure cell-space to local-space conversions. Committed placements and
//! rollback restoration both go through `cell_to_local`, so a cancelled drag
//! lands on exactly its pre-drag transform.

use bevy::prelude::*;

/// Position and size of an item rectangle in the grid's local space. The
/// position is the item's pivot point, not its corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalRect {
    pub position: Vec2,
    pub size: Vec2,
}

pub fn cell_to_local(
    origin: IVec2,
    footprint: IVec2,
    pivot: Vec2,
    cell_size: f32,
    parent_pivot_offset: Vec2,
) -> LocalRect {
    let footprint = footprint.as_vec2();
    LocalRect {
        position: (origin.as_vec2() + footprint * pivot) * cell_size - parent_pivot_offset,
        size: footprint * cell_size,
    }
}

/// Cell coordinate containing a local-space point. Callers bounds-check the
/// result against the grid themselves.
pub fn local_to_cell(point: Vec2, cell_size: f32) -> IVec2 {
    IVec2::new(
        (point.x / cell_size).floor() as i32,
        (point.y / cell_size).floor() as i32,
    )
}

/// Offset of a grid's pivot point from its bottom-left corner, the term
/// subtracted when anchoring item rectangles inside a pivoted parent.
pub fn grid_pivot_offset(width: i32, height: i32, cell_size: f32, pivot: Vec2) -> Vec2 {
    Vec2::new(width as f32, height as f32) * cell_size * pivot
}
