use bevy::prelude::*;
use bevy::window::WindowResolution;

pub mod drag;
pub mod grid;
pub mod input;
pub mod layout;
pub mod placement;

pub use drag::{DragOutcome, DragPhase, DragSession};
pub use grid::{Slot, SlotGrid, StashError};
pub use layout::LocalRect;
pub use placement::{Placement, StashItem};

const WINDOW_WIDTH: f32 = 360.0;
const WINDOW_HEIGHT: f32 = 640.0;

const SLOT_FREE_COLOR: Color = Color::Srgba(Srgba {
    red: 0.35,
    green: 0.35,
    blue: 0.35,
    alpha: 1.,
});

const SLOT_OCCUPIED_COLOR: Color = Color::Srgba(Srgba {
    red: 0.25,
    green: 0.45,
    blue: 0.25,
    alpha: 1.,
});

const SLOT_BLOCKED_COLOR: Color = Color::Srgba(Srgba {
    red: 0.12,
    green: 0.12,
    blue: 0.12,
    alpha: 1.,
});

const ITEM_COLORS: [Color; 3] = [
    Color::Srgba(Srgba {
        red: 0.9,
        green: 0.6,
        blue: 0.2,
        alpha: 1.,
    }),
    Color::Srgba(Srgba {
        red: 0.3,
        green: 0.6,
        blue: 0.9,
        alpha: 1.,
    }),
    Color::Srgba(Srgba {
        red: 0.8,
        green: 0.3,
        blue: 0.5,
        alpha: 1.,
    }),
];

const ITEM_FOOTPRINTS: [IVec2; 3] = [IVec2::new(1, 1), IVec2::new(2, 1), IVec2::new(2, 2)];

/// Inventory configuration, validated once during setup. A bad configuration
/// is fatal to the bit and only logged, never retried.
#[derive(Resource, Debug, Clone)]
pub struct StashConfig {
    pub grid_width: i32,
    pub grid_height: i32,
    pub cell_size: f32,
    pub blocked_slots: usize,
    pub seed: u64,
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            grid_width: 5,
            grid_height: 5,
            cell_size: 64.0,
            blocked_slots: 3,
            seed: 1337,
        }
    }
}

#[derive(Event)]
pub struct ItemPlaced {
    pub item: Entity,
    pub position: IVec2,
    pub transform: LocalRect,
}

#[derive(Event)]
pub struct ItemReturned {
    pub item: Entity,
    pub transform: LocalRect,
}

#[derive(Event)]
pub struct OccupancyChanged {
    pub cells: Vec<IVec2>,
}

#[derive(Component)]
struct MainCamera;

#[derive(Component)]
struct SlotVisual {
    pos: IVec2,
}

/// Composition root: owns the grid, the drag session and the presentation
/// systems. Everything below talks to the slot matrix through the placement
/// and drag modules, never by editing slots directly.
pub struct LootStashPlugin;

impl Plugin for LootStashPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DragSession>()
            .add_event::<ItemPlaced>()
            .add_event::<ItemReturned>()
            .add_event::<OccupancyChanged>()
            .add_systems(Startup, setup)
            .add_systems(
                Update,
                (
                    handle_press,
                    handle_drag,
                    handle_release,
                    apply_item_transforms,
                    refresh_slot_highlights,
                )
                    .chain()
                    .run_if(resource_exists::<SlotGrid>),
            );
    }
}

pub fn run() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: env!("CARGO_PKG_NAME").to_string(),
                resolution: WindowResolution::new(WINDOW_WIDTH, WINDOW_HEIGHT),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(StashConfig::default())
        .add_plugins(LootStashPlugin)
        .run();
}

/// Offset of the grid's center pivot; the grid is centered on the world
/// origin, so this converts between world space and bottom-left cell space.
fn grid_half_size(grid: &SlotGrid) -> Vec2 {
    layout::grid_pivot_offset(
        grid.width(),
        grid.height(),
        grid.cell_size(),
        Vec2::splat(0.5),
    )
}

fn first_fit(grid: &SlotGrid, item: &StashItem, id: Entity) -> Option<IVec2> {
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let origin = IVec2::new(x, y);
            if placement::can_place(grid, item, id, origin) {
                return Some(origin);
            }
        }
    }
    None
}

fn setup(
    mut commands: Commands,
    config: Res<StashConfig>,
    mut occupancy_events: EventWriter<OccupancyChanged>,
) {
    let mut grid = match SlotGrid::new(config.grid_width, config.grid_height, config.cell_size) {
        Ok(grid) => grid,
        Err(err) => {
            error!("inventory setup failed: {err}");
            return;
        }
    };

    let mut rng = fastrand::Rng::with_seed(config.seed);
    if let Err(err) = grid.block_random(config.blocked_slots, &mut rng) {
        error!("inventory setup failed: {err}");
        return;
    }

    commands.spawn(Camera2d).insert(MainCamera);

    let half = grid_half_size(&grid);
    let cell = grid.cell_size();
    for (pos, slot) in grid.iter() {
        let color = if slot.blocked {
            SLOT_BLOCKED_COLOR
        } else {
            SLOT_FREE_COLOR
        };
        let center = (pos.as_vec2() + Vec2::splat(0.5)) * cell - half;
        commands.spawn((
            Sprite::from_color(color, Vec2::splat(cell - 2.0)),
            Transform::from_translation(center.extend(0.0)),
            SlotVisual { pos },
        ));
    }

    for (footprint, color) in ITEM_FOOTPRINTS.iter().zip(ITEM_COLORS) {
        let id = commands.spawn_empty().id();
        let mut item = StashItem::new(*footprint, Vec2::splat(0.5));
        let Some(origin) = first_fit(&grid, &item, id) else {
            warn!("no room to seed a {footprint} item");
            commands.entity(id).despawn();
            continue;
        };
        match placement::place(&mut grid, &mut item, id, origin, half) {
            Ok(placed) => {
                commands.entity(id).insert((
                    Sprite::from_color(color, placed.transform.size - Vec2::splat(8.0)),
                    Transform::from_translation(placed.transform.position.extend(1.0)),
                    item,
                ));
                occupancy_events.send(OccupancyChanged {
                    cells: placed.changed_cells,
                });
            }
            Err(err) => {
                warn!("could not seed a {footprint} item: {err}");
                commands.entity(id).despawn();
            }
        }
    }

    commands.insert_resource(grid);
}

fn handle_press(
    mouse_input: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    windows: Query<&Window>,
    camera: Query<(&Camera, &GlobalTransform)>,
    mut session: ResMut<DragSession>,
    mut items: Query<(Entity, &mut StashItem, &Transform, &Sprite)>,
) {
    let Some(world) =
        input::just_pressed_world_position(&mouse_input, &touch_input, &windows, &camera)
    else {
        return;
    };

    // Topmost hit-testable item under the pointer wins; the flag keeps a
    // mid-drag item from occluding anything.
    let mut topmost: Option<(Entity, f32)> = None;
    for (entity, item, transform, sprite) in &items {
        if !item.hit_testable {
            continue;
        }
        let size = sprite.custom_size.unwrap_or(Vec2::ZERO);
        let center = transform.translation.truncate();
        let hit = (world - center).abs().cmple(size / 2.0).all();
        if hit && topmost.is_none_or(|(_, z)| transform.translation.z > z) {
            topmost = Some((entity, transform.translation.z));
        }
    }

    let Some((entity, _)) = topmost else {
        return;
    };
    let Ok((_, mut item, _, _)) = items.get_mut(entity) else {
        return;
    };
    if let Err(err) = session.begin(entity, &mut item) {
        warn!("ignoring pointer-down: {err}");
    }
}

fn handle_drag(
    mouse_input: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    windows: Query<&Window>,
    camera: Query<(&Camera, &GlobalTransform)>,
    mut session: ResMut<DragSession>,
    mut transforms: Query<&mut Transform, With<StashItem>>,
    mut last_pointer: Local<Option<Vec2>>,
) {
    if session.phase() != DragPhase::Dragging {
        *last_pointer = None;
        return;
    }
    let Some(world) = input::pressed_world_position(&mouse_input, &touch_input, &windows, &camera)
    else {
        return;
    };
    let Some(previous) = *last_pointer else {
        *last_pointer = Some(world);
        return;
    };
    *last_pointer = Some(world);

    let delta = world - previous;
    if delta == Vec2::ZERO {
        return;
    }
    if session.update(delta).is_err() {
        return;
    }
    let Some(id) = session.dragged_item() else {
        return;
    };
    if let Ok(mut transform) = transforms.get_mut(id) {
        transform.translation += delta.extend(0.0);
    }
}

fn handle_release(
    mouse_input: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    windows: Query<&Window>,
    camera: Query<(&Camera, &GlobalTransform)>,
    mut session: ResMut<DragSession>,
    mut grid: ResMut<SlotGrid>,
    mut items: Query<&mut StashItem>,
    mut placed_events: EventWriter<ItemPlaced>,
    mut returned_events: EventWriter<ItemReturned>,
    mut occupancy_events: EventWriter<OccupancyChanged>,
) {
    if session.phase() != DragPhase::Dragging {
        return;
    }
    let Some(world) =
        input::just_released_world_position(&mouse_input, &touch_input, &windows, &camera)
    else {
        return;
    };
    let Some(id) = session.dragged_item() else {
        return;
    };
    let Ok(mut item) = items.get_mut(id) else {
        return;
    };

    let half = grid_half_size(&grid);
    let pointer_local = world + half;
    let hovered = [layout::local_to_cell(pointer_local, grid.cell_size())];

    match session.end(&mut grid, id, &mut item, pointer_local, &hovered, half) {
        Ok(DragOutcome::Placed(placed)) => {
            occupancy_events.send(OccupancyChanged {
                cells: placed.changed_cells,
            });
            placed_events.send(ItemPlaced {
                item: id,
                position: placed.position,
                transform: placed.transform,
            });
        }
        Ok(DragOutcome::ReturnedToOrigin { transform }) => {
            returned_events.send(ItemReturned {
                item: id,
                transform,
            });
        }
        Err(err) => {
            warn!("ignoring pointer-up: {err}");
        }
    }
}

/// Presentation only reacts to placement events; committed and rolled-back
/// transforms both come from the same mapper, so a cancelled drag lands
/// pixel-identical to where it started.
fn apply_item_transforms(
    mut placed_events: EventReader<ItemPlaced>,
    mut returned_events: EventReader<ItemReturned>,
    mut items: Query<&mut Transform, With<StashItem>>,
) {
    for (entity, rect) in placed_events
        .read()
        .map(|e| (e.item, e.transform))
        .chain(returned_events.read().map(|e| (e.item, e.transform)))
    {
        if let Ok(mut transform) = items.get_mut(entity) {
            transform.translation = rect.position.extend(1.0);
        }
    }
}

fn refresh_slot_highlights(
    mut occupancy_events: EventReader<OccupancyChanged>,
    grid: Res<SlotGrid>,
    mut slots: Query<(&SlotVisual, &mut Sprite)>,
) {
    let changed: Vec<IVec2> = occupancy_events
        .read()
        .flat_map(|e| e.cells.iter().copied())
        .collect();
    if changed.is_empty() {
        return;
    }
    for (visual, mut sprite) in &mut slots {
        if !changed.contains(&visual.pos) {
            continue;
        }
        let Some(slot) = grid.get(visual.pos) else {
            continue;
        };
        sprite.color = if slot.blocked {
            SLOT_BLOCKED_COLOR
        } else if slot.occupied_by.is_some() {
            SLOT_OCCUPIED_COLOR
        } else {
            SLOT_FREE_COLOR
        };
    }
}
