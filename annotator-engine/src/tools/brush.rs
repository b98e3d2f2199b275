use annotator_core::UNLABELED;
use annotator_core::selection::query_circle;
use bevy::math::Mat4;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::constants::{
    BRUSH_CURSOR_BORDER, BRUSH_RADIUS_STEP, DEFAULT_BRUSH_RADIUS, MAX_BRUSH_RADIUS,
    MIN_BRUSH_RADIUS,
};
use crate::engine::autosave::AutosaveEvent;
use crate::engine::library::{
    ActiveCloud, CloudEntry, CloudLibrary, ColorsDirty, LabelPalette, gesture_oracle,
};
use crate::tools::labeling::CurrentLabel;

/// Screen-space paint brush. While a stroke is down every cursor sample
/// paints the circle around it, so label writes track pointer motion events
/// rather than frames.
#[derive(Resource)]
pub struct BrushTool {
    pub enabled: bool,
    pub radius: f32,
    pub stroke: bool,
}

impl Default for BrushTool {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: DEFAULT_BRUSH_RADIUS,
            stroke: false,
        }
    }
}

/// On-screen circle tracking the cursor while the brush is enabled, so the
/// operator sees the stroke footprint before painting.
#[derive(Component)]
pub struct BrushCursor;

pub fn spawn_brush_cursor(mut commands: Commands) {
    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            display: Display::None,
            border: UiRect::all(Val::Px(1.5)),
            ..default()
        },
        BorderColor(Color::srgba(
            BRUSH_CURSOR_BORDER[0],
            BRUSH_CURSOR_BORDER[1],
            BRUSH_CURSOR_BORDER[2],
            BRUSH_CURSOR_BORDER[3],
        )),
        BorderRadius::MAX,
        BrushCursor,
    ));
}

/// Top-left corner and size of a square node whose inscribed circle is the
/// brush footprint around `center`.
fn brush_cursor_rect(center: Vec2, radius: f32) -> (Vec2, Vec2) {
    (center - Vec2::splat(radius), Vec2::splat(radius * 2.0))
}

pub fn update_brush_cursor(
    brush: Res<BrushTool>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut cursor_query: Query<&mut Node, With<BrushCursor>>,
) {
    let Ok(mut node) = cursor_query.single_mut() else {
        return;
    };
    let cursor = windows.single().ok().and_then(|w| w.cursor_position());
    match cursor {
        Some(position) if brush.enabled => {
            let (corner, size) = brush_cursor_rect(position, brush.radius);
            node.display = Display::Flex;
            node.left = Val::Px(corner.x);
            node.top = Val::Px(corner.y);
            node.width = Val::Px(size.x);
            node.height = Val::Px(size.y);
        }
        _ => node.display = Display::None,
    }
}

pub fn brush_system(
    mut brush: ResMut<BrushTool>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut cursor_moved: EventReader<CursorMoved>,
    mut active: ResMut<ActiveCloud>,
    mut library: ResMut<CloudLibrary>,
    mut palette: ResMut<LabelPalette>,
    current_label: Res<CurrentLabel>,
    camera_query: Query<&GlobalTransform, With<Camera3d>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut colors_dirty: ResMut<ColorsDirty>,
    mut autosave: EventWriter<AutosaveEvent>,
) {
    if keyboard.just_pressed(KeyCode::KeyB) {
        brush.enabled = !brush.enabled;
        brush.stroke = false;
        info!("brush {}", if brush.enabled { "on" } else { "off" });
    }
    if keyboard.just_pressed(KeyCode::BracketLeft) {
        brush.radius = (brush.radius - BRUSH_RADIUS_STEP).max(MIN_BRUSH_RADIUS);
    }
    if keyboard.just_pressed(KeyCode::BracketRight) {
        brush.radius = (brush.radius + BRUSH_RADIUS_STEP).min(MAX_BRUSH_RADIUS);
    }
    if !brush.enabled {
        brush.stroke = false;
        return;
    }

    let shift = keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
    let alt = keyboard.any_pressed([KeyCode::AltLeft, KeyCode::AltRight]);

    // Collect this frame's samples before touching the stroke flag: the
    // press itself paints at the current cursor position, and every motion
    // event after it paints again.
    let mut samples: Vec<Vec2> = Vec::new();
    if mouse_button.just_pressed(MouseButton::Left) && !shift {
        if let Some(cursor) = windows.single().ok().and_then(|w| w.cursor_position()) {
            brush.stroke = true;
            samples.push(cursor);
        }
    }
    if brush.stroke {
        samples.extend(cursor_moved.read().map(|ev| ev.position));
    } else {
        cursor_moved.clear();
    }
    if mouse_button.just_released(MouseButton::Left) {
        brush.stroke = false;
    }
    if samples.is_empty() {
        return;
    }

    if active.index.is_dirty() {
        return;
    }
    let Ok(camera_transform) = camera_query.single() else {
        return;
    };

    // Alt erases; otherwise paint the current label.
    let label = if alt { UNLABELED } else { current_label.0 };
    palette.0.ensure_label(label);

    let ActiveCloud {
        key,
        index,
        occlusion,
        ..
    } = active.as_mut();
    let Some(entry) = key.as_ref().and_then(|k| library.clouds.get_mut(k)) else {
        return;
    };
    // Geometry read-only, label store mutable, out of the same entry.
    let CloudEntry { points, store } = entry;
    let oracle = gesture_oracle(points, occlusion, camera_transform.translation());

    let mut painted = 0usize;
    for center in samples {
        query_circle(
            index,
            center,
            brush.radius,
            points.positions(),
            Mat4::IDENTITY,
            &oracle,
            |j| {
                if store.label(j) != label {
                    store.paint(j, label, &palette.0);
                    painted += 1;
                }
            },
        );
    }
    if painted > 0 {
        colors_dirty.0 = true;
        autosave.write(AutosaveEvent);
        debug!("brush painted {} points with label {}", painted, label);
    }
}
