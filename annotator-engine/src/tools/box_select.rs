use annotator_core::SelectMode;
use bevy::math::Mat4;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::constants::{RECT_BORDER, RECT_FILL};
use crate::engine::library::{ActiveCloud, CloudLibrary, ColorsDirty, gesture_oracle};
use crate::tools::brush::BrushTool;

/// Rectangle drag in progress. The anchor is the press position; `last`
/// tracks the most recent cursor sample so a release outside the window
/// still closes the rectangle somewhere sensible.
#[derive(Resource)]
pub struct BoxSelectState {
    pub dragging: bool,
    pub anchor: Vec2,
    pub last: Vec2,
    pub mode: SelectMode,
}

impl Default for BoxSelectState {
    fn default() -> Self {
        Self {
            dragging: false,
            anchor: Vec2::ZERO,
            last: Vec2::ZERO,
            mode: SelectMode::Add,
        }
    }
}

/// On-screen rubber-band rectangle, shown only while dragging.
#[derive(Component)]
pub struct SelectionRect;

pub fn spawn_selection_rect(mut commands: Commands) {
    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            display: Display::None,
            border: UiRect::all(Val::Px(1.0)),
            ..default()
        },
        BackgroundColor(Color::srgba(
            RECT_FILL[0],
            RECT_FILL[1],
            RECT_FILL[2],
            RECT_FILL[3],
        )),
        BorderColor(Color::srgba(
            RECT_BORDER[0],
            RECT_BORDER[1],
            RECT_BORDER[2],
            RECT_BORDER[3],
        )),
        SelectionRect,
    ));
}

/// Shift-drag adds to the staged selection, Alt-drag subtracts. The toggle
/// itself happens on release, against the projection index rebuilt earlier
/// this frame.
pub fn box_select_system(
    mut state: ResMut<BoxSelectState>,
    mut active: ResMut<ActiveCloud>,
    library: Res<CloudLibrary>,
    brush: Res<BrushTool>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    keyboard: Res<ButtonInput<KeyCode>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    camera_query: Query<&GlobalTransform, With<Camera3d>>,
    mut rect_query: Query<&mut Node, With<SelectionRect>>,
    mut colors_dirty: ResMut<ColorsDirty>,
) {
    let shift = keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
    let alt = keyboard.any_pressed([KeyCode::AltLeft, KeyCode::AltRight]);
    let cursor = windows.single().ok().and_then(|w| w.cursor_position());

    if mouse_button.just_pressed(MouseButton::Left) && !state.dragging {
        // The brush owns plain left-drags while enabled; Shift always
        // reclaims the rectangle.
        let box_gesture = shift || (alt && !brush.enabled);
        if box_gesture {
            if let Some(cursor) = cursor {
                state.dragging = true;
                state.anchor = cursor;
                state.last = cursor;
                state.mode = if alt { SelectMode::Subtract } else { SelectMode::Add };
            }
        }
    }

    if !state.dragging {
        return;
    }
    if let Some(cursor) = cursor {
        state.last = cursor;
    }

    if let Ok(mut rect) = rect_query.single_mut() {
        if mouse_button.pressed(MouseButton::Left) {
            let min = state.anchor.min(state.last);
            let size = (state.anchor - state.last).abs();
            rect.display = Display::Flex;
            rect.left = Val::Px(min.x);
            rect.top = Val::Px(min.y);
            rect.width = Val::Px(size.x);
            rect.height = Val::Px(size.y);
        } else {
            rect.display = Display::None;
        }
    }

    if !mouse_button.just_released(MouseButton::Left) {
        return;
    }
    state.dragging = false;

    if active.index.is_dirty() {
        return;
    }
    let Ok(camera_transform) = camera_query.single() else {
        return;
    };
    let ActiveCloud {
        key,
        selection,
        index,
        occlusion,
        ..
    } = active.as_mut();
    let Some(entry) = key.as_ref().and_then(|k| library.clouds.get(k)) else {
        return;
    };

    let oracle = gesture_oracle(&entry.points, occlusion, camera_transform.translation());
    let toggled = selection.select_rectangle(
        index,
        state.anchor,
        state.last,
        state.mode,
        entry.points.positions(),
        Mat4::IDENTITY,
        &oracle,
    );
    if toggled > 0 {
        colors_dirty.0 = true;
    }
    info!(
        "box {}: {} points ({} selected)",
        match state.mode {
            SelectMode::Add => "add",
            SelectMode::Subtract => "subtract",
        },
        toggled,
        selection.len()
    );
}
