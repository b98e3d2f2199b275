use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;

use crate::engine::library::{ActiveCloud, CloudLibrary};
use crate::tools::brush::BrushTool;
use crate::tools::labeling::CurrentLabel;

#[derive(Component)]
pub struct FpsText;

#[derive(Component)]
pub struct StatusText;

pub fn spawn_overlay_ui(mut commands: Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                Text::new("no point set loaded"),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(Color::srgb(0.9, 0.9, 0.9)),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(12.0),
                    left: Val::Px(12.0),
                    ..default()
                },
                StatusText,
            ));
            parent.spawn((
                Text::new("FPS: "),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(Color::srgb(1., 0., 0.)),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(12.0),
                    right: Val::Px(12.0),
                    ..default()
                },
                FpsText,
            ));
        });
}

pub fn fps_text_update_system(
    diagnostics: Res<DiagnosticsStore>,
    mut query: Query<&mut Text, With<FpsText>>,
) {
    for mut text in &mut query {
        if let Some(fps) = diagnostics.get(&FrameTimeDiagnosticsPlugin::FPS) {
            if let Some(value) = fps.smoothed() {
                text.0 = format!("FPS: {value:.1}");
            }
        }
    }
}

/// Session readout: active set, selection size, current label, brush state.
pub fn status_text_update_system(
    active: Res<ActiveCloud>,
    library: Res<CloudLibrary>,
    current_label: Res<CurrentLabel>,
    brush: Res<BrushTool>,
    mut query: Query<&mut Text, With<StatusText>>,
) {
    let Ok(mut text) = query.single_mut() else {
        return;
    };
    let Some((key, entry)) = active
        .key
        .as_ref()
        .and_then(|k| library.clouds.get(k).map(|e| (k, e)))
    else {
        text.0 = "no point set loaded".to_owned();
        return;
    };

    let brush_state = if brush.enabled {
        format!("brush r={:.0}px", brush.radius)
    } else {
        "brush off".to_owned()
    };
    text.0 = format!(
        "{} | {} pts | selected {} | label {} | size {:.0} | {}{}",
        key,
        entry.points.len(),
        active.selection.len(),
        current_label.0,
        active.point_size,
        brush_state,
        if entry.points.visible_only() {
            " | visible-only"
        } else {
            ""
        }
    );
}
