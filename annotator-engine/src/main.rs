use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy::window::PresentMode;
use std::path::PathBuf;

mod constants;
mod engine;
mod tools;

use constants::{AUTOSAVE_FILE, DEFAULT_DATA_DIR};
use engine::autosave::{AutosaveEvent, AutosaveState, flush_autosave};
use engine::camera::{OrbitCamera, camera_controller, spawn_viewport_camera};
use engine::library::{
    ActiveCloud, CloudActivated, CloudLibrary, ColorsDirty, LabelPalette, SwitchCloudEvent,
    cycle_cloud, switch_cloud,
};
use engine::loading::ingest_startup_folder;
use engine::point_cloud::{respawn_cloud_entities, sync_point_colors, toggle_surface_visibility};
use engine::projection::{mark_projection_dirty, rebuild_projection};
use engine::ui::{fps_text_update_system, spawn_overlay_ui, status_text_update_system};
use tools::box_select::{BoxSelectState, box_select_system, spawn_selection_rect};
use tools::brush::{BrushTool, brush_system, spawn_brush_cursor, update_brush_cursor};
use tools::labeling::{CurrentLabel, labeling_system};

fn main() {
    create_app().run();
}

fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        .init_resource::<CloudLibrary>()
        .init_resource::<ActiveCloud>()
        .init_resource::<LabelPalette>()
        .init_resource::<ColorsDirty>()
        .init_resource::<OrbitCamera>()
        .init_resource::<BoxSelectState>()
        .init_resource::<BrushTool>()
        .init_resource::<CurrentLabel>()
        .insert_resource(AutosaveState::load_or_default(autosave_path()))
        .add_event::<SwitchCloudEvent>()
        .add_event::<CloudActivated>()
        .add_event::<AutosaveEvent>()
        .add_systems(
            Startup,
            (
                spawn_viewport_camera,
                spawn_overlay_ui,
                spawn_selection_rect,
                spawn_brush_cursor,
                ingest_startup_folder,
            ),
        )
        // One chain per frame: activate, move the camera, refresh the
        // projection, run gestures against it, then push colors and flush.
        .add_systems(
            Update,
            (
                cycle_cloud,
                switch_cloud,
                camera_controller,
                mark_projection_dirty,
                rebuild_projection,
                box_select_system,
                brush_system,
                update_brush_cursor,
                labeling_system,
                respawn_cloud_entities,
                sync_point_colors,
                toggle_surface_visibility,
                flush_autosave,
                status_text_update_system,
                fps_text_update_system,
            )
                .chain(),
        );

    app
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(Window {
            title: "Point Cloud Annotator".to_owned(),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }),
        ..default()
    };

    DefaultPlugins.set(window_config)
}

/// The archive lives next to the data it annotates.
fn autosave_path() -> PathBuf {
    let dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_owned());
    PathBuf::from(dir).join(AUTOSAVE_FILE)
}
