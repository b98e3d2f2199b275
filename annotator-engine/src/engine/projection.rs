use bevy::prelude::*;
use bevy::window::WindowResized;

use crate::engine::library::{ActiveCloud, CloudLibrary};

/// Invalidate the projection cache on camera movement or viewport resize.
/// Point-set switches dirty it directly in the switch path.
pub fn mark_projection_dirty(
    moved_cameras: Query<(), (With<Camera3d>, Changed<GlobalTransform>)>,
    mut resize_events: EventReader<WindowResized>,
    mut active: ResMut<ActiveCloud>,
) {
    let resized = !resize_events.is_empty();
    resize_events.clear();
    if resized || !moved_cameras.is_empty() {
        active.index.mark_dirty();
    }
}

/// Lazily rebuild the projection index, at most once per frame, before any
/// gesture system runs. Region queries later in the frame therefore always
/// observe an index consistent with the camera the frame is rendered with.
pub fn rebuild_projection(
    mut active: ResMut<ActiveCloud>,
    library: Res<CloudLibrary>,
    camera_query: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
) {
    if !active.index.is_dirty() {
        return;
    }
    let Some(entry) = active.key.as_ref().and_then(|k| library.clouds.get(k)) else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };
    let Some(viewport) = camera.logical_viewport_size() else {
        return;
    };

    let clip_from_world = camera.clip_from_view() * camera_transform.compute_matrix().inverse();
    // The cloud entity sits at the origin, so local coordinates are world
    // coordinates and one matrix covers the whole transform chain.
    active
        .index
        .rebuild(entry.points.positions(), clip_from_world, viewport);
}
