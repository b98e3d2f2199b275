use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::view::NoFrustumCulling;

use crate::constants::SURFACE_COLOR;
use crate::engine::library::{ActiveCloud, CloudActivated, CloudLibrary, ColorsDirty};

/// Marker for the point-list mesh of the active cloud.
#[derive(Component)]
pub struct CloudPoints;

/// Marker for the translucent reference-surface mesh, when the set has one.
#[derive(Component)]
pub struct ReferenceSurface;

fn base_colors(colors: &[[f32; 3]]) -> Vec<[f32; 4]> {
    colors.iter().map(|c| [c[0], c[1], c[2], 1.0]).collect()
}

/// Replace the scene's cloud entities when a different set becomes active.
/// Points render as an unlit point list carrying per-vertex label colors;
/// the reference surface, if any, renders as a translucent overlay on the
/// same vertices.
pub fn respawn_cloud_entities(
    mut activated: EventReader<CloudActivated>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    library: Res<CloudLibrary>,
    previous: Query<Entity, Or<(With<CloudPoints>, With<ReferenceSurface>)>>,
) {
    let Some(event) = activated.read().last() else {
        return;
    };
    for entity in previous.iter() {
        commands.entity(entity).despawn();
    }
    let Some(entry) = library.clouds.get(&event.key) else {
        return;
    };

    let positions: Vec<[f32; 3]> = entry.points.positions().iter().map(|p| p.to_array()).collect();

    let mut point_mesh = Mesh::new(PrimitiveTopology::PointList, RenderAssetUsages::default());
    point_mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions.clone());
    point_mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, base_colors(entry.store.colors()));
    commands.spawn((
        Mesh3d(meshes.add(point_mesh)),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::WHITE,
            unlit: true,
            ..default()
        })),
        Transform::IDENTITY,
        NoFrustumCulling,
        CloudPoints,
    ));

    if entry.points.has_surface() {
        let indices: Vec<u32> = entry
            .points
            .triangles()
            .iter()
            .flat_map(|t| t.iter().copied())
            .collect();
        let mut surface_mesh =
            Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        surface_mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        surface_mesh.insert_indices(Indices::U32(indices));
        surface_mesh.compute_smooth_normals();
        commands.spawn((
            Mesh3d(meshes.add(surface_mesh)),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgba(
                    SURFACE_COLOR[0],
                    SURFACE_COLOR[1],
                    SURFACE_COLOR[2],
                    SURFACE_COLOR[3],
                ),
                alpha_mode: AlphaMode::Blend,
                double_sided: true,
                cull_mode: None,
                perceptual_roughness: 1.0,
                ..default()
            })),
            Transform::IDENTITY,
            NoFrustumCulling,
            ReferenceSurface,
        ));
    }
}

/// Push label colors plus the selection highlight into the point mesh, but
/// only on frames where something actually changed.
pub fn sync_point_colors(
    mut colors_dirty: ResMut<ColorsDirty>,
    active: Res<ActiveCloud>,
    library: Res<CloudLibrary>,
    points_query: Query<&Mesh3d, With<CloudPoints>>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    if !colors_dirty.0 {
        return;
    }
    let Some(entry) = active.key.as_ref().and_then(|k| library.clouds.get(k)) else {
        colors_dirty.0 = false;
        return;
    };
    let Ok(mesh_handle) = points_query.single() else {
        // Entity not spawned yet; retry next frame.
        return;
    };
    let Some(mesh) = meshes.get_mut(&mesh_handle.0) else {
        return;
    };

    let mut composed = Vec::new();
    active
        .selection
        .overlay_highlight(entry.store.colors(), &mut composed);
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, base_colors(&composed));
    colors_dirty.0 = false;
}

/// M toggles the reference-surface overlay. Only its rendering; the
/// occlusion probe keeps filtering gestures regardless.
pub fn toggle_surface_visibility(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut surface_query: Query<&mut Visibility, With<ReferenceSurface>>,
) {
    if !keyboard.just_pressed(KeyCode::KeyM) {
        return;
    }
    for mut visibility in surface_query.iter_mut() {
        *visibility = match *visibility {
            Visibility::Hidden => Visibility::Inherited,
            _ => Visibility::Hidden,
        };
    }
}
