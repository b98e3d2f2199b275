//! End-to-end exercises of the picking core: projection, visibility
//! filtering, selection staging and label assignment working together the
//! way the interactive shell drives them.

use annotator_core::labels::NEUTRAL_COLOR;
use annotator_core::persistence::{LabelArchive, storage_key};
use annotator_core::selection::query_circle;
use annotator_core::{
    LabelStore, Palette, ScreenProjectionIndex, SelectMode, SelectionEngine, SurfaceOcclusion,
    UNLABELED, VisibilityOracle,
};
use bevy::math::{Mat4, Vec2, Vec3};

const VIEWPORT: Vec2 = Vec2::new(640.0, 480.0);

/// Clip matrix mapping local (x, y, _) directly to pixels on the viewport.
fn pixel_clip() -> Mat4 {
    Mat4::orthographic_rh(0.0, VIEWPORT.x, VIEWPORT.y, 0.0, -1.0, 1.0)
}

fn rebuilt_index(points: &[Vec3]) -> ScreenProjectionIndex {
    let mut index = ScreenProjectionIndex::new();
    index.rebuild(points, pixel_clip(), VIEWPORT);
    index
}

/// Ten points on a horizontal line, 50 px apart.
fn ten_points() -> Vec<Vec3> {
    (0..10)
        .map(|i| Vec3::new(50.0 + i as f32 * 50.0, 240.0, 0.0))
        .collect()
}

#[test]
fn scenario_a_box_add_then_subtract() {
    let points = ten_points();
    let index = rebuilt_index(&points);
    let mut selection = SelectionEngine::new();
    let oracle = VisibilityOracle::unfiltered();

    // Covers points 0..=3 (x in 50..=200).
    let added = selection.select_rectangle(
        &index,
        Vec2::new(40.0, 200.0),
        Vec2::new(210.0, 280.0),
        SelectMode::Add,
        &points,
        Mat4::IDENTITY,
        &oracle,
    );
    assert_eq!(added, 4);
    let mut members: Vec<u32> = selection.iter().collect();
    members.sort_unstable();
    assert_eq!(members, vec![0, 1, 2, 3]);

    // Subtract the middle two (x in 100..=150).
    selection.select_rectangle(
        &index,
        Vec2::new(90.0, 200.0),
        Vec2::new(160.0, 280.0),
        SelectMode::Subtract,
        &points,
        Mat4::IDENTITY,
        &oracle,
    );
    let mut members: Vec<u32> = selection.iter().collect();
    members.sort_unstable();
    assert_eq!(members, vec![0, 3]);
}

#[test]
fn scenario_b_occluded_point_excluded_from_brush() {
    // Local coordinates double as both pixels (via the orthographic clip)
    // and world space (identity transform). The camera hovers above the
    // brush center; a small quad halfway down shadows point 0 but not its
    // neighbor at the same screen distance from the center.
    let camera = Vec3::new(330.0, 240.0, 10.0);
    let points = vec![Vec3::new(320.0, 240.0, 0.0), Vec3::new(340.0, 240.0, 0.0)];
    let index = rebuilt_index(&points);

    // The camera->point0 ray passes through (325, 240, 5); the ray to
    // point 1 passes through (335, 240, 5) and misses this quad.
    let quad_positions = vec![
        Vec3::new(323.0, 238.0, 5.0),
        Vec3::new(327.0, 238.0, 5.0),
        Vec3::new(327.0, 242.0, 5.0),
        Vec3::new(323.0, 242.0, 5.0),
    ];
    let surface = SurfaceOcclusion::build(&quad_positions, &[[0, 1, 2], [0, 2, 3]]);
    let oracle = VisibilityOracle::new(camera, Some(&surface));

    let mut accepted = Vec::new();
    query_circle(
        &index,
        Vec2::new(330.0, 240.0),
        25.0,
        &points,
        Mat4::IDENTITY,
        &oracle,
        |j| accepted.push(j),
    );
    assert_eq!(accepted, vec![1]);
}

#[test]
fn scenario_c_assignment_grows_palette_without_disturbing_prior_labels() {
    let mut palette = Palette::default();
    let mut store = LabelStore::new(12);
    let mut selection = SelectionEngine::new();

    selection.toggle(SelectMode::Add, 3);
    selection.toggle(SelectMode::Add, 7);
    store.assign(&mut selection, 2, &mut palette);

    selection.toggle(SelectMode::Add, 9);
    store.assign(&mut selection, 5, &mut palette);

    assert!(palette.len() >= 6);
    assert_eq!(store.colors()[9], palette.colors()[5]);
    assert_eq!(store.label(3), 2);
    assert_eq!(store.label(7), 2);
    assert_eq!(store.colors()[3], palette.color_for(2));
}

#[test]
fn scenario_d_reset_clears_labels_colors_and_selection() {
    let mut palette = Palette::default();
    let mut store = LabelStore::new(6);
    let mut selection = SelectionEngine::new();
    selection.toggle(SelectMode::Add, 0);
    selection.toggle(SelectMode::Add, 4);
    store.assign(&mut selection, 1, &mut palette);

    selection.toggle(SelectMode::Add, 2);
    store.reset();
    selection.clear();

    assert!(store.labels().iter().all(|&l| l == UNLABELED));
    assert!(store.colors().iter().all(|&c| c == NEUTRAL_COLOR));
    assert!(selection.is_empty());
}

#[test]
fn rebuild_before_query_reflects_the_new_camera() {
    let points = vec![Vec3::new(100.0, 100.0, 0.0)];
    let mut index = ScreenProjectionIndex::new();
    index.rebuild(&points, pixel_clip(), VIEWPORT);

    let mut hits = 0;
    index.for_each_in_rect(Vec2::new(90.0, 90.0), Vec2::new(110.0, 110.0), |_, _| hits += 1);
    assert_eq!(hits, 1);

    // Camera pans: same query region must now come up empty once the index
    // is rebuilt against the shifted projection.
    index.mark_dirty();
    assert!(index.is_dirty());
    let panned = Mat4::from_translation(Vec3::new(200.0, 0.0, 0.0));
    index.rebuild(&points, pixel_clip() * panned, VIEWPORT);

    let mut hits = 0;
    index.for_each_in_rect(Vec2::new(90.0, 90.0), Vec2::new(110.0, 110.0), |_, _| hits += 1);
    assert_eq!(hits, 0);
    let mut hits = 0;
    index.for_each_in_rect(Vec2::new(290.0, 90.0), Vec2::new(310.0, 110.0), |_, _| hits += 1);
    assert_eq!(hits, 1);
}

#[test]
fn export_import_round_trip_is_identity() {
    let mut palette = Palette::default();
    let mut store = LabelStore::new(8);
    let mut selection = SelectionEngine::new();
    for j in [0, 2, 5] {
        selection.toggle(SelectMode::Add, j);
    }
    store.assign(&mut selection, 4, &mut palette);

    let key = storage_key("scans/site.las", store.len());
    let mut archive = LabelArchive::default();
    archive.record(key.clone(), store.export());

    let before = store.labels().to_vec();
    let restored = archive.labels_for(&key, store.len()).unwrap().to_vec();
    store.import(&restored, &palette).unwrap();
    assert_eq!(store.labels(), &before[..]);
}
