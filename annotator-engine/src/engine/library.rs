use std::collections::BTreeMap;

use annotator_core::persistence::storage_key;
use annotator_core::visibility::OcclusionProbe;
use annotator_core::{
    LabelStore, Palette, PointSet, ScreenProjectionIndex, SelectionEngine, SurfaceOcclusion,
    VisibilityOracle,
};
use bevy::math::Vec3;
use bevy::prelude::*;

use crate::constants::DEFAULT_POINT_SIZE;
use crate::engine::autosave::AutosaveState;

/// One loaded file: its immutable geometry plus the labels accumulated for
/// it. Labels stay resident for every file seen this session so switching
/// back and forth loses nothing; only the active cloud carries transients.
pub struct CloudEntry {
    pub points: PointSet,
    pub store: LabelStore,
}

impl CloudEntry {
    pub fn new(points: PointSet) -> Self {
        let store = LabelStore::new(points.len());
        Self { points, store }
    }
}

/// Every cloud ingested this session, keyed by its file-relative path.
#[derive(Resource, Default)]
pub struct CloudLibrary {
    pub clouds: BTreeMap<String, CloudEntry>,
}

/// Session-wide label palette shared by all clouds, so label identity and
/// color stay consistent across file switches.
#[derive(Resource, Default)]
pub struct LabelPalette(pub Palette);

/// Transient state owned by whichever cloud is currently active: the staged
/// selection, the screen projection cache and the occlusion probe. Disposed
/// and rebuilt wholesale on every switch; no two clouds' transients coexist.
#[derive(Resource)]
pub struct ActiveCloud {
    pub key: Option<String>,
    pub selection: SelectionEngine,
    pub index: ScreenProjectionIndex,
    pub occlusion: Option<SurfaceOcclusion>,
    pub point_size: f32,
}

impl Default for ActiveCloud {
    fn default() -> Self {
        Self {
            key: None,
            selection: SelectionEngine::new(),
            index: ScreenProjectionIndex::new(),
            occlusion: None,
            point_size: DEFAULT_POINT_SIZE,
        }
    }
}

/// Visibility oracle for a gesture against `points`, honoring the per-set
/// visible-only toggle. Borrows the probe from `occlusion`.
pub fn gesture_oracle<'a>(
    points: &PointSet,
    occlusion: &'a Option<SurfaceOcclusion>,
    camera: Vec3,
) -> VisibilityOracle<'a> {
    let probe: Option<&dyn OcclusionProbe> = if points.visible_only() {
        occlusion.as_ref().map(|s| s as &dyn OcclusionProbe)
    } else {
        None
    };
    VisibilityOracle::new(camera, probe)
}

/// Raised whenever the render-facing color buffer no longer matches the
/// label store + selection highlight and must be rewritten.
#[derive(Resource, Default)]
pub struct ColorsDirty(pub bool);

/// Request to make a different library entry the active cloud.
#[derive(Event)]
pub struct SwitchCloudEvent(pub String);

/// Fired after a switch completes, for the render and camera boundaries.
#[derive(Event)]
pub struct CloudActivated {
    pub key: String,
}

/// Tab cycles through the library in key order.
pub fn cycle_cloud(
    keyboard: Res<ButtonInput<KeyCode>>,
    library: Res<CloudLibrary>,
    active: Res<ActiveCloud>,
    mut switch: EventWriter<SwitchCloudEvent>,
) {
    if !keyboard.just_pressed(KeyCode::Tab) || library.clouds.len() < 2 {
        return;
    }
    let next = match active.key.as_ref() {
        Some(current) => library
            .clouds
            .range::<String, _>((
                std::ops::Bound::Excluded(current.clone()),
                std::ops::Bound::Unbounded,
            ))
            .next()
            .or_else(|| library.clouds.iter().next())
            .map(|(k, _)| k.clone()),
        None => library.clouds.keys().next().cloned(),
    };
    if let Some(key) = next {
        switch.write(SwitchCloudEvent(key));
    }
}

/// Tear down the previous cloud's transients, resume any autosaved labels
/// for the new one, and rebuild the occlusion probe. The projection index is
/// left dirty; the rebuild system repopulates it before any query runs.
pub fn switch_cloud(
    mut requests: EventReader<SwitchCloudEvent>,
    mut library: ResMut<CloudLibrary>,
    mut active: ResMut<ActiveCloud>,
    mut palette: ResMut<LabelPalette>,
    autosave: Res<AutosaveState>,
    mut colors_dirty: ResMut<ColorsDirty>,
    mut activated: EventWriter<CloudActivated>,
) {
    let Some(SwitchCloudEvent(key)) = requests.read().last() else {
        return;
    };
    let Some(entry) = library.clouds.get_mut(key) else {
        warn!("cannot switch to unknown cloud '{}'", key);
        return;
    };

    // Previous cloud's transients go first; nothing of the old index or
    // selection may survive into the new set.
    active.selection.clear();
    active.index.clear();
    active.occlusion = None;

    let resume_key = storage_key(key, entry.points.len());
    match autosave.archive.labels_for(&resume_key, entry.points.len()) {
        Ok(labels) => {
            if let Some(max) = labels.iter().copied().max() {
                palette.0.ensure_label(max);
            }
            let labels = labels.to_vec();
            if entry.store.import(&labels, &palette.0).is_ok() {
                info!("resumed autosaved labels for '{}'", key);
            }
        }
        Err(err) => {
            debug!("no autosave resume for '{}': {}", key, err);
        }
    }

    if entry.points.has_surface() {
        let probe = SurfaceOcclusion::build(entry.points.positions(), entry.points.triangles());
        info!(
            "built occlusion probe for '{}': {} triangles",
            key,
            probe.triangle_count()
        );
        active.occlusion = Some(probe);
    }

    active.key = Some(key.clone());
    colors_dirty.0 = true;
    activated.write(CloudActivated { key: key.clone() });
    info!(
        "active cloud: '{}' ({} points{})",
        key,
        entry.points.len(),
        if entry.points.has_surface() {
            ", reference surface"
        } else {
            ""
        }
    );
}
