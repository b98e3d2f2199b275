use annotator_core::UNLABELED;
use bevy::prelude::*;

use crate::engine::autosave::AutosaveEvent;
use crate::engine::library::{ActiveCloud, CloudLibrary, ColorsDirty, LabelPalette};

/// The label the next assignment or brush stroke writes.
#[derive(Resource)]
pub struct CurrentLabel(pub i32);

impl Default for CurrentLabel {
    fn default() -> Self {
        Self(0)
    }
}

const DIGIT_KEYS: [(KeyCode, i32); 10] = [
    (KeyCode::Digit0, 0),
    (KeyCode::Digit1, 1),
    (KeyCode::Digit2, 2),
    (KeyCode::Digit3, 3),
    (KeyCode::Digit4, 4),
    (KeyCode::Digit5, 5),
    (KeyCode::Digit6, 6),
    (KeyCode::Digit7, 7),
    (KeyCode::Digit8, 8),
    (KeyCode::Digit9, 9),
];

/// Keyboard labeling surface. Digits pick a label and commit it to the
/// staged selection in one stroke, X erases the selection back to the
/// unlabeled sentinel, C discards the selection, N mints a generated palette
/// entry, V flips visible-only filtering, Ctrl+R wipes every label of the
/// active set.
pub fn labeling_system(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut current: ResMut<CurrentLabel>,
    mut active: ResMut<ActiveCloud>,
    mut library: ResMut<CloudLibrary>,
    mut palette: ResMut<LabelPalette>,
    mut colors_dirty: ResMut<ColorsDirty>,
    mut autosave: EventWriter<AutosaveEvent>,
) {
    let mut assign_request: Option<i32> = None;

    for (key, label) in DIGIT_KEYS {
        if keyboard.just_pressed(key) {
            current.0 = label;
            palette.0.ensure_label(label);
            assign_request = Some(label);
        }
    }
    if keyboard.just_pressed(KeyCode::KeyX) {
        assign_request = Some(UNLABELED);
    }

    if keyboard.just_pressed(KeyCode::KeyN) {
        let label = palette.0.push_generated() as i32;
        current.0 = label;
        info!("new label {} added to the palette", label);
    }

    if keyboard.just_pressed(KeyCode::KeyC) && !active.selection.is_empty() {
        active.selection.clear();
        colors_dirty.0 = true;
        info!("selection cleared");
    }

    // Render-size hint only: the built-in point-list pipeline rasterizes
    // fixed-size points, so until a sized point material is wired in this
    // value reaches the status line and nothing else.
    if keyboard.just_pressed(KeyCode::Minus) {
        active.point_size = (active.point_size - 1.0).max(1.0);
    }
    if keyboard.just_pressed(KeyCode::Equal) {
        active.point_size = (active.point_size + 1.0).min(10.0);
    }

    if keyboard.just_pressed(KeyCode::KeyV) {
        if let Some(entry) = active.key.as_ref().and_then(|k| library.clouds.get_mut(k)) {
            let next = !entry.points.visible_only();
            entry.points.set_visible_only(next);
            info!("visible-only filtering {}", if next { "on" } else { "off" });
        }
    }

    let ctrl = keyboard.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]);
    if ctrl && keyboard.just_pressed(KeyCode::KeyR) {
        let ActiveCloud { key, selection, .. } = active.as_mut();
        if let Some(entry) = key.as_ref().and_then(|k| library.clouds.get_mut(k)) {
            entry.store.reset();
            selection.clear();
            colors_dirty.0 = true;
            autosave.write(AutosaveEvent);
            warn!("all labels reset for the active point set");
        }
        return;
    }

    let Some(label) = assign_request else {
        return;
    };
    let ActiveCloud { key, selection, .. } = active.as_mut();
    let Some(entry) = key.as_ref().and_then(|k| library.clouds.get_mut(k)) else {
        info!("no point set loaded");
        return;
    };
    if selection.is_empty() {
        info!("nothing selected to label");
        return;
    }
    let assigned = entry.store.assign(selection, label, &mut palette.0);
    colors_dirty.0 = true;
    autosave.write(AutosaveEvent);
    info!("assigned label {} to {} points", label, assigned);
}
