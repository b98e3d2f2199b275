use std::fs;
use std::path::PathBuf;

use annotator_core::persistence::{LabelArchive, storage_key};
use bevy::prelude::*;

use crate::engine::library::{ActiveCloud, CloudLibrary};

/// Fired after every label-mutating operation (assignment, brush sample,
/// reset) so the archive on disk never falls behind the session.
#[derive(Event)]
pub struct AutosaveEvent;

/// The on-disk label archive plus where it lives. Loaded once at startup;
/// rewritten whole on every autosave, which keeps the file a plain JSON
/// object of `storage_key -> labels` and the write atomic from the
/// session's point of view.
#[derive(Resource)]
pub struct AutosaveState {
    pub archive: LabelArchive,
    pub path: PathBuf,
}

impl AutosaveState {
    /// Read an existing archive or start empty. A corrupt file is reported
    /// and set aside rather than trusted.
    pub fn load_or_default(path: PathBuf) -> Self {
        let archive = match fs::read_to_string(&path) {
            Ok(json) => match LabelArchive::from_json(&json) {
                Ok(archive) => {
                    info!("loaded label archive '{}' ({} entries)", path.display(), archive.len());
                    archive
                }
                Err(err) => {
                    warn!("ignoring corrupt label archive '{}': {}", path.display(), err);
                    LabelArchive::default()
                }
            },
            Err(_) => LabelArchive::default(),
        };
        Self { archive, path }
    }
}

/// Record the active cloud's labels under its storage key and flush the
/// whole archive to disk. I/O failure is reported and retried on the next
/// mutation; in-memory state is never lost to it.
pub fn flush_autosave(
    mut events: EventReader<AutosaveEvent>,
    mut autosave: ResMut<AutosaveState>,
    active: Res<ActiveCloud>,
    library: Res<CloudLibrary>,
) {
    if events.is_empty() {
        return;
    }
    events.clear();

    let Some(key) = active.key.as_ref() else {
        return;
    };
    let Some(entry) = library.clouds.get(key) else {
        return;
    };

    autosave.archive.record(
        storage_key(key, entry.points.len()),
        entry.store.export(),
    );

    match autosave.archive.to_json() {
        Ok(json) => {
            if let Err(err) = fs::write(&autosave.path, json) {
                warn!("autosave write to '{}' failed: {}", autosave.path.display(), err);
            }
        }
        Err(err) => warn!("autosave serialization failed: {}", err),
    }
}
