use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use annotator_core::PointSet;
use bevy::math::{DVec3, Vec3};
use bevy::prelude::*;
use indicatif::ProgressBar;
use las::Reader;

use crate::constants::DEFAULT_DATA_DIR;
use crate::engine::library::{CloudEntry, CloudLibrary, SwitchCloudEvent};

/// Why a cloud file failed to ingest.
#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Las(las::Error),
    /// Malformed OBJ line, with its 1-based line number.
    ObjParse { line: usize, message: String },
    UnsupportedExtension(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "i/o error: {}", err),
            Self::Las(err) => write!(f, "las error: {}", err),
            Self::ObjParse { line, message } => write!(f, "obj line {}: {}", line, message),
            Self::UnsupportedExtension(ext) => write!(f, "unsupported extension '{}'", ext),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<las::Error> for LoadError {
    fn from(err: las::Error) -> Self {
        Self::Las(err)
    }
}

/// Ingest one geometry file by extension: `.las`/`.laz` become bare point
/// sets, `.obj` becomes a point set whose faces double as the reference
/// surface over the same vertices.
pub fn load_cloud_file(path: &Path) -> Result<PointSet, LoadError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "las" | "laz" => load_las(path),
        "obj" => load_obj(path),
        other => Err(LoadError::UnsupportedExtension(other.to_owned())),
    }
}

/// Read a LAS/LAZ point cloud. Survey coordinates are re-centered on their
/// minimum corner so the f32 positions the picking core works with keep
/// their precision.
fn load_las(path: &Path) -> Result<PointSet, LoadError> {
    let mut reader = Reader::new(BufReader::new(File::open(path)?))?;
    let total = reader.header().number_of_points();
    let progress = ProgressBar::new(total);

    let mut raw: Vec<DVec3> = Vec::with_capacity(total as usize);
    let mut min = DVec3::splat(f64::INFINITY);
    for point in reader.points() {
        let point = point?;
        let p = DVec3::new(point.x, point.y, point.z);
        min = min.min(p);
        raw.push(p);
        if raw.len() % 65_536 == 0 {
            progress.inc(65_536);
        }
    }
    progress.finish_and_clear();

    // LAS is z-up; the viewport is y-up.
    let positions = raw
        .into_iter()
        .map(|p| {
            let local = p - min;
            Vec3::new(local.x as f32, local.z as f32, local.y as f32)
        })
        .collect();
    Ok(PointSet::new(positions, Vec::new()))
}

/// Minimal OBJ reader: `v` positions and `f` faces, fan-triangulated.
/// Everything else in the file is ignored. Face indices may carry
/// `/texture/normal` suffixes and may be negative (relative).
fn load_obj(path: &Path) -> Result<PointSet, LoadError> {
    let reader = BufReader::new(File::open(path)?);
    let mut positions: Vec<Vec3> = Vec::new();
    let mut triangles: Vec<[u32; 3]> = Vec::new();

    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = line_index + 1;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                let mut coord = |axis: &str| -> Result<f32, LoadError> {
                    parts
                        .next()
                        .ok_or_else(|| LoadError::ObjParse {
                            line: line_no,
                            message: format!("missing {} coordinate", axis),
                        })?
                        .parse()
                        .map_err(|_| LoadError::ObjParse {
                            line: line_no,
                            message: format!("bad {} coordinate", axis),
                        })
                };
                let (x, y, z) = (coord("x")?, coord("y")?, coord("z")?);
                positions.push(Vec3::new(x, y, z));
            }
            Some("f") => {
                let mut face: Vec<u32> = Vec::with_capacity(4);
                for vertex in parts {
                    let index_text = vertex.split('/').next().unwrap_or(vertex);
                    let index: i64 = index_text.parse().map_err(|_| LoadError::ObjParse {
                        line: line_no,
                        message: format!("bad face index '{}'", vertex),
                    })?;
                    let resolved = if index < 0 {
                        positions.len() as i64 + index
                    } else {
                        index - 1
                    };
                    if resolved < 0 || resolved as usize >= positions.len() {
                        return Err(LoadError::ObjParse {
                            line: line_no,
                            message: format!("face index {} out of range", index),
                        });
                    }
                    face.push(resolved as u32);
                }
                if face.len() < 3 {
                    return Err(LoadError::ObjParse {
                        line: line_no,
                        message: "face with fewer than 3 vertices".to_owned(),
                    });
                }
                for i in 1..face.len() - 1 {
                    triangles.push([face[0], face[i], face[i + 1]]);
                }
            }
            _ => {}
        }
    }

    Ok(PointSet::new(positions, triangles))
}

/// Scan a directory for ingestible files, sorted by name. Non-cloud files
/// are skipped silently; unreadable ones are reported by the caller.
pub fn discover_cloud_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|e| {
                    let e = e.to_string_lossy().to_lowercase();
                    e == "las" || e == "laz" || e == "obj"
                })
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Startup ingestion: load every cloud in the data directory (first CLI
/// argument, default `clouds/`) into the library and activate the first.
/// A file that fails to parse is reported and skipped; it must not take the
/// rest of the folder down with it.
pub fn ingest_startup_folder(
    mut library: ResMut<CloudLibrary>,
    mut switch: EventWriter<SwitchCloudEvent>,
) {
    let dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_owned());
    let dir = PathBuf::from(dir);

    let files = match discover_cloud_files(&dir) {
        Ok(files) => files,
        Err(err) => {
            warn!("cannot scan data directory '{}': {}", dir.display(), err);
            return;
        }
    };
    if files.is_empty() {
        warn!("no .las/.laz/.obj files under '{}'", dir.display());
        return;
    }

    let mut first_key: Option<String> = None;
    for path in &files {
        let key = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match load_cloud_file(path) {
            Ok(points) => {
                info!(
                    "ingested '{}': {} points, {} triangles",
                    key,
                    points.len(),
                    points.triangles().len()
                );
                library.clouds.insert(key.clone(), CloudEntry::new(points));
                first_key.get_or_insert(key);
            }
            Err(err) => warn!("skipping '{}': {}", key, err),
        }
    }

    if let Some(key) = first_key {
        switch.write(SwitchCloudEvent(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_obj(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("annotator_{}_{}.obj", name, std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn obj_loader_reads_vertices_and_fans_faces() {
        let path = write_temp_obj(
            "quad",
            "# quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1 4/4/1\n",
        );
        let set = load_obj(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(set.len(), 4);
        assert_eq!(set.triangles(), &[[0, 1, 2], [0, 2, 3]]);
        assert!(set.visible_only());
    }

    #[test]
    fn obj_loader_rejects_out_of_range_faces() {
        let path = write_temp_obj("bad_face", "v 0 0 0\nf 1 2 3\n");
        let err = load_obj(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, LoadError::ObjParse { line: 2, .. }));
    }
}
