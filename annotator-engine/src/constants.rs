//! Engine-wide tuning constants and defaults.

/// Directory scanned for cloud files when no argument is given.
pub const DEFAULT_DATA_DIR: &str = "clouds";

/// Archive of per-cloud labels written after every label mutation, kept next
/// to the data directory.
pub const AUTOSAVE_FILE: &str = "annotations_autosave.json";

/// Render boundary point size hint, in pixels.
pub const DEFAULT_POINT_SIZE: f32 = 3.0;

pub const DEFAULT_BRUSH_RADIUS: f32 = 40.0;
pub const MIN_BRUSH_RADIUS: f32 = 4.0;
pub const MAX_BRUSH_RADIUS: f32 = 200.0;
pub const BRUSH_RADIUS_STEP: f32 = 4.0;

/// Reference surface tint, roughly the original tool's slate blue.
pub const SURFACE_COLOR: [f32; 4] = [0.53, 0.63, 0.70, 0.9];

/// Selection rectangle fill while dragging.
pub const RECT_FILL: [f32; 4] = [0.3, 0.6, 1.0, 0.15];
pub const RECT_BORDER: [f32; 4] = [0.3, 0.6, 1.0, 0.8];

/// Outline of the circular brush cursor.
pub const BRUSH_CURSOR_BORDER: [f32; 4] = [1.0, 1.0, 1.0, 0.6];
