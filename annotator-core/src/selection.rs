use std::collections::HashSet;

use bevy::math::{Mat4, Vec2, Vec3};

use crate::projection::ScreenProjectionIndex;
use crate::visibility::VisibilityOracle;

/// Drags narrower than this on either axis are clicks, not selections.
pub const MIN_DRAG_PIXELS: f32 = 2.0;

/// Alternating highlight colors for selected points. Two colors so adjacent
/// selected points stay visually distinguishable; the alternation carries no
/// meaning.
pub const HIGHLIGHT_COLORS: [[f32; 3]; 2] = [[1.0, 1.0, 0.0], [1.0, 0.0, 1.0]];

/// Whether a region gesture grows or shrinks the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    Add,
    Subtract,
}

/// Transient working set of point indices staged for the next label
/// operation. Scoped to the active point set: cleared on switch, on explicit
/// clear, and consumed by label assignment.
#[derive(Default)]
pub struct SelectionEngine {
    selected: HashSet<u32>,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, index: u32) -> bool {
        self.selected.contains(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.selected.iter().copied()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Direct membership mutation. Idempotent: re-adding a member or
    /// removing a non-member changes nothing.
    pub fn toggle(&mut self, mode: SelectMode, index: u32) {
        match mode {
            SelectMode::Add => {
                self.selected.insert(index);
            }
            SelectMode::Subtract => {
                self.selected.remove(&index);
            }
        }
    }

    /// Rectangle region query. Normalizes the two drag corners, walks only
    /// the grid buckets the rectangle covers, filters candidates through the
    /// inclusive screen-containment test and the visibility oracle, and
    /// adds or removes survivors. Returns how many points were toggled.
    ///
    /// Rectangles under [`MIN_DRAG_PIXELS`] on either axis are treated as
    /// accidental clicks and leave the selection untouched.
    pub fn select_rectangle(
        &mut self,
        index: &ScreenProjectionIndex,
        corner_a: Vec2,
        corner_b: Vec2,
        mode: SelectMode,
        positions: &[Vec3],
        world_from_local: Mat4,
        oracle: &VisibilityOracle,
    ) -> usize {
        let min = corner_a.min(corner_b);
        let max = corner_a.max(corner_b);
        if max.x - min.x < MIN_DRAG_PIXELS || max.y - min.y < MIN_DRAG_PIXELS {
            return 0;
        }

        let mut toggled = 0;
        index.for_each_in_rect(min, max, |j, _| {
            let world = world_from_local.transform_point3(positions[j as usize]);
            if !oracle.is_visible(world) {
                return;
            }
            self.toggle(mode, j);
            toggled += 1;
        });
        toggled
    }

    /// Compose the transient selection highlight over the persistent label
    /// colors. `out` is the render-facing buffer; the persistent colors in
    /// `base` are never modified, so deselection needs no undo bookkeeping.
    ///
    /// Members alternate between the two highlight colors by ascending point
    /// index, which keeps the coloring deterministic across frames.
    pub fn overlay_highlight(&self, base: &[[f32; 3]], out: &mut Vec<[f32; 3]>) {
        out.clear();
        out.extend_from_slice(base);
        if self.selected.is_empty() {
            return;
        }
        let mut members: Vec<u32> = self.selected.iter().copied().collect();
        members.sort_unstable();
        for (parity, j) in members.into_iter().enumerate() {
            if let Some(slot) = out.get_mut(j as usize) {
                *slot = HIGHLIGHT_COLORS[parity % 2];
            }
        }
    }
}

/// Circular brush query. Same candidate walk and visibility filtering as the
/// rectangle path, but instead of staging a selection it invokes `visit` for
/// each accepted point, so a brush stroke can write labels directly.
pub fn query_circle(
    index: &ScreenProjectionIndex,
    center: Vec2,
    radius: f32,
    positions: &[Vec3],
    world_from_local: Mat4,
    oracle: &VisibilityOracle,
    mut visit: impl FnMut(u32),
) {
    index.for_each_in_circle(center, radius, |j, _| {
        let world = world_from_local.transform_point3(positions[j as usize]);
        if oracle.is_visible(world) {
            visit(j);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ScreenProjectionIndex;

    fn pixel_index(points: &[Vec3], w: f32, h: f32) -> ScreenProjectionIndex {
        let mut index = ScreenProjectionIndex::new();
        let clip = Mat4::orthographic_rh(0.0, w, h, 0.0, -1.0, 1.0);
        index.rebuild(points, clip, Vec2::new(w, h));
        index
    }

    #[test]
    fn toggle_is_idempotent() {
        let mut engine = SelectionEngine::new();
        engine.toggle(SelectMode::Add, 5);
        engine.toggle(SelectMode::Add, 5);
        assert_eq!(engine.len(), 1);

        engine.toggle(SelectMode::Subtract, 9);
        assert_eq!(engine.len(), 1);
        engine.toggle(SelectMode::Subtract, 5);
        assert!(engine.is_empty());
    }

    #[test]
    fn tiny_drags_change_nothing() {
        let points = vec![Vec3::new(10.0, 10.0, 0.0)];
        let index = pixel_index(&points, 64.0, 64.0);
        let mut engine = SelectionEngine::new();
        let toggled = engine.select_rectangle(
            &index,
            Vec2::new(9.5, 9.5),
            Vec2::new(10.5, 10.5),
            SelectMode::Add,
            &points,
            Mat4::IDENTITY,
            &VisibilityOracle::unfiltered(),
        );
        assert_eq!(toggled, 0);
        assert!(engine.is_empty());
    }

    #[test]
    fn rectangle_bounds_are_inclusive() {
        let points = vec![
            Vec3::new(10.0, 10.0, 0.0),
            Vec3::new(30.0, 30.0, 0.0),
            Vec3::new(31.0, 30.0, 0.0),
        ];
        let index = pixel_index(&points, 64.0, 64.0);
        let mut engine = SelectionEngine::new();
        engine.select_rectangle(
            &index,
            Vec2::new(10.0, 10.0),
            Vec2::new(30.0, 30.0),
            SelectMode::Add,
            &points,
            Mat4::IDENTITY,
            &VisibilityOracle::unfiltered(),
        );
        assert!(engine.contains(0));
        assert!(engine.contains(1));
        assert!(!engine.contains(2));
    }

    #[test]
    fn highlight_overlays_without_touching_base() {
        let base = vec![[0.1, 0.1, 0.1]; 4];
        let mut engine = SelectionEngine::new();
        engine.toggle(SelectMode::Add, 1);
        engine.toggle(SelectMode::Add, 3);

        let mut out = Vec::new();
        engine.overlay_highlight(&base, &mut out);
        assert_eq!(out[0], [0.1, 0.1, 0.1]);
        assert_eq!(out[1], HIGHLIGHT_COLORS[0]);
        assert_eq!(out[3], HIGHLIGHT_COLORS[1]);
        assert_eq!(base[1], [0.1, 0.1, 0.1]);

        engine.clear();
        engine.overlay_highlight(&base, &mut out);
        assert_eq!(out, base);
    }
}
