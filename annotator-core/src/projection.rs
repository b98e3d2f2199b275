use bevy::math::{Mat4, Vec2, Vec3};

/// Pixels per uniform grid cell. Larger cells mean fewer buckets to walk per
/// region query but more candidates per bucket.
pub const CELL_SIZE: f32 = 16.0;

/// Screen coordinate recorded for points that never reach the viewport
/// (behind the camera). Keeps the per-point array dense without letting such
/// points satisfy any region test.
const OFFSCREEN: Vec2 = Vec2::splat(f32::INFINITY);

/// Derived, disposable cache mapping every point of the active set to its
/// projected screen coordinate and a uniform grid bucket.
///
/// Valid only for the camera/viewport configuration at rebuild time: any
/// camera move, viewport resize or point-set switch marks it dirty, and the
/// owner must run [`ScreenProjectionIndex::rebuild`] before serving region
/// queries again. There is deliberately no incremental update path; a changed
/// camera invalidates every coordinate at once, so the rebuild is a single
/// O(N) pass into fresh buckets.
pub struct ScreenProjectionIndex {
    screen: Vec<Vec2>,
    cells: Vec<Vec<u32>>,
    cols: usize,
    rows: usize,
    dirty: bool,
}

impl Default for ScreenProjectionIndex {
    fn default() -> Self {
        Self {
            screen: Vec::new(),
            cells: Vec::new(),
            cols: 0,
            rows: 0,
            dirty: true,
        }
    }
}

impl ScreenProjectionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Invalidate cached projections. Called on camera movement, viewport
    /// resize and point-set switch.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Drop all cached state (point-set switch). Leaves the index dirty.
    pub fn clear(&mut self) {
        self.screen.clear();
        self.cells.clear();
        self.cols = 0;
        self.rows = 0;
        self.dirty = true;
    }

    /// Screen coordinate of point `j` as of the last rebuild.
    pub fn screen(&self, j: u32) -> Vec2 {
        self.screen[j as usize]
    }

    /// Project every point with `clip_from_local` and bucket it into the
    /// grid for the given viewport, replacing all previous state. Clears the
    /// dirty flag on completion.
    ///
    /// A zero-area viewport produces a zero-cell grid: coordinates are still
    /// recorded but every region query over the result is a no-op.
    pub fn rebuild(&mut self, positions: &[Vec3], clip_from_local: Mat4, viewport: Vec2) {
        self.cols = if viewport.x > 0.0 {
            (viewport.x / CELL_SIZE).ceil() as usize
        } else {
            0
        };
        self.rows = if viewport.y > 0.0 {
            (viewport.y / CELL_SIZE).ceil() as usize
        } else {
            0
        };

        self.cells.clear();
        self.cells.resize(self.cols * self.rows, Vec::new());
        self.screen.clear();
        self.screen.reserve(positions.len());

        for (j, position) in positions.iter().enumerate() {
            let clip = clip_from_local * position.extend(1.0);
            if clip.w <= 0.0 {
                self.screen.push(OFFSCREEN);
                continue;
            }
            let ndc = clip.truncate() / clip.w;
            let sx = (ndc.x * 0.5 + 0.5) * viewport.x;
            let sy = (0.5 - ndc.y * 0.5) * viewport.y;
            self.screen.push(Vec2::new(sx, sy));

            let cx = (sx / CELL_SIZE).floor();
            let cy = (sy / CELL_SIZE).floor();
            if cx >= 0.0 && cy >= 0.0 {
                let (cx, cy) = (cx as usize, cy as usize);
                if cx < self.cols && cy < self.rows {
                    self.cells[cy * self.cols + cx].push(j as u32);
                }
            }
        }

        self.dirty = false;
    }

    /// Bucket range covered by the inclusive pixel span `[min, max]`, or
    /// `None` when the grid is empty or the span misses it entirely.
    fn cell_span(&self, min: Vec2, max: Vec2) -> Option<(usize, usize, usize, usize)> {
        if self.cols == 0 || self.rows == 0 {
            return None;
        }
        if max.x < 0.0 || max.y < 0.0 {
            return None;
        }
        let x0 = (min.x.max(0.0) / CELL_SIZE) as usize;
        let y0 = (min.y.max(0.0) / CELL_SIZE) as usize;
        if x0 >= self.cols || y0 >= self.rows {
            return None;
        }
        let x1 = ((max.x / CELL_SIZE) as usize).min(self.cols - 1);
        let y1 = ((max.y / CELL_SIZE) as usize).min(self.rows - 1);
        Some((x0, x1, y0, y1))
    }

    /// Visit every bucketed point whose screen coordinate lies inside the
    /// inclusive rectangle `[min, max]`.
    pub fn for_each_in_rect(&self, min: Vec2, max: Vec2, mut visit: impl FnMut(u32, Vec2)) {
        debug_assert!(!self.dirty, "region query against a dirty projection index");
        let Some((x0, x1, y0, y1)) = self.cell_span(min, max) else {
            return;
        };
        for gy in y0..=y1 {
            for gx in x0..=x1 {
                for &j in &self.cells[gy * self.cols + gx] {
                    let s = self.screen[j as usize];
                    if s.x >= min.x && s.x <= max.x && s.y >= min.y && s.y <= max.y {
                        visit(j, s);
                    }
                }
            }
        }
    }

    /// Visit every bucketed point within `radius` pixels of `center`.
    /// Candidates come from the buckets covering the circle's bounding
    /// square; membership is a squared-distance test.
    pub fn for_each_in_circle(&self, center: Vec2, radius: f32, mut visit: impl FnMut(u32, Vec2)) {
        debug_assert!(!self.dirty, "region query against a dirty projection index");
        let r = radius.max(0.0);
        let Some((x0, x1, y0, y1)) =
            self.cell_span(center - Vec2::splat(r), center + Vec2::splat(r))
        else {
            return;
        };
        let r2 = r * r;
        for gy in y0..=y1 {
            for gx in x0..=x1 {
                for &j in &self.cells[gy * self.cols + gx] {
                    let s = self.screen[j as usize];
                    if (s - center).length_squared() <= r2 {
                        visit(j, s);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Clip matrix mapping local (x, y, _) straight to pixel coordinates on
    /// a `w`x`h` viewport.
    fn pixel_clip(w: f32, h: f32) -> Mat4 {
        Mat4::orthographic_rh(0.0, w, h, 0.0, -1.0, 1.0)
    }

    fn px(x: f32, y: f32) -> Vec3 {
        Vec3::new(x, y, 0.0)
    }

    #[test]
    fn rebuild_maps_points_to_their_pixels() {
        let mut index = ScreenProjectionIndex::new();
        let points = vec![px(10.0, 20.0), px(300.0, 150.0)];
        index.rebuild(&points, pixel_clip(640.0, 480.0), Vec2::new(640.0, 480.0));

        assert!(!index.is_dirty());
        assert!((index.screen(0) - Vec2::new(10.0, 20.0)).length() < 1e-3);
        assert!((index.screen(1) - Vec2::new(300.0, 150.0)).length() < 1e-3);
    }

    #[test]
    fn rect_query_matches_brute_force_for_any_cell_size() {
        let points: Vec<Vec3> = (0..200)
            .map(|i| px((i * 7 % 640) as f32, (i * 13 % 480) as f32))
            .collect();
        let viewport = Vec2::new(640.0, 480.0);
        let mut index = ScreenProjectionIndex::new();
        index.rebuild(&points, pixel_clip(viewport.x, viewport.y), viewport);

        let (min, max) = (Vec2::new(100.0, 50.0), Vec2::new(400.0, 300.0));
        let mut queried: Vec<u32> = Vec::new();
        index.for_each_in_rect(min, max, |j, _| queried.push(j));
        queried.sort_unstable();

        let expected: Vec<u32> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y)
            .map(|(j, _)| j as u32)
            .collect();
        assert_eq!(queried, expected);
    }

    #[test]
    fn circle_query_uses_squared_distance() {
        let points = vec![px(100.0, 100.0), px(110.0, 100.0), px(100.0, 130.0)];
        let viewport = Vec2::new(640.0, 480.0);
        let mut index = ScreenProjectionIndex::new();
        index.rebuild(&points, pixel_clip(viewport.x, viewport.y), viewport);

        let mut hits = Vec::new();
        index.for_each_in_circle(Vec2::new(100.0, 100.0), 15.0, |j, _| hits.push(j));
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn offscreen_and_behind_camera_points_are_never_bucketed() {
        let points = vec![px(-50.0, 10.0), px(10.0, 10.0)];
        let viewport = Vec2::new(64.0, 64.0);
        let mut index = ScreenProjectionIndex::new();
        index.rebuild(&points, pixel_clip(viewport.x, viewport.y), viewport);

        let mut hits = Vec::new();
        index.for_each_in_rect(Vec2::splat(-1000.0), Vec2::splat(1000.0), |j, _| hits.push(j));
        assert_eq!(hits, vec![1]);

        // Perspective with the point behind the eye: recorded but unbucketed.
        let proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let behind = vec![Vec3::new(0.0, 0.0, 10.0)];
        index.rebuild(&behind, proj * view, viewport);
        let mut hits = Vec::new();
        index.for_each_in_rect(Vec2::splat(-1000.0), Vec2::splat(1000.0), |j, _| hits.push(j));
        assert!(hits.is_empty());
        assert!(!index.screen(0).x.is_finite());
    }

    #[test]
    fn zero_viewport_degrades_to_a_no_op_grid() {
        let points = vec![px(10.0, 10.0)];
        let mut index = ScreenProjectionIndex::new();
        index.rebuild(&points, pixel_clip(640.0, 480.0), Vec2::new(640.0, 0.0));

        assert!(!index.is_dirty());
        let mut count = 0;
        index.for_each_in_rect(Vec2::splat(-1e6), Vec2::splat(1e6), |_, _| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn clear_leaves_the_index_dirty() {
        let mut index = ScreenProjectionIndex::new();
        index.rebuild(&[px(1.0, 1.0)], pixel_clip(64.0, 64.0), Vec2::splat(64.0));
        assert!(!index.is_dirty());
        index.clear();
        assert!(index.is_dirty());
    }
}
