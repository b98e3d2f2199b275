use bevy::math::Vec3;

/// Sentinel label meaning "no label assigned yet".
pub const UNLABELED: i32 = -1;

/// One loaded file's worth of annotatable geometry: an ordered point sequence
/// and, optionally, triangle index triples over those same positions forming
/// the reference surface used for occlusion filtering.
///
/// Positions are immutable after load. Labels and colors live in
/// [`crate::labels::LabelStore`]; transient per-set state (selection,
/// projection index, occlusion probe) is owned by whoever holds the active
/// set and is rebuilt wholesale on switch.
#[derive(Debug)]
pub struct PointSet {
    positions: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    visible_only: bool,
}

impl PointSet {
    /// Wrap ingested geometry. Visible-only filtering defaults to enabled
    /// exactly when a reference surface is present.
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        let visible_only = !triangles.is_empty();
        Self {
            positions,
            triangles,
            visible_only,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn has_surface(&self) -> bool {
        !self.triangles.is_empty()
    }

    /// Whether picks should be filtered to points unoccluded by the
    /// reference surface. Per-set, not global.
    pub fn visible_only(&self) -> bool {
        self.visible_only
    }

    pub fn set_visible_only(&mut self, enabled: bool) {
        self.visible_only = enabled;
    }

    /// Axis-aligned bounds of the point positions, if any exist.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        for p in &self.positions[1..] {
            min = min.min(*p);
            max = max.max(*p);
        }
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_only_defaults_follow_surface_presence() {
        let bare = PointSet::new(vec![Vec3::ZERO], vec![]);
        assert!(!bare.visible_only());

        let with_surface = PointSet::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![[0, 1, 2]],
        );
        assert!(with_surface.visible_only());
    }

    #[test]
    fn bounds_cover_all_points() {
        let set = PointSet::new(
            vec![Vec3::new(-1.0, 2.0, 0.5), Vec3::new(3.0, -4.0, 0.0)],
            vec![],
        );
        let (min, max) = set.bounds().unwrap();
        assert_eq!(min, Vec3::new(-1.0, -4.0, 0.0));
        assert_eq!(max, Vec3::new(3.0, 2.0, 0.5));

        assert!(PointSet::new(vec![], vec![]).bounds().is_none());
    }
}
