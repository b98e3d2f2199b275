use bevy::math::Vec3;

/// Tolerance added to the occluder hit distance so a point lying essentially
/// on the reference surface still counts as visible despite floating-point
/// error in the intersection.
pub const SURFACE_EPSILON: f32 = 1e-3;

/// Ray-parallel-to-triangle rejection threshold for Moller-Trumbore.
const RAY_EPSILON: f32 = 1e-7;

/// Abstract accelerated-raycast capability: the distance along `direction`
/// (unit length) from `origin` to the nearest occluder surface, if any.
pub trait OcclusionProbe {
    fn nearest_intersection(&self, origin: Vec3, direction: Vec3) -> Option<f32>;
}

/// Concrete probe over the reference surface triangles.
///
/// Built once when a mesh-bearing point set becomes active and dropped when
/// it is replaced. Triangles are flattened to world-space vertex triples at
/// build time; queries do a bounding-box early-out and then a linear
/// Moller-Trumbore pass keeping the nearest positive hit.
pub struct SurfaceOcclusion {
    triangles: Vec<[Vec3; 3]>,
    bounds_min: Vec3,
    bounds_max: Vec3,
}

impl SurfaceOcclusion {
    /// Flatten index triples over `positions` into world-space triangles.
    /// Degenerate indices (out of range) are skipped rather than trusted.
    pub fn build(positions: &[Vec3], triangles: &[[u32; 3]]) -> Self {
        let mut flat = Vec::with_capacity(triangles.len());
        let mut bounds_min = Vec3::splat(f32::INFINITY);
        let mut bounds_max = Vec3::splat(f32::NEG_INFINITY);

        for tri in triangles {
            let [a, b, c] = tri.map(|i| positions.get(i as usize).copied());
            let (Some(a), Some(b), Some(c)) = (a, b, c) else {
                continue;
            };
            bounds_min = bounds_min.min(a).min(b).min(c);
            bounds_max = bounds_max.max(a).max(b).max(c);
            flat.push([a, b, c]);
        }

        Self {
            triangles: flat,
            bounds_min,
            bounds_max,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Slab test against the whole-surface bounding box.
    fn ray_hits_bounds(&self, origin: Vec3, direction: Vec3) -> bool {
        let inv = direction.recip();
        let t0 = (self.bounds_min - origin) * inv;
        let t1 = (self.bounds_max - origin) * inv;
        let t_min = t0.min(t1).max_element();
        let t_max = t0.max(t1).min_element();
        t_max >= t_min.max(0.0)
    }
}

impl OcclusionProbe for SurfaceOcclusion {
    fn nearest_intersection(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        if self.triangles.is_empty() || !self.ray_hits_bounds(origin, direction) {
            return None;
        }
        let mut nearest: Option<f32> = None;
        for tri in &self.triangles {
            if let Some(t) = ray_triangle_intersect(origin, direction, tri) {
                if nearest.is_none_or(|best| t < best) {
                    nearest = Some(t);
                }
            }
        }
        nearest
    }
}

/// Moller-Trumbore ray/triangle intersection, front and back faces alike.
/// Returns the distance along the (unit) ray direction.
fn ray_triangle_intersect(origin: Vec3, direction: Vec3, tri: &[Vec3; 3]) -> Option<f32> {
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];

    let h = direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < RAY_EPSILON {
        return None; // Ray parallel to triangle plane.
    }

    let f = 1.0 / a;
    let s = origin - tri[0];
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > RAY_EPSILON).then_some(t)
}

/// Per-pick visibility filter: is a world-space point unoccluded by the
/// reference surface as seen from the camera?
///
/// Carries no probe when the active set has no surface or its visible-only
/// mode is off, in which case every query answers true. Pure; one ray test
/// per call otherwise.
pub struct VisibilityOracle<'a> {
    camera: Vec3,
    probe: Option<&'a dyn OcclusionProbe>,
}

impl<'a> VisibilityOracle<'a> {
    pub fn new(camera: Vec3, probe: Option<&'a dyn OcclusionProbe>) -> Self {
        Self { camera, probe }
    }

    /// Oracle that filters nothing.
    pub fn unfiltered() -> Self {
        Self {
            camera: Vec3::ZERO,
            probe: None,
        }
    }

    pub fn is_visible(&self, world: Vec3) -> bool {
        let Some(probe) = self.probe else {
            return true;
        };
        let offset = world - self.camera;
        let distance = offset.length();
        if distance <= SURFACE_EPSILON {
            return true; // Point coincides with the eye.
        }
        match probe.nearest_intersection(self.camera, offset / distance) {
            // Nothing between the camera and the point occludes it.
            None => true,
            Some(hit) => distance <= hit + SURFACE_EPSILON,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit quad at z = 0 facing +Z, made of two triangles.
    fn quad() -> SurfaceOcclusion {
        let positions = vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        SurfaceOcclusion::build(&positions, &[[0, 1, 2], [0, 2, 3]])
    }

    #[test]
    fn ray_triangle_hit_and_miss() {
        let tri = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let t = ray_triangle_intersect(Vec3::new(0.25, 0.25, 1.0), Vec3::NEG_Z, &tri);
        assert!((t.unwrap() - 1.0).abs() < 1e-5);

        let miss = ray_triangle_intersect(Vec3::new(2.0, 2.0, 1.0), Vec3::NEG_Z, &tri);
        assert!(miss.is_none());
    }

    #[test]
    fn surface_reports_nearest_hit() {
        let surface = quad();
        let hit = surface
            .nearest_intersection(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z)
            .unwrap();
        assert!((hit - 5.0).abs() < 1e-4);
    }

    #[test]
    fn occluded_point_is_invisible_and_front_point_is_visible() {
        let surface = quad();
        let oracle = VisibilityOracle::new(Vec3::new(0.0, 0.0, 5.0), Some(&surface));

        // Behind the quad relative to the camera.
        assert!(!oracle.is_visible(Vec3::new(0.0, 0.0, -2.0)));
        // In front of the quad.
        assert!(oracle.is_visible(Vec3::new(0.0, 0.0, 2.0)));
        // Off to the side, ray misses the surface entirely.
        assert!(oracle.is_visible(Vec3::new(5.0, 0.0, -2.0)));
    }

    #[test]
    fn point_on_the_surface_counts_as_visible() {
        let surface = quad();
        let oracle = VisibilityOracle::new(Vec3::new(0.0, 0.0, 5.0), Some(&surface));
        // Coplanar with the occluder: the epsilon guard must keep it visible.
        assert!(oracle.is_visible(Vec3::new(0.2, 0.3, 0.0)));
    }

    #[test]
    fn unfiltered_oracle_accepts_everything() {
        let oracle = VisibilityOracle::unfiltered();
        assert!(oracle.is_visible(Vec3::new(1e6, -1e6, 42.0)));
    }
}
