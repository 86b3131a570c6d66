//! Collision geometry: bounding boxes, triangle meshes, and ray tests.
//!
//! Cushion and rail shapes arrive from the table builder as triangle meshes
//! already positioned in world space. This module gives the narrow phase the
//! two queries it consumes: AABB overlap (broad phase) and segment-vs-mesh
//! raycast (narrow phase). It never constructs table geometry itself.

use std::cell::OnceCell;

use crate::types::{constants, ConfigError, CushionMaterial, Vec3};

/// Squared sweep length below which a raycast is skipped as degenerate.
const MIN_SWEEP_LENGTH_SQ: f64 = 1e-16;

// =============================================================================
// Aabb
// =============================================================================

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Smallest box containing all `points`. Empty input yields a degenerate
    /// box at the origin.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut iter = points.into_iter();
        let first = match iter.next() {
            Some(p) => p,
            None => return Self { min: Vec3::ZERO, max: Vec3::ZERO },
        };
        let mut min = first;
        let mut max = first;
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Self { min, max }
    }

    /// Box around a sphere.
    pub fn around_sphere(center: Vec3, radius: f64) -> Self {
        let r = Vec3::new(radius, radius, radius);
        Self {
            min: center - r,
            max: center + r,
        }
    }

    /// This box grown by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vec3::new(margin, margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: Vec3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Vec3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

// =============================================================================
// Sphere
// =============================================================================

/// An explicit sphere collider: the shape of every ball.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f64,
}

impl Sphere {
    pub const fn new(center: Vec3, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::around_sphere(self.center, self.radius)
    }
}

// =============================================================================
// Triangle / RayHit / TriangleMesh
// =============================================================================

/// One world-space triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub const fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Geometric (unnormalized-winding) unit normal.
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(&(self.c - self.a)).normalized()
    }
}

/// Result of a segment-vs-mesh cast.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Fraction along the segment, in [0, 1].
    pub t: f64,
    pub point: Vec3,
    /// Unit face normal, oriented against the sweep direction.
    pub normal: Vec3,
}

/// An immutable world-space triangle mesh.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    triangles: Vec<Triangle>,
}

impl TriangleMesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    /// A vertical wall quad from (x0, z0) to (x1, z1) spanning y0..y1,
    /// split into two triangles. Handy for hosts and tests; real tables
    /// feed in full profiled cushion meshes instead.
    pub fn vertical_panel(x0: f64, z0: f64, x1: f64, z1: f64, y0: f64, y1: f64) -> Self {
        let p00 = Vec3::new(x0, y0, z0);
        let p10 = Vec3::new(x1, y0, z1);
        let p01 = Vec3::new(x0, y1, z0);
        let p11 = Vec3::new(x1, y1, z1);
        Self::new(vec![Triangle::new(p00, p10, p11), Triangle::new(p00, p11, p01)])
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Bounds of all vertices.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(
            self.triangles
                .iter()
                .flat_map(|t| [t.a, t.b, t.c]),
        )
    }

    /// Cast the segment `from -> to` against the mesh, returning the nearest
    /// hit. Degenerate (near-zero) sweeps return `None` rather than erroring:
    /// a stationary ball cannot cross a surface.
    pub fn raycast(&self, from: Vec3, to: Vec3) -> Option<RayHit> {
        let dir = to - from;
        if dir.magnitude_squared() < MIN_SWEEP_LENGTH_SQ {
            return None;
        }

        let mut nearest: Option<RayHit> = None;
        for tri in &self.triangles {
            if let Some(t) = ray_triangle(from, dir, tri) {
                if nearest.as_ref().map_or(true, |h| t < h.t) {
                    let mut normal = tri.normal();
                    // Face the normal against the sweep so the response
                    // always pushes the ball back out.
                    if normal.dot(&dir) > 0.0 {
                        normal = -normal;
                    }
                    nearest = Some(RayHit {
                        t,
                        point: from + dir * t,
                        normal,
                    });
                }
            }
        }
        nearest
    }
}

/// Möller–Trumbore segment/triangle intersection.
///
/// Returns the fraction t in [0, 1] along `dir`, or None. Parallel and
/// degenerate configurations are "no hit", never an error.
fn ray_triangle(orig: Vec3, dir: Vec3, tri: &Triangle) -> Option<f64> {
    let edge1 = tri.b - tri.a;
    let edge2 = tri.c - tri.a;

    let h = dir.cross(&edge2);
    let det = edge1.dot(&h);
    if det.abs() < constants::EPSILON {
        return None; // parallel or degenerate triangle
    }

    let inv_det = 1.0 / det;
    let s = orig - tri.a;
    let u = s.dot(&h) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = dir.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(&q) * inv_det;
    if (0.0..=1.0).contains(&t) {
        Some(t)
    } else {
        None
    }
}

// =============================================================================
// Cushion
// =============================================================================

/// A static cushion: immutable mesh plus rubber coefficients and a cached,
/// radius-expanded world-space bounding box.
///
/// Cushions never move, so the bounds are computed once on first use and
/// never invalidated. The expansion by the largest ball radius in play keeps
/// the broad phase free of false negatives.
pub struct Cushion {
    pub mesh: TriangleMesh,
    pub restitution: f64,
    pub friction: f64,
    pub rolling_friction: f64,
    cached_bounds: OnceCell<Aabb>,
}

impl Cushion {
    pub fn new(mesh: TriangleMesh, material: &CushionMaterial) -> Result<Self, ConfigError> {
        if mesh.is_empty() {
            return Err(ConfigError::EmptyCushionMesh);
        }
        Ok(Self {
            mesh,
            restitution: material.restitution,
            friction: material.friction,
            rolling_friction: material.rolling_friction,
            cached_bounds: OnceCell::new(),
        })
    }

    /// The cushion's world-space AABB expanded by `max_ball_radius`.
    pub fn bounds(&self, max_ball_radius: f64) -> Aabb {
        *self
            .cached_bounds
            .get_or_init(|| self.mesh.bounds().expanded(max_ball_radius))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn wall() -> TriangleMesh {
        // Vertical wall at x = 1, spanning z in [-1, 1], y in [0, 0.1]
        TriangleMesh::vertical_panel(1.0, -1.0, 1.0, 1.0, 0.0, 0.1)
    }

    #[test]
    fn test_aabb_intersection() {
        let a = Aabb::from_points([Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0)]);
        let b = Aabb::from_points([Vec3::new(0.5, 0.5, 0.5), Vec3::new(2.0, 2.0, 2.0)]);
        let c = Aabb::from_points([Vec3::new(3.0, 3.0, 3.0), Vec3::new(4.0, 4.0, 4.0)]);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_aabb_expansion() {
        let a = Aabb::around_sphere(Vec3::ZERO, 1.0).expanded(0.5);
        assert_eq!(a.min, Vec3::new(-1.5, -1.5, -1.5));
        assert_eq!(a.max, Vec3::new(1.5, 1.5, 1.5));
    }

    #[test]
    fn test_raycast_hits_wall() {
        let mesh = wall();
        let hit = mesh
            .raycast(Vec3::new(0.0, 0.05, 0.0), Vec3::new(2.0, 0.05, 0.0))
            .expect("should hit the wall");

        assert!((hit.t - 0.5).abs() < 1e-9, "wall at x=1 is half way, got t={}", hit.t);
        assert!((hit.point.x - 1.0).abs() < 1e-9);
        // Normal must face back toward the ray origin
        assert!(hit.normal.x < 0.0);
    }

    #[test]
    fn test_raycast_miss() {
        let mesh = wall();
        // Sweep parallel to the wall
        assert!(mesh
            .raycast(Vec3::new(0.0, 0.05, 0.0), Vec3::new(0.0, 0.05, 0.5))
            .is_none());
        // Sweep that stops short
        assert!(mesh
            .raycast(Vec3::new(0.0, 0.05, 0.0), Vec3::new(0.5, 0.05, 0.0))
            .is_none());
    }

    #[test]
    fn test_raycast_degenerate_sweep_skipped() {
        let mesh = wall();
        let p = Vec3::new(0.999999999, 0.05, 0.0);
        assert!(mesh.raycast(p, p).is_none(), "zero-length sweep is no collision");
    }

    #[test]
    fn test_raycast_picks_nearest_triangle() {
        // Two walls, one behind the other
        let mut tris = wall().triangles().to_vec();
        tris.extend(TriangleMesh::vertical_panel(2.0, -1.0, 2.0, 1.0, 0.0, 0.1).triangles().to_vec());
        let mesh = TriangleMesh::new(tris);

        let hit = mesh
            .raycast(Vec3::new(0.0, 0.05, 0.0), Vec3::new(3.0, 0.05, 0.0))
            .expect("should hit");
        assert!((hit.point.x - 1.0).abs() < 1e-9, "nearest wall wins");
    }

    #[test]
    fn test_cushion_rejects_empty_mesh() {
        let result = Cushion::new(TriangleMesh::new(vec![]), &CushionMaterial::default());
        assert!(matches!(result, Err(ConfigError::EmptyCushionMesh)));
    }

    #[test]
    fn test_cushion_bounds_expanded_and_cached() {
        let cushion = Cushion::new(wall(), &CushionMaterial::default()).unwrap();
        let r = 0.028575;

        let b1 = cushion.bounds(r);
        assert!((b1.min.x - (1.0 - r)).abs() < 1e-12);
        assert!((b1.max.x - (1.0 + r)).abs() < 1e-12);

        // Second call with a different radius returns the cached box:
        // the cushion is static and the cache is never invalidated.
        let b2 = cushion.bounds(r * 2.0);
        assert_eq!(b1, b2);
    }
}
